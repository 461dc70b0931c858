//! The four-stage run: style conversion, T-pose, multi-view, model.
//!
//! Stages run strictly one after another on the calling thread. Each step is replaced
//! wholesale after every transition, never patched in place.

mod images;
mod request;
mod stage;

use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::filter::stylize;
use crate::job::{JobClient, JobError, Transport, UreqTransport};
use crate::model::{package_model, ModelBundle, ModelError, ModelOptions};
use crate::raster::{data_url, decode_data_url, RasterBuffer, RasterError};

pub use images::{GeneratedImage, ImageKind};
pub use request::{
	is_gpu_handler, model_payload, pose_payload, result_url, style_payload, view_payload, ProcessingOptions, TposeScope,
};
pub use stage::{initial_steps, transition, InvalidTransition, ProcessingStep, Stage, StepEvent, StepStatus};

#[derive(Debug, thiserror::Error)]
pub enum StageError {
	#[error(transparent)]
	Job(#[from] JobError),
	#[error(transparent)]
	Raster(#[from] RasterError),
	#[error(transparent)]
	Model(#[from] ModelError),
	#[error(transparent)]
	Transition(#[from] InvalidTransition),
	#[error("Handler finished without a result image")]
	NoResult,
	#[error("GPU handler finished without a processed image")]
	GpuHandlerWithoutImage,
	#[error("{} of 3 views failed ({})\n  - {first}", .failed.len(), view_list(.failed))]
	Views { failed: Vec<ImageKind>, first: Box<StageError> },
}

fn view_list(views: &[ImageKind]) -> String {
	views.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, thiserror::Error)]
#[error("Stage {stage} failed\n  - {cause}")]
pub struct PipelineError {
	pub stage: Stage,
	#[source]
	pub cause: StageError,
}

impl PipelineError {
	fn new(stage: Stage, cause: impl Into<StageError>) -> Self {
		Self {
			stage,
			cause: cause.into(),
		}
	}
}

/// Orchestrates one character through every stage and keeps the per-stage display state.
pub struct Pipeline<T> {
	client: JobClient<T>,
	options: ProcessingOptions,
	model_options: ModelOptions,
	steps: Vec<ProcessingStep>,
	images: Vec<GeneratedImage>,
	model: Option<ModelBundle>,
}

impl Pipeline<UreqTransport> {
	pub fn connect(config: ApiConfig, options: ProcessingOptions, model_options: ModelOptions) -> Self {
		Self::new(JobClient::new(config, UreqTransport::default()), options, model_options)
	}
}

impl<T: Transport> Pipeline<T> {
	pub fn new(client: JobClient<T>, options: ProcessingOptions, model_options: ModelOptions) -> Self {
		Self {
			client,
			options,
			model_options,
			steps: initial_steps(),
			images: Vec::new(),
			model: None,
		}
	}

	pub fn client(&self) -> &JobClient<T> {
		&self.client
	}

	pub fn steps(&self) -> &[ProcessingStep] {
		&self.steps
	}

	pub fn step(&self, stage: Stage) -> &ProcessingStep {
		&self.steps[stage.index()]
	}

	pub fn images(&self) -> &[GeneratedImage] {
		&self.images
	}

	pub fn image(&self, kind: ImageKind) -> Option<&GeneratedImage> {
		self.images.iter().find(|i| i.kind == kind)
	}

	pub fn model(&self) -> Option<&ModelBundle> {
		self.model.as_ref()
	}

	/// Every step back to pending; images and model are dropped.
	pub fn reset(&mut self) {
		self.steps = initial_steps();
		self.images.clear();
		self.model = None;
	}

	fn update(&mut self, stage: Stage, event: StepEvent) -> Result<(), PipelineError> {
		let next = self.steps[stage.index()]
			.apply(event)
			.map_err(|e| PipelineError::new(stage, e))?;
		if next.status != self.steps[stage.index()].status {
			info!("{} is now {}", stage, next.status);
		}
		self.steps[stage.index()] = next;
		Ok(())
	}

	/// Runs `body` as `stage`: processing first, then completed or error.
	fn run_stage<R>(
		&mut self,
		stage: Stage,
		body: impl FnOnce(&mut Self) -> Result<R, StageError>,
	) -> Result<R, PipelineError> {
		self.update(stage, StepEvent::Dispatch)?;
		match body(self) {
			Ok(value) => {
				self.update(stage, StepEvent::Succeed)?;
				Ok(value)
			}
			Err(cause) => {
				self.update(stage, StepEvent::Fail)?;
				error!("{} failed: {}", stage, cause);
				Err(PipelineError { stage, cause })
			}
		}
	}

	/// Runs every stage on the encoded image `input`.
	///
	/// Starts from a reset state. The first failing stage ends the run; stages before it
	/// keep their results and later ones stay pending.
	pub fn run(&mut self, input: &[u8]) -> Result<&ModelBundle, PipelineError> {
		self.reset();
		let run_id = Uuid::new_v4();
		let span = info_span!("run", id = %run_id);
		let _guard = span.enter();

		let (raster, styled) = self.run_stage(Stage::StyleConversion, |p| {
			let raster = RasterBuffer::decode(input)?;
			let format = RasterBuffer::format_name(input).unwrap_or("png");
			p.push_image(ImageKind::Original, data_url(&format!("image/{format}"), input));
			info!("Starting run on {}x{} {} image", raster.width(), raster.height(), format);

			let styled = p.style_conversion(input, format, &raster)?;
			Ok((raster, styled))
		})?;
		let tpose = self.run_stage(Stage::PoseConversion, |p| p.pose_conversion(&styled))?;
		self.run_stage(Stage::MultiView, |p| p.multi_view(&tpose))?;
		let bundle = self.run_stage(Stage::Model3d, |p| p.model_creation(&tpose, &raster))?;

		info!("Run finished with {} model files", bundle.files.len());
		let bundle: &ModelBundle = self.model.insert(bundle);
		Ok(bundle)
	}

	fn push_image(&mut self, kind: ImageKind, url: String) {
		let mut images = self.images.clone();
		images.push(GeneratedImage::new(kind, url));
		self.images = images;
	}

	fn remote_image(&self, payload: &json::JsonValue) -> Result<String, StageError> {
		let report = self.client.run(payload)?;
		result_url(&report).ok_or(StageError::NoResult)
	}

	fn style_conversion(&mut self, input: &[u8], format: &str, raster: &RasterBuffer) -> Result<String, StageError> {
		let report = self.client.run(&style_payload(input, format, &self.options))?;
		let url = match result_url(&report) {
			Some(url) => url,
			None if is_gpu_handler(&report) => return Err(StageError::GpuHandlerWithoutImage),
			None => {
				warn!("Handler returned no styled image, using the local style pass");
				stylize(raster, &self.options.filter_options()).to_data_url()?
			}
		};
		self.push_image(ImageKind::Genshin, url.clone());
		Ok(url)
	}

	fn pose_conversion(&mut self, styled: &str) -> Result<String, StageError> {
		let url = self.remote_image(&pose_payload(styled, &self.options))?;
		self.push_image(ImageKind::Tpose, url.clone());
		Ok(url)
	}

	/// Front, side and back, one after the other. A failed view does not stop the others.
	fn multi_view(&mut self, tpose: &str) -> Result<(), StageError> {
		let mut failed = Vec::new();
		let mut first = None;

		for (i, view) in ImageKind::VIEWS.into_iter().enumerate() {
			match self.remote_image(&view_payload(tpose, view, &self.options)) {
				Ok(url) => self.push_image(view, url),
				Err(e) => {
					warn!("{} view failed: {}", view, e);
					failed.push(view);
					if first.is_none() {
						first = Some(e);
					}
				}
			}
			let progress = ((i + 1) * 100 / ImageKind::VIEWS.len()) as u8;
			self.update(Stage::MultiView, StepEvent::Progress(progress))
				.map_err(|e| e.cause)?;
		}

		match first {
			None => Ok(()),
			Some(first) => Err(StageError::Views {
				failed,
				first: Box::new(first),
			}),
		}
	}

	fn model_creation(&mut self, tpose: &str, raster: &RasterBuffer) -> Result<ModelBundle, StageError> {
		let report = self.client.run(&model_payload(tpose, &self.model_options))?;
		if let Some(bundle) = ModelBundle::from_remote(report.output_object(), &report.raw)? {
			return Ok(bundle);
		}

		warn!("Handler returned no model files, packaging the placeholder model locally");
		let texture_source = match decode_data_url(tpose).and_then(|bytes| RasterBuffer::decode(&bytes)) {
			Ok(image) => image,
			Err(_) => stylize(raster, &self.options.filter_options()),
		};
		Ok(package_model(&texture_source, &self.model_options)?)
	}
}

/// Local style pass plus placeholder model, without any remote call.
pub fn run_local(
	input: &[u8],
	options: &ProcessingOptions,
	model_options: &ModelOptions,
) -> Result<(RasterBuffer, ModelBundle), PipelineError> {
	let raster = RasterBuffer::decode(input).map_err(|e| PipelineError::new(Stage::StyleConversion, e))?;
	let styled = stylize(&raster, &options.filter_options());
	let bundle = package_model(&styled, model_options).map_err(|e| PipelineError::new(Stage::Model3d, e))?;
	Ok((styled, bundle))
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;
	use crate::config::PollSettings;
	use crate::job::transport::mock::{ok, ScriptedTransport};
	use crate::job::HttpResponse;
	use crate::model::ModelFileKind;

	const SYNC: &str = "https://api.example.ai/v2/abc123/runsync";
	const ASYNC: &str = "https://api.example.ai/v2/abc123/run";

	fn png() -> Vec<u8> {
		RasterBuffer::filled(4, 4, [200, 30, 30, 255]).encode_png().unwrap()
	}

	fn completed(url: &str) -> HttpResponse {
		ok(&format!(r#"{{"status":"COMPLETED","output":{{"image_url":"{url}"}}}}"#))
	}

	fn pipeline(endpoint: &str, transport: ScriptedTransport) -> Pipeline<ScriptedTransport> {
		let config = ApiConfig::new("key", endpoint).unwrap().with_poll(PollSettings {
			max_attempts: 3,
			interval: Duration::ZERO,
		});
		let model_options = ModelOptions {
			vertex_count: 90,
			texture_size: 4,
			..Default::default()
		};
		Pipeline::new(JobClient::new(config, transport), ProcessingOptions::default(), model_options)
	}

	fn statuses<T: Transport>(p: &Pipeline<T>) -> Vec<StepStatus> {
		p.steps().iter().map(|s| s.status).collect()
	}

	#[test]
	fn full_run_with_remote_model_files() {
		let transport = ScriptedTransport::new()
			.on_post(completed("https://cdn/genshin.png"))
			.on_post(completed("https://cdn/tpose.png"))
			.on_post(completed("https://cdn/front.png"))
			.on_post(completed("https://cdn/side.png"))
			.on_post(completed("https://cdn/back.png"))
			.on_post(ok(
				r#"{"status":"COMPLETED","output":{"model_files":[{"filename":"c.glb","url":"https://cdn/c.glb","format":"glb"}]}}"#,
			));
		let mut p = pipeline(SYNC, transport);

		let bundle = p.run(&png()).unwrap();
		assert_eq!(bundle.files.len(), 1);
		assert!(!bundle.is_local());

		assert!(statuses(&p).iter().all(|s| *s == StepStatus::Completed));
		let kinds: Vec<_> = p.images().iter().map(|i| i.kind).collect();
		assert_eq!(
			kinds,
			[
				ImageKind::Original,
				ImageKind::Genshin,
				ImageKind::Tpose,
				ImageKind::Front,
				ImageKind::Side,
				ImageKind::Back
			]
		);
		assert_eq!(p.image(ImageKind::Side).unwrap().url, "https://cdn/side.png");

		let posted = p.client().transport().posted_bodies();
		assert_eq!(posted[0]["input"]["action"], "process_image");
		assert_eq!(posted[1]["input"]["image_url"], "https://cdn/genshin.png");
		assert_eq!(posted[3]["input"]["view"], "side");
		assert_eq!(posted[5]["input"]["processed_image_url"], "https://cdn/tpose.png");
	}

	#[test]
	fn failed_side_view_stops_before_the_model() {
		let transport = ScriptedTransport::new()
			.on_post(completed("https://cdn/genshin.png"))
			.on_post(completed("https://cdn/tpose.png"))
			.on_post(completed("https://cdn/front.png"))
			.on_post(HttpResponse {
				status: 500,
				body: "boom".to_owned(),
			})
			.on_post(completed("https://cdn/back.png"));
		let mut p = pipeline(SYNC, transport);

		let err = p.run(&png()).unwrap_err();
		assert_eq!(err.stage, Stage::MultiView);
		assert!(matches!(&err.cause, StageError::Views { failed, .. } if failed == &[ImageKind::Side]));

		assert_eq!(
			statuses(&p),
			[
				StepStatus::Completed,
				StepStatus::Completed,
				StepStatus::Error,
				StepStatus::Pending
			]
		);
		assert_eq!(p.step(Stage::MultiView).progress, Some(100));
		assert!(p.image(ImageKind::Front).is_some());
		assert!(p.image(ImageKind::Back).is_some());
		assert!(p.image(ImageKind::Side).is_none());
		// all three views were attempted, the model never was
		assert_eq!(p.client().transport().count("POST"), 5);
		assert!(p.model().is_none());
	}

	#[test]
	fn remote_failure_is_not_masked() {
		let transport =
			ScriptedTransport::new().on_post(ok(r#"{"status":"FAILED","error":"CUDA out of memory"}"#));
		let mut p = pipeline(SYNC, transport);

		let err = p.run(&png()).unwrap_err();
		assert_eq!(err.stage, Stage::StyleConversion);
		assert!(matches!(&err.cause, StageError::Job(JobError::Failed(m)) if m == "CUDA out of memory"));
		assert_eq!(statuses(&p)[0], StepStatus::Error);
		assert_eq!(statuses(&p)[1], StepStatus::Pending);
		assert!(p.image(ImageKind::Genshin).is_none());
	}

	#[test]
	fn async_jobs_are_polled_and_fall_back_locally() {
		let transport = ScriptedTransport::new()
			.on_post(ok(r#"{"id":"j1","status":"IN_QUEUE"}"#))
			.on_get(ok(r#"{"status":"IN_PROGRESS"}"#))
			// no image: local style pass
			.on_get(ok(r#"{"status":"COMPLETED","output":{"message":"test handler"}}"#))
			.on_post(ok(r#"{"id":"j2"}"#))
			.on_get(completed("https://cdn/tpose.png"))
			.on_post(ok(r#"{"id":"j3"}"#))
			.on_get(completed("https://cdn/front.png"))
			.on_post(ok(r#"{"id":"j4"}"#))
			.on_get(completed("https://cdn/side.png"))
			.on_post(ok(r#"{"id":"j5"}"#))
			.on_get(completed("https://cdn/back.png"))
			.on_post(ok(r#"{"id":"j6"}"#))
			// no model files: local bundle
			.on_get(ok(r#"{"status":"SUCCESS","output":{}}"#));
		let mut p = pipeline(ASYNC, transport);

		let bundle = p.run(&png()).unwrap();
		assert!(bundle.is_local());
		assert!(bundle.file(ModelFileKind::Obj).is_some());

		let genshin = p.image(ImageKind::Genshin).unwrap();
		assert!(genshin.is_inline());
		let styled = RasterBuffer::decode(&decode_data_url(&genshin.url).unwrap()).unwrap();
		assert_eq!((styled.width(), styled.height()), (4, 4));

		let transport = p.client().transport();
		assert_eq!(transport.count("GET"), 7);
		assert!(transport.requests.borrow()[1].url.ends_with("/v2/abc123/status/j1"));
	}

	#[test]
	fn reset_clears_everything() {
		let transport = ScriptedTransport::new().on_post(HttpResponse {
			status: 401,
			body: "unauthorized".to_owned(),
		});
		let mut p = pipeline(SYNC, transport);
		let err = p.run(&png()).unwrap_err();
		assert!(matches!(err.cause, StageError::Job(JobError::Transport { status: 401, .. })));
		assert_eq!(p.images().len(), 1);

		p.reset();
		assert!(p.images().is_empty());
		assert_eq!(p.steps(), initial_steps().as_slice());
	}

	#[test]
	fn undecodable_input() {
		let mut p = pipeline(SYNC, ScriptedTransport::new());
		let err = p.run(b"definitely not an image").unwrap_err();
		assert!(matches!(err.cause, StageError::Raster(RasterError::Decode(_))));
		assert_eq!(err.stage, Stage::StyleConversion);
		assert_eq!(p.step(Stage::StyleConversion).status, StepStatus::Error);
		assert_eq!(p.step(Stage::PoseConversion).status, StepStatus::Pending);
		assert!(p.images().is_empty());
		assert_eq!(p.client().transport().count("POST"), 0);
	}

	#[test]
	fn gpu_handler_without_image_is_an_error() {
		let transport = ScriptedTransport::new()
			.on_post(ok(r#"{"status":"COMPLETED","handler_version":"REAL_AI_v3","output":{"message":"done"}}"#));
		let mut p = pipeline(SYNC, transport);

		let err = p.run(&png()).unwrap_err();
		assert_eq!(err.stage, Stage::StyleConversion);
		assert!(matches!(err.cause, StageError::GpuHandlerWithoutImage));
		assert_eq!(p.step(Stage::StyleConversion).status, StepStatus::Error);
		assert!(p.image(ImageKind::Genshin).is_none());
	}

	#[test]
	fn local_only_run() {
		let model_options = ModelOptions {
			vertex_count: 60,
			texture_size: 4,
			enable_rigging: true,
			..Default::default()
		};
		let (styled, bundle) = run_local(&png(), &ProcessingOptions::default(), &model_options).unwrap();
		assert_eq!((styled.width(), styled.height()), (4, 4));
		assert!(bundle.file(ModelFileKind::Fbx).is_some());
		assert_eq!(bundle.notes.len(), 1);
	}
}

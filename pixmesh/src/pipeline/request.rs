//! Handler payloads and result lookup.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use json::JsonValue;

use super::images::ImageKind;
use crate::filter::{FilterOptions, StyleOptions};
use crate::formats::SerialExtend;
use crate::job::JobReport;
use crate::mesh::Gender;
use crate::model::ModelOptions;

const BASE_PROMPT: &str = "Genshin Impact style, anime cel shading, ultra smooth gradients, pristine clean lineart, \
	masterpiece quality, ultra detailed face and eyes, perfect natural hands, strict T-pose anatomy, \
	character perfectly centered, rich vibrant colors, professional studio lighting, 8K resolution, \
	photorealistic textures with anime style";

const BASE_NEGATIVE_PROMPT: &str = "pixelated, 8-bit, mosaic, dithering, voxel, lowres, jpeg artifacts, oversharp, \
	deformed hands, extra fingers, missing fingers, text, watermark, harsh shadows, photorealistic, blurry, \
	low quality, noise, grain, compression artifacts, bad anatomy, distorted proportions, asymmetrical features";

const NO_WEAPON_PROMPT: &str = ", no weapons, empty hands, weaponless";
const WEAPON_NEGATIVE_PROMPT: &str = ", weapon, gun, sword, knife, rifle, spear, bow, axe, staff, grenade, bomb, \
	blade, shield, hammer, mace";

/// Keys a stage result image is looked up under, in `output` first, then at the top level.
const RESULT_URL_KEYS: [&str; 3] = ["processed_image_url", "image_url", "result_url"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TposeScope {
	#[default]
	FullBody,
	UpperBody,
}

impl TposeScope {
	pub fn as_str(self) -> &'static str {
		match self {
			TposeScope::FullBody => "full_body",
			TposeScope::UpperBody => "upper_body",
		}
	}
}

/// Knobs of the remote image stages and of the local style pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOptions {
	pub score_threshold: f32,
	pub mask_dilate: u32,
	pub tpose_scope: TposeScope,
	pub guidance_scale: f32,
	pub steps: u32,
	pub controlnet_scales: [f32; 2],
	pub out_long_side: u32,
	pub remove_weapon: bool,
	pub gender: Gender,
	/// Replaces the built-in prompt.
	pub prompt: Option<String>,
	pub negative_prompt: Option<String>,
	pub enable_highres_fix: bool,
	pub highres_scale: f32,
	pub cfg_rescale: f32,
	pub eta: f32,
	pub sampler: String,

	pub remove_pixelation: bool,
	pub enhance_colors: bool,
	pub glow: bool,
}

impl Default for ProcessingOptions {
	fn default() -> Self {
		Self {
			score_threshold: 0.15,
			mask_dilate: 16,
			tpose_scope: TposeScope::FullBody,
			guidance_scale: 12.5,
			steps: 75,
			controlnet_scales: [1.8, 0.8],
			out_long_side: 2048,
			remove_weapon: false,
			gender: Gender::Auto,
			prompt: None,
			negative_prompt: None,
			enable_highres_fix: true,
			highres_scale: 2.0,
			cfg_rescale: 0.7,
			eta: 0.0,
			sampler: "DPM++ 2M Karras".to_owned(),
			remove_pixelation: true,
			enhance_colors: true,
			glow: true,
		}
	}
}

impl ProcessingOptions {
	/// Prompt and negative prompt with the gender and weapon additions.
	pub fn prompts(&self) -> (String, String) {
		let mut prompt = self.prompt.clone().unwrap_or_else(|| BASE_PROMPT.to_owned());
		let mut negative = self
			.negative_prompt
			.clone()
			.unwrap_or_else(|| BASE_NEGATIVE_PROMPT.to_owned());

		match self.gender {
			Gender::Male => prompt.push_str(", male character, masculine features"),
			Gender::Female => prompt.push_str(", female character, feminine features"),
			Gender::Auto => (),
		}
		if self.remove_weapon {
			prompt.push_str(NO_WEAPON_PROMPT);
			negative.push_str(WEAPON_NEGATIVE_PROMPT);
		}
		(prompt, negative)
	}

	pub fn filter_options(&self) -> FilterOptions {
		FilterOptions {
			style: StyleOptions {
				remove_pixelation: self.remove_pixelation,
				enhance_colors: self.enhance_colors,
			},
			glow: self.glow,
			remove_weapon: self.remove_weapon,
			..Default::default()
		}
	}

	fn common_config(&self) -> JsonValue {
		let mut config = JsonValue::new_object();
		config["score_threshold"] = self.score_threshold.into();
		config["mask_dilate"] = self.mask_dilate.into();
		config["tpose_scope"] = self.tpose_scope.as_str().into();
		config["guidance_scale"] = self.guidance_scale.into();
		config["steps"] = self.steps.into();
		config["controlnet_scales"] = JsonValue::Array(self.controlnet_scales.iter().map(|&s| s.into()).collect());
		config["out_long_side"] = self.out_long_side.into();
		config["remove_weapon"] = self.remove_weapon.into();
		config["character_gender"] = self.gender.as_str().into();
		config
	}

	fn style_config(&self) -> JsonValue {
		let (prompt, negative) = self.prompts();
		let mut config = self.common_config();
		config["prompt"] = prompt.into();
		config["negative_prompt"] = negative.into();
		config["enable_highres_fix"] = self.enable_highres_fix.into();
		config["highres_scale"] = self.highres_scale.into();
		config["batch_size"] = 1.into();
		config["cfg_rescale"] = self.cfg_rescale.into();
		config["eta"] = self.eta.into();
		config["sampler"] = self.sampler.as_str().into();
		config
	}
}

fn envelope(action: &str, fill: impl FnOnce(&mut JsonValue)) -> JsonValue {
	let mut input = JsonValue::new_object();
	input["action"] = action.into();
	fill(&mut input);
	let mut payload = JsonValue::new_object();
	payload["input"] = input;
	payload
}

/// Style conversion of the raw upload, sent inline as base64.
pub fn style_payload(image: &[u8], format: &str, options: &ProcessingOptions) -> JsonValue {
	envelope("process_image", |input| {
		input["image_data"] = STANDARD.encode(image).into();
		input["image_format"] = format.into();
		input["config"] = options.style_config();
	})
}

pub fn pose_payload(image_url: &str, options: &ProcessingOptions) -> JsonValue {
	envelope("generate_tpose", |input| {
		input["image_url"] = image_url.into();
		input["config"] = options.common_config();
	})
}

pub fn view_payload(image_url: &str, view: ImageKind, options: &ProcessingOptions) -> JsonValue {
	envelope("generate_view", |input| {
		input["image_url"] = image_url.into();
		input["view"] = view.as_str().into();
		input["config"] = options.common_config();
	})
}

pub fn model_payload(image_url: &str, options: &ModelOptions) -> JsonValue {
	envelope("generate_3d_model", |input| {
		input["processed_image_url"] = image_url.into();
		input["config"] = options.to_json();
	})
}

/// Result image of a finished job, if the handler put one anywhere we look.
pub fn result_url(report: &JobReport) -> Option<String> {
	let output = report.output_object().map(|o| o.0);
	let top = report.raw.as_object();
	[output, top]
		.into_iter()
		.flatten()
		.flat_map(|obj| RESULT_URL_KEYS.iter().filter_map(|key| obj.get(key).and_then(JsonValue::as_str)))
		.find(|url| !url.is_empty())
		.map(str::to_owned)
}

/// Whether the answer came from a GPU-backed handler rather than a test one.
///
/// Only test handlers may finish without an image and leave the styling to the local pass.
pub fn is_gpu_handler(report: &JobReport) -> bool {
	let output = report.output_object().map(|o| o.0);
	let top = report.raw.as_object();
	let uses_gpu = |obj: &json::object::Object| {
		let gpu_used = obj.get("gpu_used").is_some_and(|v| match v {
			JsonValue::Boolean(b) => *b,
			JsonValue::Null => false,
			other => other.as_str().map_or(true, |s| !s.is_empty()),
		});
		let gpu_message = obj
			.get("message")
			.and_then(JsonValue::as_str)
			.is_some_and(|m| m.contains("GPU"));
		gpu_used || gpu_message
	};

	let real_ai = top
		.and_then(|t| t.get("handler_version"))
		.and_then(JsonValue::as_str)
		.is_some_and(|v| v.contains("REAL_AI"));
	real_ai || [output, top].into_iter().flatten().any(uses_gpu)
}

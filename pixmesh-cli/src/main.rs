use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

use pixmesh::mesh::Gender;
use pixmesh::model::{ModelBundle, ModelOptions, OutputFormat};
use pixmesh::pipeline::{run_local, Pipeline, ProcessingOptions, TposeScope};
use pixmesh::raster::decode_data_url;
use pixmesh::rig::build_rig;
use pixmesh::ApiConfig;

const API_KEY_VAR: &str = "PIXMESH_API_KEY";
const ENDPOINT_VAR: &str = "PIXMESH_ENDPOINT";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Command,

	#[arg(short, long, global = true, help = "Log at debug level")]
	verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run every remote stage on an image
	Run {
		#[command(flatten)]
		api: ApiArgs,
		#[command(flatten)]
		job: JobArgs,
	},
	/// Local style pass and placeholder model only, no network
	Local {
		#[command(flatten)]
		job: JobArgs,
	},
	/// Check that the handler answers
	Ping {
		#[command(flatten)]
		api: ApiArgs,
	},
}

#[derive(Args, Debug)]
struct ApiArgs {
	#[arg(long, help = "API key, defaults to $PIXMESH_API_KEY")]
	api_key: Option<String>,
	#[arg(long, help = "https://<host>/v2/<id>/(run|runsync), defaults to $PIXMESH_ENDPOINT")]
	endpoint: Option<String>,
}

#[derive(Args, Debug)]
struct JobArgs {
	#[arg(help = "Path to the pixel-art image")]
	input: PathBuf,
	#[arg(short, long, default_value = "out", help = "Directory the artifacts are written to")]
	out: PathBuf,
	#[arg(long, default_value_t = Gender::Auto)]
	gender: Gender,
	#[arg(long)]
	remove_weapon: bool,
	#[arg(long, help = "Limit the T-pose conversion to the upper body")]
	upper_body: bool,
	#[arg(long, default_value_t = 50_000)]
	vertex_count: usize,
	#[arg(long, default_value_t = 1024)]
	texture_size: u32,
	#[arg(long, help = "Include the skeleton")]
	rig: bool,
	#[arg(long, value_delimiter = ',', default_value = "obj,fbx,glb")]
	formats: Vec<OutputFormat>,
	#[arg(long, default_value_t = 0, help = "Seed of the placeholder geometry")]
	seed: u64,
	#[arg(long, help = "Keep the pixelated look (no posterization)")]
	keep_pixels: bool,
	#[arg(long)]
	no_glow: bool,
}

impl JobArgs {
	fn processing_options(&self) -> ProcessingOptions {
		ProcessingOptions {
			remove_weapon: self.remove_weapon,
			gender: self.gender,
			tpose_scope: if self.upper_body {
				TposeScope::UpperBody
			} else {
				TposeScope::FullBody
			},
			remove_pixelation: !self.keep_pixels,
			glow: !self.no_glow,
			..Default::default()
		}
	}

	fn model_options(&self) -> ModelOptions {
		ModelOptions {
			texture_size: self.texture_size,
			enable_rigging: self.rig,
			gender: self.gender,
			output_formats: self.formats.clone(),
			vertex_count: self.vertex_count,
			seed: self.seed,
			..Default::default()
		}
	}
}

fn api_config(args: &ApiArgs) -> Result<ApiConfig, Box<dyn Error>> {
	let api_key = args
		.api_key
		.clone()
		.or_else(|| std::env::var(API_KEY_VAR).ok())
		.unwrap_or_default();
	let endpoint = args
		.endpoint
		.clone()
		.or_else(|| std::env::var(ENDPOINT_VAR).ok())
		.unwrap_or_default();
	Ok(ApiConfig::new(api_key, &endpoint)?)
}

/// Writes a data URL to `dir/name`, or just reports a remote URL.
fn save(dir: &Path, name: &str, url: &str) -> Result<(), Box<dyn Error>> {
	if url.starts_with("data:") {
		let path = dir.join(name);
		fs::write(&path, decode_data_url(url)?)?;
		info!("Wrote {}", path.display());
	} else {
		println!("{name}: {url}");
	}
	Ok(())
}

fn save_bundle(dir: &Path, bundle: &ModelBundle) -> Result<(), Box<dyn Error>> {
	for file in &bundle.files {
		save(dir, &file.name, &file.url)?;
	}
	for note in &bundle.notes {
		warn!("{}", note);
	}
	Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();
	let _ = dotenvy::dotenv();

	tracing_subscriber::registry()
		.with(fmt::layer())
		.with(if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO })
		.init();

	match cli.command {
		Command::Ping { api } => {
			let pipeline = Pipeline::connect(api_config(&api)?, ProcessingOptions::default(), ModelOptions::default());
			let report = pipeline.client().ping()?;
			info!("Handler answered: {:?}", report.status);
			println!("{}", report.raw.pretty(2));
		}
		Command::Local { job } => {
			let input = fs::read(&job.input)?;
			fs::create_dir_all(&job.out)?;

			let (styled, bundle) = run_local(&input, &job.processing_options(), &job.model_options())?;
			save(&job.out, "genshin_style.png", &styled.to_data_url()?)?;
			save_bundle(&job.out, &bundle)?;
			if job.rig {
				println!("{}", build_rig(job.gender));
			}
		}
		Command::Run { api, job } => {
			let config = api_config(&api)?;
			let input = fs::read(&job.input)?;
			fs::create_dir_all(&job.out)?;

			let mut pipeline = Pipeline::connect(config, job.processing_options(), job.model_options());
			let result = pipeline.run(&input).map(|_| ());

			for image in pipeline.images() {
				save(&job.out, image.filename, &image.url)?;
			}
			if let Some(bundle) = pipeline.model() {
				save_bundle(&job.out, bundle)?;
			}
			for step in pipeline.steps() {
				println!("{:<24} {}", step.title(), step.status);
			}
			if let Err(e) = result {
				error!("{}", e);
				return Err(e.into());
			}
		}
	}

	Ok(())
}

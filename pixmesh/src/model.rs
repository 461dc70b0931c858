//! Model stage artifacts: the remote `model_files` listing or the local placeholder bundle.

use std::fmt;
use std::str::FromStr;

use json::JsonValue;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::formats::fbx::{emit_rig, RIG_FILENAME};
use crate::formats::gltf::{build_scene_graph, SCENE_FILENAME};
use crate::formats::mtl::{build_material_file, MTL_FILENAME};
use crate::formats::obj::{emit_obj, OBJ_FILENAME};
use crate::formats::{JsonError, JsonObject};
use crate::mesh::{build_mesh, Gender, MeshError};
use crate::raster::{data_url, decode_data_url, RasterBuffer, RasterError};
use crate::rig::{bind, build_rig};
use crate::texture::build_texture_atlas;

pub const LOCAL_HANDLER_VERSION: &str = "LOCAL_ADVANCED_v2.0";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
	#[error(transparent)]
	Mesh(#[from] MeshError),
	#[error(transparent)]
	Raster(#[from] RasterError),
	#[error("Invalid model file listing\n  - {0}")]
	Listing(#[from] JsonError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
	Obj,
	Fbx,
	Glb,
}

impl OutputFormat {
	pub fn as_str(self) -> &'static str {
		match self {
			OutputFormat::Obj => "obj",
			OutputFormat::Fbx => "fbx",
			OutputFormat::Glb => "glb",
		}
	}
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown output format {0:?}, expected obj, fbx or glb")]
pub struct UnknownFormatError(String);

impl FromStr for OutputFormat {
	type Err = UnknownFormatError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"obj" => Ok(OutputFormat::Obj),
			"fbx" => Ok(OutputFormat::Fbx),
			"glb" | "gltf" => Ok(OutputFormat::Glb),
			_ => Err(UnknownFormatError(s.to_owned())),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelOptions {
	pub mesh_resolution: u32,
	pub texture_size: u32,
	pub enable_rigging: bool,
	pub gender: Gender,
	pub output_formats: Vec<OutputFormat>,
	pub vertex_count: usize,
	/// Seed for the placeholder geometry.
	pub seed: u64,
}

impl Default for ModelOptions {
	fn default() -> Self {
		Self {
			mesh_resolution: 256,
			texture_size: 1024,
			enable_rigging: false,
			gender: Gender::Auto,
			output_formats: vec![OutputFormat::Obj, OutputFormat::Fbx, OutputFormat::Glb],
			vertex_count: 50_000,
			seed: 0,
		}
	}
}

impl ModelOptions {
	fn wants(&self, format: OutputFormat) -> bool {
		self.output_formats.contains(&format)
	}

	/// `config` object of the remote model request.
	pub fn to_json(&self) -> JsonValue {
		let mut config = JsonValue::new_object();
		config["mesh_resolution"] = self.mesh_resolution.into();
		config["texture_size"] = self.texture_size.into();
		config["enable_rigging"] = self.enable_rigging.into();
		config["character_gender"] = self.gender.as_str().into();
		config["output_formats"] = JsonValue::Array(self.output_formats.iter().map(|f| f.as_str().into()).collect());
		config["vertex_count"] = self.vertex_count.into();
		config["uv_unwrap"] = true.into();
		config["smooth_normals"] = true.into();
		config["optimize_mesh"] = true.into();
		config
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFileKind {
	Obj,
	Mtl,
	Fbx,
	Glb,
	Ply,
	Png,
}

impl ModelFileKind {
	pub fn from_name(name: &str) -> Option<Self> {
		match name.to_ascii_lowercase().as_str() {
			"obj" => Some(ModelFileKind::Obj),
			"mtl" => Some(ModelFileKind::Mtl),
			"fbx" => Some(ModelFileKind::Fbx),
			"glb" | "gltf" => Some(ModelFileKind::Glb),
			"ply" => Some(ModelFileKind::Ply),
			"png" => Some(ModelFileKind::Png),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			ModelFileKind::Obj => "obj",
			ModelFileKind::Mtl => "mtl",
			ModelFileKind::Fbx => "fbx",
			ModelFileKind::Glb => "glb",
			ModelFileKind::Ply => "ply",
			ModelFileKind::Png => "png",
		}
	}
}

impl fmt::Display for ModelFileKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One downloadable artifact. Local artifacts carry their content as a data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFile {
	pub name: String,
	pub url: String,
	pub kind: ModelFileKind,
	/// Size in bytes, 0 when the remote did not say.
	pub size: usize,
}

impl ModelFile {
	fn text(name: &str, kind: ModelFileKind, mime: &str, content: &str) -> Self {
		Self {
			name: name.to_owned(),
			url: data_url(mime, content.as_bytes()),
			kind,
			size: content.len(),
		}
	}

	/// Content of a data URL artifact, `None` for remote URLs.
	pub fn contents(&self) -> Option<Result<Vec<u8>, RasterError>> {
		self.url.starts_with("data:").then(|| decode_data_url(&self.url))
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelBundle {
	pub files: Vec<ModelFile>,
	pub handler_version: String,
	/// Known shortcomings of the produced assets.
	pub notes: Vec<String>,
}

impl ModelBundle {
	pub fn is_local(&self) -> bool {
		self.handler_version == LOCAL_HANDLER_VERSION
	}

	pub fn file(&self, kind: ModelFileKind) -> Option<&ModelFile> {
		self.files.iter().find(|f| f.kind == kind)
	}

	/// Reads `model_files` from `output`, then from the top level of `raw`.
	///
	/// Entries without a usable URL or with an unknown kind are skipped. Returns `None`
	/// when no entry survives.
	pub fn from_remote(output: Option<JsonObject>, raw: &JsonValue) -> Result<Option<Self>, ModelError> {
		let top = JsonObject::from_value("response", raw)?;
		let listing = match output.filter(|o| o.contains("model_files")) {
			Some(output) => output.get_list("model_files").map_err(|e| e.nested("output"))?,
			None if top.contains("model_files") => top.get_list("model_files")?,
			None => return Ok(None),
		};

		let mut files = Vec::with_capacity(listing.len());
		for (i, entry) in listing.iter().enumerate() {
			let entry = JsonObject::from_value("model_files", entry).map_err(|e| e.in_list(i))?;
			match parse_model_file(entry) {
				Some(file) => files.push(file),
				None => warn!("Skipping model file {} of the handler listing", i),
			}
		}
		if files.is_empty() {
			return Ok(None);
		}

		let handler_version = output
			.and_then(|o| o.first_str(&["handler_version"]))
			.or_else(|| top.first_str(&["handler_version"]))
			.unwrap_or("API_v1.0")
			.to_owned();
		Ok(Some(Self {
			files,
			handler_version,
			notes: Vec::new(),
		}))
	}
}

fn parse_model_file(entry: JsonObject) -> Option<ModelFile> {
	let url = entry.first_str(&["url"])?;
	let kind_name = entry.first_str(&["format", "type"]).unwrap_or("obj");
	let kind = ModelFileKind::from_name(kind_name)?;
	let name = entry
		.first_str(&["filename", "name"])
		.map(str::to_owned)
		.unwrap_or_else(|| format!("model.{kind_name}"));

	let size = if url.starts_with("data:") {
		decode_data_url(url).ok()?.len()
	} else if url.starts_with("http") {
		entry.get_u64("size").map(|s| s as usize).unwrap_or(0)
	} else {
		return None;
	};

	Some(ModelFile {
		name,
		url: url.to_owned(),
		kind,
		size,
	})
}

/// Local placeholder bundle, seeded from `options.seed`.
pub fn package_model(image: &RasterBuffer, options: &ModelOptions) -> Result<ModelBundle, ModelError> {
	package_model_with(image, options, &mut StdRng::seed_from_u64(options.seed))
}

pub fn package_model_with(
	image: &RasterBuffer,
	options: &ModelOptions,
	rng: &mut impl Rng,
) -> Result<ModelBundle, ModelError> {
	let mesh = build_mesh(options.gender, options.vertex_count, rng);
	let atlas = build_texture_atlas(image, options.texture_size);
	let materials = atlas.materials();
	let rig = options.enable_rigging.then(|| build_rig(options.gender));

	let mut files = Vec::new();
	let mut notes = Vec::new();

	if options.wants(OutputFormat::Obj) {
		let obj = emit_obj(&mesh, MTL_FILENAME)?;
		files.push(ModelFile::text(OBJ_FILENAME, ModelFileKind::Obj, "text/plain", &obj));
		let mtl = build_material_file(&materials);
		files.push(ModelFile::text(MTL_FILENAME, ModelFileKind::Mtl, "text/plain", &mtl));
	}

	if let Some(rig) = &rig {
		if let Err(e) = bind(rig, &mesh) {
			notes.push(e.to_string());
		}
		if options.wants(OutputFormat::Fbx) {
			files.push(ModelFile::text(RIG_FILENAME, ModelFileKind::Fbx, "text/plain", &emit_rig(rig)));
		}
	}

	if options.wants(OutputFormat::Glb) {
		let scene = build_scene_graph(&mesh, &materials, rig.as_ref())?;
		files.push(ModelFile::text(
			SCENE_FILENAME,
			ModelFileKind::Glb,
			"model/gltf+json",
			&scene.pretty(2),
		));
	}

	for (name, png) in atlas.encode()? {
		files.push(ModelFile {
			name: name.to_owned(),
			url: data_url("image/png", &png),
			kind: ModelFileKind::Png,
			size: png.len(),
		});
	}

	info!(
		"Packaged local model: {} files, {} vertices, {} faces",
		files.len(),
		mesh.vertex_count(),
		mesh.face_count()
	);
	Ok(ModelBundle {
		files,
		handler_version: LOCAL_HANDLER_VERSION.to_owned(),
		notes,
	})
}

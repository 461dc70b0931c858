//! Minimal glTF-style scene description.
//!
//! Geometry is not exported: primitives only carry their part name and face count, and the
//! single texture is an embedded 1x1 placeholder.

use std::collections::HashMap;

use json::JsonValue;

use crate::mesh::MeshAsset;
use crate::raster::{RasterBuffer, RasterError};
use crate::rig::Rig;
use crate::texture::MaterialSet;

pub const SCENE_FILENAME: &str = "genshin_character.gltf";

const PLACEHOLDER_PIXEL: [u8; 4] = [255, 255, 255, 255];
/// glTF primitive mode for triangle lists.
const TRIANGLES: u32 = 4;

fn list(items: impl IntoIterator<Item = JsonValue>) -> JsonValue {
	JsonValue::Array(items.into_iter().collect())
}

fn vec3(v: glam::Vec3) -> JsonValue {
	list([v.x, v.y, v.z].map(JsonValue::from))
}

pub fn build_scene_graph(mesh: &MeshAsset, materials: &MaterialSet, rig: Option<&Rig>) -> Result<JsonValue, RasterError> {
	let placeholder = RasterBuffer::filled(1, 1, PLACEHOLDER_PIXEL).to_data_url()?;
	let mut scene = JsonValue::new_object();

	scene["asset"]["version"] = "2.0".into();
	scene["asset"]["generator"] = concat!("pixmesh ", env!("CARGO_PKG_VERSION")).into();
	scene["scene"] = 0.into();

	let material_index: HashMap<&str, usize> = materials.iter().enumerate().map(|(i, (name, _))| (name, i)).collect();
	scene["materials"] = list(materials.iter().map(|(name, _)| {
		let mut material = JsonValue::new_object();
		material["name"] = name.into();
		material["pbrMetallicRoughness"]["baseColorTexture"]["index"] = 0.into();
		material["pbrMetallicRoughness"]["metallicFactor"] = 0.0.into();
		material["pbrMetallicRoughness"]["roughnessFactor"] = 0.6.into();
		material
	}));
	scene["textures"] = list([{
		let mut texture = JsonValue::new_object();
		texture["source"] = 0.into();
		texture
	}]);
	scene["images"] = list([{
		let mut image = JsonValue::new_object();
		image["uri"] = placeholder.into();
		image
	}]);

	let mut primitives = Vec::with_capacity(mesh.groups.len());
	for group in &mesh.groups {
		let mut primitive = JsonValue::new_object();
		primitive["mode"] = TRIANGLES.into();
		if let Some(&index) = material_index.get(group.part.material()) {
			primitive["material"] = index.into();
		}
		primitive["extras"]["part"] = group.part.as_str().into();
		primitive["extras"]["faces"] = group.faces.len().into();
		primitives.push(primitive);
	}
	let mut character_mesh = JsonValue::new_object();
	character_mesh["name"] = "character".into();
	character_mesh["primitives"] = JsonValue::Array(primitives);
	scene["meshes"] = list([character_mesh]);

	let mut character = JsonValue::new_object();
	character["name"] = "character".into();
	character["mesh"] = 0.into();
	let mut nodes = vec![character];
	let mut roots = vec![JsonValue::from(0)];

	if let Some(rig) = rig {
		// bone nodes follow the mesh node, in walk order
		let bone_index: HashMap<&str, usize> =
			rig.walk().enumerate().map(|(i, (_, bone))| (bone.name, i + 1)).collect();
		let mut children: Vec<Vec<JsonValue>> = vec![Vec::new(); bone_index.len() + 1];

		for (_, bone) in rig.walk() {
			let mut node = JsonValue::new_object();
			node["name"] = bone.name.into();
			node["translation"] = vec3(bone.translation);
			nodes.push(node);

			let index = bone_index[bone.name];
			match rig.parent_of(bone.name) {
				Some(parent) => children[bone_index[parent.name]].push(index.into()),
				None => roots.push(index.into()),
			}
		}
		for (node, kids) in nodes.iter_mut().zip(children).skip(1) {
			if !kids.is_empty() {
				node["children"] = JsonValue::Array(kids);
			}
		}

		let mut skin = JsonValue::new_object();
		skin["name"] = "character_rig".into();
		skin["joints"] = list((1..=rig.len()).map(JsonValue::from));
		skin["skeleton"] = 1.into();
		scene["skins"] = list([skin]);
		nodes[0]["skin"] = 0.into();
	}

	scene["nodes"] = JsonValue::Array(nodes);
	let mut root_scene = JsonValue::new_object();
	root_scene["nodes"] = JsonValue::Array(roots);
	scene["scenes"] = list([root_scene]);

	scene["extras"]["vertexCount"] = mesh.vertex_count().into();
	scene["extras"]["faceCount"] = mesh.face_count().into();
	scene["extras"]["meshBinding"] = "unimplemented".into();

	Ok(scene)
}

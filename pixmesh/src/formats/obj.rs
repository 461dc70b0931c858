//! Wavefront OBJ text output.

use std::fmt::Write;

use super::fmt_f32;
use crate::mesh::{MeshAsset, MeshError};

pub const OBJ_FILENAME: &str = "genshin_character.obj";

/// Serializes `mesh` as OBJ text referencing the material library `mtllib`.
///
/// Faces are grouped per body part (`g`) with the part's material (`usemtl`). The text
/// format is 1-based, so every index is shifted by one; UV and normal indices equal the
/// vertex index since the arrays are parallel.
pub fn emit_obj(mesh: &MeshAsset, mtllib: &str) -> Result<String, MeshError> {
	mesh.validate()?;

	let mut out = String::with_capacity(mesh.vertex_count() * 96);
	// writing into a String cannot fail
	let _ = writeln!(out, "# Placeholder character mesh");
	let _ = writeln!(out, "# Vertices: {}", mesh.vertex_count());
	let _ = writeln!(out, "# Faces: {}", mesh.face_count());
	let _ = writeln!(out, "mtllib {mtllib}");
	out.push('\n');

	for v in &mesh.vertices {
		let _ = writeln!(out, "v {} {} {}", fmt_f32(v.x), fmt_f32(v.y), fmt_f32(v.z));
	}
	for uv in &mesh.uvs {
		let _ = writeln!(out, "vt {} {}", fmt_f32(uv.x), fmt_f32(uv.y));
	}
	for n in &mesh.normals {
		let _ = writeln!(out, "vn {} {} {}", fmt_f32(n.x), fmt_f32(n.y), fmt_f32(n.z));
	}

	for group in &mesh.groups {
		out.push('\n');
		let _ = writeln!(out, "g {}", group.part);
		let _ = writeln!(out, "usemtl {}", group.part.material());
		for face in &group.faces {
			let [a, b, c] = face.map(|i| i + 1);
			let _ = writeln!(out, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}");
		}
	}

	Ok(out)
}

//! Procedural placeholder geometry for a humanoid in T-pose.
//!
//! Nothing here reconstructs the character from its image: vertices are swept or
//! scattered over a proportion table and stitched with naive fans.

mod proportions;
mod scatter;
mod triangulate;

use std::fmt;

use glam::{Vec2, Vec3};
use rand::Rng;
use tracing::debug;

pub use proportions::{build_proportions, BodyProportions, Gender, UnknownGenderError};
pub use scatter::{scatter_vertices, Scatter, Segment, VertexBudget};
pub use triangulate::{fan, triangulate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BodyPart {
	Head,
	Torso,
	LeftArm,
	RightArm,
	LeftLeg,
	RightLeg,
}

impl BodyPart {
	pub fn as_str(self) -> &'static str {
		match self {
			BodyPart::Head => "head",
			BodyPart::Torso => "torso",
			BodyPart::LeftArm => "left_arm",
			BodyPart::RightArm => "right_arm",
			BodyPart::LeftLeg => "left_leg",
			BodyPart::RightLeg => "right_leg",
		}
	}

	/// Material slot the part is drawn with.
	pub fn material(self) -> &'static str {
		match self {
			BodyPart::Head => "character_head",
			BodyPart::LeftArm | BodyPart::RightArm => "character_body",
			BodyPart::Torso | BodyPart::LeftLeg | BodyPart::RightLeg => "character_clothing",
		}
	}
}

impl fmt::Display for BodyPart {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Triangles of one body part, 0-based indices into the mesh vertices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceGroup {
	pub part: BodyPart,
	pub faces: Vec<[u32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Face {face} of group {part} references vertex {index}, but the mesh has {len} vertices")]
pub struct MeshError {
	pub part: BodyPart,
	pub face: usize,
	pub index: u32,
	pub len: usize,
}

/// Mesh
///
/// `vertices`, `uvs` and `normals` are parallel arrays. No manifoldness is implied.
#[derive(Debug, Clone, Default)]
pub struct MeshAsset {
	pub vertices: Vec<Vec3>,
	pub uvs: Vec<Vec2>,
	pub normals: Vec<Vec3>,
	pub groups: Vec<FaceGroup>,
}

impl MeshAsset {
	pub fn vertex_count(&self) -> usize {
		self.vertices.len()
	}

	pub fn face_count(&self) -> usize {
		self.groups.iter().map(|g| g.faces.len()).sum()
	}

	/// Checks that every face index points at an existing vertex.
	pub fn validate(&self) -> Result<(), MeshError> {
		let len = self.vertices.len();
		for group in &self.groups {
			for (face, indices) in group.faces.iter().enumerate() {
				if let Some(&index) = indices.iter().find(|&&i| i as usize >= len) {
					return Err(MeshError {
						part: group.part,
						face,
						index,
						len,
					});
				}
			}
		}
		Ok(())
	}

	/// Axis-aligned bounds, `None` for an empty mesh.
	pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
		let first = *self.vertices.first()?;
		Some(
			self.vertices
				.iter()
				.fold((first, first), |(min, max), v| (min.min(*v), max.max(*v))),
		)
	}
}

impl From<Scatter> for MeshAsset {
	fn from(scatter: Scatter) -> Self {
		let groups = triangulate(&scatter.segments);
		MeshAsset {
			vertices: scatter.positions,
			uvs: scatter.uvs,
			normals: scatter.normals,
			groups,
		}
	}
}

/// Proportions, scatter and fans in one go.
pub fn build_mesh(gender: Gender, vertex_count: usize, rng: &mut impl Rng) -> MeshAsset {
	let proportions = build_proportions(gender);
	let mesh = MeshAsset::from(scatter_vertices(&proportions, vertex_count, rng));
	debug!(
		"Built placeholder mesh ({}): {} vertices, {} faces",
		gender,
		mesh.vertex_count(),
		mesh.face_count()
	);
	mesh
}

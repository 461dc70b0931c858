//! Hand-authored humanoid skeleton.
//!
//! Offsets are fixed and independent of the generated mesh. Binding the two together is
//! not implemented and is reported as such by [`bind`].

use std::collections::HashMap;
use std::fmt;

use glam::{vec3, Vec3};
use indextree::{Arena, NodeId};
use tracing::warn;

use crate::mesh::{Gender, MeshAsset};

#[derive(Debug, thiserror::Error)]
pub enum RigError {
	#[error("Binding the rig to a generated mesh is not implemented ({bones} bones, {vertices} vertices left unweighted)")]
	BindingUnimplemented { bones: usize, vertices: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
	pub name: &'static str,
	/// Offset from the parent bone.
	pub translation: Vec3,
	/// Euler angles in degrees.
	pub rotation: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IkChain {
	pub name: &'static str,
	pub start: &'static str,
	pub end: &'static str,
	pub pole: &'static str,
}

/// `(name, parent index, translation, rotation)`, parents always listed first.
const SKELETON: &[(&str, Option<usize>, [f32; 3], [f32; 3])] = &[
	("Root", None, [0.0, -0.8, 0.0], [0.0; 3]),
	("Pelvis", Some(0), [0.0, 0.0, 0.0], [0.0; 3]),
	("Spine01", Some(1), [0.0, 0.15, 0.0], [0.0; 3]),
	("Spine02", Some(2), [0.0, 0.12, 0.0], [0.0; 3]),
	("Spine03", Some(3), [0.0, 0.15, 0.0], [0.0; 3]),
	("Neck", Some(4), [0.0, 0.18, 0.0], [0.0; 3]),
	("Head", Some(5), [0.0, 0.12, 0.0], [0.0; 3]),
	("LeftShoulder", Some(4), [-0.08, 0.15, 0.0], [0.0, 0.0, -5.0]),
	("LeftUpperArm", Some(7), [-0.18, 0.0, 0.0], [0.0; 3]),
	("LeftForearm", Some(8), [-0.28, 0.0, 0.0], [0.0; 3]),
	("LeftHand", Some(9), [-0.25, 0.0, 0.0], [0.0; 3]),
	("RightShoulder", Some(4), [0.08, 0.15, 0.0], [0.0, 0.0, 5.0]),
	("RightUpperArm", Some(11), [0.18, 0.0, 0.0], [0.0; 3]),
	("RightForearm", Some(12), [0.28, 0.0, 0.0], [0.0; 3]),
	("RightHand", Some(13), [0.25, 0.0, 0.0], [0.0; 3]),
	("LeftThigh", Some(1), [-0.12, -0.08, 0.0], [0.0; 3]),
	("LeftShin", Some(15), [0.0, -0.42, 0.0], [0.0; 3]),
	("LeftFoot", Some(16), [0.0, -0.38, 0.0], [0.0; 3]),
	("LeftToe", Some(17), [0.0, -0.05, 0.12], [0.0; 3]),
	("RightThigh", Some(1), [0.12, -0.08, 0.0], [0.0; 3]),
	("RightShin", Some(19), [0.0, -0.42, 0.0], [0.0; 3]),
	("RightFoot", Some(20), [0.0, -0.38, 0.0], [0.0; 3]),
	("RightToe", Some(21), [0.0, -0.05, 0.12], [0.0; 3]),
];

const IK_CHAINS: [IkChain; 4] = [
	IkChain {
		name: "LeftArmIK",
		start: "LeftUpperArm",
		end: "LeftHand",
		pole: "LeftElbowPole",
	},
	IkChain {
		name: "RightArmIK",
		start: "RightUpperArm",
		end: "RightHand",
		pole: "RightElbowPole",
	},
	IkChain {
		name: "LeftLegIK",
		start: "LeftThigh",
		end: "LeftFoot",
		pole: "LeftKneePole",
	},
	IkChain {
		name: "RightLegIK",
		start: "RightThigh",
		end: "RightFoot",
		pole: "RightKneePole",
	},
];

pub struct Rig {
	pub gender: Gender,
	root_id: NodeId,
	arena: Arena<Bone>,
	bone_ids: HashMap<&'static str, NodeId>,
	pub ik_chains: Vec<IkChain>,
}

impl Rig {
	pub fn root(&self) -> &Bone {
		self.arena[self.root_id].get()
	}

	pub fn len(&self) -> usize {
		self.bone_ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bone_ids.is_empty()
	}

	pub fn get(&self, name: &str) -> Option<&Bone> {
		Some(self.arena.get(*self.bone_ids.get(name)?)?.get())
	}

	pub fn parent_of(&self, name: &str) -> Option<&Bone> {
		let id = *self.bone_ids.get(name)?;
		let parent = self.arena.get(id)?.parent()?;
		Some(self.arena[parent].get())
	}

	/// Bones depth first from the root, each with its depth.
	pub fn walk(&self) -> impl Iterator<Item = (usize, &Bone)> {
		self.root_id.descendants(&self.arena).map(|id| {
			let depth = id.ancestors(&self.arena).count() - 1;
			(depth, self.arena[id].get())
		})
	}

	/// Sum of translations from the root down to `name`.
	pub fn world_translation(&self, name: &str) -> Option<Vec3> {
		let id = *self.bone_ids.get(name)?;
		Some(id.ancestors(&self.arena).map(|a| self.arena[a].get().translation).sum())
	}
}

impl fmt::Display for Rig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "Rig ({}, {} bones)", self.gender, self.len())?;
		for (depth, bone) in self.walk() {
			let name = bone.name;
			#[cfg(feature = "owo")]
			let name = {
				use owo_colors::OwoColorize;
				name.green()
			};
			let t = bone.translation;
			writeln!(f, "{}- {} ({}, {}, {})", "  ".repeat(depth), name, t.x, t.y, t.z)?;
		}
		Ok(())
	}
}

/// The fixed skeleton. Only the labelling depends on `gender`.
pub fn build_rig(gender: Gender) -> Rig {
	let mut arena = Arena::with_capacity(SKELETON.len());
	let mut ids: Vec<NodeId> = Vec::with_capacity(SKELETON.len());

	for &(name, parent, t, r) in SKELETON {
		let id = arena.new_node(Bone {
			name,
			translation: vec3(t[0], t[1], t[2]),
			rotation: vec3(r[0], r[1], r[2]),
		});
		if let Some(parent) = parent {
			ids[parent].append(id, &mut arena);
		}
		ids.push(id);
	}

	let bone_ids = SKELETON.iter().map(|b| b.0).zip(ids.iter().copied()).collect();
	Rig {
		gender,
		root_id: ids[0],
		arena,
		bone_ids,
		ik_chains: IK_CHAINS.to_vec(),
	}
}

/// Skin weights of `mesh` against `rig`. Always fails: no weights are ever computed.
pub fn bind(rig: &Rig, mesh: &MeshAsset) -> Result<Vec<[f32; 4]>, RigError> {
	warn!(
		"Rig offsets are static; not binding {} bones to {} mesh vertices",
		rig.len(),
		mesh.vertex_count()
	);
	Err(RigError::BindingUnimplemented {
		bones: rig.len(),
		vertices: mesh.vertex_count(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hierarchy() {
		let rig = build_rig(Gender::Female);
		assert_eq!(rig.len(), 23);
		assert_eq!(rig.root().name, "Root");
		assert_eq!(rig.parent_of("Head").unwrap().name, "Neck");
		assert_eq!(rig.parent_of("LeftShoulder").unwrap().name, "Spine03");
		assert_eq!(rig.parent_of("RightThigh").unwrap().name, "Pelvis");
		assert!(rig.parent_of("Root").is_none());
		assert!(rig.get("Tail").is_none());
	}

	#[test]
	fn walk_is_depth_first() {
		let rig = build_rig(Gender::Auto);
		let walked: Vec<_> = rig.walk().map(|(depth, bone)| (depth, bone.name)).collect();
		assert_eq!(walked.len(), rig.len());
		assert_eq!(walked[0], (0, "Root"));
		assert_eq!(walked[1], (1, "Pelvis"));
		assert_eq!(walked[2], (2, "Spine01"));
		assert!(walked.contains(&(6, "Head")));
	}

	#[test]
	fn arms_are_mirrored() {
		let rig = build_rig(Gender::Male);
		let left = rig.world_translation("LeftHand").unwrap();
		let right = rig.world_translation("RightHand").unwrap();
		assert!((left.x + right.x).abs() < 1e-6);
		assert!((left.y - right.y).abs() < 1e-6);
		assert!(left.x < 0.0);
	}

	#[test]
	fn binding_is_reported_unimplemented() {
		let rig = build_rig(Gender::Auto);
		let err = bind(&rig, &MeshAsset::default()).unwrap_err();
		assert!(matches!(err, RigError::BindingUnimplemented { bones: 23, vertices: 0 }));
	}
}

//! ASCII, FBX-flavoured rig description.
//!
//! This is a descriptive text block, not a file any FBX importer will load.

use std::fmt::Write;

use glam::Vec3;

use super::fmt_f32;
use crate::rig::Rig;

pub const RIG_FILENAME: &str = "character_rigging.fbx";

const BLEND_SHAPES: [&str; 12] = [
	"Smile",
	"Frown",
	"Surprise",
	"Angry",
	"Blink_L",
	"Blink_R",
	"EyeLook_Up",
	"EyeLook_Down",
	"Mouth_Open",
	"Mouth_Kiss",
	"Eyebrow_Up",
	"Eyebrow_Down",
];

fn vec(v: Vec3) -> String {
	format!("{}, {}, {}", fmt_f32(v.x), fmt_f32(v.y), fmt_f32(v.z))
}

fn quoted_list(items: &[&str]) -> String {
	items.iter().map(|s| format!("\"{s}\"")).collect::<Vec<_>>().join(", ")
}

pub fn emit_rig(rig: &Rig) -> String {
	let mut out = String::new();
	let _ = writeln!(out, "# Character rigging data");
	let _ = writeln!(out, "# Generated for {} character", rig.gender);
	let _ = writeln!(out, "# Mesh binding: unimplemented, bone offsets are not derived from the mesh");
	out.push('\n');
	let _ = writeln!(out, "FBXVersion: 7.4.0");
	let _ = writeln!(out, "FileFormat: ASCII");
	out.push('\n');

	let _ = writeln!(out, "Definitions: {{");
	let _ = writeln!(out, "\tObjectType: \"Model\" {{");
	let _ = writeln!(out, "\t\tCount: {}", rig.len());
	for (_, bone) in rig.walk() {
		out.push('\n');
		let _ = writeln!(out, "\t\tModel: \"{}\", \"Mesh\" {{", bone.name);
		let _ = writeln!(out, "\t\t\tProperties70: {{");
		let _ = writeln!(
			out,
			"\t\t\t\tP: \"Lcl Translation\", \"Lcl Translation\", \"\", \"A\", {}",
			vec(bone.translation)
		);
		let _ = writeln!(
			out,
			"\t\t\t\tP: \"Lcl Rotation\", \"Lcl Rotation\", \"\", \"A\", {}",
			vec(bone.rotation)
		);
		let _ = writeln!(out, "\t\t\t}}");
		if let Some(parent) = rig.parent_of(bone.name) {
			let _ = writeln!(out, "\t\t\tParent: \"{}\"", parent.name);
		}
		let _ = writeln!(out, "\t\t}}");
	}
	let _ = writeln!(out, "\t}}");
	let _ = writeln!(out, "}}");
	out.push('\n');

	let _ = writeln!(out, "ControlRig: {{");
	for chain in &rig.ik_chains {
		let _ = writeln!(out, "\tIKChain: \"{}\" {{", chain.name);
		let _ = writeln!(out, "\t\tStartBone: \"{}\"", chain.start);
		let _ = writeln!(out, "\t\tEndBone: \"{}\"", chain.end);
		let _ = writeln!(out, "\t\tPole: \"{}\"", chain.pole);
		let _ = writeln!(out, "\t}}");
	}
	let _ = writeln!(out, "\tFacialRig: {{");
	let _ = writeln!(out, "\t\tControllerCount: {}", BLEND_SHAPES.len());
	let _ = writeln!(out, "\t\tBlendShapes: [{}]", quoted_list(&BLEND_SHAPES));
	let _ = writeln!(out, "\t}}");
	let _ = writeln!(out, "}}");
	out.push('\n');

	let _ = writeln!(out, "AnimationReady: true");
	let _ = writeln!(out, "RiggingVersion: \"Advanced_{}_v2.0\"", rig.gender);
	out
}

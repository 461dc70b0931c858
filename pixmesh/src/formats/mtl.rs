//! Wavefront material library output.

use std::fmt::Write;

use crate::texture::MaterialSet;

pub const MTL_FILENAME: &str = "character_material.mtl";

/// Fixed Phong parameters per material slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shading {
	pub ambient: [f32; 3],
	pub diffuse: [f32; 3],
	pub specular: [f32; 3],
	pub shininess: f32,
}

const SKIN: Shading = Shading {
	ambient: [0.25, 0.22, 0.20],
	diffuse: [0.92, 0.85, 0.78],
	specular: [0.15, 0.12, 0.10],
	shininess: 25.0,
};

const HAIR: Shading = Shading {
	ambient: [0.15, 0.12, 0.10],
	diffuse: [0.45, 0.35, 0.25],
	specular: [0.8, 0.7, 0.6],
	shininess: 80.0,
};

const CLOTH: Shading = Shading {
	ambient: [0.2, 0.2, 0.25],
	diffuse: [0.6, 0.65, 0.8],
	specular: [0.3, 0.3, 0.3],
	shininess: 40.0,
};

pub fn shading_for(material: &str) -> Shading {
	match material {
		"character_hair" => HAIR,
		"character_clothing" => CLOTH,
		_ => SKIN,
	}
}

fn rgb(v: [f32; 3]) -> String {
	format!("{} {} {}", v[0], v[1], v[2])
}

/// Emits one `newmtl` block per material, referencing the atlas files.
pub fn build_material_file(materials: &MaterialSet) -> String {
	let mut out = String::from("# Placeholder character materials\n");

	for (name, maps) in materials.iter() {
		let shading = shading_for(name);
		out.push('\n');
		let _ = writeln!(out, "newmtl {name}");
		let _ = writeln!(out, "Ka {}", rgb(shading.ambient));
		let _ = writeln!(out, "Kd {}", rgb(shading.diffuse));
		let _ = writeln!(out, "Ks {}", rgb(shading.specular));
		let _ = writeln!(out, "Ns {:.1}", shading.shininess);
		let _ = writeln!(out, "d 1.0");
		let _ = writeln!(out, "illum 2");
		let _ = writeln!(out, "map_Kd {}", maps.diffuse);
		let _ = writeln!(out, "map_Ks {}", maps.specular);
		let _ = writeln!(out, "map_Bump {}", maps.normal);
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mesh::BodyPart;

	#[test]
	fn declares_every_part_material() {
		let mtl = build_material_file(&MaterialSet::aliased());

		for part in [BodyPart::Head, BodyPart::Torso, BodyPart::LeftArm, BodyPart::RightLeg] {
			assert!(mtl.contains(&format!("newmtl {}\n", part.material())), "{part}");
		}
		assert_eq!(mtl.matches("newmtl ").count(), 4);
		assert_eq!(mtl.matches("map_Kd character_diffuse.png").count(), 4);
	}

	#[test]
	fn hair_block() {
		let mtl = build_material_file(&MaterialSet::aliased());
		let hair = mtl.split("newmtl ").find(|b| b.starts_with("character_hair")).unwrap();
		assert!(hair.contains("Kd 0.45 0.35 0.25\n"));
		assert!(hair.contains("Ns 80.0\n"));
	}
}

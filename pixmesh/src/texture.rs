//! Texture atlas and material slots for the placeholder model.
//!
//! Every material slot aliases the same three maps derived from the single input image.

use std::collections::BTreeMap;
use std::fmt;

use image::{imageops, DynamicImage};
use tracing::debug;

use crate::raster::{RasterBuffer, RasterError};

/// Contrast boost (percent) for the specular map.
const SPECULAR_CONTRAST: f32 = 30.0;
/// Tangent-space "straight up" normal.
const FLAT_NORMAL: [u8; 4] = [128, 128, 255, 255];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKind {
	Diffuse,
	Specular,
	Normal,
}

impl MapKind {
	pub const ALL: [MapKind; 3] = [MapKind::Diffuse, MapKind::Specular, MapKind::Normal];

	pub fn filename(self) -> &'static str {
		match self {
			MapKind::Diffuse => "character_diffuse.png",
			MapKind::Specular => "character_specular.png",
			MapKind::Normal => "character_normal.png",
		}
	}
}

impl fmt::Display for MapKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			MapKind::Diffuse => "diffuse",
			MapKind::Specular => "specular",
			MapKind::Normal => "normal",
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureAtlas {
	pub size: u32,
	pub diffuse: RasterBuffer,
	pub specular: RasterBuffer,
	pub normal: RasterBuffer,
}

impl TextureAtlas {
	pub fn map(&self, kind: MapKind) -> &RasterBuffer {
		match kind {
			MapKind::Diffuse => &self.diffuse,
			MapKind::Specular => &self.specular,
			MapKind::Normal => &self.normal,
		}
	}

	/// PNG bytes of every map, keyed by its filename.
	pub fn encode(&self) -> Result<Vec<(&'static str, Vec<u8>)>, RasterError> {
		MapKind::ALL
			.iter()
			.map(|&kind| Ok((kind.filename(), self.map(kind).encode_png()?)))
			.collect()
	}

	pub fn materials(&self) -> MaterialSet {
		MaterialSet::aliased()
	}
}

/// Resizes `image` into a `size`x`size` square and derives the specular and normal maps from it.
pub fn build_texture_atlas(image: &RasterBuffer, size: u32) -> TextureAtlas {
	let size = size.max(1);
	let diffuse = image.resize_exact(size, size);

	let (specular, normal) = rayon::join(
		|| {
			let grey = DynamicImage::ImageRgba8(diffuse.to_image()).grayscale().to_rgba8();
			RasterBuffer::from(imageops::contrast(&grey, SPECULAR_CONTRAST))
		},
		|| RasterBuffer::filled(size, size, FLAT_NORMAL),
	);

	debug!("Built {size}x{size} texture atlas");
	TextureAtlas {
		size,
		diffuse,
		specular,
		normal,
	}
}

/// Texture files one material references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialMaps {
	pub diffuse: &'static str,
	pub specular: &'static str,
	pub normal: &'static str,
}

impl Default for MaterialMaps {
	fn default() -> Self {
		Self {
			diffuse: MapKind::Diffuse.filename(),
			specular: MapKind::Specular.filename(),
			normal: MapKind::Normal.filename(),
		}
	}
}

pub const MATERIAL_SLOTS: [&str; 4] = [
	"character_body",
	"character_head",
	"character_clothing",
	"character_hair",
];

/// Material name to texture maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialSet(pub BTreeMap<String, MaterialMaps>);

impl MaterialSet {
	/// All slots pointing at the same atlas maps.
	pub fn aliased() -> Self {
		Self(
			MATERIAL_SLOTS
				.iter()
				.map(|&name| (name.to_owned(), MaterialMaps::default()))
				.collect(),
		)
	}

	pub fn get(&self, name: &str) -> Option<&MaterialMaps> {
		self.0.get(name)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &MaterialMaps)> {
		self.0.iter().map(|(name, maps)| (name.as_str(), maps))
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn atlas_maps_are_square() {
		let image = RasterBuffer::filled(40, 20, [200, 40, 40, 255]);
		let atlas = build_texture_atlas(&image, 16);

		for kind in MapKind::ALL {
			let map = atlas.map(kind);
			assert_eq!((map.width(), map.height()), (16, 16), "{kind}");
		}
		assert_eq!(atlas.diffuse.pixel(3, 3), [200, 40, 40, 255]);
		assert_eq!(atlas.normal.pixel(15, 0), FLAT_NORMAL);
	}

	#[test]
	fn specular_is_grey() {
		let image = RasterBuffer::filled(4, 4, [10, 200, 90, 255]);
		let atlas = build_texture_atlas(&image, 4);
		let [r, g, b, a] = atlas.specular.pixel(1, 2);
		assert_eq!(r, g);
		assert_eq!(g, b);
		assert_eq!(a, 255);
	}

	#[test]
	fn every_slot_aliases_the_atlas() {
		let materials = MaterialSet::aliased();
		assert_eq!(materials.len(), 4);
		for (_, maps) in materials.iter() {
			assert_eq!(maps.diffuse, "character_diffuse.png");
			assert_eq!(maps.normal, "character_normal.png");
		}
		assert!(materials.get("character_hair").is_some());
	}
}

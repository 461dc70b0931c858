//! Per-pixel passes over [`RasterBuffer`]s.
//!
//! Every pass leaves fully transparent pixels untouched except [`apply_glow`], which
//! composites a blurred copy over the whole buffer.

mod glow;
mod inpaint;
mod style;

use tracing::debug;

use crate::raster::RasterBuffer;

pub use glow::{apply_glow, apply_glow_with, GLOW_OPACITY, GLOW_RADIUS};
pub use inpaint::{detect_and_inpaint_metal, detect_weapon_mask, is_weapon_like, SKIN_TONE};
pub use style::{apply_style, enhance, quantize, tone_curve, StyleOptions, POSTERIZE_LEVELS};

/// Options of the local stylization pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOptions {
	pub style: StyleOptions,
	pub glow: bool,
	pub remove_weapon: bool,
	/// Long side the input is scaled down to before filtering.
	pub max_side: u32,
}

impl Default for FilterOptions {
	fn default() -> Self {
		Self {
			style: StyleOptions::default(),
			glow: true,
			remove_weapon: false,
			max_side: 1024,
		}
	}
}

/// Fit, inpaint, style and glow, in that order.
pub fn stylize(input: &RasterBuffer, options: &FilterOptions) -> RasterBuffer {
	let mut raster = input.fit_within(options.max_side);

	if options.remove_weapon {
		let replaced = detect_and_inpaint_metal(&mut raster);
		debug!("Inpainted {} weapon-like pixels", replaced);
	}
	apply_style(&mut raster, options.style);
	if options.glow {
		apply_glow(&mut raster);
	}

	raster
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stylize_fits_and_keeps_transparency() {
		let mut input = RasterBuffer::filled(40, 20, [255, 0, 0, 255]);
		input.set_pixel(0, 0, [9, 9, 9, 0]);

		let options = FilterOptions {
			glow: false,
			max_side: 20,
			..Default::default()
		};
		let out = stylize(&input, &options);
		assert_eq!((out.width(), out.height()), (20, 10));

		let unfitted = stylize(
			&input,
			&FilterOptions {
				glow: false,
				..Default::default()
			},
		);
		assert_eq!(unfitted.pixel(0, 0), [9, 9, 9, 0]);
	}
}

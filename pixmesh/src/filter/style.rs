use rayon::prelude::*;

use crate::raster::RasterBuffer;

pub const POSTERIZE_LEVELS: f32 = 6.0;
const SATURATION_BOOST: f32 = 1.3;
const BRIGHTNESS_BOOST: f32 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleOptions {
	/// Posterize every channel for a cel-shaded look.
	pub remove_pixelation: bool,
	/// Boost saturation and brightness before the tone curve.
	pub enhance_colors: bool,
}

impl Default for StyleOptions {
	fn default() -> Self {
		Self {
			remove_pixelation: true,
			enhance_colors: true,
		}
	}
}

/// Snaps a channel value to the nearest multiple of `255 / POSTERIZE_LEVELS`.
pub fn quantize(c: f32) -> f32 {
	let step = 255.0 / POSTERIZE_LEVELS;
	(c / step).round() * step
}

/// S-curve tone map, lifted into `[0.05, 0.95]` of the channel range.
pub fn tone_curve(c: f32) -> f32 {
	let x = (c / 255.0).clamp(0.0, 1.0);
	let y = if x < 0.5 {
		2.0 * x * x
	} else {
		1.0 - 2.0 * (1.0 - x) * (1.0 - x)
	};
	(y * 0.9 + 0.05) * 255.0
}

/// Pushes channels away from the pixel's midpoint, then brightens.
pub fn enhance(rgb: [f32; 3]) -> [f32; 3] {
	let max = rgb[0].max(rgb[1]).max(rgb[2]);
	let min = rgb[0].min(rgb[1]).min(rgb[2]);
	let mid = (max + min) / 2.0;

	rgb.map(|c| ((mid + (c - mid) * SATURATION_BOOST) * BRIGHTNESS_BOOST).clamp(0.0, 255.0))
}

fn style_pixel(px: &mut [u8], options: StyleOptions) {
	if px[3] == 0 {
		return;
	}

	let mut rgb = [px[0] as f32, px[1] as f32, px[2] as f32];
	if options.remove_pixelation {
		rgb = rgb.map(quantize);
	}
	if options.enhance_colors {
		rgb = enhance(rgb);
	}
	for (dst, c) in px.iter_mut().zip(rgb) {
		*dst = tone_curve(c).round().clamp(0.0, 255.0) as u8;
	}
}

/// Quantization, then saturation/brightness, then the tone curve, per channel.
pub fn apply_style(buffer: &mut RasterBuffer, options: StyleOptions) {
	buffer
		.pixels_mut()
		.par_chunks_exact_mut(4)
		.for_each(|px| style_pixel(px, options));
}

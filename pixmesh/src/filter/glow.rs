use image::imageops;
use rayon::prelude::*;

use crate::raster::RasterBuffer;

pub const GLOW_RADIUS: f32 = 2.0;
pub const GLOW_OPACITY: f32 = 0.3;

/// Screen-blends `src` at `opacity` over `dst`, with source-over alpha.
fn screen_over(dst: &mut [u8], src: &[u8], opacity: f32) {
	let sa = src[3] as f32 / 255.0 * opacity;
	if sa <= 0.0 {
		return;
	}
	let da = dst[3] as f32 / 255.0;
	let ao = sa + da * (1.0 - sa);

	for c in 0..3 {
		let cb = dst[c] as f32 / 255.0;
		let cs = src[c] as f32 / 255.0;
		let screen = cb + cs - cb * cs;
		let co = sa * (1.0 - da) * cs + sa * da * screen + (1.0 - sa) * da * cb;
		dst[c] = (co / ao * 255.0).round().clamp(0.0, 255.0) as u8;
	}
	dst[3] = (ao * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Cheap bloom: a blurred copy of the buffer, screen-blended over itself.
pub fn apply_glow(buffer: &mut RasterBuffer) {
	apply_glow_with(buffer, GLOW_RADIUS, GLOW_OPACITY);
}

pub fn apply_glow_with(buffer: &mut RasterBuffer, radius: f32, opacity: f32) {
	let blurred = imageops::blur(&buffer.to_image(), radius);

	buffer
		.pixels_mut()
		.par_chunks_exact_mut(4)
		.zip(blurred.as_raw().par_chunks_exact(4))
		.for_each(|(dst, src)| screen_over(dst, src, opacity));
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn black_and_white_are_fixed_points() {
		let mut black = RasterBuffer::filled(6, 6, [0, 0, 0, 255]);
		apply_glow(&mut black);
		assert!(black.pixels().chunks_exact(4).all(|px| px == [0, 0, 0, 255]));

		let mut white = RasterBuffer::filled(6, 6, [255, 255, 255, 255]);
		apply_glow(&mut white);
		assert!(white.pixels().chunks_exact(4).all(|px| px == [255, 255, 255, 255]));
	}

	#[test]
	fn grey_gets_brighter() {
		let mut grey = RasterBuffer::filled(6, 6, [128, 128, 128, 255]);
		apply_glow(&mut grey);
		// 0.7 * c + 0.3 * screen(c, c)
		let px = grey.pixel(3, 3);
		assert!((145..=149).contains(&px[0]), "{px:?}");
		assert_eq!(px[3], 255);
	}

	#[test]
	fn transparent_stays_transparent() {
		let mut clear = RasterBuffer::filled(4, 4, [50, 60, 70, 0]);
		apply_glow(&mut clear);
		assert!(clear.pixels().chunks_exact(4).all(|px| px == [50, 60, 70, 0]));
	}

	#[test]
	fn glow_bleeds_into_transparent_neighbours() {
		let mut raster = RasterBuffer::filled(9, 9, [0, 0, 0, 0]);
		raster.set_pixel(4, 4, [255, 255, 255, 255]);
		apply_glow(&mut raster);
		assert!(raster.pixel(5, 4)[3] > 0);
	}
}

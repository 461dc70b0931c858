use rayon::prelude::*;

use crate::raster::RasterBuffer;

/// Fill colour for weapon-like pixels without a usable neighbour.
pub const SKIN_TONE: [u8; 3] = [241, 194, 167];

const METAL_MAX_SPREAD: u8 = 24;
const METAL_MIN_LUMA: u16 = 170;
const DARK_MAX: u8 = 40;
const EDGE_MIN_SPREAD: u8 = 200;

/// Bright near-grey (metal), uniformly dark, or extreme channel spread (hard edge).
///
/// A colour heuristic, not object detection: dark hair or black outlines are flagged too.
pub fn is_weapon_like(px: [u8; 4]) -> bool {
	if px[3] == 0 {
		return false;
	}
	let [r, g, b, _] = px;
	let max = r.max(g).max(b);
	let min = r.min(g).min(b);
	let spread = max - min;
	let luma = (r as u16 + g as u16 + b as u16) / 3;

	let metallic = spread < METAL_MAX_SPREAD && luma > METAL_MIN_LUMA;
	let dark = max < DARK_MAX;
	let edge = spread > EDGE_MIN_SPREAD;
	metallic || dark || edge
}

pub fn detect_weapon_mask(buffer: &RasterBuffer) -> Vec<bool> {
	buffer
		.pixels()
		.par_chunks_exact(4)
		.map(|px| is_weapon_like([px[0], px[1], px[2], px[3]]))
		.collect()
}

fn neighbour_mean(source: &RasterBuffer, mask: &[bool], x: u32, y: u32) -> [u8; 3] {
	let (w, h) = (source.width() as i64, source.height() as i64);
	let mut sum = [0_u32; 3];
	let mut count = 0;

	for dy in -1..=1_i64 {
		for dx in -1..=1_i64 {
			let (nx, ny) = (x as i64 + dx, y as i64 + dy);
			if (dx == 0 && dy == 0) || nx < 0 || ny < 0 || nx >= w || ny >= h {
				continue;
			}
			if mask[(ny * w + nx) as usize] {
				continue;
			}
			let px = source.pixel(nx as u32, ny as u32);
			if px[3] == 0 {
				continue;
			}
			for c in 0..3 {
				sum[c] += px[c] as u32;
			}
			count += 1;
		}
	}

	if count == 0 {
		SKIN_TONE
	} else {
		sum.map(|s| ((s as f32 / count as f32).round()) as u8)
	}
}

/// Replaces flagged pixels with the mean of their unflagged 3x3 neighbours. Returns how many were replaced.
pub fn detect_and_inpaint_metal(buffer: &mut RasterBuffer) -> usize {
	let mask = detect_weapon_mask(buffer);
	let replaced = mask.iter().filter(|&&m| m).count();
	if replaced == 0 || buffer.width() == 0 {
		return 0;
	}

	let source = buffer.clone();
	let row_len = source.width() as usize * 4;
	buffer
		.pixels_mut()
		.par_chunks_exact_mut(row_len)
		.enumerate()
		.for_each(|(y, row)| {
			for (x, px) in row.chunks_exact_mut(4).enumerate() {
				if mask[y * source.width() as usize + x] {
					let rgb = neighbour_mean(&source, &mask, x as u32, y as u32);
					px[..3].copy_from_slice(&rgb);
				}
			}
		});

	replaced
}

#[cfg(test)]
mod tests {
	use super::*;

	const RED: [u8; 4] = [200, 40, 40, 255];

	#[test]
	fn classifies_pixels() {
		assert!(is_weapon_like([200, 205, 210, 255]));
		assert!(is_weapon_like([10, 20, 30, 255]));
		assert!(is_weapon_like([250, 10, 40, 255]));
		assert!(!is_weapon_like(RED));
		assert!(!is_weapon_like([241, 194, 167, 255]));
		assert!(!is_weapon_like([0, 0, 0, 0]));
	}

	#[test]
	fn metal_blade_takes_neighbour_colour() {
		let mut raster = RasterBuffer::filled(3, 3, RED);
		raster.set_pixel(1, 1, [210, 210, 215, 200]);

		assert_eq!(detect_and_inpaint_metal(&mut raster), 1);
		assert_eq!(raster.pixel(1, 1), [200, 40, 40, 200]);
	}

	#[test]
	fn mean_ignores_flagged_and_transparent_neighbours() {
		let mut raster = RasterBuffer::filled(3, 1, [100, 60, 40, 255]);
		raster.set_pixel(0, 0, [0, 0, 0, 0]);
		raster.set_pixel(1, 0, [5, 5, 5, 255]);

		detect_and_inpaint_metal(&mut raster);
		assert_eq!(raster.pixel(1, 0), [100, 60, 40, 255]);
		assert_eq!(raster.pixel(0, 0), [0, 0, 0, 0]);
	}

	#[test]
	fn fully_flagged_falls_back_to_skin() {
		let mut raster = RasterBuffer::filled(2, 2, [8, 8, 8, 255]);
		assert_eq!(detect_and_inpaint_metal(&mut raster), 4);
		let [r, g, b] = SKIN_TONE;
		assert!(raster.pixels().chunks_exact(4).all(|px| px == [r, g, b, 255]));
	}
}

use std::f32::consts::{PI, TAU};
use std::ops::Range;

use glam::{vec2, vec3, Vec2, Vec3};
use rand::Rng;

use super::proportions::BodyProportions;
use super::BodyPart;

/// How a vertex budget is split across body parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBudget {
	pub head: usize,
	pub torso: usize,
	pub arms: usize,
	pub legs: usize,
}

impl VertexBudget {
	/// 25% head, 20% arms, 20% legs, torso takes the rest so the sum is exactly `target`.
	pub fn allocate(target: usize) -> Self {
		let head = target / 4;
		let arms = target / 5;
		let legs = target / 5;
		Self {
			head,
			torso: target - head - arms - legs,
			arms,
			legs,
		}
	}

	pub fn total(&self) -> usize {
		self.head + self.torso + self.arms + self.legs
	}
}

/// A run of consecutive vertices belonging to one body part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
	pub part: BodyPart,
	pub range: Range<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Scatter {
	pub positions: Vec<Vec3>,
	pub normals: Vec<Vec3>,
	pub uvs: Vec<Vec2>,
	pub segments: Vec<Segment>,
}

impl Scatter {
	fn push(&mut self, position: Vec3, normal: Vec3, uv: Vec2) {
		self.positions.push(position);
		self.normals.push(normal.normalize_or_zero());
		self.uvs.push(uv);
	}

	fn segment(&mut self, part: BodyPart, fill: impl FnOnce(&mut Self)) {
		let start = self.positions.len();
		fill(self);
		let end = self.positions.len();
		if end > start {
			self.segments.push(Segment {
				part,
				range: start..end,
			});
		}
	}
}

/// Origin of each part's quarter of the texture.
fn uv_region(part: BodyPart, local: Vec2) -> Vec2 {
	let origin = match part {
		BodyPart::Head => vec2(0.0, 0.5),
		BodyPart::Torso => vec2(0.5, 0.5),
		BodyPart::LeftArm | BodyPart::RightArm => vec2(0.0, 0.0),
		BodyPart::LeftLeg | BodyPart::RightLeg => vec2(0.5, 0.0),
	};
	origin + local.clamp(Vec2::ZERO, Vec2::ONE) * 0.5
}

/// Ring size for `n` vertices swept into rings.
fn ring_size(n: usize) -> usize {
	((n as f32).sqrt().round() as usize).max(3)
}

fn scatter_head(out: &mut Scatter, p: &BodyProportions, n: usize, rng: &mut impl Rng) {
	let center = vec3(0.0, p.head_center_y(), 0.0);
	let radii = vec3(p.head_width / 2.0, 0.5, p.head_width / 2.0 * 0.9);

	for _ in 0..n {
		let polar = (2.0 * rng.gen::<f32>() - 1.0).clamp(-1.0, 1.0).acos();
		let azimuth = TAU * rng.gen::<f32>();
		let dir = vec3(polar.sin() * azimuth.cos(), polar.cos(), polar.sin() * azimuth.sin());
		out.push(
			center + dir * radii,
			dir / radii,
			uv_region(BodyPart::Head, vec2(azimuth / TAU, 1.0 - polar / PI)),
		);
	}
}

fn scatter_torso(out: &mut Scatter, p: &BodyProportions, n: usize) {
	let ring = ring_size(n);
	let rings = n.div_ceil(ring).max(2);

	for i in 0..n {
		let t = (i / ring) as f32 / (rings - 1) as f32;
		let k = (i % ring) as f32 / ring as f32;

		let width = if t < 0.6 {
			p.shoulder_width + (p.waist_width - p.shoulder_width) * (t / 0.6)
		} else {
			p.waist_width + (p.hip_width - p.waist_width) * ((t - 0.6) / 0.4)
		};
		let (rx, rz) = (width / 2.0, width * 0.55 / 2.0);
		let y = p.shoulder_y() + (p.hip_y() - p.shoulder_y()) * t;
		let angle = TAU * k;
		let (c, s) = (angle.cos(), angle.sin());

		out.push(
			vec3(rx * c, y, rz * s),
			vec3(c / rx, 0.0, s / rz),
			uv_region(BodyPart::Torso, vec2(k, 1.0 - t)),
		);
	}
}

/// Sweeps `n` vertices along `start -> end` with a circular cross-section.
fn scatter_limb(out: &mut Scatter, part: BodyPart, n: usize, start: Vec3, end: Vec3, radius: f32) {
	let axis = (end - start).normalize_or_zero();
	let helper = if axis.y.abs() < 0.9 { Vec3::Y } else { Vec3::X };
	let b1 = axis.cross(helper).normalize_or_zero();
	let b2 = axis.cross(b1);

	let ring = ring_size(n);
	let rings = n.div_ceil(ring).max(2);

	for i in 0..n {
		let t = (i / ring) as f32 / (rings - 1) as f32;
		let k = (i % ring) as f32 / ring as f32;
		let angle = TAU * k;
		// limbs taper towards hands and feet
		let r = radius * (1.0 - 0.35 * t);
		let dir = b1 * angle.cos() + b2 * angle.sin();

		out.push(start + (end - start) * t + dir * r, dir, uv_region(part, vec2(k, 1.0 - t)));
	}
}

/// Scatters exactly `target` vertices over a humanoid silhouette in T-pose.
///
/// Only head vertices are random (drawn from `rng`); torso and limbs are deterministic sweeps.
pub fn scatter_vertices(proportions: &BodyProportions, target: usize, rng: &mut impl Rng) -> Scatter {
	let p = proportions;
	let budget = VertexBudget::allocate(target);
	let mut out = Scatter {
		positions: Vec::with_capacity(target),
		normals: Vec::with_capacity(target),
		uvs: Vec::with_capacity(target),
		segments: Vec::with_capacity(6),
	};

	out.segment(BodyPart::Head, |out| scatter_head(out, p, budget.head, rng));
	out.segment(BodyPart::Torso, |out| scatter_torso(out, p, budget.torso));

	let arm_y = p.shoulder_y() - p.arm_width / 2.0;
	let shoulder_x = p.shoulder_width / 2.0;
	let (left_arm, right_arm) = (budget.arms - budget.arms / 2, budget.arms / 2);
	out.segment(BodyPart::LeftArm, |out| {
		let start = vec3(-shoulder_x, arm_y, 0.0);
		let end = vec3(-shoulder_x - p.arm_length, arm_y, 0.0);
		scatter_limb(out, BodyPart::LeftArm, left_arm, start, end, p.arm_width / 2.0)
	});
	out.segment(BodyPart::RightArm, |out| {
		let start = vec3(shoulder_x, arm_y, 0.0);
		let end = vec3(shoulder_x + p.arm_length, arm_y, 0.0);
		scatter_limb(out, BodyPart::RightArm, right_arm, start, end, p.arm_width / 2.0)
	});

	let hip_x = p.hip_width / 4.0;
	let (left_leg, right_leg) = (budget.legs - budget.legs / 2, budget.legs / 2);
	out.segment(BodyPart::LeftLeg, |out| {
		let start = vec3(-hip_x, p.hip_y(), 0.0);
		let end = vec3(-hip_x, 0.0, 0.0);
		scatter_limb(out, BodyPart::LeftLeg, left_leg, start, end, p.leg_width / 2.0)
	});
	out.segment(BodyPart::RightLeg, |out| {
		let start = vec3(hip_x, p.hip_y(), 0.0);
		let end = vec3(hip_x, 0.0, 0.0);
		scatter_limb(out, BodyPart::RightLeg, right_leg, start, end, p.leg_width / 2.0)
	});

	out
}

#[cfg(test)]
mod tests {
	use rand::rngs::StdRng;
	use rand::SeedableRng;

	use super::*;
	use crate::mesh::proportions::{build_proportions, Gender};

	#[test]
	fn budget_is_exact() {
		for target in [0, 1, 7, 10, 99, 1001, 50_000] {
			let budget = VertexBudget::allocate(target);
			assert_eq!(budget.total(), target);
		}
		assert_eq!(
			VertexBudget::allocate(100),
			VertexBudget {
				head: 25,
				torso: 35,
				arms: 20,
				legs: 20,
			}
		);
	}

	#[test]
	fn returns_exactly_the_requested_count() {
		let p = build_proportions(Gender::Auto);
		for target in [0, 5, 13, 250, 4099] {
			let scatter = scatter_vertices(&p, target, &mut StdRng::seed_from_u64(1));
			assert_eq!(scatter.positions.len(), target);
			assert_eq!(scatter.normals.len(), target);
			assert_eq!(scatter.uvs.len(), target);
			let covered: usize = scatter.segments.iter().map(|s| s.range.len()).sum();
			assert_eq!(covered, target);
		}
	}

	#[test]
	fn seeded_scatter_is_reproducible() {
		let p = build_proportions(Gender::Female);
		let a = scatter_vertices(&p, 400, &mut StdRng::seed_from_u64(42));
		let b = scatter_vertices(&p, 400, &mut StdRng::seed_from_u64(42));
		let c = scatter_vertices(&p, 400, &mut StdRng::seed_from_u64(43));
		assert_eq!(a.positions, b.positions);
		assert_ne!(a.positions, c.positions);
	}

	#[test]
	fn parts_stay_in_their_region() {
		let p = build_proportions(Gender::Male);
		let scatter = scatter_vertices(&p, 1000, &mut StdRng::seed_from_u64(3));

		for segment in &scatter.segments {
			for v in &scatter.positions[segment.range.clone()] {
				match segment.part {
					BodyPart::Head => assert!(v.y >= p.shoulder_y() - 1e-4 && v.y <= p.total_height() + 1e-4),
					BodyPart::LeftArm => assert!(v.x < 0.0),
					BodyPart::RightArm => assert!(v.x > 0.0),
					BodyPart::LeftLeg | BodyPart::RightLeg => assert!(v.y <= p.hip_y() + 1e-4),
					BodyPart::Torso => {
						assert!(v.y >= p.hip_y() - 1e-4 && v.y <= p.shoulder_y() + 1e-4)
					}
				}
			}
		}
		for uv in &scatter.uvs {
			assert!(uv.x >= 0.0 && uv.x <= 1.0 && uv.y >= 0.0 && uv.y <= 1.0);
		}
	}
}

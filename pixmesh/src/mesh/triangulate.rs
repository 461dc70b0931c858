use std::ops::Range;

use super::scatter::Segment;
use super::FaceGroup;

/// Triangle fan over consecutive vertex indices: `(first, i, i + 1)`.
///
/// Purely structural: the result is neither watertight nor free of self-intersections.
pub fn fan(range: Range<usize>) -> Vec<[u32; 3]> {
	if range.len() < 3 {
		return Vec::new();
	}
	let first = range.start as u32;
	((range.start + 1)..(range.end - 1))
		.map(|i| [first, i as u32, i as u32 + 1])
		.collect()
}

/// One fan per segment, grouped by body part, in segment order.
pub fn triangulate(segments: &[Segment]) -> Vec<FaceGroup> {
	segments
		.iter()
		.map(|segment| FaceGroup {
			part: segment.part,
			faces: fan(segment.range.clone()),
		})
		.filter(|group| !group.faces.is_empty())
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mesh::BodyPart;

	#[test]
	fn fan_counts() {
		assert!(fan(0..0).is_empty());
		assert!(fan(4..6).is_empty());
		assert_eq!(fan(0..3), vec![[0, 1, 2]]);
		assert_eq!(fan(10..14), vec![[10, 11, 12], [10, 12, 13]]);
	}

	#[test]
	fn groups_skip_tiny_segments() {
		let segments = [
			Segment {
				part: BodyPart::Head,
				range: 0..5,
			},
			Segment {
				part: BodyPart::Torso,
				range: 5..7,
			},
			Segment {
				part: BodyPart::LeftArm,
				range: 7..10,
			},
		];
		let groups = triangulate(&segments);
		assert_eq!(groups.len(), 2);
		assert_eq!(groups[0].faces.len(), 3);
		assert_eq!(groups[1].part, BodyPart::LeftArm);
		assert_eq!(groups[1].faces, vec![[7, 8, 9]]);
	}
}

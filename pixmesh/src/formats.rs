pub mod fbx;
pub mod gltf;
mod json;
pub mod mtl;
pub mod obj;

pub use json::{JsonError, JsonObject, JsonResult, SerialExtend};

/// Formats a float the way the text formats expect it: at most six decimals, no trailing zeros.
pub(crate) fn fmt_f32(v: f32) -> String {
	let v = if v == 0.0 { 0.0 } else { v };
	let s = format!("{v:.6}");
	match s.trim_end_matches('0').trim_end_matches('.') {
		"-0" => "0".to_owned(),
		s => s.to_owned(),
	}
}

#[cfg(test)]
mod tests {
	use super::fmt_f32;

	#[test]
	fn float_formatting() {
		assert_eq!(fmt_f32(1.0), "1");
		assert_eq!(fmt_f32(-0.25), "-0.25");
		assert_eq!(fmt_f32(-0.0), "0");
		assert_eq!(fmt_f32(0.1234567), "0.123457");
	}
}

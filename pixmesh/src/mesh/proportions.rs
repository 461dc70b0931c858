use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Gender {
	#[default]
	Auto,
	Male,
	Female,
}

impl Gender {
	pub fn as_str(self) -> &'static str {
		match self {
			Gender::Auto => "auto",
			Gender::Male => "male",
			Gender::Female => "female",
		}
	}
}

impl fmt::Display for Gender {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown gender {0:?}, expected auto, male or female")]
pub struct UnknownGenderError(String);

impl FromStr for Gender {
	type Err = UnknownGenderError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"auto" => Ok(Gender::Auto),
			"male" => Ok(Gender::Male),
			"female" => Ok(Gender::Female),
			a => Err(UnknownGenderError(a.to_owned())),
		}
	}
}

/// Body widths and lengths in head-height units (the head is 1 tall).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyProportions {
	pub head_width: f32,
	pub shoulder_width: f32,
	pub waist_width: f32,
	pub hip_width: f32,
	pub arm_width: f32,
	pub leg_width: f32,
	/// Shoulders to hips.
	pub torso_height: f32,
	pub arm_length: f32,
	pub leg_length: f32,
}

impl BodyProportions {
	pub fn hip_y(&self) -> f32 {
		self.leg_length
	}

	pub fn shoulder_y(&self) -> f32 {
		self.leg_length + self.torso_height
	}

	/// Center of the head sphere, sitting on the shoulders.
	pub fn head_center_y(&self) -> f32 {
		self.shoulder_y() + 0.5
	}

	pub fn total_height(&self) -> f32 {
		self.shoulder_y() + 1.0
	}
}

pub fn build_proportions(gender: Gender) -> BodyProportions {
	match gender {
		Gender::Male => BodyProportions {
			head_width: 0.75,
			shoulder_width: 2.2,
			waist_width: 1.4,
			hip_width: 1.5,
			arm_width: 0.45,
			leg_width: 0.6,
			torso_height: 3.0,
			arm_length: 3.2,
			leg_length: 4.0,
		},
		Gender::Female => BodyProportions {
			head_width: 0.7,
			shoulder_width: 1.8,
			waist_width: 1.2,
			hip_width: 1.7,
			arm_width: 0.38,
			leg_width: 0.55,
			torso_height: 2.8,
			arm_length: 3.0,
			leg_length: 3.9,
		},
		Gender::Auto => BodyProportions {
			head_width: 0.72,
			shoulder_width: 2.0,
			waist_width: 1.3,
			hip_width: 1.6,
			arm_width: 0.42,
			leg_width: 0.58,
			torso_height: 2.9,
			arm_length: 3.1,
			leg_length: 3.95,
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_gender() {
		assert_eq!("female".parse::<Gender>().unwrap(), Gender::Female);
		assert!("other".parse::<Gender>().is_err());
		assert_eq!(Gender::default().to_string(), "auto");
	}

	#[test]
	fn tables_are_plausible() {
		for gender in [Gender::Auto, Gender::Male, Gender::Female] {
			let p = build_proportions(gender);
			assert!(p.shoulder_width > p.waist_width, "{gender}");
			assert!(p.total_height() > 7.0 && p.total_height() < 9.0, "{gender}");
		}
		let male = build_proportions(Gender::Male);
		let female = build_proportions(Gender::Female);
		assert!(male.shoulder_width > female.shoulder_width);
		assert!(female.hip_width > male.hip_width);
	}
}

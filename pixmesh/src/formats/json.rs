//! Read-side JSON helpers for handler responses, on top of the `json` crate.

use json::JsonValue;

pub trait SerialExtend {
	fn as_object(&self) -> Option<&json::object::Object>;
}

impl SerialExtend for json::JsonValue {
	fn as_object(&self) -> Option<&json::object::Object> {
		if let json::JsonValue::Object(obj) = self {
			Some(obj)
		} else {
			None
		}
	}
}

pub type JsonResult<T> = Result<T, JsonError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JsonError {
	#[error("Key {0:?} does not exist")]
	KeyDoesNotExist(String),
	#[error("Value at {0:?} is not an object")]
	ValueIsNotObject(String),
	#[error("Value at {0:?} is not a list")]
	ValueIsNotList(String),
	#[error("Value at {0:?} is not a string")]
	ValueIsNotString(String),
	#[error("Value at {0:?} is not a number")]
	ValueIsNotNumber(String),
	#[error("Error while parsing int at {0:?}\n  - number out of scope")]
	ParseIntError(String),
	#[error("Error in list at index {index}\n  - {inner}")]
	ErrorInList { index: usize, inner: Box<JsonError> },
	#[error("Error in object at {key:?}\n  - {inner}")]
	ErrorInObject { key: String, inner: Box<JsonError> },
}

impl JsonError {
	pub fn nested(self, key: &str) -> Self {
		Self::ErrorInObject {
			key: key.to_owned(),
			inner: Box::new(self),
		}
	}

	pub fn in_list(self, index: usize) -> Self {
		Self::ErrorInList {
			index,
			inner: Box::new(self),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JsonObject<'a>(pub &'a json::object::Object);

impl<'a> JsonObject<'a> {
	/// Wraps a value that must be an object; `what` names it in the error.
	pub fn from_value(what: &str, value: &'a JsonValue) -> JsonResult<Self> {
		match value.as_object() {
			Some(obj) => Ok(JsonObject(obj)),
			None => Err(JsonError::ValueIsNotObject(what.to_owned())),
		}
	}

	fn get(&self, key: &str) -> JsonResult<&'a json::JsonValue> {
		match self.0.get(key) {
			Some(value) => Ok(value),
			None => Err(JsonError::KeyDoesNotExist(key.to_owned())),
		}
	}

	pub fn contains(&self, key: &str) -> bool {
		self.0.get(key).is_some_and(|v| !v.is_null())
	}

	pub fn get_object(&self, key: &str) -> JsonResult<JsonObject<'a>> {
		match self.get(key)?.as_object() {
			Some(obj) => Ok(JsonObject(obj)),
			None => Err(JsonError::ValueIsNotObject(key.to_owned())),
		}
	}

	pub fn get_list(&self, key: &str) -> JsonResult<&'a [JsonValue]> {
		match self.get(key)? {
			json::JsonValue::Array(arr) => Ok(arr),
			_ => Err(JsonError::ValueIsNotList(key.to_owned())),
		}
	}

	pub fn get_str(&self, key: &str) -> JsonResult<&'a str> {
		match self.get(key)?.as_str() {
			Some(val) => Ok(val),
			None => Err(JsonError::ValueIsNotString(key.to_owned())),
		}
	}

	pub fn get_nullable_str(&self, key: &str) -> JsonResult<Option<&'a str>> {
		if !self.contains(key) {
			return Ok(None);
		}
		self.get_str(key).map(Some)
	}

	/// First of `keys` that holds a string.
	pub fn first_str(&self, keys: &[&str]) -> Option<&'a str> {
		keys.iter().find_map(|key| self.0.get(key).and_then(JsonValue::as_str))
	}

	fn get_number(&self, key: &str) -> JsonResult<json::number::Number> {
		match self.get(key)?.as_number() {
			Some(val) => Ok(val),
			None => Err(JsonError::ValueIsNotNumber(key.to_owned())),
		}
	}

	pub fn get_u64(&self, key: &str) -> JsonResult<u64> {
		self.get_number(key)?
			.try_into()
			.map_err(|_| JsonError::ParseIntError(key.to_owned()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reads_nested_values() {
		let value = json::parse(r#"{"id": "a1", "output": {"size": 12, "ratio": 0.5}, "error": null}"#).unwrap();
		let obj = JsonObject::from_value("response", &value).unwrap();

		assert_eq!(obj.get_str("id"), Ok("a1"));
		assert_eq!(obj.get_nullable_str("error"), Ok(None));
		assert_eq!(obj.get_nullable_str("missing"), Ok(None));

		let output = obj.get_object("output").unwrap();
		assert_eq!(output.get_u64("size"), Ok(12));
		assert!(!obj.contains("error"));
	}

	#[test]
	fn reports_shape_errors() {
		let value = json::parse(r#"{"id": 3, "size": -1}"#).unwrap();
		let obj = JsonObject::from_value("response", &value).unwrap();

		assert_eq!(obj.get_str("id"), Err(JsonError::ValueIsNotString("id".to_owned())));
		assert_eq!(obj.get_u64("size"), Err(JsonError::ParseIntError("size".to_owned())));
		assert_eq!(
			obj.get_object("output"),
			Err(JsonError::KeyDoesNotExist("output".to_owned()))
		);
		assert!(JsonObject::from_value("list", &json::parse("[1]").unwrap()).is_err());
	}

	#[test]
	fn first_str_skips_non_strings() {
		let value = json::parse(r#"{"a": 1, "b": "two", "c": "three"}"#).unwrap();
		let obj = JsonObject::from_value("x", &value).unwrap();
		assert_eq!(obj.first_str(&["z", "a", "b", "c"]), Some("two"));
		assert_eq!(obj.first_str(&["z"]), None);
	}
}

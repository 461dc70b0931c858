use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::imageops::{self, FilterType};
use image::{ColorType, ImageError, ImageFormat, RgbaImage};

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
	#[error("Failed to load image")]
	Decode(#[source] ImageError),
	#[error("Could not encode image")]
	Encode(#[source] ImageError),
	#[error("{len} bytes do not make a {width}x{height} RGBA image")]
	SizeMismatch { width: u32, height: u32, len: usize },
	#[error("Not a base64 data URL")]
	NotADataUrl,
	#[error("Invalid base64 payload")]
	Base64(#[from] base64::DecodeError),
}

/// A `width * height` grid of RGBA bytes, row major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterBuffer {
	pixels: Vec<u8>,
	width: u32,
	height: u32,
}

impl RasterBuffer {
	pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, RasterError> {
		if pixels.len() != width as usize * height as usize * 4 {
			return Err(RasterError::SizeMismatch {
				width,
				height,
				len: pixels.len(),
			});
		}
		Ok(Self { pixels, width, height })
	}

	pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
		let pixels = rgba.repeat(width as usize * height as usize);
		Self { pixels, width, height }
	}

	/// Decodes any format the `image` crate was built with.
	pub fn decode(bytes: &[u8]) -> Result<Self, RasterError> {
		let img = image::load_from_memory(bytes).map_err(RasterError::Decode)?;
		Ok(Self::from(img.into_rgba8()))
	}

	/// Format name of encoded bytes, as sent to the handler (`png`, `jpeg`, ...).
	pub fn format_name(bytes: &[u8]) -> Option<&'static str> {
		match image::guess_format(bytes).ok()? {
			ImageFormat::Png => Some("png"),
			ImageFormat::Jpeg => Some("jpeg"),
			ImageFormat::Gif => Some("gif"),
			other => other.extensions_str().first().copied(),
		}
	}

	pub fn pixels(&self) -> &[u8] {
		&self.pixels
	}

	pub fn pixels_mut(&mut self) -> &mut [u8] {
		&mut self.pixels
	}

	pub fn width(&self) -> u32 {
		self.width
	}

	pub fn height(&self) -> u32 {
		self.height
	}

	fn offset(&self, x: u32, y: u32) -> usize {
		(y as usize * self.width as usize + x as usize) * 4
	}

	pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
		let i = self.offset(x, y);
		[self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]]
	}

	pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
		let i = self.offset(x, y);
		self.pixels[i..i + 4].copy_from_slice(&rgba);
	}

	pub fn to_image(&self) -> RgbaImage {
		// length is checked on construction
		RgbaImage::from_raw(self.width, self.height, self.pixels.clone()).unwrap_or_else(|| RgbaImage::new(0, 0))
	}

	pub fn resize_exact(&self, width: u32, height: u32) -> Self {
		Self::from(imageops::resize(&self.to_image(), width, height, FilterType::Triangle))
	}

	/// Scales down, keeping the aspect ratio, so that the long side is at most `max_side`.
	pub fn fit_within(&self, max_side: u32) -> Self {
		let long = self.width.max(self.height);
		if long <= max_side || long == 0 {
			return self.clone();
		}
		let scale = max_side as f32 / long as f32;
		let width = ((self.width as f32 * scale).round() as u32).max(1);
		let height = ((self.height as f32 * scale).round() as u32).max(1);
		self.resize_exact(width, height)
	}

	pub fn encode_png(&self) -> Result<Vec<u8>, RasterError> {
		let mut buf = Cursor::new(Vec::new());
		image::write_buffer_with_format(
			&mut buf,
			&self.pixels,
			self.width,
			self.height,
			ColorType::Rgba8,
			ImageFormat::Png,
		)
		.map_err(RasterError::Encode)?;
		Ok(buf.into_inner())
	}

	pub fn to_data_url(&self) -> Result<String, RasterError> {
		Ok(data_url("image/png", &self.encode_png()?))
	}
}

impl From<RgbaImage> for RasterBuffer {
	fn from(value: RgbaImage) -> Self {
		Self {
			width: value.width(),
			height: value.height(),
			pixels: value.into_raw(),
		}
	}
}

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
	format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Payload bytes of a `data:<mime>;base64,<payload>` URL.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, RasterError> {
	let rest = url.strip_prefix("data:").ok_or(RasterError::NotADataUrl)?;
	let (meta, payload) = rest.split_once(',').ok_or(RasterError::NotADataUrl)?;
	if !meta.ends_with(";base64") {
		return Err(RasterError::NotADataUrl);
	}
	Ok(STANDARD.decode(payload)?)
}

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
	Original,
	Genshin,
	Tpose,
	Front,
	Side,
	Back,
}

impl ImageKind {
	pub const VIEWS: [ImageKind; 3] = [ImageKind::Front, ImageKind::Side, ImageKind::Back];

	pub fn as_str(self) -> &'static str {
		match self {
			ImageKind::Original => "original",
			ImageKind::Genshin => "genshin",
			ImageKind::Tpose => "tpose",
			ImageKind::Front => "front",
			ImageKind::Side => "side",
			ImageKind::Back => "back",
		}
	}

	pub fn id(self) -> &'static str {
		match self {
			ImageKind::Original => "original",
			ImageKind::Genshin => "genshin-style",
			ImageKind::Tpose => "tpose",
			ImageKind::Front => "front-view",
			ImageKind::Side => "side-view",
			ImageKind::Back => "back-view",
		}
	}

	pub fn filename(self) -> &'static str {
		match self {
			ImageKind::Original => "original.png",
			ImageKind::Genshin => "genshin_style.png",
			ImageKind::Tpose => "tpose.png",
			ImageKind::Front => "front_view.png",
			ImageKind::Side => "side_view.png",
			ImageKind::Back => "back_view.png",
		}
	}
}

impl fmt::Display for ImageKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A stage result. `url` is either remote or a data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
	pub id: &'static str,
	pub kind: ImageKind,
	pub url: String,
	pub filename: &'static str,
}

impl GeneratedImage {
	pub fn new(kind: ImageKind, url: String) -> Self {
		Self {
			id: kind.id(),
			kind,
			url,
			filename: kind.filename(),
		}
	}

	pub fn is_inline(&self) -> bool {
		self.url.starts_with("data:")
	}
}

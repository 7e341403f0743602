//! Visual theming for the network graph.
//!
//! Provides the group color lookup and the stroke/fill/label styles the
//! painter uses.

use std::collections::HashMap;

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: f64,
}

impl Color {
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Parses `#RRGGBB` or `#RGB`. Anything else is `None`.
	pub fn from_hex(hex: &str) -> Option<Self> {
		let digits = hex.strip_prefix('#').filter(|d| d.is_ascii())?;
		let channel = |s: &str| u8::from_str_radix(s, 16).ok();
		match digits.len() {
			6 => Some(Self::rgb(
				channel(&digits[0..2])?,
				channel(&digits[2..4])?,
				channel(&digits[4..6])?,
			)),
			3 => {
				let short = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
				Some(Self::rgb(short(0)?, short(1)?, short(2)?))
			}
			_ => None,
		}
	}

	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}
}

/// Neutral gray for groups without a configured color.
pub const FALLBACK_NODE_COLOR: Color = Color::rgb(0x99, 0x99, 0x99);

/// Fixed group → color lookup. Unknown groups are gray, never an error.
#[derive(Clone, Debug, Default)]
pub struct GroupPalette {
	colors: HashMap<String, Color>,
}

impl GroupPalette {
	/// Builds the lookup from CSS hex strings; unparsable entries fall back to
	/// gray.
	pub fn from_hex_map(map: &HashMap<String, String>) -> Self {
		Self {
			colors: map
				.iter()
				.map(|(group, hex)| {
					(
						group.clone(),
						Color::from_hex(hex).unwrap_or(FALLBACK_NODE_COLOR),
					)
				})
				.collect(),
		}
	}

	pub fn color_for(&self, group: &str) -> Color {
		self.colors.get(group).copied().unwrap_or(FALLBACK_NODE_COLOR)
	}
}

/// Node visual style.
#[derive(Clone, Debug)]
pub struct NodeStyle {
	/// Circle radius once the entrance transition completes.
	pub radius: f64,
	pub border_color: Color,
	pub border_width: f64,
	pub label_color: Color,
	pub label_font: &'static str,
	/// Label offset from the node center.
	pub label_offset: (f64, f64),
}

/// Link visual style.
#[derive(Clone, Debug)]
pub struct EdgeStyle {
	pub color: Color,
	pub width: f64,
	pub arrow_color: Color,
	pub arrow_size: f64,
	/// Distance from the target center to the arrow tip, measured along the arc.
	pub arrow_inset: f64,
}

/// Canvas background.
#[derive(Clone, Debug)]
pub struct BackgroundStyle {
	pub color: Color,
}

/// Complete visual theme.
#[derive(Clone, Debug)]
pub struct Theme {
	pub background: BackgroundStyle,
	pub edge: EdgeStyle,
	pub node: NodeStyle,
}

impl Default for Theme {
	fn default() -> Self {
		Self {
			background: BackgroundStyle {
				color: Color::rgb(255, 255, 255),
			},
			edge: EdgeStyle {
				color: Color::rgb(0x9a, 0xa4, 0xb2),
				width: 1.6,
				arrow_color: Color::rgb(0x99, 0x99, 0x99),
				arrow_size: 7.0,
				arrow_inset: 18.0,
			},
			node: NodeStyle {
				radius: 16.0,
				border_color: Color::rgb(255, 255, 255),
				border_width: 1.6,
				label_color: Color::rgb(0x11, 0x11, 0x11),
				label_font: "13px sans-serif",
				label_offset: (22.0, 6.0),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::default_group_colors;

	#[test]
	fn hex_parsing() {
		assert_eq!(Color::from_hex("#3a86ff"), Some(Color::rgb(0x3a, 0x86, 0xff)));
		assert_eq!(Color::from_hex("#999"), Some(Color::rgb(0x99, 0x99, 0x99)));
		assert_eq!(Color::from_hex("red"), None);
		assert_eq!(Color::from_hex("#12345"), None);
	}

	#[test]
	fn unknown_groups_fall_back_to_gray() {
		let palette = GroupPalette::from_hex_map(&default_group_colors());
		assert_eq!(palette.color_for("NATO").to_css(), "#3a86ff");
		assert_eq!(palette.color_for("CSTO").to_css(), "#ff0000");
		assert_eq!(palette.color_for("Other"), FALLBACK_NODE_COLOR);
		assert_eq!(palette.color_for(""), FALLBACK_NODE_COLOR);
	}

	#[test]
	fn translucent_css() {
		assert_eq!(Color::rgb(1, 2, 3).with_alpha(0.5).to_css(), "rgba(1, 2, 3, 0.5)");
	}
}

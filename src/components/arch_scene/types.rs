use std::fmt;

/// Stable identity of a node in the diagram.
pub type NodeId = String;

/// An opaque RGB color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
}

impl Color {
	pub const WHITE: Color = Color::from_hex(0xffffff);

	pub const fn new(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b }
	}

	/// Builds a color from a packed `0xrrggbb` value.
	pub const fn from_hex(hex: u32) -> Self {
		Self {
			r: ((hex >> 16) & 0xff) as u8,
			g: ((hex >> 8) & 0xff) as u8,
			b: (hex & 0xff) as u8,
		}
	}

	pub const fn to_hex(self) -> u32 {
		((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
	}

	/// Parses `#rrggbb` (the leading `#` is required).
	pub fn parse(s: &str) -> Option<Self> {
		let digits = s.strip_prefix('#')?;
		if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
			return None;
		}
		u32::from_str_radix(digits, 16).ok().map(Self::from_hex)
	}

	pub fn to_hex_string(self) -> String {
		format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
	}

	pub fn css_rgba(self, alpha: f64) -> String {
		format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, alpha)
	}

	/// Mixes toward white by `t` in `[0, 1]`.
	pub fn lighten(self, t: f32) -> Self {
		let t = t.clamp(0.0, 1.0);
		let mix = |c: u8| (c as f32 + (255.0 - c as f32) * t).round() as u8;
		Self::new(mix(self.r), mix(self.g), mix(self.b))
	}
}

impl fmt::Display for Color {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_hex_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_and_format() {
		let c = Color::parse("#06B6d4").unwrap();
		assert_eq!(c, Color::from_hex(0x06b6d4));
		assert_eq!(c.to_hex_string(), "#06b6d4");
		assert_eq!(c.to_hex(), 0x06b6d4);
	}

	#[test]
	fn test_parse_rejects_malformed() {
		assert!(Color::parse("06b6d4").is_none());
		assert!(Color::parse("#06b6d").is_none());
		assert!(Color::parse("#zzzzzz").is_none());
		assert!(Color::parse("#+12345").is_none());
	}

	#[test]
	fn test_lighten_reaches_white() {
		assert_eq!(Color::from_hex(0x102030).lighten(1.0), Color::WHITE);
		assert_eq!(Color::from_hex(0x102030).lighten(0.0), Color::from_hex(0x102030));
	}
}

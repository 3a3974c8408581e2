//! センチネル色の表現
//!
//! - `#FF0000` / `FF0000` / `255,0,0` / `red` の各表記を受け付ける
//! - 設定ファイルには `#RRGGBB` で保存

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color { r: 255, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// 全チャンネルが許容差以内か
    pub fn matches(&self, r: u8, g: u8, b: u8, tolerance: u8) -> bool {
        self.r.abs_diff(r) <= tolerance
            && self.g.abs_diff(g) <= tolerance
            && self.b.abs_diff(b) <= tolerance
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::RED
    }
}

impl std::str::FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lazy_static::lazy_static! {
            static ref HEX: Regex = Regex::new(r"^#?([0-9a-fA-F]{2})([0-9a-fA-F]{2})([0-9a-fA-F]{2})$").unwrap();
        }
        lazy_static::lazy_static! {
            static ref TRIPLE: Regex = Regex::new(r"^\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*$").unwrap();
        }

        let s = s.trim();

        match s.to_lowercase().as_str() {
            "red" => return Ok(Color::new(255, 0, 0)),
            "green" => return Ok(Color::new(0, 255, 0)),
            "blue" => return Ok(Color::new(0, 0, 255)),
            _ => {}
        }

        if let Some(caps) = HEX.captures(s) {
            let channel = |i: usize| u8::from_str_radix(&caps[i], 16).map_err(|e| e.to_string());
            return Ok(Color::new(channel(1)?, channel(2)?, channel(3)?));
        }

        if let Some(caps) = TRIPLE.captures(s) {
            let channel = |i: usize| {
                caps[i]
                    .parse::<u8>()
                    .map_err(|_| format!("色の値は0-255で指定してください: {}", &caps[i]))
            };
            return Ok(Color::new(channel(1)?, channel(2)?, channel(3)?));
        }

        Err(format!("Unknown color: {}. Use #RRGGBB, R,G,B or red/green/blue", s))
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!("#FF0000".parse::<Color>().unwrap(), Color::RED);
        assert_eq!("00ff7f".parse::<Color>().unwrap(), Color::new(0, 255, 127));
    }

    #[test]
    fn test_parse_triple_and_name() {
        assert_eq!("12, 34,56".parse::<Color>().unwrap(), Color::new(12, 34, 56));
        assert_eq!("Red".parse::<Color>().unwrap(), Color::RED);
    }

    #[test]
    fn test_parse_invalid() {
        assert!("#GG0000".parse::<Color>().is_err());
        assert!("256,0,0".parse::<Color>().is_err());
        assert!("purple".parse::<Color>().is_err());
    }

    #[test]
    fn test_matches_tolerance() {
        let red = Color::RED;
        assert!(red.matches(250, 5, 10, 10));
        assert!(!red.matches(240, 0, 0, 10));
        assert!(red.matches(255, 0, 0, 0));
    }

    #[test]
    fn test_display_roundtrip_via_serde() {
        let json = serde_json::to_string(&Color::new(1, 2, 3)).unwrap();
        assert_eq!(json, "\"#010203\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::new(1, 2, 3));
    }
}

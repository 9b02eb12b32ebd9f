//! Display colors for risk bands, used for map markers and report styling.

use crate::model::RiskLevel;
use serde::Serialize;
use std::fmt;

/// An sRGB color, rendered as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

pub const EMERALD: Color = Color::rgb(0x10, 0xb9, 0x81);
pub const AMBER: Color = Color::rgb(0xf5, 0x9e, 0x0b);
pub const RED: Color = Color::rgb(0xdc, 0x26, 0x26);
pub const MAROON: Color = Color::rgb(0x7f, 0x1d, 0x1d);
/// Used for anything that is not a known risk level.
pub const NEUTRAL_GRAY: Color = Color::rgb(0x9c, 0xa3, 0xaf);

pub fn color_for(level: RiskLevel) -> Color {
    match level {
        RiskLevel::Normal => EMERALD,
        RiskLevel::Warning => AMBER,
        RiskLevel::Danger => RED,
        RiskLevel::Extreme => MAROON,
    }
}

/// Color for a raw risk label as it arrives from upstream or a UI layer.
/// Labels that do not name a risk level get the neutral gray.
pub fn color_for_label(label: &str) -> Color {
    label.parse::<RiskLevel>().map(color_for).unwrap_or(NEUTRAL_GRAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_level_has_a_distinct_non_gray_color() {
        let colors: HashSet<Color> = RiskLevel::ALL.iter().map(|l| color_for(*l)).collect();
        assert_eq!(colors.len(), RiskLevel::ALL.len());
        assert!(!colors.contains(&NEUTRAL_GRAY));
    }

    #[test]
    fn test_palette_hex_values() {
        assert_eq!(color_for(RiskLevel::Normal).hex(), "#10b981");
        assert_eq!(color_for(RiskLevel::Warning).hex(), "#f59e0b");
        assert_eq!(color_for(RiskLevel::Danger).hex(), "#dc2626");
        assert_eq!(color_for(RiskLevel::Extreme).to_string(), "#7f1d1d");
    }

    #[test]
    fn test_unknown_labels_fall_back_to_gray() {
        assert_eq!(color_for_label("SEVERE"), NEUTRAL_GRAY);
        assert_eq!(color_for_label(""), NEUTRAL_GRAY);
        assert_eq!(color_for_label("undefined"), NEUTRAL_GRAY);
        assert_eq!(color_for_label("DANGER"), RED);
    }
}

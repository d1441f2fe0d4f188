//! Visual styles and themes.
//!
//! Styles are never persisted; they are resolved on demand from the theme
//! default merged with per-annotation overrides.

use serde::{Deserialize, Serialize};

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    /// CSS hex notation, e.g. `#ff8800`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Parse `#rrggbb` or `#rgb`.
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
                let expand = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
                Some(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            _ => None,
        }
    }

    /// Distinct color for the n-th item (golden-angle hue stepping).
    pub fn from_index(index: u32) -> Self {
        let hue = (index as f32 * 137.5) % 360.0;
        let (r, g, b) = hsv_to_rgb(hue, 0.7, 0.9);
        Self::rgb(
            (r * 255.0).round() as u8,
            (g * 255.0).round() as u8,
            (b * 255.0).round() as u8,
        )
    }
}

/// Convert HSV to RGB (h in degrees, s and v in 0-1).
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (r + m, g + m, b + m)
}

/// Fully resolved visual style for one annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub stroke: Color,
    pub stroke_width: f64,
    pub stroke_opacity: f64,
    pub fill: Option<Color>,
    pub fill_opacity: f64,
    /// Dash pattern, empty for a solid line.
    pub dash: Vec<f64>,
    pub font_size: f64,
    pub font_family: String,
}

impl Style {
    /// Apply one option, replacing the corresponding field.
    pub fn apply(&mut self, option: &StyleOption) {
        match option {
            StyleOption::Stroke(c) => self.stroke = *c,
            StyleOption::StrokeWidth(w) => self.stroke_width = *w,
            StyleOption::StrokeOpacity(o) => self.stroke_opacity = *o,
            StyleOption::Fill(c) => self.fill = *c,
            StyleOption::FillOpacity(o) => self.fill_opacity = *o,
            StyleOption::Dash(d) => self.dash = d.clone(),
            StyleOption::FontSize(s) => self.font_size = *s,
            StyleOption::FontFamily(f) => self.font_family = f.clone(),
        }
    }

    /// A copy with every option applied in order.
    pub fn with_options(&self, options: &[StyleOption]) -> Style {
        let mut style = self.clone();
        for option in options {
            style.apply(option);
        }
        style
    }
}

/// One overridable style property.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleOption {
    Stroke(Color),
    StrokeWidth(f64),
    StrokeOpacity(f64),
    Fill(Option<Color>),
    FillOpacity(f64),
    Dash(Vec<f64>),
    FontSize(f64),
    FontFamily(String),
}

impl StyleOption {
    /// Options of the same variant replace each other.
    pub fn same_property(&self, other: &StyleOption) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Theme choice - dark or light mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    #[default]
    Dark,
    Light,
}

/// Theme defaults for annotation styling.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub choice: ThemeChoice,
    /// Style of a normal annotation.
    pub default_style: Style,
    /// Options layered on top when an annotation is selected.
    pub selected: Vec<StyleOption>,
    /// Style of in-progress tool previews.
    pub preview_style: Style,
    /// Style of group bounding boxes (stroke is replaced by the group color).
    pub group_style: Style,
    /// Color of label text.
    pub label_color: Color,
}

impl Theme {
    /// Create a dark theme (light strokes over dark imagery).
    pub fn dark() -> Self {
        Self::build(ThemeChoice::Dark, Color::rgb(0x4d, 0x99, 0xe6), Color::WHITE)
    }

    /// Create a light theme.
    pub fn light() -> Self {
        Self::build(ThemeChoice::Light, Color::rgb(0x1a, 0x5f, 0xb4), Color::BLACK)
    }

    pub fn from_choice(choice: ThemeChoice) -> Self {
        match choice {
            ThemeChoice::Dark => Self::dark(),
            ThemeChoice::Light => Self::light(),
        }
    }

    fn build(choice: ThemeChoice, accent: Color, label_color: Color) -> Self {
        let default_style = Style {
            stroke: accent,
            stroke_width: 2.0,
            stroke_opacity: 1.0,
            fill: Some(accent),
            fill_opacity: 0.15,
            dash: Vec::new(),
            font_size: 16.0,
            font_family: "sans-serif".to_string(),
        };
        Self {
            choice,
            selected: vec![
                StyleOption::Stroke(Color::rgb(0xff, 0xc1, 0x07)),
                StyleOption::StrokeWidth(3.0),
            ],
            preview_style: default_style.with_options(&[
                StyleOption::Dash(vec![6.0, 4.0]),
                StyleOption::Fill(None),
            ]),
            group_style: default_style.with_options(&[
                StyleOption::Dash(vec![4.0, 4.0]),
                StyleOption::Fill(None),
                StyleOption::StrokeWidth(1.0),
            ]),
            default_style,
            label_color,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let c = Color::rgb(255, 136, 0);
        assert_eq!(c.to_hex(), "#ff8800");
        assert_eq!(Color::from_hex("#ff8800"), Some(c));
        assert_eq!(Color::from_hex("#f80"), Some(c));
        assert_eq!(Color::from_hex("ff8800"), None);
        assert_eq!(Color::from_hex("#zzzzzz"), None);
    }

    #[test]
    fn test_index_colors_differ() {
        assert_ne!(Color::from_index(1), Color::from_index(2));
    }

    #[test]
    fn test_options_replace_fields() {
        let base = Theme::dark().default_style;
        let styled = base.with_options(&[StyleOption::StrokeWidth(5.0), StyleOption::Fill(None)]);
        assert_eq!(styled.stroke_width, 5.0);
        assert_eq!(styled.fill, None);
        assert_eq!(styled.stroke, base.stroke);
    }

    #[test]
    fn test_same_property() {
        assert!(StyleOption::StrokeWidth(1.0).same_property(&StyleOption::StrokeWidth(9.0)));
        assert!(!StyleOption::StrokeWidth(1.0).same_property(&StyleOption::FontSize(1.0)));
    }
}

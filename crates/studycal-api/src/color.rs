//! Color bands and theme tokens

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Discrete color category derived from an achievement rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    White,
    Yellow,
    Green,
    Brown,
    Blue,
    Black,
    Purple,
}

impl Band {
    pub const ALL: [Band; 7] = [
        Band::White,
        Band::Yellow,
        Band::Green,
        Band::Brown,
        Band::Blue,
        Band::Black,
        Band::Purple,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::White => "white",
            Band::Yellow => "yellow",
            Band::Green => "green",
            Band::Brown => "brown",
            Band::Blue => "blue",
            Band::Black => "black",
            Band::Purple => "purple",
        }
    }

    /// Position in the white..purple progression (0..=6)
    pub fn ordinal(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calendar color theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Discrete palette, one color per band
    #[default]
    Classic,
    /// Green intensity stepped by band
    Green,
    /// Contribution-graph style gradient interpolated from the rate itself
    Github,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Classic => "classic",
            Theme::Green => "green",
            Theme::Github => "github",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "classic" => Ok(Theme::Classic),
            "green" => Ok(Theme::Green),
            "github" => Ok(Theme::Github),
            other => Err(format!("unknown theme '{}'", other)),
        }
    }
}

/// 24-bit color, rendered as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(0xff, 0xff, 0xff);

    /// Perceived luminance in `[0, 1]`
    pub fn luminance(&self) -> f64 {
        (0.299 * f64::from(self.0) + 0.587 * f64::from(self.1) + 0.114 * f64::from(self.2))
            / 255.0
    }

    /// Linear interpolation; `t` is clamped to `[0, 1]`
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// What a calendar cell should look like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisualToken {
    pub band: Band,
    pub theme: Theme,
    pub background: Rgb,
    pub foreground: Rgb,
}

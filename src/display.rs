//! Display geometry for the two meter renderings
//!
//! Nothing here draws; it turns a [`Reading`] into the numbers a renderer
//! needs (bar fill, needle angle, colour) so every front end shows the same
//! meter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    NEEDLE_ANGLE_CEILING_DEG, NEEDLE_ANGLE_FLOOR_DEG, SCALE_TICKS_VU, VU_CEILING, VU_FLOOR,
};
use crate::meter::Reading;

/// How the reading is rendered. The only persisted user choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Horizontal LED bar
    #[default]
    Led,
    /// Analog dial with a needle
    Needle,
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayMode::Led => write!(f, "led"),
            DisplayMode::Needle => write!(f, "needle"),
        }
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "led" => Ok(DisplayMode::Led),
            "needle" => Ok(DisplayMode::Needle),
            other => Err(format!("unknown display mode '{}'", other)),
        }
    }
}

/// 8-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const GREEN: Rgb = Rgb::new(0x00, 0x80, 0x00);
    pub const YELLOW: Rgb = Rgb::new(0xFF, 0xFF, 0x00);
    pub const ORANGE: Rgb = Rgb::new(0xFF, 0xA5, 0x00);
    pub const RED: Rgb = Rgb::new(0xFF, 0x00, 0x00);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear interpolation towards `other`, `t` clamped to [0, 1]
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    /// `#rrggbb`
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Fraction of the scale covered by `vu`, in [0, 1]
pub fn normalized(vu: f32) -> f32 {
    ((vu - VU_FLOOR) / (VU_CEILING - VU_FLOOR)).clamp(0.0, 1.0)
}

/// Needle angle in degrees: the floor sits at 230°, the ceiling at -50°
pub fn needle_angle_degrees(vu: f32) -> f32 {
    let t = normalized(vu);
    NEEDLE_ANGLE_FLOOR_DEG + (NEEDLE_ANGLE_CEILING_DEG - NEEDLE_ANGLE_FLOOR_DEG) * t
}

fn interpolate(vu: f32, vu_start: f32, vu_end: f32, start: Rgb, end: Rgb) -> Rgb {
    start.lerp(end, (vu - vu_start) / (vu_end - vu_start))
}

/// Fill colour for a VU value: green up to -6, yellow to orange up to -3,
/// orange to red above
pub fn zone_colour(vu: f32) -> Rgb {
    if vu <= -6.0 {
        Rgb::GREEN
    } else if vu <= -3.0 {
        interpolate(vu, -6.0, -3.0, Rgb::YELLOW, Rgb::ORANGE)
    } else {
        interpolate(vu, -3.0, 3.0, Rgb::ORANGE, Rgb::RED)
    }
}

/// Fill colour for a reading; a peak hit always shows red
pub fn reading_colour(reading: &Reading) -> Rgb {
    if reading.peak_hit {
        Rgb::RED
    } else {
        zone_colour(reading.vu_value)
    }
}

/// Scale tick positions
pub fn scale_ticks() -> &'static [f32] {
    &SCALE_TICKS_VU
}

/// Everything a front end needs to draw one refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterFrame {
    pub reading: Reading,
    pub mode: DisplayMode,
    /// Bar fill in [0, 1]
    pub normalized: f32,
    /// Needle angle in degrees
    pub needle_angle_deg: f32,
    /// Fill or needle colour, `#rrggbb`
    pub colour: String,
}

impl MeterFrame {
    pub fn new(reading: Reading, mode: DisplayMode) -> Self {
        Self {
            reading,
            mode,
            normalized: normalized(reading.vu_value),
            needle_angle_deg: needle_angle_degrees(reading.vu_value),
            colour: reading_colour(&reading).to_hex(),
        }
    }
}

/// Text LED bar for terminal output, e.g. `[########------] -4.2 VU`
pub fn render_led_bar(reading: &Reading, width: usize) -> String {
    let filled = (normalized(reading.vu_value) * width as f32).round() as usize;
    let filled = filled.min(width);

    let mut bar = String::with_capacity(width + 20);
    bar.push('[');
    bar.extend(std::iter::repeat('#').take(filled));
    bar.extend(std::iter::repeat('-').take(width - filled));
    bar.push(']');
    bar.push_str(&format!(" {:+5.1} VU", reading.vu_value));
    if reading.peak_hit {
        bar.push_str(" PEAK");
    }
    bar
}

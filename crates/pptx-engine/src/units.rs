//! Length units used by DrawingML
//!
//! All geometry in a package is stored in English Metric Units (EMU).

use serde::{Deserialize, Serialize};

/// EMU per inch
pub const EMU_PER_INCH: i64 = 914_400;

/// EMU per typographic point
pub const EMU_PER_POINT: i64 = 12_700;

/// A length in English Metric Units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Emu(pub i64);

impl Emu {
    pub fn from_inches(inches: f64) -> Self {
        Emu((inches * EMU_PER_INCH as f64).round() as i64)
    }

    pub fn from_points(points: f64) -> Self {
        Emu((points * EMU_PER_POINT as f64).round() as i64)
    }

    /// Pixels at the given resolution
    pub fn from_pixels(pixels: u32, dpi: u32) -> Self {
        Emu(pixels as i64 * EMU_PER_INCH / dpi.max(1) as i64)
    }

    pub fn inches(self) -> f64 {
        self.0 as f64 / EMU_PER_INCH as f64
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl std::ops::Add for Emu {
    type Output = Emu;

    fn add(self, rhs: Emu) -> Emu {
        Emu(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Emu {
    type Output = Emu;

    fn sub(self, rhs: Emu) -> Emu {
        Emu(self.0 - rhs.0)
    }
}

impl std::fmt::Display for Emu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}\"", self.inches())
    }
}

/// Position and size of a shape, as stored in `a:xfrm`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub left: Emu,
    pub top: Emu,
    pub width: Emu,
    pub height: Emu,
}

impl Transform {
    pub fn from_inches(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left: Emu::from_inches(left),
            top: Emu::from_inches(top),
            width: Emu::from_inches(width),
            height: Emu::from_inches(height),
        }
    }

    pub fn right(&self) -> Emu {
        self.left + self.width
    }

    pub fn bottom(&self) -> Emu {
        self.top + self.height
    }

    pub fn center(&self) -> (Emu, Emu) {
        (
            Emu(self.left.0 + self.width.0 / 2),
            Emu(self.top.0 + self.height.0 / 2),
        )
    }
}

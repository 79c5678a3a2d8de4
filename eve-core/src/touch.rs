//! Touch data types

/// Value of the XY registers when nothing touches the screen
pub const NO_TOUCH: u32 = 0x8000_8000;

/// A calibrated touch position in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchPoint {
    pub x: i16,
    pub y: i16,
}

impl TouchPoint {
    /// Decode a packed XY register (x in the high half, y in the low half)
    pub const fn from_xy(raw: u32) -> Option<Self> {
        if raw == NO_TOUCH {
            return None;
        }
        Some(Self {
            x: (raw >> 16) as u16 as i16,
            y: raw as u16 as i16,
        })
    }
}

/// Touch transform matrix, six 16.16 fixed-point coefficients A..F
///
/// Screen coordinates are `x' = (A*x + B*y + C) >> 16` and
/// `y' = (D*x + E*y + F) >> 16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TouchTransform(pub [u32; 6]);

impl TouchTransform {
    /// Identity transform (chip reset value)
    pub const IDENTITY: TouchTransform = TouchTransform([0x1_0000, 0, 0, 0, 0x1_0000, 0]);
}

impl Default for TouchTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

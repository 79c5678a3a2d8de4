//! FT81x register map
//!
//! Registers sit in the `RAM_REG` window. Each one has a fixed width; the
//! driver transfers exactly that many bytes, little-endian.

use crate::memory::RAM_REG;

/// Data width of a register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Width {
    /// 8-bit register
    W8,
    /// 16-bit register
    W16,
    /// 32-bit register
    W32,
}

impl Width {
    /// Number of bytes on the wire
    pub const fn bytes(self) -> usize {
        match self {
            Width::W8 => 1,
            Width::W16 => 2,
            Width::W32 => 4,
        }
    }

    /// Mask of the bits a register of this width can hold
    pub const fn mask(self) -> u32 {
        match self {
            Width::W8 => 0xFF,
            Width::W16 => 0xFFFF,
            Width::W32 => 0xFFFF_FFFF,
        }
    }
}

/// A device register: address plus width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Register {
    /// 22-bit chip address
    pub address: u32,
    /// Transfer width
    pub width: Width,
}

impl Register {
    const fn new(offset: u32, width: Width) -> Self {
        Self {
            address: RAM_REG + offset,
            width,
        }
    }

    /// Encode a value as the little-endian bytes of this register
    ///
    /// Returns the buffer and the number of meaningful bytes in it.
    pub const fn encode(&self, value: u32) -> ([u8; 4], usize) {
        (value.to_le_bytes(), self.width.bytes())
    }

    /// Decode little-endian bytes read from this register
    pub fn decode(&self, bytes: &[u8]) -> u32 {
        let mut word = [0u8; 4];
        let n = self.width.bytes().min(bytes.len());
        word[..n].copy_from_slice(&bytes[..n]);
        u32::from_le_bytes(word)
    }
}

/// Register definitions
pub mod reg {
    use super::{Register, Width};

    /// Chip identification, reads 0x7C once the chip is awake
    pub const ID: Register = Register::new(0x000, Width::W8);
    /// Frame counter
    pub const FRAMES: Register = Register::new(0x004, Width::W32);
    /// Clock cycle counter
    pub const CLOCK: Register = Register::new(0x008, Width::W32);
    /// Main clock frequency
    pub const FREQUENCY: Register = Register::new(0x00C, Width::W32);
    /// Engine reset control; 0 means all engines running
    pub const CPURESET: Register = Register::new(0x020, Width::W8);
    /// Horizontal total cycle count
    pub const HCYCLE: Register = Register::new(0x02C, Width::W16);
    /// Horizontal display start offset
    pub const HOFFSET: Register = Register::new(0x030, Width::W16);
    /// Horizontal display pixel count
    pub const HSIZE: Register = Register::new(0x034, Width::W16);
    /// Horizontal sync fall offset
    pub const HSYNC0: Register = Register::new(0x038, Width::W16);
    /// Horizontal sync rise offset
    pub const HSYNC1: Register = Register::new(0x03C, Width::W16);
    /// Vertical total cycle count
    pub const VCYCLE: Register = Register::new(0x040, Width::W16);
    /// Vertical display start offset
    pub const VOFFSET: Register = Register::new(0x044, Width::W16);
    /// Vertical display line count
    pub const VSIZE: Register = Register::new(0x048, Width::W16);
    /// Vertical sync fall offset
    pub const VSYNC0: Register = Register::new(0x04C, Width::W16);
    /// Vertical sync rise offset
    pub const VSYNC1: Register = Register::new(0x050, Width::W16);
    /// Display-list swap control
    pub const DLSWAP: Register = Register::new(0x054, Width::W8);
    /// Screen rotation control
    pub const ROTATE: Register = Register::new(0x058, Width::W8);
    /// Output bit resolution
    pub const OUTBITS: Register = Register::new(0x05C, Width::W16);
    /// Output dither enable
    pub const DITHER: Register = Register::new(0x060, Width::W8);
    /// Output RGB signal swizzle
    pub const SWIZZLE: Register = Register::new(0x064, Width::W8);
    /// Output clock spreading enable
    pub const CSPREAD: Register = Register::new(0x068, Width::W8);
    /// PCLK polarity
    pub const PCLK_POL: Register = Register::new(0x06C, Width::W8);
    /// PCLK divisor; 0 disables the display output
    pub const PCLK: Register = Register::new(0x070, Width::W8);
    /// Tag query X coordinate
    pub const TAG_X: Register = Register::new(0x074, Width::W16);
    /// Tag query Y coordinate
    pub const TAG_Y: Register = Register::new(0x078, Width::W16);
    /// Tag query result
    pub const TAG: Register = Register::new(0x07C, Width::W8);
    /// Legacy GPIO direction
    pub const GPIO_DIR: Register = Register::new(0x090, Width::W8);
    /// Legacy GPIO read/write
    pub const GPIO: Register = Register::new(0x094, Width::W8);
    /// Extended GPIO direction
    pub const GPIOX_DIR: Register = Register::new(0x098, Width::W16);
    /// Extended GPIO read/write
    pub const GPIOX: Register = Register::new(0x09C, Width::W16);
    /// Interrupt flags, clear by read
    pub const INT_FLAGS: Register = Register::new(0x0A8, Width::W8);
    /// Global interrupt enable
    pub const INT_EN: Register = Register::new(0x0AC, Width::W8);
    /// Individual interrupt enable
    pub const INT_MASK: Register = Register::new(0x0B0, Width::W8);
    /// Backlight PWM frequency in Hz
    pub const PWM_HZ: Register = Register::new(0x0D0, Width::W16);
    /// Backlight PWM duty cycle, 0..=128
    pub const PWM_DUTY: Register = Register::new(0x0D4, Width::W8);
    /// Command ring read pointer
    pub const CMD_READ: Register = Register::new(0x0F8, Width::W32);
    /// Command ring write pointer
    pub const CMD_WRITE: Register = Register::new(0x0FC, Width::W32);
    /// Co-processor display-list write offset
    pub const CMD_DL: Register = Register::new(0x100, Width::W32);
    /// Touch sampling mode
    pub const TOUCH_MODE: Register = Register::new(0x104, Width::W8);
    /// Touch resistance threshold
    pub const TOUCH_RZTHRESH: Register = Register::new(0x118, Width::W16);
    /// Raw touch coordinates
    pub const TOUCH_RAW_XY: Register = Register::new(0x11C, Width::W32);
    /// Touch resistance
    pub const TOUCH_RZ: Register = Register::new(0x120, Width::W16);
    /// Calibrated touch coordinates, x in the high half
    pub const TOUCH_SCREEN_XY: Register = Register::new(0x124, Width::W32);
    /// Coordinates used for the tag lookup
    pub const TOUCH_TAG_XY: Register = Register::new(0x128, Width::W32);
    /// Tag under the touch point
    pub const TOUCH_TAG: Register = Register::new(0x12C, Width::W8);
    /// Touch transform coefficient A
    pub const TOUCH_TRANSFORM_A: Register = Register::new(0x150, Width::W32);
    /// Touch transform coefficient B
    pub const TOUCH_TRANSFORM_B: Register = Register::new(0x154, Width::W32);
    /// Touch transform coefficient C
    pub const TOUCH_TRANSFORM_C: Register = Register::new(0x158, Width::W32);
    /// Touch transform coefficient D
    pub const TOUCH_TRANSFORM_D: Register = Register::new(0x15C, Width::W32);
    /// Touch transform coefficient E
    pub const TOUCH_TRANSFORM_E: Register = Register::new(0x160, Width::W32);
    /// Touch transform coefficient F
    pub const TOUCH_TRANSFORM_F: Register = Register::new(0x164, Width::W32);
    /// Free space in the command ring (bulk write interface)
    pub const CMDB_SPACE: Register = Register::new(0x574, Width::W32);
    /// Bulk write port into the command ring
    pub const CMDB_WRITE: Register = Register::new(0x578, Width::W32);

    /// All six touch transform coefficients in order
    pub const TOUCH_TRANSFORM: [Register; 6] = [
        TOUCH_TRANSFORM_A,
        TOUCH_TRANSFORM_B,
        TOUCH_TRANSFORM_C,
        TOUCH_TRANSFORM_D,
        TOUCH_TRANSFORM_E,
        TOUCH_TRANSFORM_F,
    ];
}

/// Value of `ID` once the chip is ready
pub const CHIP_ID: u8 = 0x7C;

/// `DLSWAP` values
pub mod dlswap {
    /// Swap after the current scan line
    pub const LINE: u8 = 1;
    /// Swap at the next frame boundary
    pub const FRAME: u8 = 2;
}

/// `TOUCH_MODE` values
pub mod touch_mode {
    /// Touch sampling off
    pub const OFF: u8 = 0;
    /// Sample once on request
    pub const ONESHOT: u8 = 1;
    /// Sample every frame
    pub const FRAME: u8 = 2;
    /// Sample continuously
    pub const CONTINUOUS: u8 = 3;
}

/// `GPIO` bit driving the panel's DISP (display enable) line
pub const GPIO_DISP: u8 = 0x80;

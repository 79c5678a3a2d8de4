//! Configuration type definitions
//!
//! Panel timings, backlight, polling limits and the bring-up sequence
//! parameters. The firmware fills [`PanelConfig`] from its `panel.toml` at
//! build time; everything else has sensible defaults.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Display panel timing
///
/// All horizontal values are in pixel clocks, all vertical values in lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PanelConfig {
    /// Active width
    pub hsize: u16,
    /// Total clocks per line
    pub hcycle: u16,
    /// Start of the active line
    pub hoffset: u16,
    /// Start of the horizontal sync pulse
    pub hsync0: u16,
    /// End of the horizontal sync pulse
    pub hsync1: u16,
    /// Active height
    pub vsize: u16,
    /// Total lines per frame
    pub vcycle: u16,
    /// Start of the active frame
    pub voffset: u16,
    /// Start of the vertical sync pulse
    pub vsync0: u16,
    /// End of the vertical sync pulse
    pub vsync1: u16,
    /// Pixel clock divisor (system clock / pclk)
    pub pclk: u8,
    /// Active edge of PCLK (1 = falling)
    pub pclk_pol: u8,
    /// RGB output pin order
    pub swizzle: u8,
    /// Output dithering
    pub dither: u8,
    /// Output clock spreading
    pub cspread: u8,
}

impl PanelConfig {
    /// 4.3" 480x272 WQVGA panel
    pub const WQVGA_480X272: PanelConfig = PanelConfig {
        hsize: 480,
        hcycle: 928,
        hoffset: 88,
        hsync0: 0,
        hsync1: 48,
        vsize: 272,
        vcycle: 525,
        voffset: 32,
        vsync0: 0,
        vsync1: 3,
        pclk: 2,
        pclk_pol: 1,
        swizzle: 0,
        dither: 1,
        cspread: 1,
    };

    /// 5" 800x480 WVGA panel
    pub const WVGA_800X480: PanelConfig = PanelConfig {
        hsize: 800,
        hcycle: 928,
        hoffset: 88,
        hsync0: 0,
        hsync1: 48,
        vsize: 480,
        vcycle: 525,
        voffset: 32,
        vsync0: 0,
        vsync1: 3,
        pclk: 2,
        pclk_pol: 1,
        swizzle: 0,
        dither: 1,
        cspread: 0,
    };

    /// Check that the timings describe a drawable frame
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hsize == 0 || self.vsize == 0 {
            return Err(ConfigError::ZeroSize);
        }
        if self.hoffset as u32 + self.hsize as u32 > self.hcycle as u32 {
            return Err(ConfigError::LineOverflow);
        }
        if self.voffset as u32 + self.vsize as u32 > self.vcycle as u32 {
            return Err(ConfigError::FrameOverflow);
        }
        if self.hsync1 < self.hsync0 || self.vsync1 < self.vsync0 {
            return Err(ConfigError::SyncOrder);
        }
        if self.pclk == 0 {
            return Err(ConfigError::PixelClockDisabled);
        }
        if self.pclk_pol > 1 || self.dither > 1 || self.cspread > 1 || self.swizzle > 15 {
            return Err(ConfigError::FlagOutOfRange);
        }
        Ok(())
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self::WQVGA_480X272
    }
}

/// Backlight PWM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BacklightConfig {
    /// Duty cycle, 0 (off) to 128 (full)
    pub duty: u8,
    /// PWM frequency in Hz (250..=10000)
    pub frequency_hz: u16,
}

impl BacklightConfig {
    /// Largest duty value the chip accepts
    pub const MAX_DUTY: u8 = 128;
}

impl Default for BacklightConfig {
    fn default() -> Self {
        Self {
            duty: 127,
            frequency_hz: 250,
        }
    }
}

/// Bounded retry policy for polling the chip
///
/// Replaces open-ended spins: a wait gives up after `max_polls` reads
/// spaced `interval_us` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PollPolicy {
    /// Reads before giving up (at least one read is always made)
    pub max_polls: u32,
    /// Delay between reads in microseconds
    pub interval_us: u32,
}

impl PollPolicy {
    pub const fn new(max_polls: u32, interval_us: u32) -> Self {
        Self {
            max_polls,
            interval_us,
        }
    }

    /// Upper bound of the time a wait can take, in microseconds
    pub const fn budget_us(&self) -> u64 {
        self.max_polls as u64 * self.interval_us as u64
    }
}

impl Default for PollPolicy {
    /// One second at 100 µs spacing
    fn default() -> Self {
        Self::new(10_000, 100)
    }
}

/// Everything the bring-up sequence needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BringUpConfig {
    /// Panel timing
    pub panel: PanelConfig,
    /// Backlight level
    pub backlight: BacklightConfig,
    /// Time PD is held low, and the settle time after releasing it
    pub reset_pulse_ms: u32,
    /// Delay after the ACTIVE host command (chip needs at least 300 ms)
    pub wake_delay_ms: u32,
    /// Link clock until the chip reports ready
    pub bring_up_spi_hz: u32,
    /// Link clock once the chip is ready
    pub run_spi_hz: u32,
    /// Send CLKEXT before ACTIVE
    pub external_clock: bool,
    /// Touch resistance threshold, left at the chip default when `None`
    pub touch_rz_threshold: Option<u16>,
    /// Wait for `ID` to read 0x7C
    pub chip_id_poll: PollPolicy,
    /// Wait for `CPURESET` to read 0
    pub cpu_reset_poll: PollPolicy,
    /// Wait for the command ring to drain
    pub fifo_poll: PollPolicy,
}

impl BringUpConfig {
    /// Minimum wake delay after ACTIVE
    pub const MIN_WAKE_DELAY_MS: u32 = 300;

    /// Check the sequence parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.panel.validate()?;
        if self.backlight.duty > BacklightConfig::MAX_DUTY {
            return Err(ConfigError::DutyOutOfRange);
        }
        if self.wake_delay_ms < Self::MIN_WAKE_DELAY_MS {
            return Err(ConfigError::WakeDelayTooShort);
        }
        if self.bring_up_spi_hz > 11_000_000 {
            return Err(ConfigError::BringUpClockTooFast);
        }
        if self.chip_id_poll.max_polls == 0
            || self.cpu_reset_poll.max_polls == 0
            || self.fifo_poll.max_polls == 0
        {
            return Err(ConfigError::EmptyPollPolicy);
        }
        Ok(())
    }
}

impl Default for BringUpConfig {
    fn default() -> Self {
        Self {
            panel: PanelConfig::default(),
            backlight: BacklightConfig::default(),
            reset_pulse_ms: 20,
            wake_delay_ms: 500,
            bring_up_spi_hz: 8_000_000,
            run_spi_hz: 25_000_000,
            external_clock: false,
            touch_rz_threshold: None,
            chip_id_poll: PollPolicy::new(1_000, 1_000),
            cpu_reset_poll: PollPolicy::new(1_000, 1_000),
            fifo_poll: PollPolicy::default(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Width or height is zero
    ZeroSize,
    /// hoffset + hsize exceeds hcycle
    LineOverflow,
    /// voffset + vsize exceeds vcycle
    FrameOverflow,
    /// A sync pulse ends before it starts
    SyncOrder,
    /// PCLK of 0 would leave the display dark
    PixelClockDisabled,
    /// A single-bit flag holds something other than 0 or 1
    FlagOutOfRange,
    /// Backlight duty above 128
    DutyOutOfRange,
    /// Wake delay below the chip minimum
    WakeDelayTooShort,
    /// Bring-up clock above 11 MHz
    BringUpClockTooFast,
    /// A poll policy allows no reads
    EmptyPollPolicy,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::ZeroSize => "panel width and height must be non-zero",
            Self::LineOverflow => "hoffset + hsize exceeds hcycle",
            Self::FrameOverflow => "voffset + vsize exceeds vcycle",
            Self::SyncOrder => "sync pulse ends before it starts",
            Self::PixelClockDisabled => "pclk must be non-zero",
            Self::FlagOutOfRange => "pclk_pol, dither and cspread must be 0 or 1, swizzle 0..=15",
            Self::DutyOutOfRange => "backlight duty must be 0..=128",
            Self::WakeDelayTooShort => "wake delay must be at least 300 ms",
            Self::BringUpClockTooFast => "bring-up SPI clock must not exceed 11 MHz",
            Self::EmptyPollPolicy => "poll policies need at least one read",
        };
        f.write_str(msg)
    }
}

//! Host commands
//!
//! Power and clock directives use their own 3-byte framing instead of a
//! register address: `[command, parameter, 0x00]`.

/// Host command opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum HostCommand {
    /// Wake from standby/sleep, or leave power-down
    Active = 0x00,
    /// Stop the clock, keep the PLL
    Standby = 0x41,
    /// Stop clock and PLL
    Sleep = 0x42,
    /// Power down the core
    PowerDown = 0x43,
    /// Use the external crystal
    ClockExternal = 0x44,
    /// Use the internal oscillator
    ClockInternal = 0x48,
    /// Power down individual ROMs
    PowerDownRoms = 0x49,
    /// Select the system clock multiplier
    ClockSelect = 0x61,
    /// Pulse the core reset
    ResetPulse = 0x68,
}

impl HostCommand {
    /// Wire framing with a parameter byte
    pub const fn frame(self, param: u8) -> [u8; 3] {
        [self as u8, param, 0x00]
    }

    /// Look up a command by opcode
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(HostCommand::Active),
            0x41 => Some(HostCommand::Standby),
            0x42 => Some(HostCommand::Sleep),
            0x43 => Some(HostCommand::PowerDown),
            0x44 => Some(HostCommand::ClockExternal),
            0x48 => Some(HostCommand::ClockInternal),
            0x49 => Some(HostCommand::PowerDownRoms),
            0x61 => Some(HostCommand::ClockSelect),
            0x68 => Some(HostCommand::ResetPulse),
            _ => None,
        }
    }
}

/// Chip power state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PowerMode {
    /// Fully running
    #[default]
    Active,
    /// Clock gated, PLL running
    Standby,
    /// Clock and PLL stopped
    Sleep,
    /// Core powered down
    PowerDown,
}

impl PowerMode {
    /// Host command entering this mode
    pub const fn command(self) -> HostCommand {
        match self {
            PowerMode::Active => HostCommand::Active,
            PowerMode::Standby => HostCommand::Standby,
            PowerMode::Sleep => HostCommand::Sleep,
            PowerMode::PowerDown => HostCommand::PowerDown,
        }
    }
}

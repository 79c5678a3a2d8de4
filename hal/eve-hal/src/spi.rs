//! Serial link abstractions
//!
//! The EVE co-processor is driven over a full-duplex serial link where
//! every clocked byte is answered by one byte from the device. The protocol
//! layer only ever needs that single primitive.

/// Byte-level transport to the co-processor
///
/// Exchanges exactly one byte per call. The returned byte is only
/// meaningful while reading; writes ignore it. There is no buffering or
/// queuing: each call is a synchronous request/reply.
///
/// A hung link (clock halted, device absent) is not detected here. Callers
/// that poll for an expected value bound their own retries.
pub trait Transport {
    /// Error type for link operations
    type Error: core::fmt::Debug;

    /// Send `byte` and return the byte clocked in at the same time
    fn exchange(&mut self, byte: u8) -> Result<u8, Self::Error>;

    /// Send every byte in `data`, discarding what comes back
    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        for &byte in data {
            self.exchange(byte)?;
        }
        Ok(())
    }

    /// Fill `buf` with incoming bytes (clocks out zeros)
    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        for slot in buf.iter_mut() {
            *slot = self.exchange(0x00)?;
        }
        Ok(())
    }

    /// Wait until every byte written so far has left the bus
    ///
    /// Chip select must not be released before this returns. Transports
    /// whose writes complete synchronously keep the default no-op.
    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Change the link clock
    ///
    /// The co-processor only accepts a slow clock until it has finished
    /// booting; afterwards the link can run at full speed. Transports that
    /// cannot retune themselves keep the default no-op.
    fn set_frequency(&mut self, _hz: u32) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Link settings handed to the board's SPI peripheral
///
/// The co-processor samples on the leading edge with the clock idling low
/// (mode 0) at both clock rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
    /// Clock polarity
    pub polarity: Polarity,
    /// Clock phase
    pub phase: Phase,
}

impl SpiConfig {
    /// Highest clock the co-processor tolerates before it is fully awake
    pub const MAX_BRING_UP_HZ: u32 = 11_000_000;

    /// Configuration for the boot phase
    pub const fn bring_up() -> Self {
        Self {
            frequency: 8_000_000,
            polarity: Polarity::IdleLow,
            phase: Phase::CaptureOnFirstTransition,
        }
    }

    /// Configuration once the chip reports ready
    pub const fn run() -> Self {
        Self {
            frequency: 25_000_000,
            polarity: Polarity::IdleLow,
            phase: Phase::CaptureOnFirstTransition,
        }
    }
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self::bring_up()
    }
}

/// Clock level between transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    IdleLow,
    IdleHigh,
}

/// Clock edge on which the device samples MOSI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Leading edge
    CaptureOnFirstTransition,
    /// Trailing edge
    CaptureOnSecondTransition,
}

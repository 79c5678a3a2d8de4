//! SPI command-streaming driver for FT81x EVE display co-processors
//!
//! [`Eve`] owns the serial link, the chip-select line and a delay source,
//! and provides:
//!
//! - Register and memory access, one chip-select transaction each
//! - Command bursts into the co-processor ring ([`CommandBurst`])
//! - Flow control against the ring read/write pointers
//! - The one-time bring-up sequence and blank-screen display list
//! - Touch readout and calibration
//!
//! Every wait is bounded by a [`PollPolicy`](eve_core::config::PollPolicy)
//! and reports [`EveError::Timeout`] instead of spinning forever.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

mod bringup;
mod burst;
mod bus;
mod display_list;
mod error;
mod flow;
mod touch;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

use eve_core::config::PollPolicy;
use eve_hal::{ChipSelect, Transport};
use embedded_hal::delay::DelayNs;

pub use burst::CommandBurst;
pub use display_list::DisplayListWriter;
pub use error::{EveError, WaitTarget};

/// Driver for one EVE co-processor
///
/// `T` is the serial link, `CS` the chip-select line, `D` the delay source
/// used between polls and during power sequencing.
pub struct Eve<T, CS, D> {
    transport: T,
    cs: CS,
    delay: D,
    poll: PollPolicy,
    /// Local mirror of the ring write pointer
    cmd_offset: u16,
}

impl<T: Transport, CS: ChipSelect, D: DelayNs> Eve<T, CS, D> {
    /// Create a driver; chip select is released immediately
    pub fn new(transport: T, mut cs: CS, delay: D) -> Self {
        cs.deselect();
        Self {
            transport,
            cs,
            delay,
            poll: PollPolicy::default(),
            cmd_offset: 0,
        }
    }

    /// Replace the policy used when waiting for the command ring
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Policy used when waiting for the command ring
    pub fn poll_policy(&self) -> PollPolicy {
        self.poll
    }

    /// Ring offset where the next burst will start
    pub fn cmd_offset(&self) -> u16 {
        self.cmd_offset
    }

    /// Borrow the delay source
    pub fn delay(&mut self) -> &mut D {
        &mut self.delay
    }

    /// Tear the driver down into its parts
    pub fn release(self) -> (T, CS, D) {
        (self.transport, self.cs, self.delay)
    }
}

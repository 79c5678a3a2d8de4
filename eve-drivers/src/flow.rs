//! Flow control against the command ring
//!
//! The co-processor consumes the ring on its own; the only way to learn how
//! far it got is to poll `CMD_READ`. When it equals `CMD_WRITE` the ring is
//! empty and that value is where the next burst starts.
//!
//! A read pointer of 0xFFF means the co-processor hit an invalid command and
//! stopped. Waits report [`EveError::CoprocessorFault`] right away; the
//! caller decides whether to [`recover_coprocessor`](Eve::recover_coprocessor).

use embedded_hal::delay::DelayNs;
use eve_core::config::PollPolicy;
use eve_core::registers::{reg, Register};
use eve_core::ring;
use eve_hal::{ChipSelect, Transport};

use crate::{Eve, EveError, WaitTarget};

impl<T: Transport, CS: ChipSelect, D: DelayNs> Eve<T, CS, D> {
    /// Wait until the co-processor has executed everything queued
    ///
    /// Returns the ring offset where the next burst starts and stores it as
    /// the local write-pointer mirror.
    pub fn wait_cmd_fifo_empty(&mut self) -> Result<u16, EveError<T::Error>> {
        self.wait_cmd_fifo_empty_with(self.poll)
    }

    /// Same as [`wait_cmd_fifo_empty`](Self::wait_cmd_fifo_empty) with an
    /// explicit policy, for commands known to run long
    pub fn wait_cmd_fifo_empty_with(&mut self, policy: PollPolicy) -> Result<u16, EveError<T::Error>> {
        for attempt in 0..policy.max_polls.max(1) {
            let read = self.read_register(reg::CMD_READ)?;
            if ring::is_fault(read) {
                #[cfg(feature = "defmt")]
                defmt::error!("co-processor fault");
                return Err(EveError::CoprocessorFault);
            }
            let write = self.read_register(reg::CMD_WRITE)?;
            if read & 0xFFF == write & 0xFFF {
                self.cmd_offset = (write & 0xFFF) as u16;
                return Ok(self.cmd_offset);
            }
            if attempt + 1 < policy.max_polls {
                self.delay.delay_us(policy.interval_us);
            }
        }
        #[cfg(feature = "defmt")]
        defmt::warn!("command fifo did not drain after {} polls", policy.max_polls);
        Err(EveError::Timeout(WaitTarget::CommandFifo))
    }

    /// Bytes that can be queued right now without overrunning the consumer
    pub fn cmd_fifo_free_space(&mut self) -> Result<u16, EveError<T::Error>> {
        let read = self.read_register(reg::CMD_READ)?;
        if ring::is_fault(read) {
            return Err(EveError::CoprocessorFault);
        }
        let write = self.read_register(reg::CMD_WRITE)?;
        Ok(ring::free_space(
            (read & 0xFFF) as u16,
            (write & 0xFFF) as u16,
        ))
    }

    /// Reset the co-processor after a fault and empty the ring
    ///
    /// Holds the co-processor in reset, zeroes both ring pointers and the
    /// display-list offset, then lets it run again.
    pub fn recover_coprocessor(&mut self) -> Result<(), EveError<T::Error>> {
        #[cfg(feature = "defmt")]
        defmt::warn!("resetting co-processor");
        self.write_register(reg::CPURESET, 1)?;
        self.write_register(reg::CMD_READ, 0)?;
        self.write_register(reg::CMD_WRITE, 0)?;
        self.write_register(reg::CMD_DL, 0)?;
        self.write_register(reg::CPURESET, 0)?;
        self.cmd_offset = 0;
        Ok(())
    }

    /// Poll `register` until it reads `expected`
    pub fn wait_register(
        &mut self,
        register: Register,
        expected: u32,
        policy: PollPolicy,
        target: WaitTarget,
    ) -> Result<(), EveError<T::Error>> {
        for attempt in 0..policy.max_polls.max(1) {
            if self.read_register(register)? == expected {
                return Ok(());
            }
            if attempt + 1 < policy.max_polls {
                self.delay.delay_us(policy.interval_us);
            }
        }
        #[cfg(feature = "defmt")]
        defmt::warn!("timed out waiting for {}", target);
        Err(EveError::Timeout(target))
    }
}

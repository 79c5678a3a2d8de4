//! Register and memory access
//!
//! Every operation here is one self-contained chip-select transaction:
//! address phase, optional dummy byte, data, release. The [`Selected`]
//! guard releases chip select on every exit path, errors included.

use embedded_hal::delay::DelayNs;
use eve_core::host::{HostCommand, PowerMode};
use eve_core::memory;
use eve_core::registers::{reg, Register};
use eve_hal::{ChipSelect, Transport};

use crate::{Eve, EveError};

/// Chip select held for the lifetime of the guard
///
/// The link is flushed before chip select is released.
pub(crate) struct Selected<'a, T: Transport, CS: ChipSelect> {
    pub(crate) link: &'a mut T,
    cs: &'a mut CS,
    flushed: bool,
}

impl<'a, T: Transport, CS: ChipSelect> Selected<'a, T, CS> {
    pub(crate) fn new(link: &'a mut T, cs: &'a mut CS) -> Self {
        cs.select();
        Self {
            link,
            cs,
            flushed: false,
        }
    }

    /// Flush the link and end the transaction
    pub(crate) fn release(mut self) -> Result<(), T::Error> {
        self.link.flush()?;
        self.flushed = true;
        Ok(())
    }
}

impl<T: Transport, CS: ChipSelect> Drop for Selected<'_, T, CS> {
    fn drop(&mut self) {
        if !self.flushed {
            // error path; the transaction is already lost
            let _ = self.link.flush();
        }
        self.cs.deselect();
    }
}

impl<T: Transport, CS: ChipSelect, D: DelayNs> Eve<T, CS, D> {
    pub(crate) fn select(&mut self) -> Selected<'_, T, CS> {
        Selected::new(&mut self.transport, &mut self.cs)
    }

    /// Write `data` starting at `address`, auto-incrementing
    pub fn write_memory(&mut self, address: u32, data: &[u8]) -> Result<(), EveError<T::Error>> {
        let mut bus = self.select();
        bus.link.write_all(&memory::write_header(address))?;
        bus.link.write_all(data)?;
        bus.release()?;
        Ok(())
    }

    /// Fill `buf` from `address` onwards
    pub fn read_memory(&mut self, address: u32, buf: &mut [u8]) -> Result<(), EveError<T::Error>> {
        let mut bus = self.select();
        bus.link.write_all(&memory::read_header(address))?;
        bus.link.read_into(buf)?;
        bus.release()?;
        Ok(())
    }

    pub fn wr8(&mut self, address: u32, value: u8) -> Result<(), EveError<T::Error>> {
        self.write_memory(address, &[value])
    }

    pub fn wr16(&mut self, address: u32, value: u16) -> Result<(), EveError<T::Error>> {
        self.write_memory(address, &value.to_le_bytes())
    }

    pub fn wr32(&mut self, address: u32, value: u32) -> Result<(), EveError<T::Error>> {
        self.write_memory(address, &value.to_le_bytes())
    }

    pub fn rd8(&mut self, address: u32) -> Result<u8, EveError<T::Error>> {
        let mut buf = [0u8; 1];
        self.read_memory(address, &mut buf)?;
        Ok(buf[0])
    }

    pub fn rd16(&mut self, address: u32) -> Result<u16, EveError<T::Error>> {
        let mut buf = [0u8; 2];
        self.read_memory(address, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn rd32(&mut self, address: u32) -> Result<u32, EveError<T::Error>> {
        let mut buf = [0u8; 4];
        self.read_memory(address, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Write a register using its native width
    ///
    /// Bits above the register width are dropped.
    pub fn write_register(&mut self, register: Register, value: u32) -> Result<(), EveError<T::Error>> {
        let (bytes, n) = register.encode(value);
        self.write_memory(register.address, &bytes[..n])
    }

    /// Read a register using its native width
    pub fn read_register(&mut self, register: Register) -> Result<u32, EveError<T::Error>> {
        let mut bytes = [0u8; 4];
        let n = register.width.bytes();
        self.read_memory(register.address, &mut bytes[..n])?;
        Ok(register.decode(&bytes[..n]))
    }

    /// Read-modify-write: set `bits` in a register
    pub fn set_register_bits(&mut self, register: Register, bits: u32) -> Result<u32, EveError<T::Error>> {
        let value = self.read_register(register)? | bits;
        self.write_register(register, value)?;
        Ok(value)
    }

    /// Send a host command (`[cmd, param, 0x00]`)
    pub fn host_command(&mut self, cmd: HostCommand, param: u8) -> Result<(), EveError<T::Error>> {
        let mut bus = self.select();
        bus.link.write_all(&cmd.frame(param))?;
        bus.release()?;
        Ok(())
    }

    /// Move the chip to another power state
    pub fn set_power_mode(&mut self, mode: PowerMode) -> Result<(), EveError<T::Error>> {
        #[cfg(feature = "defmt")]
        defmt::debug!("power mode {}", mode);
        self.host_command(mode.command(), 0)
    }

    /// Set the backlight duty cycle (clamped to 0..=128)
    pub fn set_backlight(&mut self, duty: u8) -> Result<(), EveError<T::Error>> {
        self.write_register(reg::PWM_DUTY, duty.min(128) as u32)
    }
}

#[cfg(test)]
mod tests {
    use eve_core::host::{HostCommand, PowerMode};
    use eve_core::registers::reg;
    use proptest::prelude::*;

    use crate::sim::{SimEve, SimError};
    use crate::{Eve, EveError};

    #[test]
    fn test_register_roundtrip_by_width() {
        let sim = SimEve::ready();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        eve.write_register(reg::PWM_DUTY, 100).unwrap();
        eve.write_register(reg::HSIZE, 480).unwrap();
        eve.write_register(reg::TOUCH_TRANSFORM_A, 0xDEAD_BEEF).unwrap();

        assert_eq!(eve.read_register(reg::PWM_DUTY).unwrap(), 100);
        assert_eq!(eve.read_register(reg::HSIZE).unwrap(), 480);
        assert_eq!(eve.read_register(reg::TOUCH_TRANSFORM_A).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn test_write_truncates_to_width() {
        let sim = SimEve::ready();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        eve.write_register(reg::VSIZE, 0x0012_0110).unwrap();
        assert_eq!(sim.last_transaction_len(), 3 + 2);
        assert_eq!(sim.reg(reg::VSIZE), 0x0110);
        // neighbour untouched
        assert_eq!(sim.reg(reg::VSYNC0), 0);
    }

    #[test]
    fn test_little_endian_on_the_wire() {
        let sim = SimEve::ready();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        eve.wr32(0x0000_0100, 0x1234_5678).unwrap();
        let mut raw = [0u8; 4];
        sim.read_memory(0x100, &mut raw);
        assert_eq!(raw, [0x78, 0x56, 0x34, 0x12]);
        assert_eq!(eve.rd16(0x0000_0102).unwrap(), 0x1234);
        assert_eq!(eve.rd8(0x0000_0101).unwrap(), 0x56);
    }

    #[test]
    fn test_each_access_is_one_transaction() {
        let sim = SimEve::ready();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        let before = sim.transactions();
        eve.rd32(reg::CMD_READ.address).unwrap();
        assert_eq!(sim.transactions(), before + 1);
        // address phase + dummy + 4 data bytes
        assert_eq!(sim.last_transaction_len(), 8);
        assert!(!sim.cs_selected());
        assert_eq!(sim.stray_bytes(), 0);
    }

    #[test]
    fn test_link_flushed_before_release() {
        let sim = SimEve::new();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        eve.wr8(reg::PWM_DUTY.address, 64).unwrap();
        eve.rd16(reg::HSIZE.address).unwrap();
        eve.write_memory(0, &[1, 2, 3, 4, 5]).unwrap();
        eve.host_command(HostCommand::Active, 0).unwrap();
        assert_eq!(sim.transactions(), 4);
        assert_eq!(sim.unflushed_releases(), 0);

        sim.fail_after(1);
        assert!(eve.wr32(reg::PWM_HZ.address, 1000).is_err());
        assert_eq!(sim.unflushed_releases(), 0);
    }

    #[test]
    fn test_host_command_framing() {
        let sim = SimEve::new();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        eve.host_command(HostCommand::ClockExternal, 0).unwrap();
        eve.set_power_mode(PowerMode::Active).unwrap();
        eve.set_power_mode(PowerMode::Standby).unwrap();
        assert_eq!(sim.last_transaction_len(), 3);
        assert_eq!(
            sim.host_commands().as_slice(),
            &[(0x44, 0x00), (0x00, 0x00), (0x41, 0x00)]
        );
    }

    #[test]
    fn test_chip_select_released_on_error() {
        let sim = SimEve::ready();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        sim.fail_after(2);
        let err = eve.wr32(reg::PWM_HZ.address, 1000).unwrap_err();
        assert_eq!(err, EveError::Transport(SimError::LinkDown));
        assert!(!sim.cs_selected());
    }

    #[test]
    fn test_set_register_bits() {
        let sim = SimEve::ready();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        sim.set_reg(reg::GPIO, 0x03);
        assert_eq!(eve.set_register_bits(reg::GPIO, 0x80).unwrap(), 0x83);
        assert_eq!(sim.reg(reg::GPIO), 0x83);
    }

    #[test]
    fn test_backlight_is_clamped() {
        let sim = SimEve::ready();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        eve.set_backlight(255).unwrap();
        assert_eq!(sim.reg(reg::PWM_DUTY), 128);
    }

    proptest! {
        #[test]
        fn prop_ram_g_roundtrip(addr in 0u32..4000, value in any::<u32>()) {
            let sim = SimEve::ready();
            let (link, cs) = sim.link();
            let mut eve = Eve::new(link, cs, sim.delay());
            eve.wr32(addr, value).unwrap();
            prop_assert_eq!(eve.rd32(addr).unwrap(), value);
            eve.wr16(addr, value as u16).unwrap();
            prop_assert_eq!(eve.rd16(addr).unwrap(), value as u16);
        }
    }
}

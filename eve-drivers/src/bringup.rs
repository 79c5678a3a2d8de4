//! One-time power-up sequence
//!
//! 1. Pulse PD low, let the chip settle
//! 2. Optionally select the external clock, then send `ACTIVE`
//! 3. Wait for `ID` to read 0x7C and `CPURESET` to read 0
//! 4. Program panel timings, enable the display pin, backlight, touch
//! 5. Show a blank display list
//! 6. Raise the link to the run clock and sync the ring offset

use embedded_hal::delay::DelayNs;
use eve_core::config::{BringUpConfig, PanelConfig};
use eve_core::host::HostCommand;
use eve_core::registers::{reg, CHIP_ID, GPIO_DISP};
use eve_hal::{ChipSelect, PowerDown, Transport};

use crate::{Eve, EveError, WaitTarget};

impl<T: Transport, CS: ChipSelect, D: DelayNs> Eve<T, CS, D> {
    /// Power the chip up and leave it showing a blank screen
    ///
    /// `pd` is only used during the reset pulse.
    pub fn bring_up<PD: PowerDown>(
        &mut self,
        pd: &mut PD,
        config: &BringUpConfig,
    ) -> Result<(), EveError<T::Error>> {
        self.transport.set_frequency(config.bring_up_spi_hz)?;
        self.poll = config.fifo_poll;

        pd.assert_reset();
        self.delay.delay_ms(config.reset_pulse_ms);
        pd.release_reset();
        self.delay.delay_ms(config.reset_pulse_ms);

        if config.external_clock {
            self.host_command(HostCommand::ClockExternal, 0)?;
        }
        self.host_command(HostCommand::Active, 0)?;
        self.delay.delay_ms(config.wake_delay_ms);

        self.wait_register(reg::ID, CHIP_ID as u32, config.chip_id_poll, WaitTarget::ChipId)?;
        self.wait_register(reg::CPURESET, 0, config.cpu_reset_poll, WaitTarget::CpuReset)?;
        #[cfg(feature = "defmt")]
        defmt::info!("EVE chip answered");

        self.configure_panel(&config.panel)?;
        self.set_register_bits(reg::GPIO, GPIO_DISP as u32)?;
        self.write_register(reg::PCLK, config.panel.pclk as u32)?;
        self.write_register(reg::PWM_HZ, config.backlight.frequency_hz as u32)?;
        self.set_backlight(config.backlight.duty)?;
        if let Some(threshold) = config.touch_rz_threshold {
            self.write_register(reg::TOUCH_RZTHRESH, threshold as u32)?;
        }

        self.write_blank_screen()?;

        self.transport.set_frequency(config.run_spi_hz)?;
        let _offset = self.wait_cmd_fifo_empty()?;
        #[cfg(feature = "defmt")]
        defmt::info!(
            "EVE ready: {}x{}, ring at {}",
            config.panel.hsize,
            config.panel.vsize,
            _offset
        );
        Ok(())
    }

    /// Write the display timing registers
    ///
    /// `PCLK` is left alone; writing it starts scan-out.
    pub fn configure_panel(&mut self, panel: &PanelConfig) -> Result<(), EveError<T::Error>> {
        let timings = [
            (reg::HCYCLE, panel.hcycle),
            (reg::HOFFSET, panel.hoffset),
            (reg::HSYNC0, panel.hsync0),
            (reg::HSYNC1, panel.hsync1),
            (reg::VCYCLE, panel.vcycle),
            (reg::VOFFSET, panel.voffset),
            (reg::VSYNC0, panel.vsync0),
            (reg::VSYNC1, panel.vsync1),
            (reg::HSIZE, panel.hsize),
            (reg::VSIZE, panel.vsize),
        ];
        for (register, value) in timings {
            self.write_register(register, value as u32)?;
        }
        let flags = [
            (reg::SWIZZLE, panel.swizzle),
            (reg::PCLK_POL, panel.pclk_pol),
            (reg::CSPREAD, panel.cspread),
            (reg::DITHER, panel.dither),
        ];
        for (register, value) in flags {
            self.write_register(register, value as u32)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use eve_core::config::{BringUpConfig, PanelConfig, PollPolicy};
    use eve_core::registers::reg;

    use crate::sim::SimEve;
    use crate::{Eve, EveError, WaitTarget};

    #[test]
    fn test_bring_up_sequence() {
        let sim = SimEve::new();
        sim.set_id_ready_after(3);
        let (link, cs) = sim.link();
        let mut pd = sim.power_down();
        let mut eve = Eve::new(link, cs, sim.delay());

        let config = BringUpConfig::default();
        eve.bring_up(&mut pd, &config).unwrap();

        assert_eq!(sim.resets(), 1);
        assert!(sim.is_awake());
        assert_eq!(sim.host_commands().as_slice(), &[(0x00, 0x00)]);

        assert_eq!(sim.reg(reg::HSIZE), 480);
        assert_eq!(sim.reg(reg::HCYCLE), 928);
        assert_eq!(sim.reg(reg::HOFFSET), 88);
        assert_eq!(sim.reg(reg::HSYNC1), 48);
        assert_eq!(sim.reg(reg::VSIZE), 272);
        assert_eq!(sim.reg(reg::VCYCLE), 525);
        assert_eq!(sim.reg(reg::VOFFSET), 32);
        assert_eq!(sim.reg(reg::VSYNC1), 3);
        assert_eq!(sim.reg(reg::PCLK_POL), 1);
        assert_eq!(sim.reg(reg::PCLK), 2);
        assert_eq!(sim.reg(reg::GPIO) & 0x80, 0x80);
        assert_eq!(sim.reg(reg::PWM_HZ), 250);
        assert_eq!(sim.reg(reg::PWM_DUTY), 127);

        assert_eq!(sim.dl_word(0), 0x0200_0000);
        assert_eq!(sim.dl_word(1), 0x2600_0007);
        assert_eq!(sim.dl_word(2), 0x0000_0000);
        assert_eq!(sim.dl_swaps(), 1);

        assert_eq!(sim.spi_hz(), 25_000_000);
        assert_eq!(eve.cmd_offset(), 0);
        assert_eq!(eve.poll_policy(), config.fifo_poll);
        // 20 + 20 + 500 ms of sequencing, three 1 ms id polls
        assert_eq!(sim.elapsed_ns(), 543_000_000);
        assert!(!sim.cs_selected());
        assert_eq!(sim.unflushed_releases(), 0);
    }

    #[test]
    fn test_external_clock_and_touch_threshold() {
        let sim = SimEve::new();
        let (link, cs) = sim.link();
        let mut pd = sim.power_down();
        let mut eve = Eve::new(link, cs, sim.delay());

        let config = BringUpConfig {
            external_clock: true,
            touch_rz_threshold: Some(1200),
            panel: PanelConfig::WVGA_800X480,
            ..BringUpConfig::default()
        };
        eve.bring_up(&mut pd, &config).unwrap();

        assert_eq!(sim.host_commands().as_slice(), &[(0x44, 0x00), (0x00, 0x00)]);
        assert_eq!(sim.reg(reg::TOUCH_RZTHRESH), 1200);
        assert_eq!(sim.reg(reg::HSIZE), 800);
        assert_eq!(sim.reg(reg::CSPREAD), 0);
    }

    #[test]
    fn test_silent_chip_times_out() {
        let sim = SimEve::new();
        sim.set_id_ready_after(u32::MAX);
        let (link, cs) = sim.link();
        let mut pd = sim.power_down();
        let mut eve = Eve::new(link, cs, sim.delay());

        let config = BringUpConfig {
            chip_id_poll: PollPolicy::new(3, 10),
            ..BringUpConfig::default()
        };
        assert_eq!(
            eve.bring_up(&mut pd, &config),
            Err(EveError::Timeout(WaitTarget::ChipId))
        );
        // never got as far as the panel
        assert_eq!(sim.reg(reg::HSIZE), 0);
        assert_eq!(sim.spi_hz(), 8_000_000);
    }

    #[test]
    fn test_bring_up_repeats_after_reset() {
        let sim = SimEve::new();
        let (link, cs) = sim.link();
        let mut pd = sim.power_down();
        let mut eve = Eve::new(link, cs, sim.delay());

        let config = BringUpConfig::default();
        eve.bring_up(&mut pd, &config).unwrap();
        eve.bring_up(&mut pd, &config).unwrap();
        assert_eq!(sim.resets(), 2);
        assert_eq!(sim.dl_swaps(), 2);
    }
}

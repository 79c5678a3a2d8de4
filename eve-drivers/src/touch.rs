//! Touch readout and calibration

use embedded_hal::delay::DelayNs;
use eve_core::cmd::Command;
use eve_core::config::PollPolicy;
use eve_core::memory::RAM_CMD;
use eve_core::registers::{reg, touch_mode};
use eve_core::ring;
use eve_core::touch::{TouchPoint, TouchTransform};
use eve_hal::{ChipSelect, Transport};

use crate::{Eve, EveError};

impl<T: Transport, CS: ChipSelect, D: DelayNs> Eve<T, CS, D> {
    /// Calibrated touch position, `None` while nothing touches the screen
    pub fn touch_point(&mut self) -> Result<Option<TouchPoint>, EveError<T::Error>> {
        let raw = self.read_register(reg::TOUCH_SCREEN_XY)?;
        Ok(TouchPoint::from_xy(raw))
    }

    /// Tag of the object under the finger (0 = none)
    pub fn touch_tag(&mut self) -> Result<u8, EveError<T::Error>> {
        Ok(self.read_register(reg::TOUCH_TAG)? as u8)
    }

    /// Set the touch sampling mode
    pub fn set_touch_mode(&mut self, mode: u8) -> Result<(), EveError<T::Error>> {
        self.write_register(reg::TOUCH_MODE, (mode & touch_mode::CONTINUOUS) as u32)
    }

    pub fn touch_transform(&mut self) -> Result<TouchTransform, EveError<T::Error>> {
        let mut coeffs = [0u32; 6];
        for (coeff, register) in coeffs.iter_mut().zip(reg::TOUCH_TRANSFORM) {
            *coeff = self.read_register(register)?;
        }
        Ok(TouchTransform(coeffs))
    }

    /// Restore a transform saved from an earlier calibration
    pub fn set_touch_transform(&mut self, transform: &TouchTransform) -> Result<(), EveError<T::Error>> {
        for (coeff, register) in transform.0.iter().zip(reg::TOUCH_TRANSFORM) {
            self.write_register(register, *coeff)?;
        }
        Ok(())
    }

    /// Run the co-processor calibration routine
    ///
    /// The routine waits for the user to tap three dots, so `policy` should
    /// allow tens of seconds. Returns whether the chip reported success.
    pub fn calibrate(&mut self, policy: PollPolicy) -> Result<bool, EveError<T::Error>> {
        let mut burst = self.begin_burst()?;
        burst.push(&Command::DlStart)?;
        let at = burst.push(&Command::Calibrate)?;
        burst.commit_with(policy)?;

        let slot = ring::increment_offset(at, 4);
        let result = self.rd32(RAM_CMD + slot as u32)?;
        #[cfg(feature = "defmt")]
        defmt::info!("touch calibration result {}", result);
        Ok(result != 0)
    }
}

#[cfg(test)]
mod tests {
    use eve_core::config::PollPolicy;
    use eve_core::registers::reg;
    use eve_core::touch::{TouchPoint, TouchTransform};

    use crate::sim::SimEve;
    use crate::Eve;

    #[test]
    fn test_touch_point_and_tag() {
        let sim = SimEve::ready();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        assert_eq!(eve.touch_point().unwrap(), None);
        assert_eq!(eve.touch_tag().unwrap(), 0);

        sim.touch(120, 45, 7);
        assert_eq!(eve.touch_point().unwrap(), Some(TouchPoint { x: 120, y: 45 }));
        assert_eq!(eve.touch_tag().unwrap(), 7);

        sim.release_touch();
        assert_eq!(eve.touch_point().unwrap(), None);
    }

    #[test]
    fn test_transform_roundtrip() {
        let sim = SimEve::ready();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        assert_eq!(eve.touch_transform().unwrap(), TouchTransform::IDENTITY);
        let saved = TouchTransform([0x0000_8A3C, 0xFFFF_FF12, 0xFFF4_2E10, 0x44, 0xFFFF_6F1B, 0x0112_3456]);
        eve.set_touch_transform(&saved).unwrap();
        assert_eq!(eve.touch_transform().unwrap(), saved);
        assert_eq!(sim.reg(reg::TOUCH_TRANSFORM_F), 0x0112_3456);
    }

    #[test]
    fn test_calibrate_reads_result_slot() {
        let sim = SimEve::ready();
        sim.set_reg(reg::CMD_READ, 4088);
        sim.set_reg(reg::CMD_WRITE, 4088);
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        // opcode at 4092, result slot wraps to 0
        assert!(eve.calibrate(PollPolicy::new(10, 1)).unwrap());
        assert_eq!(eve.cmd_offset(), 4);

        sim.set_calibrate_result(0);
        assert!(!eve.calibrate(PollPolicy::new(10, 1)).unwrap());
    }

    #[test]
    fn test_touch_mode_is_masked() {
        let sim = SimEve::ready();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        eve.set_touch_mode(0xFF).unwrap();
        assert_eq!(sim.reg(reg::TOUCH_MODE), 3);
    }
}

//! Flashing dot

use embedded_hal::delay::DelayNs;
use eve_core::dl::{DlCmd, Primitive, Rgb};
use eve_drivers::{CommandBurst, EveError};
use eve_hal::{ChipSelect, Transport};

use crate::Screen;

/// A dot on a black background, red on even frames and black on odd ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashingDot {
    /// Center in pixels
    pub x: i16,
    pub y: i16,
    /// Radius in pixels
    pub size: u16,
    pub color: Rgb,
    lit: bool,
}

impl FlashingDot {
    pub const fn new(x: i16, y: i16, size: u16) -> Self {
        Self {
            x,
            y,
            size,
            color: Rgb::RED,
            lit: true,
        }
    }

    /// Whether the next frame shows the dot lit
    pub fn is_lit(&self) -> bool {
        self.lit
    }
}

impl Default for FlashingDot {
    fn default() -> Self {
        Self::new(100, 100, 20)
    }
}

impl Screen for FlashingDot {
    fn draw<T: Transport, CS: ChipSelect, D: DelayNs>(
        &mut self,
        frame: &mut CommandBurst<'_, T, CS, D>,
    ) -> Result<(), EveError<T::Error>> {
        let color = if self.lit { self.color } else { Rgb::BLACK };
        frame.push_dl(DlCmd::clear_color_rgb(0, 0, 0))?;
        frame.push_dl(DlCmd::clear(true, true, true))?;
        frame.push_dl(DlCmd::color_rgb(color.r, color.g, color.b))?;
        frame.push_dl(DlCmd::point_size(self.size.saturating_mul(16)))?;
        frame.push_dl(DlCmd::begin(Primitive::Points))?;
        frame.push_dl(DlCmd::vertex2f(
            self.x.saturating_mul(16),
            self.y.saturating_mul(16),
        ))?;
        frame.push_dl(DlCmd::end())?;
        self.lit = !self.lit;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render;
    use eve_core::registers::reg;
    use eve_drivers::sim::SimEve;
    use eve_drivers::Eve;

    #[test]
    fn test_dot_frame_is_forty_bytes() {
        let sim = SimEve::ready();
        sim.set_reg(reg::CMD_READ, 4076);
        sim.set_reg(reg::CMD_WRITE, 4076);
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        let mut dot = FlashingDot::default();
        // 4076 + 40 wraps
        assert_eq!(render(&mut eve, &mut dot).unwrap(), 20);
        assert_eq!(sim.last_burst().len(), 40);
        assert_eq!(sim.dl_word(2), DlCmd::color_rgb(0xFF, 0, 0).0);
        assert_eq!(sim.dl_word(5), DlCmd::vertex2f(1600, 1600).0);
    }

    #[test]
    fn test_dot_alternates() {
        let sim = SimEve::ready();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        let mut dot = FlashingDot::default();
        render(&mut eve, &mut dot).unwrap();
        assert!(!dot.is_lit());
        render(&mut eve, &mut dot).unwrap();
        assert_eq!(sim.dl_word(2), DlCmd::color_rgb(0, 0, 0).0);
        assert!(dot.is_lit());
        assert_eq!(sim.cmd_swaps(), 2);
        assert_eq!(eve.cmd_offset(), 80);
    }
}

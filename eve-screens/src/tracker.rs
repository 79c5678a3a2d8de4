//! Touch tracker

use embedded_hal::delay::DelayNs;
use eve_core::cmd::{opt, Command};
use eve_core::dl::{DlCmd, Primitive, Rgb};
use eve_core::touch::TouchPoint;
use eve_drivers::{CommandBurst, Eve, EveError};
use eve_hal::{ChipSelect, Transport};

use crate::Screen;

/// Tag assigned to the on-screen button
pub const BUTTON_TAG: u8 = 1;

/// Draws a dot under the finger and a button that reports presses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TouchTracker {
    finger: Option<TouchPoint>,
    tag: u8,
    presses: u32,
}

impl TouchTracker {
    pub const fn new() -> Self {
        Self {
            finger: None,
            tag: 0,
            presses: 0,
        }
    }

    /// Sample the touch registers
    ///
    /// Returns the tag that was just pressed, once per press.
    pub fn update<T: Transport, CS: ChipSelect, D: DelayNs>(
        &mut self,
        eve: &mut Eve<T, CS, D>,
    ) -> Result<Option<u8>, EveError<T::Error>> {
        self.finger = eve.touch_point()?;
        let tag = if self.finger.is_some() {
            eve.touch_tag()?
        } else {
            0
        };
        let pressed = (tag != 0 && tag != self.tag).then_some(tag);
        if let Some(_tag) = pressed {
            self.presses += 1;
            #[cfg(feature = "defmt")]
            defmt::debug!("tag {} pressed", _tag);
        }
        self.tag = tag;
        Ok(pressed)
    }

    /// Latest finger position
    pub fn finger(&self) -> Option<TouchPoint> {
        self.finger
    }

    /// Presses seen on any tag
    pub fn presses(&self) -> u32 {
        self.presses
    }
}

impl Screen for TouchTracker {
    fn draw<T: Transport, CS: ChipSelect, D: DelayNs>(
        &mut self,
        frame: &mut CommandBurst<'_, T, CS, D>,
    ) -> Result<(), EveError<T::Error>> {
        frame.push_dl(DlCmd::clear_color_rgb(0, 0, 0))?;
        frame.push_dl(DlCmd::clear(true, true, true))?;

        let options = if self.tag == BUTTON_TAG { opt::FLAT } else { opt::NONE };
        frame.push_dl(DlCmd::tag_mask(true))?;
        frame.push_dl(DlCmd::tag(BUTTON_TAG))?;
        frame.push(&Command::Button {
            x: 20,
            y: 20,
            w: 120,
            h: 48,
            font: 28,
            options,
            text: "PRESS",
        })?;
        frame.push_dl(DlCmd::tag_mask(false))?;

        if let Some(p) = self.finger {
            let c = Rgb::new(0x20, 0xC0, 0xFF);
            frame.push_dl(DlCmd::color_rgb(c.r, c.g, c.b))?;
            frame.push_dl(DlCmd::point_size(12 * 16))?;
            frame.push_dl(DlCmd::begin(Primitive::Points))?;
            frame.push_dl(DlCmd::vertex2f(
                p.x.saturating_mul(16),
                p.y.saturating_mul(16),
            ))?;
            frame.push_dl(DlCmd::end())?;
        }
        Ok(())
    }
}

//! Centered greeting text

use embedded_hal::delay::DelayNs;
use eve_core::cmd::{opt, Command};
use eve_core::config::PanelConfig;
use eve_core::dl::{DlCmd, Rgb};
use eve_drivers::{CommandBurst, EveError};
use eve_hal::{ChipSelect, Transport};
use heapless::String;

use crate::Screen;

/// Longest greeting kept, in bytes
pub const GREETING_LEN: usize = 48;

/// Text centered on the panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    text: String<GREETING_LEN>,
    x: i16,
    y: i16,
    /// ROM font handle (16..=31)
    pub font: i16,
    pub color: Rgb,
    pub background: Rgb,
}

impl Greeting {
    pub const DEFAULT_TEXT: &'static str = "HELLO AT HZIRI";

    /// Greeting centered on `panel`
    pub fn new(panel: &PanelConfig) -> Self {
        let mut greeting = Self {
            text: String::new(),
            x: (panel.hsize / 2) as i16,
            y: (panel.vsize / 2) as i16,
            font: 31,
            color: Rgb::WHITE,
            background: Rgb::BLACK,
        };
        greeting.set_text(Self::DEFAULT_TEXT);
        greeting
    }

    /// Replace the text, truncating at a character boundary if too long
    ///
    /// A NUL ends the text.
    pub fn set_text(&mut self, text: &str) {
        self.text.clear();
        for c in text.chars().take_while(|&c| c != '\0') {
            if self.text.push(c).is_err() {
                break;
            }
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Screen for Greeting {
    fn draw<T: Transport, CS: ChipSelect, D: DelayNs>(
        &mut self,
        frame: &mut CommandBurst<'_, T, CS, D>,
    ) -> Result<(), EveError<T::Error>> {
        let bg = self.background;
        frame.push_dl(DlCmd::clear_color_rgb(bg.r, bg.g, bg.b))?;
        frame.push_dl(DlCmd::clear(true, true, true))?;
        frame.push_dl(DlCmd::color_rgb(self.color.r, self.color.g, self.color.b))?;
        frame.push(&Command::text(self.x, self.y, self.font, opt::CENTER, &self.text))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render;
    use eve_core::cmd::opcode;
    use eve_drivers::sim::SimEve;
    use eve_drivers::Eve;

    #[test]
    fn test_greeting_is_centered() {
        let greeting = Greeting::new(&PanelConfig::WQVGA_480X272);
        assert_eq!((greeting.x, greeting.y), (240, 136));
        assert_eq!(greeting.text(), "HELLO AT HZIRI");
    }

    #[test]
    fn test_long_text_is_truncated() {
        let mut greeting = Greeting::new(&PanelConfig::default());
        greeting.set_text("0123456789012345678901234567890123456789012345678999");
        assert_eq!(greeting.text().len(), GREETING_LEN);

        greeting.set_text("HI\0THERE");
        assert_eq!(greeting.text(), "HI");
    }

    #[test]
    fn test_greeting_frame() {
        let sim = SimEve::ready();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        let mut greeting = Greeting::new(&PanelConfig::WQVGA_480X272);
        // DLSTART + 3 words + 28-byte text + DISPLAY + SWAP
        assert_eq!(render(&mut eve, &mut greeting).unwrap(), 4 + 12 + 28 + 4 + 4);

        let wire = sim.last_burst();
        assert_eq!(&wire[16..20], &opcode::TEXT.to_le_bytes());
        let (cmd, used) = Command::decode(&wire[16..]).unwrap();
        assert_eq!(used, 28);
        assert_eq!(
            cmd,
            Command::text(240, 136, 31, opt::CENTER, "HELLO AT HZIRI")
        );
    }
}

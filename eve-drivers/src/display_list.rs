//! Direct display-list writes
//!
//! Writes instructions straight into `RAM_DL`, bypassing the co-processor
//! and its ring. Used at bring-up for the blank screen and for static lists
//! that never need widgets.

use embedded_hal::delay::DelayNs;
use eve_core::dl::DlCmd;
use eve_core::memory::{RAM_DL, RAM_DL_SIZE};
use eve_core::registers::{dlswap, reg};
use eve_hal::{ChipSelect, Transport};

use crate::{Eve, EveError, WaitTarget};

/// Instructions making up the bring-up screen: clear to black, end of list
pub const BLANK_SCREEN: [DlCmd; 3] = [
    DlCmd::clear_color_rgb(0, 0, 0),
    DlCmd::clear(true, true, true),
    DlCmd::display(),
];

/// Sequential writer into `RAM_DL`
///
/// Each instruction is its own register-style write. Once the list is full
/// further instructions overwrite the last slot, which keeps the list
/// terminated if the final instruction is `DISPLAY`.
pub struct DisplayListWriter<'e, T, CS, D> {
    eve: &'e mut Eve<T, CS, D>,
    cursor: u32,
}

impl<T: Transport, CS: ChipSelect, D: DelayNs> DisplayListWriter<'_, T, CS, D> {
    pub fn push(&mut self, cmd: DlCmd) -> Result<(), EveError<T::Error>> {
        self.eve.wr32(RAM_DL + self.cursor, cmd.to_u32())?;
        if self.cursor + 4 < RAM_DL_SIZE {
            self.cursor += 4;
        }
        Ok(())
    }

    pub fn extend(&mut self, cmds: &[DlCmd]) -> Result<(), EveError<T::Error>> {
        cmds.iter().try_for_each(|cmd| self.push(*cmd))
    }

    /// Byte offset of the next instruction inside `RAM_DL`
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Promote the list at the next frame boundary
    pub fn swap(self) -> Result<(), EveError<T::Error>> {
        self.eve.swap_display_list()
    }
}

impl<T: Transport, CS: ChipSelect, D: DelayNs> Eve<T, CS, D> {
    /// Start writing a display list at the top of `RAM_DL`
    pub fn display_list(&mut self) -> DisplayListWriter<'_, T, CS, D> {
        DisplayListWriter {
            eve: self,
            cursor: 0,
        }
    }

    /// Request a swap at the next frame and wait for the chip to take it
    pub fn swap_display_list(&mut self) -> Result<(), EveError<T::Error>> {
        self.write_register(reg::DLSWAP, dlswap::FRAME as u32)?;
        let policy = self.poll;
        self.wait_register(reg::DLSWAP, 0, policy, WaitTarget::DisplayListSwap)
    }

    /// Write the blank screen into `RAM_DL` and make it current
    pub fn write_blank_screen(&mut self) -> Result<(), EveError<T::Error>> {
        let mut dl = self.display_list();
        dl.extend(&BLANK_SCREEN)?;
        dl.swap()
    }
}

#[cfg(test)]
mod tests {
    use eve_core::config::PollPolicy;
    use eve_core::dl::DlCmd;
    use eve_core::registers::reg;

    use super::BLANK_SCREEN;
    use crate::sim::SimEve;
    use crate::{Eve, EveError, WaitTarget};

    #[test]
    fn test_blank_screen_words() {
        assert_eq!(BLANK_SCREEN[0].0, 0x0200_0000);
        assert_eq!(BLANK_SCREEN[1].0, 0x2600_0007);
        assert_eq!(BLANK_SCREEN[2].0, 0x0000_0000);
    }

    #[test]
    fn test_write_blank_screen() {
        let sim = SimEve::ready();
        sim.set_reg(reg::CMD_READ, 12);
        sim.set_reg(reg::CMD_WRITE, 12);
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        eve.write_blank_screen().unwrap();
        assert_eq!(sim.dl_word(0), 0x0200_0000);
        assert_eq!(sim.dl_word(1), 0x2600_0007);
        assert_eq!(sim.dl_word(2), 0x0000_0000);
        assert_eq!(sim.dl_swaps(), 1);
        // the ring is not involved
        assert_eq!(sim.reg(reg::CMD_WRITE), 12);
        assert_eq!(sim.executed(), 0);
    }

    #[test]
    fn test_writer_clamps_at_end_of_ram_dl() {
        let sim = SimEve::ready();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        let mut dl = eve.display_list();
        for _ in 0..2048 {
            dl.push(DlCmd::end()).unwrap();
        }
        assert_eq!(dl.cursor(), 8188);
        dl.push(DlCmd::display()).unwrap();
        assert_eq!(dl.cursor(), 8188);
        assert_eq!(sim.dl_word(2047), DlCmd::display().0);
    }

    #[test]
    fn test_stuck_swap_times_out() {
        let sim = SimEve::ready();
        sim.set_dlswap_stuck(true);
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay()).with_poll_policy(PollPolicy::new(4, 50));

        assert_eq!(
            eve.swap_display_list(),
            Err(EveError::Timeout(WaitTarget::DisplayListSwap))
        );
    }
}

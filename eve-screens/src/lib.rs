//! Demo screens for EVE display co-processors
//!
//! Each screen queues the body of one frame into a [`CommandBurst`];
//! [`render`] wraps it with `DLSTART` / `DISPLAY` / `SWAP` and commits.
//!
//! - [`FlashingDot`]: a dot that alternates red and black every frame
//! - [`Greeting`]: centered text
//! - [`BitmapTile`]: a checkerboard bitmap uploaded once and tiled
//! - [`TouchTracker`]: a dot under the finger plus a tagged button

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

mod dot;
mod greeting;
mod tile;
mod tracker;

use embedded_hal::delay::DelayNs;
use eve_core::cmd::Command;
use eve_core::dl::DlCmd;
use eve_drivers::{CommandBurst, Eve, EveError};
use eve_hal::{ChipSelect, Transport};

pub use dot::FlashingDot;
pub use greeting::Greeting;
pub use tile::BitmapTile;
pub use tracker::TouchTracker;

/// Something that can draw one frame
pub trait Screen {
    /// Queue the frame body, between `DLSTART` and `DISPLAY`
    fn draw<T: Transport, CS: ChipSelect, D: DelayNs>(
        &mut self,
        frame: &mut CommandBurst<'_, T, CS, D>,
    ) -> Result<(), EveError<T::Error>>;
}

/// Build a frame from `screen` and show it
///
/// Returns the ring offset after the co-processor has run the frame.
pub fn render<S, T, CS, D>(eve: &mut Eve<T, CS, D>, screen: &mut S) -> Result<u16, EveError<T::Error>>
where
    S: Screen + ?Sized,
    T: Transport,
    CS: ChipSelect,
    D: DelayNs,
{
    let mut frame = eve.begin_burst()?;
    frame.push(&Command::DlStart)?;
    screen.draw(&mut frame)?;
    frame.push_dl(DlCmd::display())?;
    frame.push(&Command::Swap)?;
    frame.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eve_drivers::sim::SimEve;

    struct Blank;

    impl Screen for Blank {
        fn draw<T: Transport, CS: ChipSelect, D: DelayNs>(
            &mut self,
            frame: &mut CommandBurst<'_, T, CS, D>,
        ) -> Result<(), EveError<T::Error>> {
            frame.push_dl(DlCmd::clear(true, true, true))?;
            Ok(())
        }
    }

    #[test]
    fn test_render_wraps_frame() {
        let sim = SimEve::ready();
        let (link, cs) = sim.link();
        let mut eve = Eve::new(link, cs, sim.delay());

        assert_eq!(render(&mut eve, &mut Blank).unwrap(), 16);
        assert_eq!(sim.cmd_swaps(), 1);
        assert_eq!(sim.dl_word(0), DlCmd::clear(true, true, true).0);
        assert_eq!(sim.dl_word(1), DlCmd::display().0);
    }
}

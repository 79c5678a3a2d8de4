//! Tiled checkerboard bitmap

use embedded_hal::delay::DelayNs;
use eve_core::cmd::Command;
use eve_core::dl::{BitmapFormat, DlCmd, Filter, Primitive, Wrap};
use eve_drivers::{CommandBurst, EveError};
use eve_hal::{ChipSelect, Transport};

use crate::Screen;

/// Side of the checkerboard cell in pixels
pub const TILE_SIZE: u16 = 8;

const TILE_BYTES: usize = (TILE_SIZE * TILE_SIZE) as usize;

const fn checkerboard() -> [u8; TILE_BYTES] {
    let mut pixels = [0u8; TILE_BYTES];
    let mut i = 0;
    while i < TILE_BYTES {
        let (x, y) = (i % TILE_SIZE as usize, i / TILE_SIZE as usize);
        // 2x2 pixel squares
        if (x / 2 + y / 2) % 2 == 0 {
            pixels[i] = 0xFF;
        }
        i += 1;
    }
    pixels
}

/// 8x8 L8 checkerboard
pub const CHECKERBOARD: [u8; TILE_BYTES] = checkerboard();

/// A rectangle filled by repeating the checkerboard
///
/// The pixels are copied into `RAM_G` through the ring with the first
/// frame; later frames only reference them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitmapTile {
    /// Where the pixels live in `RAM_G`
    pub address: u32,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    uploaded: bool,
}

impl BitmapTile {
    pub const fn new(address: u32, x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            address,
            x,
            y,
            width,
            height,
            uploaded: false,
        }
    }

    pub fn is_uploaded(&self) -> bool {
        self.uploaded
    }

    /// Upload again with the next frame
    pub fn invalidate(&mut self) {
        self.uploaded = false;
    }
}

impl Screen for BitmapTile {
    fn draw<T: Transport, CS: ChipSelect, D: DelayNs>(
        &mut self,
        frame: &mut CommandBurst<'_, T, CS, D>,
    ) -> Result<(), EveError<T::Error>> {
        if !self.uploaded {
            frame.push(&Command::MemWrite {
                ptr: self.address,
                data: &CHECKERBOARD,
            })?;
            self.uploaded = true;
        }
        let format = BitmapFormat::L8;
        frame.push_dl(DlCmd::clear_color_rgb(0, 0, 0x40))?;
        frame.push_dl(DlCmd::clear(true, true, true))?;
        frame.push_dl(DlCmd::bitmap_handle(0))?;
        frame.push_dl(DlCmd::bitmap_source(self.address))?;
        frame.push_dl(DlCmd::bitmap_layout(
            format,
            format.stride(TILE_SIZE),
            TILE_SIZE,
        ))?;
        frame.push_dl(DlCmd::bitmap_size(
            Filter::Nearest,
            Wrap::Repeat,
            Wrap::Repeat,
            self.width,
            self.height,
        ))?;
        frame.push_dl(DlCmd::begin(Primitive::Bitmaps))?;
        frame.push_dl(DlCmd::vertex2ii(self.x, self.y, 0, 0))?;
        frame.push_dl(DlCmd::end())?;
        Ok(())
    }
}

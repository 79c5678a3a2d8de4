//! FT81x memory map
//!
//! Every location on the chip lives in one flat 22-bit address space,
//! transmitted as three bytes on the wire.

/// General purpose graphics RAM
pub const RAM_G: u32 = 0x00_0000;
/// Size of graphics RAM (1 MiB)
pub const RAM_G_SIZE: u32 = 1024 * 1024;

/// Built-in font ROM
pub const ROM_FONT: u32 = 0x1E_0000;

/// Display-list RAM
pub const RAM_DL: u32 = 0x30_0000;
/// Size of display-list RAM (8 KiB, 2048 instructions)
pub const RAM_DL_SIZE: u32 = 8 * 1024;

/// Register file
pub const RAM_REG: u32 = 0x30_2000;
/// Size of the register file window
pub const RAM_REG_SIZE: u32 = 4 * 1024;

/// Co-processor command ring
pub const RAM_CMD: u32 = 0x30_8000;
/// Size of the command ring (4 KiB)
pub const RAM_CMD_SIZE: u32 = 4 * 1024;

/// Highest address the address phase can carry
pub const ADDRESS_MASK: u32 = 0x3F_FFFF;

/// Bit 7 of the high address byte marks a write transaction
pub const WRITE_FLAG: u8 = 0x80;

/// Build the 3-byte address phase of a write transaction
pub const fn write_header(address: u32) -> [u8; 3] {
    let address = address & ADDRESS_MASK;
    [
        (address >> 16) as u8 | WRITE_FLAG,
        (address >> 8) as u8,
        address as u8,
    ]
}

/// Build the address phase of a read transaction, including the dummy byte
pub const fn read_header(address: u32) -> [u8; 4] {
    let address = address & ADDRESS_MASK;
    [(address >> 16) as u8, (address >> 8) as u8, address as u8, 0x00]
}

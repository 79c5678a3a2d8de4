//! Co-processor command encoding
//!
//! Every co-processor command is a 32-bit opcode of the form `0xFFFF_FFxx`
//! followed by little-endian operands. Words without the `0xFFFF_FF` prefix
//! are display-list instructions, which the co-processor appends to the
//! list it is building.
//!
//! # Alignment
//!
//! The ring only accepts whole words. Commands carrying a variable-length
//! payload (a NUL-terminated string, a block of memory) are padded with zero
//! bytes by the encoder until the total command length, header included, is
//! a multiple of 4. Callers never supply padding themselves.
//!
//! # Example
//!
//! ```text
//! TEXT at (240, 136), font 31, centered, "HELLO AT HZIRI"
//!
//! 0C FF FF FF   opcode
//! F0 00 88 00   x, y
//! 1F 00 00 06   font, options
//! 48 45 4C 4C 4F 20 41 54 20 48 5A 49 52 49 00 00
//!               string, NUL, one pad byte  -> 28 bytes total
//! ```

use core::fmt;

use crate::dl::{BitmapFormat, DlCmd, Rgb};
use crate::ring::{padded_len, padding};

/// Co-processor opcodes
pub mod opcode {
    pub const DLSTART: u32 = 0xFFFF_FF00;
    pub const SWAP: u32 = 0xFFFF_FF01;
    pub const INTERRUPT: u32 = 0xFFFF_FF02;
    pub const BGCOLOR: u32 = 0xFFFF_FF09;
    pub const FGCOLOR: u32 = 0xFFFF_FF0A;
    pub const GRADIENT: u32 = 0xFFFF_FF0B;
    pub const TEXT: u32 = 0xFFFF_FF0C;
    pub const BUTTON: u32 = 0xFFFF_FF0D;
    pub const KEYS: u32 = 0xFFFF_FF0E;
    pub const PROGRESS: u32 = 0xFFFF_FF0F;
    pub const SLIDER: u32 = 0xFFFF_FF10;
    pub const SCROLLBAR: u32 = 0xFFFF_FF11;
    pub const TOGGLE: u32 = 0xFFFF_FF12;
    pub const CALIBRATE: u32 = 0xFFFF_FF15;
    pub const SPINNER: u32 = 0xFFFF_FF16;
    pub const STOP: u32 = 0xFFFF_FF17;
    pub const MEMWRITE: u32 = 0xFFFF_FF1A;
    pub const MEMSET: u32 = 0xFFFF_FF1B;
    pub const MEMZERO: u32 = 0xFFFF_FF1C;
    pub const MEMCPY: u32 = 0xFFFF_FF1D;
    pub const APPEND: u32 = 0xFFFF_FF1E;
    pub const INFLATE: u32 = 0xFFFF_FF22;
    pub const LOADIDENTITY: u32 = 0xFFFF_FF26;
    pub const TRANSLATE: u32 = 0xFFFF_FF27;
    pub const SCALE: u32 = 0xFFFF_FF28;
    pub const ROTATE: u32 = 0xFFFF_FF29;
    pub const SETMATRIX: u32 = 0xFFFF_FF2A;
    pub const SETFONT: u32 = 0xFFFF_FF2B;
    pub const TRACK: u32 = 0xFFFF_FF2C;
    pub const NUMBER: u32 = 0xFFFF_FF2E;
    pub const LOGO: u32 = 0xFFFF_FF31;
    pub const COLDSTART: u32 = 0xFFFF_FF32;
    pub const GRADCOLOR: u32 = 0xFFFF_FF34;
    pub const SETROTATE: u32 = 0xFFFF_FF36;
    pub const SETBITMAP: u32 = 0xFFFF_FF43;

    /// Prefix shared by every co-processor opcode
    pub const PREFIX: u32 = 0xFFFF_FF00;

    /// Whether a word is a co-processor opcode rather than a display-list word
    pub const fn is_coprocessor(word: u32) -> bool {
        word & 0xFFFF_FF00 == PREFIX
    }
}

/// Widget option flags
pub mod opt {
    /// 3D effect (default)
    pub const NONE: u16 = 0;
    /// Decompress to L8 instead of the native format
    pub const MONO: u16 = 1;
    /// Do not append a display list for this widget
    pub const NODL: u16 = 2;
    /// Flat rendering, no 3D effect
    pub const FLAT: u16 = 256;
    /// Signed number rendering
    pub const SIGNED: u16 = 256;
    /// Center horizontally
    pub const CENTERX: u16 = 512;
    /// Center vertically
    pub const CENTERY: u16 = 1024;
    /// Center both ways
    pub const CENTER: u16 = 1536;
    /// Right-justify text
    pub const RIGHTX: u16 = 2048;
    /// No background for keys/scrollbar/slider
    pub const NOBACK: u16 = 4096;
    /// No ticks on gauges and clocks
    pub const NOTICKS: u16 = 8192;
    /// No hour and minute hands on clocks
    pub const NOHM: u16 = 16384;
    /// No pointer on gauges
    pub const NOPOINTER: u16 = 16384;
    /// No second hand on clocks
    pub const NOSECS: u16 = 32768;
}

/// Destination for encoded command bytes
///
/// Implemented by in-memory buffers and by the driver's burst writer, so
/// the same encoder feeds both tests and the wire.
pub trait CommandSink {
    /// Error raised when a write cannot be accepted
    type Error;

    /// Append raw bytes
    fn put(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    fn put_u32(&mut self, value: u32) -> Result<(), Self::Error> {
        self.put(&value.to_le_bytes())
    }

    fn put_i32(&mut self, value: i32) -> Result<(), Self::Error> {
        self.put(&value.to_le_bytes())
    }

    fn put_u16(&mut self, value: u16) -> Result<(), Self::Error> {
        self.put(&value.to_le_bytes())
    }

    fn put_i16(&mut self, value: i16) -> Result<(), Self::Error> {
        self.put(&value.to_le_bytes())
    }

    /// Append `count` zero bytes (at most 3 are ever needed)
    fn put_padding(&mut self, count: usize) -> Result<(), Self::Error> {
        const ZEROS: [u8; 4] = [0; 4];
        self.put(&ZEROS[..count.min(4)])
    }
}

/// A fixed-capacity buffer ran out of room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SinkFull;

impl fmt::Display for SinkFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "command buffer full")
    }
}

impl<const N: usize> CommandSink for heapless::Vec<u8, N> {
    type Error = SinkFull;

    fn put(&mut self, bytes: &[u8]) -> Result<(), SinkFull> {
        self.extend_from_slice(bytes).map_err(|_| SinkFull)
    }
}

/// Errors decoding a command stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Stream ended inside a command
    Truncated,
    /// Opcode with the co-processor prefix that is not known
    UnknownOpcode(u32),
    /// String payload is not valid UTF-8
    InvalidUtf8,
    /// String payload has no NUL terminator
    MissingTerminator,
    /// Bitmap format field holds an unknown value
    InvalidFormat(u16),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "command stream truncated"),
            Self::UnknownOpcode(op) => write!(f, "unknown opcode {:#010x}", op),
            Self::InvalidUtf8 => write!(f, "string payload is not UTF-8"),
            Self::MissingTerminator => write!(f, "string payload not terminated"),
            Self::InvalidFormat(v) => write!(f, "unknown bitmap format {}", v),
        }
    }
}

/// One co-processor command
///
/// Coordinates are in pixels. Borrowed payloads (strings, memory blocks)
/// are copied straight into the ring when encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Display-list instruction passed through to the list being built
    Dl(DlCmd),
    /// Start a new display list
    DlStart,
    /// Swap the display lists at the next frame
    Swap,
    /// Reset co-processor state to defaults
    ColdStart,
    /// Play the boot animation
    Logo,
    /// Stop spinner/screensaver/sketch
    Stop,
    /// Reset the bitmap transform matrix
    LoadIdentity,
    /// Emit the current matrix into the display list
    SetMatrix,
    /// Raise the co-processor interrupt after a delay
    Interrupt { ms: u32 },
    FgColor(Rgb),
    BgColor(Rgb),
    GradColor(Rgb),
    Text {
        x: i16,
        y: i16,
        font: i16,
        options: u16,
        text: &'a str,
    },
    Button {
        x: i16,
        y: i16,
        w: i16,
        h: i16,
        font: i16,
        options: u16,
        text: &'a str,
    },
    Keys {
        x: i16,
        y: i16,
        w: i16,
        h: i16,
        font: i16,
        options: u16,
        text: &'a str,
    },
    Toggle {
        x: i16,
        y: i16,
        w: i16,
        font: i16,
        options: u16,
        state: u16,
        text: &'a str,
    },
    Number {
        x: i16,
        y: i16,
        font: i16,
        options: u16,
        n: i32,
    },
    Gradient {
        x0: i16,
        y0: i16,
        rgb0: Rgb,
        x1: i16,
        y1: i16,
        rgb1: Rgb,
    },
    Progress {
        x: i16,
        y: i16,
        w: i16,
        h: i16,
        options: u16,
        val: u16,
        range: u16,
    },
    Slider {
        x: i16,
        y: i16,
        w: i16,
        h: i16,
        options: u16,
        val: u16,
        range: u16,
    },
    Scrollbar {
        x: i16,
        y: i16,
        w: i16,
        h: i16,
        options: u16,
        val: u16,
        size: u16,
        range: u16,
    },
    Spinner {
        x: i16,
        y: i16,
        style: u16,
        scale: u16,
    },
    /// Track touches over a region and report them under `tag`
    Track {
        x: i16,
        y: i16,
        w: i16,
        h: i16,
        tag: i16,
    },
    /// Run the touch calibration routine; the chip writes the result word
    /// right after the opcode
    Calibrate,
    SetRotate(u32),
    /// Rotate by `angle` in 1/65536 of a turn
    Rotate { angle: i32 },
    /// Scale by 16.16 fixed-point factors
    Scale { sx: i32, sy: i32 },
    /// Translate by 16.16 fixed-point offsets
    Translate { tx: i32, ty: i32 },
    SetFont { font: u32, ptr: u32 },
    SetBitmap {
        addr: u32,
        format: BitmapFormat,
        width: u16,
        height: u16,
    },
    /// Copy `data` into chip memory at `ptr`
    MemWrite { ptr: u32, data: &'a [u8] },
    MemSet { ptr: u32, value: u32, num: u32 },
    MemZero { ptr: u32, num: u32 },
    MemCpy { dst: u32, src: u32, num: u32 },
    /// Append `num` bytes of `RAM_G` at `ptr` to the display list
    Append { ptr: u32, num: u32 },
    /// Decompress zlib `data` into chip memory at `ptr`
    Inflate { ptr: u32, data: &'a [u8] },
}

/// Bytes of `text` sent to the chip: everything before the first NUL
///
/// The co-processor ends a string at its first NUL, so anything after it
/// would be run as commands.
const fn wire_text(text: &str) -> &[u8] {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == 0 {
            return bytes.split_at(i).0;
        }
        i += 1;
    }
    bytes
}

const fn string_command_len(header: usize, text: &str) -> usize {
    padded_len(header + wire_text(text).len() + 1)
}

impl<'a> Command<'a> {
    /// Text command with the common arguments
    pub const fn text(x: i16, y: i16, font: i16, options: u16, text: &'a str) -> Self {
        Command::Text {
            x,
            y,
            font,
            options,
            text,
        }
    }

    /// Opcode word sent first
    pub const fn opcode(&self) -> u32 {
        match self {
            Command::Dl(word) => word.0,
            Command::DlStart => opcode::DLSTART,
            Command::Swap => opcode::SWAP,
            Command::ColdStart => opcode::COLDSTART,
            Command::Logo => opcode::LOGO,
            Command::Stop => opcode::STOP,
            Command::LoadIdentity => opcode::LOADIDENTITY,
            Command::SetMatrix => opcode::SETMATRIX,
            Command::Interrupt { .. } => opcode::INTERRUPT,
            Command::FgColor(_) => opcode::FGCOLOR,
            Command::BgColor(_) => opcode::BGCOLOR,
            Command::GradColor(_) => opcode::GRADCOLOR,
            Command::Text { .. } => opcode::TEXT,
            Command::Button { .. } => opcode::BUTTON,
            Command::Keys { .. } => opcode::KEYS,
            Command::Toggle { .. } => opcode::TOGGLE,
            Command::Number { .. } => opcode::NUMBER,
            Command::Gradient { .. } => opcode::GRADIENT,
            Command::Progress { .. } => opcode::PROGRESS,
            Command::Slider { .. } => opcode::SLIDER,
            Command::Scrollbar { .. } => opcode::SCROLLBAR,
            Command::Spinner { .. } => opcode::SPINNER,
            Command::Track { .. } => opcode::TRACK,
            Command::Calibrate => opcode::CALIBRATE,
            Command::SetRotate(_) => opcode::SETROTATE,
            Command::Rotate { .. } => opcode::ROTATE,
            Command::Scale { .. } => opcode::SCALE,
            Command::Translate { .. } => opcode::TRANSLATE,
            Command::SetFont { .. } => opcode::SETFONT,
            Command::SetBitmap { .. } => opcode::SETBITMAP,
            Command::MemWrite { .. } => opcode::MEMWRITE,
            Command::MemSet { .. } => opcode::MEMSET,
            Command::MemZero { .. } => opcode::MEMZERO,
            Command::MemCpy { .. } => opcode::MEMCPY,
            Command::Append { .. } => opcode::APPEND,
            Command::Inflate { .. } => opcode::INFLATE,
        }
    }

    /// Bytes this command occupies in the ring, padding included
    ///
    /// Always a multiple of 4.
    pub const fn encoded_len(&self) -> usize {
        match *self {
            Command::Dl(_)
            | Command::DlStart
            | Command::Swap
            | Command::ColdStart
            | Command::Logo
            | Command::Stop
            | Command::LoadIdentity
            | Command::SetMatrix => 4,
            Command::Interrupt { .. }
            | Command::FgColor(_)
            | Command::BgColor(_)
            | Command::GradColor(_)
            | Command::Calibrate
            | Command::SetRotate(_)
            | Command::Rotate { .. } => 8,
            Command::Scale { .. }
            | Command::Translate { .. }
            | Command::SetFont { .. }
            | Command::Spinner { .. }
            | Command::MemZero { .. }
            | Command::Append { .. } => 12,
            Command::Number { .. }
            | Command::Track { .. }
            | Command::SetBitmap { .. }
            | Command::MemSet { .. }
            | Command::MemCpy { .. } => 16,
            Command::Gradient { .. }
            | Command::Progress { .. }
            | Command::Slider { .. }
            | Command::Scrollbar { .. } => 20,
            Command::Text { text, .. } => string_command_len(12, text),
            Command::Button { text, .. } | Command::Keys { text, .. } => {
                string_command_len(16, text)
            }
            Command::Toggle { text, .. } => string_command_len(16, text),
            Command::MemWrite { data, .. } => 12 + padded_len(data.len()),
            Command::Inflate { data, .. } => 8 + padded_len(data.len()),
        }
    }

    /// Serialize into `sink`, padding included
    pub fn encode<S: CommandSink>(&self, sink: &mut S) -> Result<(), S::Error> {
        sink.put_u32(self.opcode())?;
        match *self {
            Command::Dl(_)
            | Command::DlStart
            | Command::Swap
            | Command::ColdStart
            | Command::Logo
            | Command::Stop
            | Command::LoadIdentity
            | Command::SetMatrix => {}
            Command::Interrupt { ms } => sink.put_u32(ms)?,
            Command::FgColor(c) | Command::BgColor(c) | Command::GradColor(c) => {
                sink.put_u32(c.to_u32())?
            }
            Command::Text {
                x,
                y,
                font,
                options,
                text,
            } => {
                put_xy(sink, x, y)?;
                sink.put_i16(font)?;
                sink.put_u16(options)?;
                put_string(sink, 12, text)?;
            }
            Command::Button {
                x,
                y,
                w,
                h,
                font,
                options,
                text,
            }
            | Command::Keys {
                x,
                y,
                w,
                h,
                font,
                options,
                text,
            } => {
                put_xy(sink, x, y)?;
                put_xy(sink, w, h)?;
                sink.put_i16(font)?;
                sink.put_u16(options)?;
                put_string(sink, 16, text)?;
            }
            Command::Toggle {
                x,
                y,
                w,
                font,
                options,
                state,
                text,
            } => {
                put_xy(sink, x, y)?;
                sink.put_i16(w)?;
                sink.put_i16(font)?;
                sink.put_u16(options)?;
                sink.put_u16(state)?;
                put_string(sink, 16, text)?;
            }
            Command::Number {
                x,
                y,
                font,
                options,
                n,
            } => {
                put_xy(sink, x, y)?;
                sink.put_i16(font)?;
                sink.put_u16(options)?;
                sink.put_i32(n)?;
            }
            Command::Gradient {
                x0,
                y0,
                rgb0,
                x1,
                y1,
                rgb1,
            } => {
                put_xy(sink, x0, y0)?;
                sink.put_u32(rgb0.to_u32())?;
                put_xy(sink, x1, y1)?;
                sink.put_u32(rgb1.to_u32())?;
            }
            Command::Progress {
                x,
                y,
                w,
                h,
                options,
                val,
                range,
            }
            | Command::Slider {
                x,
                y,
                w,
                h,
                options,
                val,
                range,
            } => {
                put_xy(sink, x, y)?;
                put_xy(sink, w, h)?;
                sink.put_u16(options)?;
                sink.put_u16(val)?;
                sink.put_u16(range)?;
                sink.put_padding(2)?;
            }
            Command::Scrollbar {
                x,
                y,
                w,
                h,
                options,
                val,
                size,
                range,
            } => {
                put_xy(sink, x, y)?;
                put_xy(sink, w, h)?;
                sink.put_u16(options)?;
                sink.put_u16(val)?;
                sink.put_u16(size)?;
                sink.put_u16(range)?;
            }
            Command::Spinner { x, y, style, scale } => {
                put_xy(sink, x, y)?;
                sink.put_u16(style)?;
                sink.put_u16(scale)?;
            }
            Command::Track { x, y, w, h, tag } => {
                put_xy(sink, x, y)?;
                put_xy(sink, w, h)?;
                sink.put_i16(tag)?;
                sink.put_padding(2)?;
            }
            // result slot, overwritten by the chip
            Command::Calibrate => sink.put_u32(0)?,
            Command::SetRotate(r) => sink.put_u32(r)?,
            Command::Rotate { angle } => sink.put_i32(angle)?,
            Command::Scale { sx, sy } => {
                sink.put_i32(sx)?;
                sink.put_i32(sy)?;
            }
            Command::Translate { tx, ty } => {
                sink.put_i32(tx)?;
                sink.put_i32(ty)?;
            }
            Command::SetFont { font, ptr } => {
                sink.put_u32(font)?;
                sink.put_u32(ptr)?;
            }
            Command::SetBitmap {
                addr,
                format,
                width,
                height,
            } => {
                sink.put_u32(addr)?;
                sink.put_u16(format as u16)?;
                sink.put_u16(width)?;
                sink.put_u16(height)?;
                sink.put_padding(2)?;
            }
            Command::MemWrite { ptr, data } => {
                sink.put_u32(ptr)?;
                sink.put_u32(data.len() as u32)?;
                sink.put(data)?;
                sink.put_padding(padding(data.len()))?;
            }
            Command::MemSet { ptr, value, num } => {
                sink.put_u32(ptr)?;
                sink.put_u32(value)?;
                sink.put_u32(num)?;
            }
            Command::MemZero { ptr, num } | Command::Append { ptr, num } => {
                sink.put_u32(ptr)?;
                sink.put_u32(num)?;
            }
            Command::MemCpy { dst, src, num } => {
                sink.put_u32(dst)?;
                sink.put_u32(src)?;
                sink.put_u32(num)?;
            }
            Command::Inflate { ptr, data } => {
                sink.put_u32(ptr)?;
                sink.put(data)?;
                sink.put_padding(padding(data.len()))?;
            }
        }
        Ok(())
    }

    /// Decode one command from the front of `bytes`
    ///
    /// Returns the command and the number of bytes it occupied.
    pub fn decode(bytes: &'a [u8]) -> Result<(Self, usize), DecodeError> {
        let mut r = Reader { bytes, pos: 0 };
        let op = r.u32()?;
        if !opcode::is_coprocessor(op) {
            return Ok((Command::Dl(DlCmd(op)), 4));
        }
        let cmd = match op {
            opcode::DLSTART => Command::DlStart,
            opcode::SWAP => Command::Swap,
            opcode::COLDSTART => Command::ColdStart,
            opcode::LOGO => Command::Logo,
            opcode::STOP => Command::Stop,
            opcode::LOADIDENTITY => Command::LoadIdentity,
            opcode::SETMATRIX => Command::SetMatrix,
            opcode::INTERRUPT => Command::Interrupt { ms: r.u32()? },
            opcode::FGCOLOR => Command::FgColor(Rgb::from_u32(r.u32()?)),
            opcode::BGCOLOR => Command::BgColor(Rgb::from_u32(r.u32()?)),
            opcode::GRADCOLOR => Command::GradColor(Rgb::from_u32(r.u32()?)),
            opcode::TEXT => Command::Text {
                x: r.i16()?,
                y: r.i16()?,
                font: r.i16()?,
                options: r.u16()?,
                text: r.string()?,
            },
            opcode::BUTTON => Command::Button {
                x: r.i16()?,
                y: r.i16()?,
                w: r.i16()?,
                h: r.i16()?,
                font: r.i16()?,
                options: r.u16()?,
                text: r.string()?,
            },
            opcode::KEYS => Command::Keys {
                x: r.i16()?,
                y: r.i16()?,
                w: r.i16()?,
                h: r.i16()?,
                font: r.i16()?,
                options: r.u16()?,
                text: r.string()?,
            },
            opcode::TOGGLE => Command::Toggle {
                x: r.i16()?,
                y: r.i16()?,
                w: r.i16()?,
                font: r.i16()?,
                options: r.u16()?,
                state: r.u16()?,
                text: r.string()?,
            },
            opcode::NUMBER => Command::Number {
                x: r.i16()?,
                y: r.i16()?,
                font: r.i16()?,
                options: r.u16()?,
                n: r.i32()?,
            },
            opcode::GRADIENT => Command::Gradient {
                x0: r.i16()?,
                y0: r.i16()?,
                rgb0: Rgb::from_u32(r.u32()?),
                x1: r.i16()?,
                y1: r.i16()?,
                rgb1: Rgb::from_u32(r.u32()?),
            },
            opcode::PROGRESS | opcode::SLIDER => {
                let (x, y, w, h) = (r.i16()?, r.i16()?, r.i16()?, r.i16()?);
                let (options, val, range) = (r.u16()?, r.u16()?, r.u16()?);
                r.skip(2)?;
                if op == opcode::PROGRESS {
                    Command::Progress {
                        x,
                        y,
                        w,
                        h,
                        options,
                        val,
                        range,
                    }
                } else {
                    Command::Slider {
                        x,
                        y,
                        w,
                        h,
                        options,
                        val,
                        range,
                    }
                }
            }
            opcode::SCROLLBAR => Command::Scrollbar {
                x: r.i16()?,
                y: r.i16()?,
                w: r.i16()?,
                h: r.i16()?,
                options: r.u16()?,
                val: r.u16()?,
                size: r.u16()?,
                range: r.u16()?,
            },
            opcode::SPINNER => Command::Spinner {
                x: r.i16()?,
                y: r.i16()?,
                style: r.u16()?,
                scale: r.u16()?,
            },
            opcode::TRACK => {
                let cmd = Command::Track {
                    x: r.i16()?,
                    y: r.i16()?,
                    w: r.i16()?,
                    h: r.i16()?,
                    tag: r.i16()?,
                };
                r.skip(2)?;
                cmd
            }
            opcode::CALIBRATE => {
                r.skip(4)?;
                Command::Calibrate
            }
            opcode::SETROTATE => Command::SetRotate(r.u32()?),
            opcode::ROTATE => Command::Rotate { angle: r.i32()? },
            opcode::SCALE => Command::Scale {
                sx: r.i32()?,
                sy: r.i32()?,
            },
            opcode::TRANSLATE => Command::Translate {
                tx: r.i32()?,
                ty: r.i32()?,
            },
            opcode::SETFONT => Command::SetFont {
                font: r.u32()?,
                ptr: r.u32()?,
            },
            opcode::SETBITMAP => {
                let addr = r.u32()?;
                let raw = r.u16()?;
                let format = u8::try_from(raw)
                    .ok()
                    .and_then(BitmapFormat::from_u8)
                    .ok_or(DecodeError::InvalidFormat(raw))?;
                let cmd = Command::SetBitmap {
                    addr,
                    format,
                    width: r.u16()?,
                    height: r.u16()?,
                };
                r.skip(2)?;
                cmd
            }
            opcode::MEMWRITE => {
                let ptr = r.u32()?;
                let num = r.u32()? as usize;
                let data = r.take(num)?;
                r.skip(padding(num))?;
                Command::MemWrite { ptr, data }
            }
            opcode::MEMSET => Command::MemSet {
                ptr: r.u32()?,
                value: r.u32()?,
                num: r.u32()?,
            },
            opcode::MEMZERO => Command::MemZero {
                ptr: r.u32()?,
                num: r.u32()?,
            },
            opcode::MEMCPY => Command::MemCpy {
                dst: r.u32()?,
                src: r.u32()?,
                num: r.u32()?,
            },
            opcode::APPEND => Command::Append {
                ptr: r.u32()?,
                num: r.u32()?,
            },
            // Compressed length is not on the wire; the rest of the
            // stream is taken as the payload.
            opcode::INFLATE => {
                let ptr = r.u32()?;
                let data = r.rest();
                Command::Inflate { ptr, data }
            }
            other => return Err(DecodeError::UnknownOpcode(other)),
        };
        Ok((cmd, r.pos))
    }
}

fn put_xy<S: CommandSink>(sink: &mut S, x: i16, y: i16) -> Result<(), S::Error> {
    sink.put_i16(x)?;
    sink.put_i16(y)
}

/// String up to its first NUL, NUL, then padding so `header + payload`
/// is word aligned
fn put_string<S: CommandSink>(sink: &mut S, header: usize, text: &str) -> Result<(), S::Error> {
    let bytes = wire_text(text);
    sink.put(bytes)?;
    let terminated = bytes.len() + 1;
    sink.put_padding(1 + padding(header + terminated))
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(n).ok_or(DecodeError::Truncated)?;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(DecodeError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        self.take(n).map(|_| ())
    }

    fn rest(&mut self) -> &'a [u8] {
        let slice = &self.bytes[self.pos..];
        self.pos = self.bytes.len();
        slice
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        self.array().map(u32::from_le_bytes)
    }

    fn i32(&mut self) -> Result<i32, DecodeError> {
        self.array().map(i32::from_le_bytes)
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        self.array().map(u16::from_le_bytes)
    }

    fn i16(&mut self) -> Result<i16, DecodeError> {
        self.array().map(i16::from_le_bytes)
    }

    /// NUL-terminated string followed by padding to the next word
    fn string(&mut self) -> Result<&'a str, DecodeError> {
        let start = self.pos;
        let tail = &self.bytes[start..];
        let len = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or(DecodeError::MissingTerminator)?;
        let text = core::str::from_utf8(&tail[..len]).map_err(|_| DecodeError::InvalidUtf8)?;
        let end = padded_len(start + len + 1);
        if end > self.bytes.len() {
            return Err(DecodeError::Truncated);
        }
        self.pos = end;
        Ok(text)
    }
}

/// Iterator decoding consecutive commands from a byte stream
///
/// Stops after the first error.
pub struct CommandIter<'a> {
    bytes: &'a [u8],
}

impl<'a> CommandIter<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl<'a> Iterator for CommandIter<'a> {
    type Item = Result<Command<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bytes.is_empty() {
            return None;
        }
        match Command::decode(self.bytes) {
            Ok((cmd, used)) => {
                self.bytes = &self.bytes[used..];
                Some(Ok(cmd))
            }
            Err(e) => {
                self.bytes = &[];
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dl::Primitive;
    use heapless::Vec;
    use proptest::prelude::*;

    fn encode(cmd: &Command) -> Vec<u8, 512> {
        let mut buf = Vec::new();
        cmd.encode(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_text_layout() {
        let cmd = Command::text(240, 136, 31, opt::CENTER, "HELLO AT HZIRI");
        let bytes = encode(&cmd);
        assert_eq!(bytes.len(), 28);
        assert_eq!(cmd.encoded_len(), 28);
        assert_eq!(&bytes[..4], &[0x0C, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&bytes[4..8], &[0xF0, 0x00, 0x88, 0x00]);
        assert_eq!(&bytes[8..12], &[0x1F, 0x00, 0x00, 0x06]);
        assert_eq!(&bytes[12..26], b"HELLO AT HZIRI");
        assert_eq!(&bytes[26..], &[0, 0]);
    }

    #[test]
    fn test_string_padding_counts_header() {
        // 12 + 3 + 1 = 16, already aligned: NUL only
        let bytes = encode(&Command::text(0, 0, 26, 0, "abc"));
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes[15], 0);
        // 12 + 4 + 1 = 17 -> 20
        assert_eq!(encode(&Command::text(0, 0, 26, 0, "abcd")).len(), 20);
        // empty string still carries its NUL
        assert_eq!(encode(&Command::text(0, 0, 26, 0, "")).len(), 16);
    }

    #[test]
    fn test_embedded_nul_ends_string() {
        let cmd = Command::text(0, 0, 26, 0, "AB\0CDEFGHIJ");
        let bytes = encode(&cmd);
        assert_eq!(bytes.len(), 16);
        assert_eq!(cmd.encoded_len(), 16);

        let decoded: Vec<_, 4> = CommandIter::new(&bytes).collect();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0], Ok(Command::text(0, 0, 26, 0, "AB")));

        let button = Command::Button {
            x: 0,
            y: 0,
            w: 80,
            h: 30,
            font: 27,
            options: 0,
            text: "\0\u{1}\u{1}\u{1}\u{1}",
        };
        assert_eq!(encode(&button).len(), 20);
        assert_eq!(CommandIter::new(&encode(&button)).count(), 1);
    }

    #[test]
    fn test_fixed_lengths_match_encoding() {
        let cmds = [
            Command::DlStart,
            Command::Swap,
            Command::Dl(DlCmd::begin(Primitive::Points)),
            Command::FgColor(Rgb::RED),
            Command::Number {
                x: 1,
                y: 2,
                font: 26,
                options: opt::SIGNED,
                n: -42,
            },
            Command::Gradient {
                x0: 0,
                y0: 0,
                rgb0: Rgb::BLACK,
                x1: 480,
                y1: 272,
                rgb1: Rgb::WHITE,
            },
            Command::Progress {
                x: 10,
                y: 10,
                w: 100,
                h: 10,
                options: opt::FLAT,
                val: 50,
                range: 100,
            },
            Command::Scrollbar {
                x: 0,
                y: 0,
                w: 10,
                h: 100,
                options: 0,
                val: 1,
                size: 2,
                range: 3,
            },
            Command::Spinner {
                x: 240,
                y: 136,
                style: 0,
                scale: 0,
            },
            Command::Track {
                x: 0,
                y: 0,
                w: 100,
                h: 100,
                tag: 7,
            },
            Command::Calibrate,
            Command::SetBitmap {
                addr: 0,
                format: BitmapFormat::L8,
                width: 8,
                height: 8,
            },
            Command::MemCpy {
                dst: 0,
                src: 64,
                num: 64,
            },
        ];
        for cmd in cmds.iter() {
            assert_eq!(encode(cmd).len(), cmd.encoded_len(), "{:?}", cmd);
            assert_eq!(cmd.encoded_len() % 4, 0);
        }
    }

    #[test]
    fn test_memwrite_pads_payload() {
        let cmd = Command::MemWrite {
            ptr: 0x100,
            data: &[1, 2, 3, 4, 5],
        };
        let bytes = encode(&cmd);
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[4..8], &0x100u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &5u32.to_le_bytes());
        assert_eq!(&bytes[12..], &[1, 2, 3, 4, 5, 0, 0, 0]);
    }

    #[test]
    fn test_decode_display_list_word() {
        let bytes = 0x2600_0007u32.to_le_bytes();
        let (cmd, used) = Command::decode(&bytes).unwrap();
        assert_eq!(cmd, Command::Dl(DlCmd::clear(true, true, true)));
        assert_eq!(used, 4);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            Command::decode(&[0x0C, 0xFF]).unwrap_err(),
            DecodeError::Truncated
        );
        assert_eq!(
            Command::decode(&0xFFFF_FFF0u32.to_le_bytes()).unwrap_err(),
            DecodeError::UnknownOpcode(0xFFFF_FFF0)
        );

        let mut bytes = encode(&Command::text(0, 0, 26, 0, "abcd"));
        for b in bytes.iter_mut().skip(12) {
            *b = b'x';
        }
        assert_eq!(
            Command::decode(&bytes).unwrap_err(),
            DecodeError::MissingTerminator
        );

        let mut bytes = encode(&Command::text(0, 0, 26, 0, "ab"));
        bytes[12] = 0xC3;
        assert_eq!(
            Command::decode(&bytes).unwrap_err(),
            DecodeError::InvalidUtf8
        );

        // 12 + 5 + 1 = 18 -> needs 20 bytes
        let bytes = encode(&Command::text(0, 0, 26, 0, "abcde"));
        assert_eq!(
            Command::decode(&bytes[..18]).unwrap_err(),
            DecodeError::Truncated
        );
    }

    #[test]
    fn test_iter_walks_burst() {
        let burst = [
            Command::DlStart,
            Command::Dl(DlCmd::clear_color_rgb(0, 0, 0)),
            Command::Dl(DlCmd::clear(true, true, true)),
            Command::text(10, 10, 28, 0, "hi"),
            Command::Dl(DlCmd::display()),
            Command::Swap,
        ];
        let mut bytes: Vec<u8, 512> = Vec::new();
        for cmd in burst.iter() {
            cmd.encode(&mut bytes).unwrap();
        }
        let mut decoded = CommandIter::new(&bytes);
        for cmd in burst.iter() {
            assert_eq!(decoded.next(), Some(Ok(*cmd)));
        }
        assert_eq!(decoded.next(), None);
    }

    #[test]
    fn test_sink_full() {
        let mut small: Vec<u8, 8> = Vec::new();
        let cmd = Command::text(0, 0, 26, 0, "too long");
        assert_eq!(cmd.encode(&mut small), Err(SinkFull));
    }

    proptest! {
        #[test]
        fn prop_text_roundtrip(
            x in any::<i16>(),
            y in any::<i16>(),
            font in 16i16..=34,
            options in any::<u16>(),
            text in "[\\x00 -~]{0,64}",
        ) {
            let cmd = Command::text(x, y, font, options, &text);
            let bytes = encode(&cmd);
            prop_assert_eq!(bytes.len() % 4, 0);
            prop_assert_eq!(bytes.len(), cmd.encoded_len());
            let (decoded, used) = Command::decode(&bytes).unwrap();
            prop_assert_eq!(used, bytes.len());
            let sent = text.split('\0').next().unwrap_or("");
            prop_assert_eq!(decoded, Command::text(x, y, font, options, sent));
        }

        #[test]
        fn prop_button_roundtrip(
            w in 1i16..480,
            h in 1i16..272,
            text in "[a-zA-Z0-9 ]{0,32}",
        ) {
            let cmd = Command::Button { x: 5, y: 6, w, h, font: 27, options: opt::FLAT, text: &text };
            let bytes = encode(&cmd);
            prop_assert_eq!(bytes.len() % 4, 0);
            prop_assert_eq!(Command::decode(&bytes).unwrap(), (cmd, bytes.len()));
        }

        #[test]
        fn prop_memwrite_roundtrip(
            ptr in 0u32..0x10_0000,
            data in proptest::collection::vec(any::<u8>(), 0..128),
        ) {
            let cmd = Command::MemWrite { ptr, data: &data };
            let bytes = encode(&cmd);
            prop_assert_eq!(bytes.len(), cmd.encoded_len());
            prop_assert_eq!(bytes.len() % 4, 0);
            prop_assert_eq!(Command::decode(&bytes).unwrap(), (cmd, bytes.len()));
        }
    }
}

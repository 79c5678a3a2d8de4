//! Display-list instructions
//!
//! A display list is a flat sequence of 32-bit words, one instruction each.
//! The words can be written straight into `RAM_DL` or queued through the
//! co-processor, which copies anything it does not recognise as one of its
//! own commands into the display list it is building.

/// One display-list instruction word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DlCmd(pub u32);

/// 24-bit color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);
    pub const RED: Rgb = Rgb::new(0xFF, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packed `0x00RRGGBB`
    pub const fn to_u32(self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    /// Unpack from `0x00RRGGBB`
    pub const fn from_u32(value: u32) -> Self {
        Self::new((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }
}

/// Graphics primitive selected by `BEGIN`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Primitive {
    Bitmaps = 1,
    Points = 2,
    Lines = 3,
    LineStrip = 4,
    EdgeStripR = 5,
    EdgeStripL = 6,
    EdgeStripA = 7,
    EdgeStripB = 8,
    Rects = 9,
}

/// Bitmap pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum BitmapFormat {
    Argb1555 = 0,
    L1 = 1,
    L4 = 2,
    L8 = 3,
    Rgb332 = 4,
    Argb2 = 5,
    Argb4 = 6,
    Rgb565 = 7,
    Text8x8 = 9,
    TextVga = 10,
    Bargraph = 11,
    Paletted565 = 14,
    Paletted4444 = 15,
    Paletted8 = 16,
    L2 = 17,
}

impl BitmapFormat {
    /// Bytes per line for a bitmap of `width` pixels
    pub const fn stride(self, width: u16) -> u16 {
        let width = width as u32;
        let stride = match self {
            BitmapFormat::L1 => (width + 7) / 8,
            BitmapFormat::L2 => (width + 3) / 4,
            BitmapFormat::L4 => (width + 1) / 2,
            BitmapFormat::L8
            | BitmapFormat::Rgb332
            | BitmapFormat::Argb2
            | BitmapFormat::Paletted8
            | BitmapFormat::Bargraph => width,
            BitmapFormat::Text8x8 | BitmapFormat::TextVga => width * 2,
            BitmapFormat::Argb1555
            | BitmapFormat::Argb4
            | BitmapFormat::Rgb565
            | BitmapFormat::Paletted565
            | BitmapFormat::Paletted4444 => width * 2,
        };
        stride as u16
    }

    /// Look up a format by its register value
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => BitmapFormat::Argb1555,
            1 => BitmapFormat::L1,
            2 => BitmapFormat::L4,
            3 => BitmapFormat::L8,
            4 => BitmapFormat::Rgb332,
            5 => BitmapFormat::Argb2,
            6 => BitmapFormat::Argb4,
            7 => BitmapFormat::Rgb565,
            9 => BitmapFormat::Text8x8,
            10 => BitmapFormat::TextVga,
            11 => BitmapFormat::Bargraph,
            14 => BitmapFormat::Paletted565,
            15 => BitmapFormat::Paletted4444,
            16 => BitmapFormat::Paletted8,
            17 => BitmapFormat::L2,
            _ => return None,
        })
    }
}

/// Bitmap sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Filter {
    Nearest = 0,
    Bilinear = 1,
}

/// Bitmap edge behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Wrap {
    Border = 0,
    Repeat = 1,
}

const fn op(code: u32) -> u32 {
    code << 24
}

impl DlCmd {
    /// Size of one instruction in bytes
    pub const LENGTH: u32 = 4;

    /// End of the display list
    pub const fn display() -> Self {
        DlCmd(0)
    }

    pub const fn clear_color_rgb(r: u8, g: u8, b: u8) -> Self {
        DlCmd(op(0x02) | Rgb::new(r, g, b).to_u32())
    }

    pub const fn clear_color_a(alpha: u8) -> Self {
        DlCmd(op(0x0F) | alpha as u32)
    }

    /// Clear the color, stencil and tag buffers selectively
    pub const fn clear(color: bool, stencil: bool, tag: bool) -> Self {
        DlCmd(op(0x26) | (color as u32) << 2 | (stencil as u32) << 1 | tag as u32)
    }

    pub const fn color_rgb(r: u8, g: u8, b: u8) -> Self {
        DlCmd(op(0x04) | Rgb::new(r, g, b).to_u32())
    }

    pub const fn color_a(alpha: u8) -> Self {
        DlCmd(op(0x10) | alpha as u32)
    }

    pub const fn begin(primitive: Primitive) -> Self {
        DlCmd(op(0x1F) | primitive as u32)
    }

    pub const fn end() -> Self {
        DlCmd(op(0x21))
    }

    /// Point radius in 1/16 pixel
    pub const fn point_size(size: u16) -> Self {
        DlCmd(op(0x0D) | (size as u32 & 0x1FFF))
    }

    /// Line width in 1/16 pixel
    pub const fn line_width(width: u16) -> Self {
        DlCmd(op(0x0E) | (width as u32 & 0xFFF))
    }

    /// Vertex in sub-pixel units (1/16 pixel with the default format)
    pub const fn vertex2f(x: i16, y: i16) -> Self {
        DlCmd(1 << 30 | (x as u32 & 0x7FFF) << 15 | (y as u32 & 0x7FFF))
    }

    /// Vertex in whole pixels with bitmap handle and cell
    pub const fn vertex2ii(x: u16, y: u16, handle: u8, cell: u8) -> Self {
        DlCmd(
            2 << 30
                | (x as u32 & 0x1FF) << 21
                | (y as u32 & 0x1FF) << 12
                | (handle as u32 & 0x1F) << 7
                | (cell as u32 & 0x7F),
        )
    }

    /// Fractional bits used by `vertex2f`
    pub const fn vertex_format(frac: u8) -> Self {
        DlCmd(op(0x27) | (frac as u32 & 0x7))
    }

    pub const fn tag(tag: u8) -> Self {
        DlCmd(op(0x03) | tag as u32)
    }

    pub const fn tag_mask(enabled: bool) -> Self {
        DlCmd(op(0x14) | enabled as u32)
    }

    pub const fn bitmap_source(address: u32) -> Self {
        DlCmd(op(0x01) | (address & 0x3F_FFFF))
    }

    pub const fn bitmap_layout(format: BitmapFormat, stride: u16, height: u16) -> Self {
        DlCmd(
            op(0x07)
                | (format as u32 & 0x1F) << 19
                | (stride as u32 & 0x3FF) << 9
                | (height as u32 & 0x1FF),
        )
    }

    pub const fn bitmap_size(
        filter: Filter,
        wrap_x: Wrap,
        wrap_y: Wrap,
        width: u16,
        height: u16,
    ) -> Self {
        DlCmd(
            op(0x08)
                | (filter as u32) << 20
                | (wrap_x as u32) << 19
                | (wrap_y as u32) << 18
                | (width as u32 & 0x1FF) << 9
                | (height as u32 & 0x1FF),
        )
    }

    pub const fn bitmap_handle(handle: u8) -> Self {
        DlCmd(op(0x05) | (handle as u32 & 0x1F))
    }

    pub const fn scissor_xy(x: u16, y: u16) -> Self {
        DlCmd(op(0x1B) | (x as u32 & 0x7FF) << 11 | (y as u32 & 0x7FF))
    }

    pub const fn scissor_size(width: u16, height: u16) -> Self {
        DlCmd(op(0x1C) | (width as u32 & 0xFFF) << 12 | (height as u32 & 0xFFF))
    }

    pub const fn save_context() -> Self {
        DlCmd(op(0x22))
    }

    pub const fn restore_context() -> Self {
        DlCmd(op(0x23))
    }

    /// Raw instruction word
    pub const fn to_u32(self) -> u32 {
        self.0
    }
}

impl From<DlCmd> for u32 {
    fn from(cmd: DlCmd) -> u32 {
        cmd.0
    }
}

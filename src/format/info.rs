//! Pixel formats understood by the video DMA engines
//!
//! Every memory format is tied to the media bus code the stream carries on the AXI4-Stream links
//! of the pipeline. Several memory formats may share the same bus code, e.g. `NV12` and `NV12M`
//! only differ in how the planes are laid out in memory.

use std::fmt;

use crate::format::mbus::code;
use crate::format::FourCC;
use crate::Fraction;

#[derive(Debug, PartialEq, Eq)]
/// Static description of a pixel format
pub struct FormatInfo {
    /// memory pixel format
    pub fourcc: FourCC,
    /// media bus code on the stream side
    pub code: u32,
    /// average number of bits per pixel, all planes included
    pub bits_per_pixel: u8,
    /// bytes per pixel in a line of each plane
    pub bytes_per_pixel: Fraction,
    /// number of planes (1 or 2)
    pub num_planes: u8,
    /// number of memory buffers, 2 only when each plane has its own buffer
    pub num_buffers: u8,
    /// horizontal chroma subsampling factor
    pub hsub: u8,
    /// vertical chroma subsampling factor
    pub vsub: u8,
}

impl FormatInfo {
    /// Whether all planes live in a single memory buffer
    pub fn is_contiguous(&self) -> bool {
        self.num_buffers == 1
    }
}

impl fmt::Display for FormatInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "fourcc         : {}", self.fourcc)?;
        writeln!(f, "code           : 0x{:04x}", self.code)?;
        writeln!(f, "bpp            : {}", self.bits_per_pixel)?;
        writeln!(f, "bytes/pixel    : {}", self.bytes_per_pixel)?;
        writeln!(f, "planes         : {}", self.num_planes)?;
        writeln!(f, "buffers        : {}", self.num_buffers)?;
        writeln!(f, "subsampling    : {}x{}", self.hsub, self.vsub)?;
        Ok(())
    }
}

const fn packed(fourcc: FourCC, code: u32, bits: u8, bpp: Fraction) -> FormatInfo {
    FormatInfo {
        fourcc,
        code,
        bits_per_pixel: bits,
        bytes_per_pixel: bpp,
        num_planes: 1,
        num_buffers: 1,
        hsub: 1,
        vsub: 1,
    }
}

#[allow(clippy::too_many_arguments)]
const fn semi_planar(
    fourcc: FourCC,
    code: u32,
    bits: u8,
    bpp: Fraction,
    buffers: u8,
    hsub: u8,
    vsub: u8,
) -> FormatInfo {
    FormatInfo {
        fourcc,
        code,
        bits_per_pixel: bits,
        bytes_per_pixel: bpp,
        num_planes: 2,
        num_buffers: buffers,
        hsub,
        vsub,
    }
}

#[rustfmt::skip]
static FORMATS: [FormatInfo; 35] = [
    semi_planar(FourCC::NV12,   code::VYYUYY8_1X24,   12, Fraction::new(1, 1), 1, 1, 2),
    semi_planar(FourCC::NV12M,  code::VYYUYY8_1X24,   12, Fraction::new(1, 1), 2, 1, 2),
    semi_planar(FourCC::XV15,   code::VYYUYY10_4X20,  12, Fraction::new(4, 3), 1, 2, 2),
    semi_planar(FourCC::XV15M,  code::VYYUYY10_4X20,  12, Fraction::new(4, 3), 2, 1, 2),
    semi_planar(FourCC::X012,   code::UYYVYY12_4X24,  12, Fraction::new(5, 3), 1, 2, 2),
    semi_planar(FourCC::X012M,  code::UYYVYY12_4X24,  12, Fraction::new(5, 3), 2, 1, 2),
    semi_planar(FourCC::X016,   code::UYYVYY16_4X32,  12, Fraction::new(2, 1), 1, 2, 2),
    semi_planar(FourCC::X016M,  code::UYYVYY16_4X32,  12, Fraction::new(2, 1), 2, 1, 2),
    semi_planar(FourCC::NV16,   code::UYVY8_1X16,     16, Fraction::new(1, 1), 1, 1, 1),
    semi_planar(FourCC::NV16M,  code::UYVY8_1X16,     16, Fraction::new(1, 1), 2, 1, 1),
    FormatInfo { hsub: 2, ..packed(FourCC::YUYV, code::UYVY8_1X16, 16, Fraction::new(2, 1)) },
    FormatInfo { hsub: 2, ..packed(FourCC::UYVY, code::UYVY8_1X16, 16, Fraction::new(2, 1)) },
    semi_planar(FourCC::XV20,   code::UYVY10_1X20,    16, Fraction::new(4, 3), 1, 2, 1),
    semi_planar(FourCC::XV20M,  code::UYVY10_1X20,    16, Fraction::new(4, 3), 2, 1, 1),
    packed(FourCC::VUY24,       code::VUY8_1X24,      24, Fraction::new(3, 1)),
    packed(FourCC::XVUY32,      code::VUY8_1X24,      32, Fraction::new(4, 1)),
    packed(FourCC::XVUY10,      code::VUY10_1X30,     32, Fraction::new(4, 1)),
    packed(FourCC::BGR24,       code::RBG888_1X24,    24, Fraction::new(3, 1)),
    packed(FourCC::RGB24,       code::RBG888_1X24,    24, Fraction::new(3, 1)),
    packed(FourCC::BGRX32,      code::RBG888_1X24,    32, Fraction::new(4, 1)),
    packed(FourCC::XBGR32,      code::RBG888_1X24,    32, Fraction::new(4, 1)),
    packed(FourCC::XBGR30,      code::RBG101010_1X30, 32, Fraction::new(4, 1)),
    packed(FourCC::BGR48,       code::RBG161616_1X48, 48, Fraction::new(6, 1)),
    packed(FourCC::GREY,        code::Y8_1X8,          8, Fraction::new(1, 1)),
    packed(FourCC::XY10,        code::Y10_1X10,       32, Fraction::new(4, 3)),
    packed(FourCC::Y16,         code::Y16_1X16,       16, Fraction::new(2, 1)),
    packed(FourCC::SRGGB8,      code::SRGGB8_1X8,      8, Fraction::new(1, 1)),
    packed(FourCC::SGRBG8,      code::SGRBG8_1X8,      8, Fraction::new(1, 1)),
    packed(FourCC::SGBRG8,      code::SGBRG8_1X8,      8, Fraction::new(1, 1)),
    packed(FourCC::SBGGR8,      code::SBGGR8_1X8,      8, Fraction::new(1, 1)),
    packed(FourCC::SRGGB10,     code::SRGGB10_1X10,   10, Fraction::new(2, 1)),
    packed(FourCC::SBGGR10,     code::SBGGR10_1X10,   10, Fraction::new(2, 1)),
    packed(FourCC::SRGGB12,     code::SRGGB12_1X12,   12, Fraction::new(2, 1)),
    packed(FourCC::SBGGR12,     code::SBGGR12_1X12,   12, Fraction::new(2, 1)),
    packed(FourCC::SRGGB16,     code::SRGGB16_1X16,   16, Fraction::new(2, 1)),
];

/// Returns all known formats, in table order
pub fn formats() -> &'static [FormatInfo] {
    &FORMATS
}

/// Retrieves the format information for a pixel format
///
/// Unknown pixel formats resolve to the first entry of the table, so the result can always be
/// used to normalize a format request.
///
/// # Example
///
/// ```
/// use vipp::format::{info, FourCC};
///
/// assert_eq!(info::by_fourcc(FourCC::YUYV).fourcc, FourCC::YUYV);
/// assert_eq!(info::by_fourcc(FourCC::new(b"ABCD")).fourcc, FourCC::NV12);
/// ```
pub fn by_fourcc(fourcc: FourCC) -> &'static FormatInfo {
    FORMATS
        .iter()
        .find(|info| info.fourcc == fourcc)
        .unwrap_or(&FORMATS[0])
}

/// Retrieves the first format carried by media bus code `code`
pub fn by_code(code: u32) -> Option<&'static FormatInfo> {
    FORMATS.iter().find(|info| info.code == code)
}

/// Retrieves the `index`'th format of the table
pub fn by_index(index: usize) -> Option<&'static FormatInfo> {
    FORMATS.get(index)
}

use std::fmt;

use crate::format::FieldOrder;

/// Media bus codes describing the pixel layout on a stream link
#[allow(clippy::unreadable_literal)]
pub mod code {
    pub const Y8_1X8: u32 = 0x2001;
    pub const Y10_1X10: u32 = 0x200a;
    pub const UYVY8_1X16: u32 = 0x200f;
    pub const UYVY10_1X20: u32 = 0x201a;
    pub const VUY8_1X24: u32 = 0x2024;
    pub const VYYUYY8_1X24: u32 = 0x202c;
    pub const Y16_1X16: u32 = 0x202e;
    pub const VYYUYY10_4X20: u32 = 0x2031;
    pub const UYYVYY12_4X24: u32 = 0x2038;
    pub const UYYVYY16_4X32: u32 = 0x203a;
    pub const VUY10_1X30: u32 = 0x2102;
    pub const RBG888_1X24: u32 = 0x100e;
    pub const RBG101010_1X30: u32 = 0x1018;
    pub const RBG161616_1X48: u32 = 0x101a;
    pub const SBGGR8_1X8: u32 = 0x3001;
    pub const SGRBG8_1X8: u32 = 0x3002;
    pub const SBGGR10_1X10: u32 = 0x3007;
    pub const SBGGR12_1X12: u32 = 0x3008;
    pub const SGBRG8_1X8: u32 = 0x3013;
    pub const SRGGB8_1X8: u32 = 0x3014;
    pub const SRGGB10_1X10: u32 = 0x300f;
    pub const SRGGB12_1X12: u32 = 0x3012;
    pub const SRGGB16_1X16: u32 = 0x3020;
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
/// Active format on a stage pad
pub struct MbusFormat {
    /// media bus code
    pub code: u32,
    /// width in pixels
    pub width: u32,
    /// height in lines
    pub height: u32,
    /// field order of the stream
    pub field: FieldOrder,
}

impl MbusFormat {
    pub const fn new(code: u32, width: u32, height: u32) -> Self {
        MbusFormat {
            code,
            width,
            height,
            field: FieldOrder::Progressive,
        }
    }
}

impl fmt::Display for MbusFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:04x} {}x{} ({})",
            self.code, self.width, self.height, self.field
        )
    }
}

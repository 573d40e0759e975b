use std::fmt;

pub mod field;
pub use field::FieldOrder;

pub mod fourcc;
pub use fourcc::FourCC;

pub mod info;
pub use info::FormatInfo;

pub mod mbus;
pub use mbus::MbusFormat;

/// Maximum number of planes a DMA engine can address
pub const MAX_PLANES: usize = 2;

/// Streaming format (multi-planar)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Format {
    /// width in pixels
    pub width: u32,
    /// height in pixels
    pub height: u32,
    /// pixelformat code
    pub fourcc: FourCC,
    /// field order for interlacing
    pub field_order: FieldOrder,

    pub plane_fmt: [PlaneFormat; MAX_PLANES],

    /// number of memory buffers described by `plane_fmt`
    pub num_planes: u8,
}

impl Format {
    /// Returns a format request
    ///
    /// Stride and size are left at zero, negotiation fills them in.
    ///
    /// # Arguments
    ///
    /// * `width` - Width in pixels
    /// * `height` - Height in pixels
    /// * `fourcc` - Four character code (pixelformat)
    ///
    /// # Example
    ///
    /// ```
    /// use vipp::format::{Format, FourCC};
    /// let fmt = Format::new(1920, 1080, FourCC::NV12);
    /// ```
    pub const fn new(width: u32, height: u32, fourcc: FourCC) -> Self {
        Format {
            width,
            height,
            fourcc,
            field_order: FieldOrder::Progressive,
            plane_fmt: [PlaneFormat { stride: 0, size: 0 }; MAX_PLANES],
            num_planes: 1,
        }
    }

    /// Planes that are backed by a memory buffer
    pub fn planes(&self) -> &[PlaneFormat] {
        &self.plane_fmt[..(self.num_planes as usize).min(MAX_PLANES)]
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "width          : {}", self.width)?;
        writeln!(f, "height         : {}", self.height)?;
        writeln!(f, "fourcc         : {}", self.fourcc)?;
        writeln!(f, "field_order    : {}", self.field_order)?;
        for (i, plane) in self.planes().iter().enumerate() {
            writeln!(f, "plane_fmt[{}]", i)?;
            write!(f, "{}", plane)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct PlaneFormat {
    /// bytes per line
    pub stride: u32,
    /// maximum number of bytes required to store an image
    pub size: u32,
}

impl fmt::Display for PlaneFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  stride         : {}", self.stride)?;
        writeln!(f, "  size           : {}", self.size)?;
        Ok(())
    }
}

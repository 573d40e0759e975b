use std::{fmt, str};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
/// Four character code representing a pixelformat
pub struct FourCC {
    pub repr: [u8; 4],
}

impl FourCC {
    pub const YUYV: FourCC = FourCC::new(b"YUYV");
    pub const UYVY: FourCC = FourCC::new(b"UYVY");
    pub const NV12: FourCC = FourCC::new(b"NV12");
    pub const NV12M: FourCC = FourCC::new(b"NM12");
    pub const NV16: FourCC = FourCC::new(b"NV16");
    pub const NV16M: FourCC = FourCC::new(b"NM16");
    pub const XV15: FourCC = FourCC::new(b"XV15");
    pub const XV15M: FourCC = FourCC::new(b"XM15");
    pub const XV20: FourCC = FourCC::new(b"XV20");
    pub const XV20M: FourCC = FourCC::new(b"XM20");
    pub const X012: FourCC = FourCC::new(b"X012");
    pub const X012M: FourCC = FourCC::new(b"XM12");
    pub const X016: FourCC = FourCC::new(b"X016");
    pub const X016M: FourCC = FourCC::new(b"XM16");
    pub const VUY24: FourCC = FourCC::new(b"VU24");
    pub const XVUY32: FourCC = FourCC::new(b"XV32");
    pub const XVUY10: FourCC = FourCC::new(b"XY30");
    pub const BGR24: FourCC = FourCC::new(b"BGR3");
    pub const RGB24: FourCC = FourCC::new(b"RGB3");
    pub const BGRX32: FourCC = FourCC::new(b"RX24");
    pub const XBGR32: FourCC = FourCC::new(b"XR24");
    pub const XBGR30: FourCC = FourCC::new(b"XR30");
    pub const BGR48: FourCC = FourCC::new(b"BGR6");
    pub const GREY: FourCC = FourCC::new(b"GREY");
    pub const XY10: FourCC = FourCC::new(b"XY10");
    pub const Y16: FourCC = FourCC::new(b"Y16 ");
    pub const SRGGB8: FourCC = FourCC::new(b"RGGB");
    pub const SGRBG8: FourCC = FourCC::new(b"GRBG");
    pub const SGBRG8: FourCC = FourCC::new(b"GBRG");
    pub const SBGGR8: FourCC = FourCC::new(b"BA81");
    pub const SRGGB10: FourCC = FourCC::new(b"RG10");
    pub const SBGGR10: FourCC = FourCC::new(b"BG10");
    pub const SRGGB12: FourCC = FourCC::new(b"RG12");
    pub const SBGGR12: FourCC = FourCC::new(b"BG12");
    pub const SRGGB16: FourCC = FourCC::new(b"RG16");

    #[allow(clippy::trivially_copy_pass_by_ref)]
    /// Returns a pixelformat as four character code
    ///
    /// # Arguments
    ///
    /// * `repr` - Four characters as raw bytes
    ///
    /// # Example
    ///
    /// ```
    /// use vipp::format::FourCC;
    /// let fourcc = FourCC::new(b"NV12");
    /// assert_eq!(fourcc, FourCC::NV12);
    /// ```
    pub const fn new(repr: &[u8; 4]) -> FourCC {
        FourCC { repr: *repr }
    }

    /// Returns the string representation of a four character code
    pub fn str(&self) -> Result<&str, str::Utf8Error> {
        str::from_utf8(&self.repr)
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.str() {
            Ok(string) => write!(f, "{}", string),
            Err(_) => write!(f, "0x{:08x}", u32::from(*self)),
        }
    }
}

impl From<u32> for FourCC {
    fn from(code: u32) -> Self {
        FourCC::new(&code.to_le_bytes())
    }
}

impl From<FourCC> for u32 {
    fn from(fourcc: FourCC) -> Self {
        Self::from_le_bytes(fourcc.repr)
    }
}

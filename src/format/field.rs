use std::fmt;

/// Field order of a stream
///
/// Values match the field codes of the media bus and video interfaces.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum FieldOrder {
    /// full frames
    #[default]
    Progressive = 1,
    /// a single top (odd) field
    Top = 2,
    /// a single bottom (even) field
    Bottom = 3,
    /// both fields woven into one frame
    Interlaced = 4,
    /// one field per buffer, alternating between top and bottom
    Alternate = 7,
}

impl FieldOrder {
    /// Numeric field code
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Field id tag programmed into a transfer descriptor
    ///
    /// The hardware marks odd (top) fields with 1 and even (bottom) fields with 0. Progressive
    /// frames are tagged like bottom fields. Every other order carries no tag.
    pub fn fid(self) -> Option<u32> {
        match self {
            FieldOrder::Top => Some(1),
            FieldOrder::Bottom | FieldOrder::Progressive => Some(0),
            _ => None,
        }
    }

    /// Maps a field id reported by the hardware back to a field
    pub fn from_fid(fid: u32) -> Self {
        if fid != 0 {
            FieldOrder::Top
        } else {
            FieldOrder::Bottom
        }
    }
}

impl fmt::Display for FieldOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Progressive => write!(f, "progressive"),
            Self::Top => write!(f, "top"),
            Self::Bottom => write!(f, "bottom"),
            Self::Interlaced => write!(f, "interlaced"),
            Self::Alternate => write!(f, "alternate"),
        }
    }
}

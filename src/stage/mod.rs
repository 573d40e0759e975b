//! Processing stages
//!
//! Stages are the hardware blocks between the DMA engines: receivers, color space and chroma
//! resampling converters, stream switches and HLS cores. They own no buffers, the pipeline only
//! needs to turn their streams on and off and to read their active formats.

use std::fmt;

use crate::format::MbusFormat;
use crate::graph::PadFlags;
use crate::Result;

pub mod passthrough;
pub use passthrough::Passthrough;

/// Mask selecting the first stream of a pad
pub const STREAM0: u64 = 1;

/// Kind of processing block behind a stage
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Kind {
    /// camera sensor or serializer at the head of the pipeline
    Sensor,
    /// CSI-2 or similar receiver
    Receiver,
    /// color space or chroma resampling converter
    Converter,
    /// color filter array demosaicing
    Cfa,
    /// AXI4-Stream switch routing sinks to sources
    Switch,
    /// high level synthesis core
    Hls,
    #[default]
    Other,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Sensor => write!(f, "sensor"),
            Kind::Receiver => write!(f, "receiver"),
            Kind::Converter => write!(f, "converter"),
            Kind::Cfa => write!(f, "cfa"),
            Kind::Switch => write!(f, "switch"),
            Kind::Hls => write!(f, "hls"),
            Kind::Other => write!(f, "other"),
        }
    }
}

/// Stage capability protocol
///
/// Streams on a pad may be enabled once per pipeline branch going through it, an implementation
/// shared by several branches counts enables and only stops once every branch disabled it.
/// Propagation to the neighbouring stages is done by the graph, an implementation only handles
/// its own hardware.
pub trait Stage: Send + Sync {
    /// Entity name, used in logs and errors
    fn name(&self) -> &str;

    /// Kind of block
    fn kind(&self) -> Kind {
        Kind::Other
    }

    /// Direction of every pad, indexed by pad number
    fn pads(&self) -> &[PadFlags];

    /// Enable streams on a pad
    ///
    /// # Arguments
    ///
    /// * `pad` - Pad the request enters the stage through
    /// * `streams` - Mask of streams to enable
    fn enable_streams(&self, pad: u32, streams: u64) -> Result<()>;

    /// Disable streams on a pad
    fn disable_streams(&self, pad: u32, streams: u64) -> Result<()>;

    /// Returns the active format of a pad
    fn format(&self, pad: u32) -> Result<MbusFormat>;
}

use bitflags::bitflags;
use std::fmt;

use crate::format::{FieldOrder, MAX_PLANES};
use crate::Timestamp;

/// State a buffer is handed back to the queue with
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum State {
    /// Returned unprocessed, streaming never started
    Queued,
    /// Transfer completed
    Done,
    /// Transfer failed or was cancelled
    Error,
}

bitflags! {
    #[allow(clippy::unreadable_literal)]
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Flags: u32 {
        /// Buffer is queued for processing
        const QUEUED                = 0x00000002;
        /// Buffer is ready
        const DONE                  = 0x00000004;
        /// Buffer is ready, but the data contained within is corrupted
        const ERROR                 = 0x00000040;
        /// Timestamp taken from the monotonic clock, at end of frame
        const TIMESTAMP_MONOTONIC   = 0x00002000;
    }
}

impl Default for Flags {
    fn default() -> Self {
        Flags::empty()
    }
}

impl From<State> for Flags {
    fn from(state: State) -> Self {
        match state {
            State::Queued => Flags::QUEUED,
            State::Done => Flags::DONE | Flags::TIMESTAMP_MONOTONIC,
            State::Error => Flags::DONE | Flags::ERROR,
        }
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Buffer metadata, filled in on completion
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Sequence number, counting the frames
    pub sequence: u32,
    /// Time of completion
    pub timestamp: Timestamp,
    /// Field carried by the buffer
    pub field: FieldOrder,
    /// Number of bytes occupied by data in each plane
    pub bytesused: [u32; MAX_PLANES],
    /// Buffer flags
    pub flags: Flags,
}

/// Image buffer owned by a buffer queue
///
/// The DMA addresses are the only view the engines need: transfers never go through the CPU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    /// Index of the buffer in its queue
    pub index: u32,
    /// DMA address of each memory plane
    pub addrs: [u64; MAX_PLANES],
    /// Number of valid entries in `addrs`
    pub num_planes: u8,
    /// Field declared by the application, only meaningful for input endpoints
    pub field: FieldOrder,
    pub meta: Metadata,
}

impl Buffer {
    /// Returns a single plane buffer
    ///
    /// # Arguments
    ///
    /// * `index` - Index of the buffer in its queue
    /// * `addr` - DMA address of the buffer memory
    ///
    /// # Example
    ///
    /// ```
    /// use vipp::Buffer;
    /// let buf = Buffer::new(0, 0x1000_0000);
    /// assert_eq!(buf.plane_addr(0), Some(0x1000_0000));
    /// ```
    pub fn new(index: u32, addr: u64) -> Self {
        Buffer {
            index,
            addrs: [addr, 0],
            num_planes: 1,
            field: FieldOrder::Progressive,
            meta: Metadata::default(),
        }
    }

    /// Returns a buffer with one memory region per plane
    pub fn with_planes(index: u32, luma: u64, chroma: u64) -> Self {
        Buffer {
            addrs: [luma, chroma],
            num_planes: 2,
            ..Buffer::new(index, luma)
        }
    }

    /// DMA address of plane `plane`, if the buffer has it
    pub fn plane_addr(&self, plane: usize) -> Option<u64> {
        if plane < self.num_planes as usize {
            self.addrs.get(plane).copied()
        } else {
            None
        }
    }
}

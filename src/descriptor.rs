//! Interleaved transfer descriptors
//!
//! A video frame is moved as a two dimensional transfer: `numf` lines of `size` bytes each,
//! separated by an inter chunk gap (`icg`) that skips the padding up to the next line. Two plane
//! formats add a second chunk for the chroma plane, which the engine reaches by skipping
//! `plane_gap` bytes after the last luma line.

use std::fmt;

use crate::buffer::Buffer;
use crate::format::{Format, FormatInfo, FourCC, MAX_PLANES};
use crate::{Error, Rect, Result};

/// Transfer direction, seen from the DMA engine
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    /// the engine writes the stream into memory (output endpoints)
    DevToMem,
    /// the engine reads memory into the stream (input endpoints)
    MemToDev,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::DevToMem => write!(f, "dev-to-mem"),
            Direction::MemToDev => write!(f, "mem-to-dev"),
        }
    }
}

/// Geometry of one plane
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// DMA address of the first byte
    pub addr: u64,
    /// bytes transferred per line
    pub size: u32,
    /// bytes skipped between two lines
    pub icg: u32,
    /// number of lines
    pub numf: u32,
}

/// Interleaved transfer template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interleaved {
    pub dir: Direction,
    /// memory format, the engine is configured for it before the transfer
    pub fourcc: FourCC,
    pub chunks: [Chunk; MAX_PLANES],
    /// number of valid chunks
    pub frame_size: u8,
    /// bytes between the end of the last luma line and the first chroma line
    pub plane_gap: u64,
    /// field id tag, none when the field is unspecified
    pub fid: Option<u32>,
}

impl Interleaved {
    /// Builds the descriptor moving `buf` with the negotiated format of an endpoint
    ///
    /// Only the `rect` region (crop or compose rectangle) of the frame is transferred. The second
    /// plane of a contiguous two plane format is located right after the full height first plane.
    ///
    /// # Arguments
    ///
    /// * `dir` - Transfer direction
    /// * `buf` - Buffer to transfer
    /// * `format` - Negotiated format
    /// * `info` - Format information matching `format`
    /// * `rect` - Active crop or compose rectangle
    pub fn for_buffer(
        dir: Direction,
        buf: &Buffer,
        format: &Format,
        info: &FormatInfo,
        rect: &Rect,
    ) -> Result<Self> {
        let stride = format.plane_fmt[0].stride;
        let luma = buf
            .plane_addr(0)
            .ok_or(Error::Invalid("buffer has no memory"))?;

        let width = info.bytes_per_pixel.scale(rect.width);
        let mut chunks = [Chunk::default(); MAX_PLANES];
        chunks[0] = Chunk {
            addr: luma,
            size: width,
            icg: stride.saturating_sub(width),
            numf: rect.height,
        };

        let mut plane_gap = 0;
        if info.num_planes == 2 {
            let chroma = if info.num_buffers == 2 {
                buf.plane_addr(1)
                    .ok_or(Error::Invalid("buffer lacks the chroma plane"))?
            } else {
                luma + stride as u64 * format.height as u64
            };

            let luma_end = luma + stride as u64 * rect.height as u64;
            plane_gap = chroma
                .checked_sub(luma_end)
                .ok_or(Error::Invalid("chroma plane overlaps the luma plane"))?;

            let chroma_stride = format.plane_fmt[1].stride.max(stride);
            chunks[1] = Chunk {
                addr: chroma,
                size: width,
                icg: chroma_stride.saturating_sub(width),
                numf: rect.height / info.vsub as u32,
            };
        }

        Ok(Interleaved {
            dir,
            fourcc: format.fourcc,
            chunks,
            frame_size: info.num_planes,
            plane_gap,
            fid: buf.field.fid(),
        })
    }

    /// Planes described by the template
    pub fn planes(&self) -> &[Chunk] {
        &self.chunks[..(self.frame_size as usize).min(MAX_PLANES)]
    }

    /// Number of lines of the first plane
    pub fn numf(&self) -> u32 {
        self.chunks[0].numf
    }

    /// Number of bytes the transfer moves
    pub fn len(&self) -> u64 {
        self.planes()
            .iter()
            .map(|c| c.size as u64 * c.numf as u64)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

use std::sync::Weak;

use crate::descriptor::Interleaved;
use crate::endpoint::Endpoint;
use crate::format::FourCC;
use crate::Result;

/// Identifies a prepared descriptor on its channel
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Cookie(pub u64);

/// Completion callback of one descriptor
///
/// The channel keeps the handle with the descriptor and consumes it when the transfer finishes.
/// Descriptors abandoned by [`Channel::terminate_all`] drop their handle without calling it.
#[derive(Debug)]
pub struct Completion {
    endpoint: Weak<Endpoint>,
    id: u64,
}

impl Completion {
    pub(crate) fn new(endpoint: Weak<Endpoint>, id: u64) -> Self {
        Completion { endpoint, id }
    }

    /// Signal the end of the transfer
    ///
    /// Safe to call from the channel's interrupt handling context: it only takes the endpoint's
    /// in-flight lock.
    ///
    /// # Arguments
    ///
    /// * `fid` - Field id of the transferred field, if the channel reports one
    pub fn complete(self, fid: Option<u32>) {
        if let Some(endpoint) = self.endpoint.upgrade() {
            endpoint.complete(self.id, fid);
        }
    }
}

/// Hardware DMA channel
///
/// Descriptors are prepared and submitted while the channel is idle; they only start moving data
/// once [`Channel::issue_pending`] has been called.
pub trait Channel: Send + Sync {
    /// Width alignment in pixels required by the engine, if any
    fn width_align(&self) -> Option<u32> {
        None
    }

    /// Stride alignment in bytes, as a power of two
    fn copy_align(&self) -> u32 {
        0
    }

    /// Pixel formats the engine supports, empty when it supports the whole format table
    fn formats(&self) -> Vec<FourCC> {
        Vec::new()
    }

    /// Prepare an interleaved transfer
    ///
    /// Fails with [`crate::Error::ChannelRejected`] when the engine cannot perform the transfer.
    ///
    /// # Arguments
    ///
    /// * `xt` - Transfer template
    /// * `done` - Completion to invoke when the transfer finishes
    fn prepare(&self, xt: &Interleaved, done: Completion) -> Result<Cookie>;

    /// Append a prepared descriptor to the pending queue
    fn submit(&self, cookie: Cookie);

    /// Start processing pending descriptors
    fn issue_pending(&self) -> Result<()>;

    /// Abort all transfers and drop every pending descriptor
    fn terminate_all(&self);
}

use crate::buffer::{Buffer, State};

/// Buffer queue protocol
///
/// A queue owns the image buffers. It lends them to an endpoint for DMA and gets them back through
/// [`Queue::done`], either from the completion path or when streaming stops.
pub trait Queue: Send + Sync {
    /// Whether buffers are allocated on the queue
    ///
    /// The negotiated format is frozen for as long as this returns true.
    fn is_busy(&self) -> bool;

    /// Take back a buffer previously handed to the endpoint
    ///
    /// This may be called from the completion path and must not block.
    ///
    /// # Arguments
    ///
    /// * `buf` - The buffer, its metadata filled in
    /// * `state` - Outcome of the transfer
    fn done(&self, buf: Buffer, state: State);
}

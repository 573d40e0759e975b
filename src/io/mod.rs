pub mod traits;
pub use traits::Queue;

pub mod queue;
pub use queue::BufferQueue;

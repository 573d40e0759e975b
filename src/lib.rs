//! Video pipeline streaming over DMA engines
//!
//! A [`Device`] holds a graph of processing stages with DMA [`Endpoint`]s at its edges. Endpoints
//! move frame buffers between memory and the stages, and the [`Pipeline`] shared by every
//! endpoint of a connected graph starts and stops the stages and engines as a unit.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vipp::channel::{Channel, Completion, Cookie};
//! use vipp::descriptor::Interleaved;
//! use vipp::endpoint::Type;
//! use vipp::format::{mbus::code, MbusFormat};
//! use vipp::graph::PadRef;
//! use vipp::io::BufferQueue;
//! use vipp::stage::{Kind, Passthrough};
//! use vipp::{Buffer, Config, Device, Result};
//!
//! struct Idle;
//!
//! impl Channel for Idle {
//!     fn prepare(&self, _: &Interleaved, _: Completion) -> Result<Cookie> { Ok(Cookie(0)) }
//!     fn submit(&self, _: Cookie) {}
//!     fn issue_pending(&self) -> Result<()> { Ok(()) }
//!     fn terminate_all(&self) {}
//! }
//!
//! let dev = Device::new(Config::default());
//! let fmt = MbusFormat::new(code::UYVY8_1X16, 1920, 1080);
//! let rx = dev.add_stage(Arc::new(Passthrough::new("rx", Kind::Receiver, 1, 1, fmt)));
//!
//! let queue = Arc::new(BufferQueue::new());
//! let ep = dev.add_endpoint(Type::Output, 0, Arc::new(Idle), queue.clone()).unwrap();
//! dev.link_output(PadRef::new(rx, 1), &ep).unwrap();
//!
//! ep.queue_buffer(Buffer::new(0, 0x1000_0000)).unwrap();
//! ep.start_streaming().unwrap();
//! assert_eq!(ep.pipeline().unwrap().use_count(), 1);
//! ep.stop_streaming();
//! ```

pub mod buffer;
pub use buffer::Buffer;

pub mod channel;
pub use channel::Channel;

pub mod config;
pub use config::{Config, Mode};

pub mod descriptor;

mod device;
pub use device::Device;

pub mod endpoint;
pub use endpoint::Endpoint;

mod error;
pub use error::{Error, Result};

pub mod format;
pub use format::{Format, FourCC};

mod fraction;
pub use fraction::Fraction;

pub mod graph;
pub use graph::Graph;

pub mod io;

pub mod pipeline;
pub use pipeline::Pipeline;

pub mod rect;
pub use rect::Rect;

pub mod stage;
pub use stage::Stage;

mod timestamp;
pub use timestamp::Timestamp;

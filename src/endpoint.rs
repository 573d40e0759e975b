//! DMA endpoints
//!
//! An endpoint is a DMA engine at the edge of the processing graph. Output endpoints write the
//! stream coming out of the pipeline into memory, input endpoints read memory and feed it into
//! the pipeline.

use log::{debug, error, warn};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::buffer::{self, Buffer, Flags, Metadata};
use crate::channel::{Channel, Completion};
use crate::config::Config;
use crate::descriptor::{Direction, Interleaved};
use crate::format::{info, FieldOrder, Format, FormatInfo, FourCC, PlaneFormat, MAX_PLANES};
use crate::graph::{EntityId, Graph, PadFlags};
use crate::io::Queue;
use crate::pipeline::Pipeline;
use crate::rect::{Rect, Target};
use crate::{Error, Result, Timestamp};

pub const DEFAULT_FORMAT: FourCC = FourCC::YUYV;
pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;

pub const MIN_WIDTH: u32 = 1;
pub const MAX_WIDTH: u32 = 65535;
pub const MIN_HEIGHT: u32 = 1;
pub const MAX_HEIGHT: u32 = 8191;

/// Side of the pipeline an endpoint sits on
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Type {
    /// consumes the pipeline output, writing frames to memory
    Output,
    /// reads frames from memory, producing the pipeline input
    Input,
}

impl Type {
    /// Direction of the transfers, seen from the DMA engine
    pub fn direction(self) -> Direction {
        match self {
            Type::Output => Direction::DevToMem,
            Type::Input => Direction::MemToDev,
        }
    }

    /// Flags of the endpoint's single pad
    pub fn pad(self) -> PadFlags {
        match self {
            Type::Output => PadFlags::SINK,
            Type::Input => PadFlags::SOURCE,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Output => write!(f, "output"),
            Type::Input => write!(f, "input"),
        }
    }
}

fn round_down(value: u32, align: u32) -> u32 {
    value - value % align
}

fn round_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

struct State {
    format: Format,
    info: &'static FormatInfo,
    /// crop rectangle of input endpoints, compose rectangle of output endpoints
    rect: Rect,
    /// pipeline this endpoint streams in, set while streaming
    pipe: Option<Arc<Pipeline>>,
}

struct Inflight {
    id: u64,
    buf: Buffer,
    alternate: bool,
    payload: [u32; MAX_PLANES],
}

#[derive(Default)]
struct Queued {
    bufs: VecDeque<Inflight>,
    next_id: u64,
    sequence: u32,
    prev_fid: Option<u32>,
    /// the channel was told to process its pending descriptors
    active: bool,
    /// the channel may hold descriptors of this endpoint
    live: bool,
}

/// DMA endpoint
pub struct Endpoint {
    name: String,
    ty: Type,
    port: u32,
    entity: EntityId,
    /// pipeline embedded in the endpoint, used if this endpoint starts streaming first
    pipe: Arc<Pipeline>,
    graph: Arc<Graph>,
    channel: Arc<dyn Channel>,
    queue: Arc<dyn Queue>,
    /// width alignment in pixels
    width_align: u32,
    /// stride alignment in bytes
    align: u32,
    this: Weak<Endpoint>,
    state: Mutex<State>,
    /// buffers handed to the channel, in submission order
    queued: Mutex<Queued>,
}

impl Endpoint {
    /// Returns a new endpoint registered in `graph`
    ///
    /// The endpoint starts with a 1920x1080 YUYV progressive format, adjusted to the alignment
    /// requirements of the channel.
    ///
    /// # Arguments
    ///
    /// * `graph` - Topology to register the endpoint in
    /// * `config` - Device configuration
    /// * `ty` - Side of the pipeline
    /// * `port` - Port number, used to name the endpoint
    /// * `channel` - DMA channel moving the data
    /// * `queue` - Queue owning the buffers
    pub fn new(
        graph: &Arc<Graph>,
        config: &Config,
        ty: Type,
        port: u32,
        channel: Arc<dyn Channel>,
        queue: Arc<dyn Queue>,
    ) -> Arc<Self> {
        let width_align = match channel.width_align() {
            Some(align) if align > 0 => align,
            _ => {
                debug!("using width align {}", config.width_align);
                config.width_align.max(1)
            }
        };
        let align = 1u32 << channel.copy_align().min(16);
        let name = format!("vipp {} {}", ty, port);

        Arc::new_cyclic(|this: &Weak<Endpoint>| {
            let entity = graph.add_video(&name, this.clone(), ty.pad());

            let mut endpoint = Endpoint {
                name,
                ty,
                port,
                entity,
                pipe: Arc::new(Pipeline::new(graph.clone(), config.multi_out_mode)),
                graph: graph.clone(),
                channel,
                queue,
                width_align,
                align,
                this: this.clone(),
                state: Mutex::new(State {
                    format: Format::new(DEFAULT_WIDTH, DEFAULT_HEIGHT, DEFAULT_FORMAT),
                    info: info::by_fourcc(DEFAULT_FORMAT),
                    rect: Rect::new(DEFAULT_WIDTH, DEFAULT_HEIGHT),
                    pipe: None,
                }),
                queued: Mutex::new(Queued::default()),
            };

            let (format, info) = endpoint.normalize(&Format::new(
                DEFAULT_WIDTH,
                DEFAULT_HEIGHT,
                DEFAULT_FORMAT,
            ));
            let state = endpoint.state.get_mut().unwrap_or_else(|e| e.into_inner());
            state.format = format;
            state.info = info;
            state.rect = Rect::new(format.width, format.height);

            endpoint
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn queued(&self) -> MutexGuard<'_, Queued> {
        self.queued.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> Type {
        self.ty
    }

    pub fn port(&self) -> u32 {
        self.port
    }

    /// Graph entity of the endpoint, its only pad is pad 0
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Width alignment in pixels
    pub fn width_align(&self) -> u32 {
        self.width_align
    }

    /// Whether the endpoint is streaming
    pub fn is_streaming(&self) -> bool {
        self.lock().pipe.is_some()
    }

    /// Pipeline the endpoint currently streams in
    pub fn pipeline(&self) -> Option<Arc<Pipeline>> {
        self.lock().pipe.clone()
    }

    /// Number of buffers handed to the channel and not completed yet
    pub fn inflight(&self) -> usize {
        self.queued().bufs.len()
    }

    fn normalize(&self, req: &Format) -> (Format, &'static FormatInfo) {
        let info = info::by_fourcc(req.fourcc);
        let mut fmt = *req;

        fmt.fourcc = info.fourcc;
        if fmt.field_order != FieldOrder::Alternate {
            fmt.field_order = FieldOrder::Progressive;
        }

        let min_width = round_up(MIN_WIDTH, self.width_align);
        let max_width = round_down(MAX_WIDTH, self.width_align);
        fmt.width = round_down(req.width, self.width_align).clamp(min_width, max_width);
        fmt.height = req.height.clamp(MIN_HEIGHT, MAX_HEIGHT);

        let max_stride = round_down(MAX_WIDTH, self.align);
        let mut planes = [PlaneFormat::default(); MAX_PLANES];
        for (i, plane) in planes
            .iter_mut()
            .enumerate()
            .take(info.num_planes as usize)
        {
            let min_stride = round_up(info.bytes_per_pixel.scale(fmt.width), self.align);
            let stride = round_down(req.plane_fmt[i].stride, self.align);

            let vsub = if i > 0 { info.vsub.max(1) as u32 } else { 1 };

            plane.stride = stride.clamp(min_stride, max_stride.max(min_stride));
            plane.size = plane.stride * fmt.height / vsub;
        }

        if info.num_buffers == 1 {
            let extra: u32 = planes[1..].iter().map(|p| p.size).sum();
            planes[0].size += extra;
        }

        fmt.plane_fmt = planes;
        fmt.num_planes = info.num_buffers;
        (fmt, info)
    }

    /// Adjusts a format to what the endpoint supports
    ///
    /// Unknown pixel formats are replaced with the default one, the frame size is clamped and
    /// aligned, and the stride and size of every plane are computed. Nothing is committed.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use vipp::channel::{Channel, Completion, Cookie};
    /// use vipp::descriptor::Interleaved;
    /// use vipp::endpoint::{Endpoint, Type};
    /// use vipp::format::{Format, FourCC};
    /// use vipp::graph::Graph;
    /// use vipp::io::BufferQueue;
    /// use vipp::{Config, Result};
    ///
    /// struct Idle;
    ///
    /// impl Channel for Idle {
    ///     fn prepare(&self, _: &Interleaved, _: Completion) -> Result<Cookie> { Ok(Cookie(0)) }
    ///     fn submit(&self, _: Cookie) {}
    ///     fn issue_pending(&self) -> Result<()> { Ok(()) }
    ///     fn terminate_all(&self) {}
    /// }
    ///
    /// let graph = Arc::new(Graph::new());
    /// let ep = Endpoint::new(
    ///     &graph,
    ///     &Config::default(),
    ///     Type::Output,
    ///     0,
    ///     Arc::new(Idle),
    ///     Arc::new(BufferQueue::new()),
    /// );
    ///
    /// let fmt = ep.try_format(&Format::new(1921, 1079, FourCC::NV12));
    /// assert_eq!((fmt.width, fmt.height), (1920, 1079));
    /// assert_eq!(fmt.plane_fmt[0].size, 1920 * 1079 + 1920 * 1079 / 2);
    /// ```
    pub fn try_format(&self, req: &Format) -> Format {
        self.normalize(req).0
    }

    /// Adjusts and commits a format
    ///
    /// The crop or compose rectangle is reset to the full frame. Fails with [`Error::Busy`]
    /// while buffers are allocated on the queue.
    pub fn set_format(&self, req: &Format) -> Result<Format> {
        let (format, info) = self.normalize(req);

        let mut state = self.lock();
        if self.queue.is_busy() || state.pipe.is_some() {
            return Err(Error::Busy);
        }

        state.format = format;
        state.info = info;
        state.rect = Rect::new(format.width, format.height);
        Ok(format)
    }

    /// Returns the negotiated format
    pub fn format(&self) -> Format {
        self.lock().format
    }

    /// Returns the format information of the negotiated format
    pub fn format_info(&self) -> &'static FormatInfo {
        self.lock().info
    }

    /// Enumerates the supported pixel formats
    ///
    /// With a media bus code, only index 0 is valid and returns the pixel format carrying that
    /// code.
    ///
    /// # Arguments
    ///
    /// * `index` - Position in the list of supported formats
    /// * `code` - Media bus code to restrict the enumeration to
    pub fn enum_format(&self, index: usize, code: Option<u32>) -> Result<FourCC> {
        let supported = self.channel.formats();

        let found = match code {
            Some(_) if index > 0 => None,
            Some(code) if !supported.is_empty() => supported
                .iter()
                .map(|fourcc| info::by_fourcc(*fourcc))
                .find(|info| info.code == code && supported.contains(&info.fourcc)),
            Some(code) => info::by_code(code),
            None if !supported.is_empty() => supported
                .get(index)
                .map(|fourcc| info::by_fourcc(*fourcc))
                .filter(|info| info.fourcc == supported[index]),
            None => info::by_index(index),
        };

        found
            .map(|info| info.fourcc)
            .ok_or(Error::Invalid("no format at this index"))
    }

    /// Returns a selection rectangle
    ///
    /// Output endpoints expose the compose targets, input endpoints the crop targets.
    pub fn selection(&self, target: Target) -> Result<Rect> {
        self.check_target(target)?;

        let state = self.lock();
        if target.is_active() {
            Ok(state.rect)
        } else {
            Ok(Rect::new(state.format.width, state.format.height))
        }
    }

    /// Sets the active crop (input) or compose (output) rectangle
    ///
    /// Only rectangles anchored at the top left corner and fitting in the frame are accepted. The
    /// width is aligned down, never below the width alignment.
    pub fn set_selection(&self, target: Target, rect: Rect) -> Result<Rect> {
        self.check_target(target)?;
        if !target.is_active() {
            return Err(Error::Invalid("selection target is read-only"));
        }

        let mut state = self.lock();
        if self.queue.is_busy() || state.pipe.is_some() {
            return Err(Error::Busy);
        }
        if rect.width > state.format.width
            || rect.height > state.format.height
            || rect.left != 0
            || rect.top != 0
        {
            return Err(Error::Invalid("rectangle exceeds the frame"));
        }

        let width = round_down(rect.width.max(MIN_WIDTH), self.width_align).max(self.width_align);
        state.rect = Rect::new(width, rect.height.max(MIN_HEIGHT));
        Ok(state.rect)
    }

    /// Sets the active crop or compose rectangle, whichever the endpoint type supports
    pub fn set_crop(&self, rect: Rect) -> Result<Rect> {
        match self.ty {
            Type::Output => self.set_selection(Target::Compose, rect),
            Type::Input => self.set_selection(Target::Crop, rect),
        }
    }

    fn check_target(&self, target: Target) -> Result<()> {
        match (self.ty, target.is_compose()) {
            (Type::Output, true) | (Type::Input, false) => Ok(()),
            _ => Err(Error::Invalid("selection target not supported by the endpoint type")),
        }
    }

    /// Returns the size of each buffer plane, or checks the requested ones
    ///
    /// # Arguments
    ///
    /// * `sizes` - Plane sizes requested by the application, empty to get the required ones
    pub fn queue_setup(&self, sizes: &[u32]) -> Result<Vec<u32>> {
        let state = self.lock();
        let required = state.format.planes();

        if sizes.is_empty() {
            return Ok(required.iter().map(|p| p.size).collect());
        }

        if sizes.len() != required.len() {
            return Err(Error::Invalid("plane count does not match the format"));
        }
        if sizes.iter().zip(required).any(|(size, plane)| *size < plane.size) {
            return Err(Error::Invalid("plane too small for the format"));
        }

        Ok(sizes.to_vec())
    }

    /// Hands a buffer to the DMA channel
    ///
    /// The transfer only starts once the endpoint's DMA engine runs, which in sync mode waits for
    /// the whole pipeline to start. A buffer the channel refuses is handed back to the queue right
    /// away, in the error state. Once the channel accepted the buffer, it owns it.
    pub fn queue_buffer(&self, buf: Buffer) -> Result<()> {
        let state = self.lock();

        let xt = match Interleaved::for_buffer(
            self.ty.direction(),
            &buf,
            &state.format,
            state.info,
            &state.rect,
        ) {
            Ok(xt) => xt,
            Err(e) => {
                error!("{}: invalid buffer {}: {}", self.name, buf.index, e);
                drop(state);
                self.queue.done(buf, buffer::State::Error);
                return Err(e);
            }
        };

        let id = {
            let mut queued = self.queued();
            queued.next_id += 1;
            queued.next_id
        };

        let cookie = match self
            .channel
            .prepare(&xt, Completion::new(self.this.clone(), id))
        {
            Ok(cookie) => cookie,
            Err(e) => {
                error!("{}: failed to prepare DMA transfer", self.name);
                drop(state);
                self.queue.done(buf, buffer::State::Error);
                return Err(e);
            }
        };

        let mut payload = [0; MAX_PLANES];
        for (size, plane) in payload.iter_mut().zip(state.format.planes()) {
            *size = plane.size;
        }
        {
            let mut queued = self.queued();
            queued.bufs.push_back(Inflight {
                id,
                buf,
                alternate: state.format.field_order == FieldOrder::Alternate,
                payload,
            });
            queued.live = true;
        }
        self.channel.submit(cookie);

        if self.queued().active {
            if let Err(e) = self.channel.issue_pending() {
                error!("{}: failed to issue transfer {}: {}", self.name, id, e);
            }
        }

        Ok(())
    }

    /// Completion of the transfer `id`
    pub(crate) fn complete(&self, id: u64, fid: Option<u32>) {
        let mut queued = self.queued();

        let Some(pos) = queued.bufs.iter().position(|b| b.id == id) else {
            warn!("{}: completion of unknown transfer {}", self.name, id);
            return;
        };
        let Some(Inflight {
            mut buf,
            alternate,
            payload,
            ..
        }) = queued.bufs.remove(pos)
        else {
            return;
        };

        let mut field = FieldOrder::Progressive;
        let mut sequence = queued.sequence;
        queued.sequence = queued.sequence.wrapping_add(1);

        if let (true, Some(fid)) = (alternate, fid) {
            field = FieldOrder::from_fid(fid);
            if queued.prev_fid == Some(fid) {
                sequence = queued.sequence;
                queued.sequence = queued.sequence.wrapping_add(1);
            }
            sequence >>= 1;
            queued.prev_fid = Some(fid);
        }
        drop(queued);

        buf.meta = Metadata {
            sequence,
            timestamp: Timestamp::monotonic(),
            field,
            bytesused: payload,
            flags: Flags::from(buffer::State::Done),
        };
        self.queue.done(buf, buffer::State::Done);
    }

    fn return_buffers(&self, state: buffer::State) {
        let bufs: Vec<_> = self.queued().bufs.drain(..).collect();

        for entry in bufs {
            let mut buf = entry.buf;
            buf.meta.flags = Flags::from(state);
            self.queue.done(buf, state);
        }
    }

    /// Checks the negotiated format against the active format of the connected stage
    pub fn verify_format(&self) -> Result<()> {
        let state = self.lock();
        self.check_format(&state)
    }

    fn check_format(&self, state: &State) -> Result<()> {
        let (stage, pad) = self
            .graph
            .remote_stage(self.entity)
            .ok_or(Error::NotConnected)?;
        let fmt = stage.format(pad.pad)?;

        if fmt.code != state.info.code {
            debug!(
                "{}: code mismatch 0x{:04x} != 0x{:04x}",
                self.name, fmt.code, state.info.code
            );
            return Err(Error::FormatMismatch("media bus code"));
        }
        if fmt.width != state.rect.width || fmt.height != state.rect.height {
            debug!(
                "{}: size mismatch {}x{} != {}x{}",
                self.name, fmt.width, fmt.height, state.rect.width, state.rect.height
            );
            return Err(Error::FormatMismatch("frame size"));
        }
        if fmt.field != state.format.field_order {
            debug!(
                "{}: field mismatch {} != {}",
                self.name, fmt.field, state.format.field_order
            );
            return Err(Error::FormatMismatch("field order"));
        }

        Ok(())
    }

    /// Starts streaming
    ///
    /// The endpoint joins the pipeline running in its part of the graph, or starts one with its
    /// own embedded pipeline. When the start fails, every queued buffer is handed back to the
    /// queue in the queued state.
    pub fn start_streaming(&self) -> Result<()> {
        let mut state = self.lock();
        if state.pipe.is_some() {
            return Err(Error::Busy);
        }

        {
            let mut queued = self.queued();
            queued.sequence = 0;
            queued.prev_fid = None;
        }

        match self.start(&state) {
            Ok(pipe) => {
                debug!("{}: streaming", self.name);
                state.pipe = Some(pipe);
                Ok(())
            }
            Err(e) => {
                drop(state);
                self.cancel();
                self.return_buffers(buffer::State::Queued);
                Err(e)
            }
        }
    }

    fn start(&self, state: &State) -> Result<Arc<Pipeline>> {
        let pipe = self.graph.pipeline_start(self.entity, &self.pipe)?;

        if let Err(e) = self
            .check_format(state)
            .and_then(|_| pipe.prepare(self))
        {
            self.graph.pipeline_stop(self.entity);
            return Err(e);
        }

        if let Err(e) = pipe.start_dma(self) {
            pipe.release();
            self.graph.pipeline_stop(self.entity);
            return Err(e);
        }

        Ok(pipe)
    }

    /// Stops streaming
    ///
    /// Buffers still owned by the channel are handed back to the queue in the error state.
    pub fn stop_streaming(&self) {
        let mut state = self.lock();
        let Some(pipe) = state.pipe.take() else {
            return;
        };

        pipe.stop_dma(self);
        pipe.release();
        self.graph.pipeline_stop(self.entity);
        drop(state);

        debug!("{}: stopped", self.name);
        self.cancel();
        self.return_buffers(buffer::State::Error);
    }

    /// Drops the descriptors the channel still holds, unless the pipeline already did
    fn cancel(&self) {
        if self.queued().live {
            self.dma_stop();
        }
    }

    pub(crate) fn dma_start(&self) -> Result<()> {
        self.queued().active = true;
        self.channel.issue_pending().map_err(|e| {
            self.queued().active = false;
            e
        })
    }

    pub(crate) fn dma_stop(&self) {
        {
            let mut queued = self.queued();
            queued.active = false;
            queued.live = false;
        }
        self.channel.terminate_all();
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("entity", &self.entity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Cookie;
    use crate::io::BufferQueue;

    #[derive(Default)]
    struct Idle {
        width_align: Option<u32>,
        copy_align: u32,
        formats: Vec<FourCC>,
    }

    impl Channel for Idle {
        fn width_align(&self) -> Option<u32> {
            self.width_align
        }

        fn copy_align(&self) -> u32 {
            self.copy_align
        }

        fn formats(&self) -> Vec<FourCC> {
            self.formats.clone()
        }

        fn prepare(&self, _: &Interleaved, _: Completion) -> Result<Cookie> {
            Ok(Cookie(0))
        }

        fn submit(&self, _: Cookie) {}

        fn issue_pending(&self) -> Result<()> {
            Ok(())
        }

        fn terminate_all(&self) {}
    }

    fn endpoint_with(ty: Type, channel: Idle) -> (Arc<Endpoint>, Arc<BufferQueue>) {
        let graph = Arc::new(Graph::new());
        let queue = Arc::new(BufferQueue::new());
        let ep = Endpoint::new(
            &graph,
            &Config::default(),
            ty,
            0,
            Arc::new(channel),
            queue.clone(),
        );
        (ep, queue)
    }

    fn endpoint(ty: Type) -> (Arc<Endpoint>, Arc<BufferQueue>) {
        endpoint_with(ty, Idle::default())
    }

    #[test]
    fn default_format() {
        let (ep, _) = endpoint(Type::Output);
        let fmt = ep.format();

        assert_eq!((fmt.width, fmt.height), (1920, 1080));
        assert_eq!(fmt.fourcc, FourCC::YUYV);
        assert_eq!(fmt.plane_fmt[0].stride, 3840);
        assert_eq!(fmt.plane_fmt[0].size, 3840 * 1080);
        assert_eq!(fmt.num_planes, 1);
        assert_eq!(ep.selection(Target::Compose), Ok(Rect::new(1920, 1080)));
        assert_eq!(ep.name(), "vipp output 0");
    }

    #[test]
    fn width_is_aligned_and_normalization_is_stable() {
        let (ep, _) = endpoint(Type::Output);

        let fmt = ep.set_format(&Format::new(1921, 1079, FourCC::new(b"ZZZZ"))).unwrap();
        assert_eq!((fmt.width, fmt.height), (1920, 1079));
        assert_eq!(fmt.fourcc, FourCC::NV12);
        assert_eq!(fmt.plane_fmt[0].stride, 1920);
        assert_eq!(fmt.plane_fmt[1].stride, 1920);
        assert_eq!(fmt.plane_fmt[0].size, 1920 * 1079 + 1920 * 1079 / 2);
        assert_eq!(fmt.num_planes, 1);

        assert_eq!(ep.set_format(&fmt), Ok(fmt));
    }

    #[test]
    fn normalization_is_stable_for_every_format() {
        let (ep, _) = endpoint_with(
            Type::Output,
            Idle {
                copy_align: 4,
                ..Idle::default()
            },
        );
        let sizes = [(0, 0), (1, 1), (641, 479), (1921, 1079), (4097, 2161), (100_000, 9000)];

        for info in info::formats() {
            for (width, height) in sizes {
                let once = ep.try_format(&Format::new(width, height, info.fourcc));
                let twice = ep.try_format(&once);
                assert_eq!(once, twice, "{} {}x{}", info.fourcc, width, height);
                assert_eq!(once.fourcc, info.fourcc);
                assert_eq!(once.num_planes, info.num_buffers);
                assert!(once.planes().iter().all(|p| p.stride % 16 == 0));
            }
        }
    }

    #[test]
    fn size_is_clamped() {
        let (ep, _) = endpoint(Type::Input);

        let fmt = ep.try_format(&Format::new(0, 0, FourCC::GREY));
        assert_eq!((fmt.width, fmt.height), (2, 1));

        let fmt = ep.try_format(&Format::new(100_000, 10_000, FourCC::GREY));
        assert_eq!((fmt.width, fmt.height), (65534, 8191));
        assert_eq!(fmt.plane_fmt[0].stride, 65534);
    }

    #[test]
    fn stride_follows_the_copy_alignment() {
        let (ep, _) = endpoint_with(
            Type::Output,
            Idle {
                width_align: Some(8),
                copy_align: 6,
                ..Idle::default()
            },
        );
        assert_eq!(ep.width_align(), 8);

        let mut req = Format::new(1000, 100, FourCC::RGB24);
        let fmt = ep.try_format(&req);
        assert_eq!(fmt.width, 1000);
        assert_eq!(fmt.plane_fmt[0].stride, 3008);

        // larger strides are kept, rounded down to the alignment
        req.plane_fmt[0].stride = 4100;
        assert_eq!(ep.try_format(&req).plane_fmt[0].stride, 4096);
    }

    #[test]
    fn separate_planes_keep_their_sizes() {
        let (ep, _) = endpoint(Type::Output);

        let fmt = ep.try_format(&Format::new(1280, 720, FourCC::NV12M));
        assert_eq!(fmt.num_planes, 2);
        assert_eq!(fmt.plane_fmt[0].size, 1280 * 720);
        assert_eq!(fmt.plane_fmt[1].size, 1280 * 360);
        assert_eq!(ep.queue_setup(&[]), Ok(vec![3840 * 1080]));

        ep.set_format(&fmt).unwrap();
        assert_eq!(ep.queue_setup(&[]), Ok(vec![1280 * 720, 1280 * 360]));
        assert!(ep.queue_setup(&[1280 * 720]).is_err());
        assert!(ep.queue_setup(&[1280 * 720, 100]).is_err());
        assert_eq!(
            ep.queue_setup(&[1 << 20, 1 << 20]),
            Ok(vec![1 << 20, 1 << 20])
        );
    }

    #[test]
    fn interlacing_other_than_alternate_is_dropped() {
        let (ep, _) = endpoint(Type::Output);

        let mut req = Format::new(720, 240, FourCC::UYVY);
        req.field_order = FieldOrder::Alternate;
        assert_eq!(ep.try_format(&req).field_order, FieldOrder::Alternate);

        req.field_order = FieldOrder::Interlaced;
        assert_eq!(ep.try_format(&req).field_order, FieldOrder::Progressive);
    }

    #[test]
    fn configuration_is_frozen_while_buffers_are_allocated() {
        let (ep, queue) = endpoint(Type::Output);
        let before = ep.format();
        ep.set_crop(Rect::new(640, 480)).unwrap();

        queue.allocate(4);
        assert_eq!(ep.set_format(&Format::new(640, 480, FourCC::NV12)), Err(Error::Busy));
        assert_eq!(ep.set_crop(Rect::new(320, 240)), Err(Error::Busy));
        assert_eq!(ep.format(), before);
        assert_eq!(ep.selection(Target::Compose), Ok(Rect::new(640, 480)));

        queue.release();
        ep.set_format(&Format::new(640, 480, FourCC::NV12)).unwrap();
        assert_eq!(ep.selection(Target::Compose), Ok(Rect::new(640, 480)));
    }

    #[test]
    fn selection_targets_depend_on_the_type() {
        let (output, _) = endpoint(Type::Output);
        let (input, _) = endpoint(Type::Input);

        assert!(output.selection(Target::Crop).is_err());
        assert!(input.selection(Target::ComposeBounds).is_err());
        assert!(output.set_selection(Target::ComposeBounds, Rect::new(64, 64)).is_err());

        input.set_crop(Rect::new(1001, 0)).unwrap();
        assert_eq!(input.selection(Target::Crop), Ok(Rect::new(1000, 1)));
        assert_eq!(input.selection(Target::CropDefault), Ok(Rect::new(1920, 1080)));
        assert_eq!(input.selection(Target::CropBounds), Ok(Rect::new(1920, 1080)));
    }

    #[test]
    fn crop_must_fit_the_frame() {
        let (ep, _) = endpoint(Type::Input);

        assert!(matches!(ep.set_crop(Rect::new(1922, 1080)), Err(Error::Invalid(_))));
        let shifted = Rect {
            left: 2,
            ..Rect::new(64, 64)
        };
        assert!(matches!(ep.set_crop(shifted), Err(Error::Invalid(_))));

        assert_eq!(ep.set_crop(Rect::new(1, 1)), Ok(Rect::new(2, 1)));
    }

    #[test]
    fn enumerate_the_table() {
        let (ep, _) = endpoint(Type::Output);

        assert_eq!(ep.enum_format(0, None), Ok(FourCC::NV12));
        assert_eq!(ep.enum_format(10, None), Ok(FourCC::YUYV));
        assert!(ep.enum_format(info::formats().len(), None).is_err());

        assert_eq!(
            ep.enum_format(0, Some(crate::format::mbus::code::RBG888_1X24)),
            Ok(FourCC::BGR24)
        );
        assert!(ep.enum_format(1, Some(crate::format::mbus::code::RBG888_1X24)).is_err());
    }

    #[test]
    fn enumerate_the_channel_formats() {
        let (ep, _) = endpoint_with(
            Type::Output,
            Idle {
                formats: vec![FourCC::RGB24, FourCC::new(b"????"), FourCC::GREY],
                ..Idle::default()
            },
        );

        assert_eq!(ep.enum_format(0, None), Ok(FourCC::RGB24));
        assert!(ep.enum_format(1, None).is_err());
        assert_eq!(ep.enum_format(2, None), Ok(FourCC::GREY));
        assert!(ep.enum_format(3, None).is_err());

        assert_eq!(
            ep.enum_format(0, Some(crate::format::mbus::code::RBG888_1X24)),
            Ok(FourCC::RGB24)
        );
        assert!(ep
            .enum_format(0, Some(crate::format::mbus::code::UYVY8_1X16))
            .is_err());
    }
}

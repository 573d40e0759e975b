#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use vipp::channel::{Channel, Completion, Cookie};
use vipp::descriptor::Interleaved;
use vipp::endpoint::Type;
use vipp::format::{mbus::code, FieldOrder, Format, FourCC, MbusFormat};
use vipp::graph::{EntityId, PadRef};
use vipp::io::BufferQueue;
use vipp::stage::{Kind, Passthrough};
use vipp::{Config, Device, Endpoint, Error, Result};

pub const WIDTH: u32 = 1280;
pub const HEIGHT: u32 = 720;

/// Ordered record of hardware events
#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}

struct Prepared {
    cookie: Cookie,
    done: Completion,
    xt: Interleaved,
}

/// DMA channel completing transfers on demand
pub struct MockChannel {
    name: String,
    log: Log,
    next: AtomicU64,
    running: AtomicBool,
    reject: AtomicBool,
    fail_start: AtomicBool,
    prepared: Mutex<Vec<Prepared>>,
    pending: Mutex<VecDeque<(Completion, Interleaved)>>,
}

impl MockChannel {
    pub fn new(name: &str, log: &Log) -> Arc<Self> {
        Arc::new(MockChannel {
            name: name.to_string(),
            log: log.clone(),
            next: AtomicU64::new(0),
            running: AtomicBool::new(false),
            reject: AtomicBool::new(false),
            fail_start: AtomicBool::new(false),
            prepared: Mutex::new(Vec::new()),
            pending: Mutex::new(VecDeque::new()),
        })
    }

    pub fn reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Template of the `index`th pending transfer
    pub fn descriptor(&self, index: usize) -> Option<Interleaved> {
        self.pending
            .lock()
            .unwrap()
            .get(index)
            .map(|(_, xt)| xt.clone())
    }

    /// Completes the oldest pending transfer, if the channel runs
    pub fn finish_next(&self, fid: Option<u32>) -> bool {
        if !self.is_running() {
            return false;
        }

        let next = self.pending.lock().unwrap().pop_front();
        match next {
            Some((done, _)) => {
                done.complete(fid);
                true
            }
            None => false,
        }
    }
}

impl Channel for MockChannel {
    fn prepare(&self, xt: &Interleaved, done: Completion) -> Result<Cookie> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(Error::ChannelRejected);
        }

        let cookie = Cookie(self.next.fetch_add(1, Ordering::SeqCst));
        self.prepared.lock().unwrap().push(Prepared {
            cookie,
            done,
            xt: xt.clone(),
        });
        Ok(cookie)
    }

    fn submit(&self, cookie: Cookie) {
        let mut prepared = self.prepared.lock().unwrap();
        if let Some(pos) = prepared.iter().position(|p| p.cookie == cookie) {
            let p = prepared.remove(pos);
            self.pending.lock().unwrap().push_back((p.done, p.xt));
        }
    }

    fn issue_pending(&self) -> Result<()> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(Error::stage(self.name.clone(), "engine halted"));
        }
        if !self.running.swap(true, Ordering::SeqCst) {
            self.log.push(format!("start {}", self.name));
        }
        Ok(())
    }

    fn terminate_all(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.pending.lock().unwrap().clear();
        self.log.push(format!("stop {}", self.name));
    }
}

/// Stage logging the start and stop of its block
pub fn stage(name: &str, kind: Kind, sinks: usize, sources: usize, log: &Log) -> Arc<Passthrough> {
    let log = log.clone();
    let tag = name.to_string();
    Arc::new(
        Passthrough::new(name, kind, sinks, sources, bus_format()).with_hook(move |on| {
            log.push(format!("{} {}", if on { "enable" } else { "disable" }, tag));
            Ok(())
        }),
    )
}

/// Stage whose block refuses to start
pub fn broken_stage(name: &str, log: &Log) -> Arc<Passthrough> {
    let log = log.clone();
    let tag = name.to_string();
    Arc::new(
        Passthrough::new(name, Kind::Converter, 1, 1, bus_format()).with_hook(move |on| {
            if on {
                return Err(Error::stage(tag.clone(), "not responding"));
            }
            log.push(format!("disable {}", tag));
            Ok(())
        }),
    )
}

pub fn bus_format() -> MbusFormat {
    MbusFormat::new(code::UYVY8_1X16, WIDTH, HEIGHT)
}

/// Endpoint format matching [`bus_format`]
pub fn format() -> Format {
    Format::new(WIDTH, HEIGHT, FourCC::YUYV)
}

pub fn interlaced_format() -> Format {
    let mut fmt = format();
    fmt.field_order = FieldOrder::Alternate;
    fmt
}

pub struct Port {
    pub endpoint: Arc<Endpoint>,
    pub channel: Arc<MockChannel>,
    pub queue: Arc<BufferQueue>,
}

impl Port {
    pub fn new(dev: &Device, ty: Type, port: u32, name: &str, log: &Log) -> Self {
        let channel = MockChannel::new(name, log);
        let queue = Arc::new(BufferQueue::new());
        let endpoint = dev
            .add_endpoint(ty, port, channel.clone(), queue.clone())
            .unwrap();
        endpoint.set_format(&format()).unwrap();

        Port {
            endpoint,
            channel,
            queue,
        }
    }
}

/// Memory to memory pipeline
///
/// ```text
/// rx ------------> sw:0
/// in0 --> csc --> sw:1
///                 sw:2 --> out0
///                 sw:3 --> out1
/// ```
pub struct M2m {
    pub dev: Device,
    pub log: Log,
    pub input: Port,
    pub outputs: [Port; 2],
    pub rx: Arc<Passthrough>,
    pub csc: Arc<Passthrough>,
    pub sw: Arc<Passthrough>,
}

impl M2m {
    pub fn new(config: Config) -> Self {
        Self::with_csc(config, |log| stage("csc", Kind::Converter, 1, 1, log))
    }

    pub fn with_csc<F>(config: Config, csc: F) -> Self
    where
        F: FnOnce(&Log) -> Arc<Passthrough>,
    {
        let dev = Device::new(config);
        let log = Log::default();

        let rx = stage("rx", Kind::Receiver, 0, 1, &log);
        let csc = csc(&log);
        let sw = stage("sw", Kind::Switch, 2, 2, &log);
        let rx_id = dev.add_stage(rx.clone());
        let csc_id = dev.add_stage(csc.clone());
        let sw_id = dev.add_stage(sw.clone());

        let input = Port::new(&dev, Type::Input, 0, "in0", &log);
        let outputs = [
            Port::new(&dev, Type::Output, 1, "out0", &log),
            Port::new(&dev, Type::Output, 2, "out1", &log),
        ];

        let graph = dev.graph();
        graph
            .link(PadRef::new(rx_id, 0), PadRef::new(sw_id, 0), true)
            .unwrap();
        dev.link_input(&input.endpoint, PadRef::new(csc_id, 0)).unwrap();
        graph
            .link(PadRef::new(csc_id, 1), PadRef::new(sw_id, 1), true)
            .unwrap();
        dev.link_output(PadRef::new(sw_id, 2), &outputs[0].endpoint)
            .unwrap();
        dev.link_output(PadRef::new(sw_id, 3), &outputs[1].endpoint)
            .unwrap();

        M2m {
            dev,
            log,
            input,
            outputs,
            rx,
            csc,
            sw,
        }
    }

    pub fn ports(&self) -> [&Port; 3] {
        [&self.input, &self.outputs[0], &self.outputs[1]]
    }
}

/// Single branch capture pipeline: `rx --> out0`
pub struct Capture {
    pub dev: Device,
    pub log: Log,
    pub rx: Arc<Passthrough>,
    pub rx_id: EntityId,
    pub port: Port,
}

impl Capture {
    pub fn new(config: Config) -> Self {
        let dev = Device::new(config);
        let log = Log::default();

        let rx = stage("rx", Kind::Receiver, 0, 1, &log);
        let rx_id = dev.add_stage(rx.clone());
        let port = Port::new(&dev, Type::Output, 0, "out0", &log);
        dev.link_output(PadRef::new(rx_id, 0), &port.endpoint).unwrap();

        Capture {
            dev,
            log,
            rx,
            rx_id,
            port,
        }
    }
}

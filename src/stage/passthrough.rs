use std::sync::{Mutex, MutexGuard};

use log::debug;

use crate::format::MbusFormat;
use crate::graph::PadFlags;
use crate::stage::{Kind, Stage};
use crate::{Error, Result};

type Hook = Box<dyn Fn(bool) -> Result<()> + Send + Sync>;

struct State {
    formats: Vec<MbusFormat>,
    /// enable count per pad
    enabled: Vec<u32>,
}

/// Stage forwarding its sink format unchanged to its sources
///
/// Pads are numbered sinks first, then sources. The block is started when the first pad gets
/// enabled and stopped when the last one gets disabled, through an optional hook that stands for
/// the register accesses of the real block.
pub struct Passthrough {
    name: String,
    kind: Kind,
    pads: Vec<PadFlags>,
    state: Mutex<State>,
    hook: Option<Hook>,
}

impl Passthrough {
    /// Returns a stage with `sinks` sink pads followed by `sources` source pads
    ///
    /// # Arguments
    ///
    /// * `name` - Entity name
    /// * `kind` - Kind of block
    /// * `sinks` - Number of sink pads
    /// * `sources` - Number of source pads
    /// * `format` - Initial format of every pad
    ///
    /// # Example
    ///
    /// ```
    /// use vipp::format::{mbus::code, MbusFormat};
    /// use vipp::stage::{Kind, Passthrough, Stage};
    ///
    /// let fmt = MbusFormat::new(code::UYVY8_1X16, 1920, 1080);
    /// let csc = Passthrough::new("csc", Kind::Converter, 1, 1, fmt);
    /// assert_eq!(csc.pads().len(), 2);
    /// ```
    pub fn new(name: &str, kind: Kind, sinks: usize, sources: usize, format: MbusFormat) -> Self {
        let mut pads = vec![PadFlags::SINK; sinks];
        pads.extend(std::iter::repeat(PadFlags::SOURCE).take(sources));

        Passthrough {
            name: name.to_string(),
            kind,
            state: Mutex::new(State {
                formats: vec![format; pads.len()],
                enabled: vec![0; pads.len()],
            }),
            pads,
            hook: None,
        }
    }

    /// Runs `hook` with `true` when the block starts and `false` when it stops
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(bool) -> Result<()> + Send + Sync + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_pad(&self, pad: u32) -> Result<usize> {
        let pad = pad as usize;
        if pad < self.pads.len() {
            Ok(pad)
        } else {
            Err(Error::Invalid("no such pad"))
        }
    }

    /// Sets the format of a pad and returns it
    ///
    /// A format set on a sink pad is propagated to every source pad.
    pub fn set_format(&self, pad: u32, format: MbusFormat) -> Result<MbusFormat> {
        let pad = self.check_pad(pad)?;
        let mut state = self.lock();
        if state.enabled.iter().any(|&n| n > 0) {
            return Err(Error::Busy);
        }

        state.formats[pad] = format;
        if self.pads[pad].contains(PadFlags::SINK) {
            for (i, flags) in self.pads.iter().enumerate() {
                if flags.contains(PadFlags::SOURCE) {
                    state.formats[i] = format;
                }
            }
        }

        Ok(format)
    }

    /// Whether any pad has streams enabled
    pub fn is_streaming(&self) -> bool {
        self.lock().enabled.iter().any(|&n| n > 0)
    }

    /// Number of outstanding enables on a pad
    pub fn enable_count(&self, pad: u32) -> u32 {
        self.lock().enabled.get(pad as usize).copied().unwrap_or(0)
    }
}

impl Stage for Passthrough {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> Kind {
        self.kind
    }

    fn pads(&self) -> &[PadFlags] {
        &self.pads
    }

    fn enable_streams(&self, pad: u32, streams: u64) -> Result<()> {
        let index = self.check_pad(pad)?;
        let mut state = self.lock();

        let idle = state.enabled.iter().all(|&n| n == 0);
        if idle {
            debug!("starting {} {}", self.kind, self.name);
            if let Some(hook) = &self.hook {
                hook(true)?;
            }
        }

        debug!(
            "enabled streams 0x{:x} on {}/{}",
            streams, self.name, pad
        );
        state.enabled[index] += 1;
        Ok(())
    }

    fn disable_streams(&self, pad: u32, streams: u64) -> Result<()> {
        let index = self.check_pad(pad)?;
        let mut state = self.lock();

        if state.enabled[index] == 0 {
            return Err(Error::Invalid("streams are not enabled"));
        }
        state.enabled[index] -= 1;
        debug!(
            "disabled streams 0x{:x} on {}/{}",
            streams, self.name, pad
        );

        if state.enabled.iter().all(|&n| n == 0) {
            debug!("stopping {} {}", self.kind, self.name);
            if let Some(hook) = &self.hook {
                hook(false)?;
            }
        }

        Ok(())
    }

    fn format(&self, pad: u32) -> Result<MbusFormat> {
        let pad = self.check_pad(pad)?;
        Ok(self.lock().formats[pad])
    }
}

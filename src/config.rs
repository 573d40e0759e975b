use std::{fmt, str::FromStr};

use crate::Error;

/// Mode of operation for pipelines with multiple output DMA engines
///
/// Output engines don't accept data until they are started. If no stage along the pipeline can
/// drop packets, back-pressure from an idle output stalls the whole pipeline.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Wait for all endpoints to be started before starting the pipeline
    #[default]
    Sync,
    /// Start and stop pipeline branches independently, as their endpoints start and stop
    Async,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Sync => write!(f, "sync"),
            Mode::Async => write!(f, "async"),
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" | "sync" => Ok(Mode::Sync),
            "1" | "async" => Ok(Mode::Async),
            _ => Err(Error::Invalid("multi-output mode must be 0/sync or 1/async")),
        }
    }
}

/// Width alignment used when the DMA channel does not report one
pub const DEFAULT_WIDTH_ALIGN: u32 = 2;

/// Device configuration
///
/// The configuration is fixed when the device is created and shared by every pipeline it
/// starts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Config {
    /// multi-output pipeline mode
    pub multi_out_mode: Mode,
    /// width alignment in pixels for channels without their own requirement
    pub width_align: u32,
}

impl Config {
    /// Returns the default configuration with `mode` selected
    ///
    /// # Example
    ///
    /// ```
    /// use vipp::config::{Config, Mode};
    ///
    /// let config = Config::with_mode("async".parse().unwrap());
    /// assert_eq!(config.multi_out_mode, Mode::Async);
    /// ```
    pub fn with_mode(mode: Mode) -> Self {
        Config {
            multi_out_mode: mode,
            ..Config::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            multi_out_mode: Mode::Sync,
            width_align: DEFAULT_WIDTH_ALIGN,
        }
    }
}

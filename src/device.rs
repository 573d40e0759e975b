use log::debug;
use std::sync::{Arc, Mutex};

use crate::channel::Channel;
use crate::endpoint::{Endpoint, Type};
use crate::graph::{EntityId, Graph, PadRef};
use crate::io::Queue;
use crate::stage::Stage;
use crate::{Config, Error, Result};

/// Composite video pipeline device
///
/// The device owns the processing graph and the DMA endpoints at its edges. Its configuration is
/// shared by every pipeline started on the graph.
pub struct Device {
    config: Config,
    graph: Arc<Graph>,
    endpoints: Mutex<Vec<Arc<Endpoint>>>,
}

impl Device {
    /// Returns an empty device
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration of the pipelines
    ///
    /// # Example
    ///
    /// ```
    /// use vipp::{Config, Device};
    /// let dev = Device::new(Config::default());
    /// assert!(dev.endpoints().is_empty());
    /// ```
    pub fn new(config: Config) -> Self {
        debug!("multi-output mode: {}", config.multi_out_mode);
        Device {
            config,
            graph: Arc::new(Graph::new()),
            endpoints: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Topology of the device
    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// Adds a processing stage to the graph
    pub fn add_stage(&self, stage: Arc<dyn Stage>) -> EntityId {
        self.graph.add_stage(stage)
    }

    /// Adds a DMA endpoint
    ///
    /// # Arguments
    ///
    /// * `ty` - Side of the pipeline
    /// * `port` - Port number, unique per device
    /// * `channel` - DMA channel
    /// * `queue` - Buffer queue
    pub fn add_endpoint(
        &self,
        ty: Type,
        port: u32,
        channel: Arc<dyn Channel>,
        queue: Arc<dyn Queue>,
    ) -> Result<Arc<Endpoint>> {
        let mut endpoints = self.endpoints.lock().unwrap_or_else(|e| e.into_inner());
        if endpoints.iter().any(|ep| ep.port() == port) {
            return Err(Error::Invalid("port already in use"));
        }

        let endpoint = Endpoint::new(&self.graph, &self.config, ty, port, channel, queue);
        debug!("registered {}", endpoint.name());
        endpoints.push(endpoint.clone());
        Ok(endpoint)
    }

    /// Links a stage source pad to an output endpoint
    pub fn link_output(&self, source: PadRef, endpoint: &Endpoint) -> Result<()> {
        if endpoint.ty() != Type::Output {
            return Err(Error::Invalid("not an output endpoint"));
        }
        self.graph
            .link(source, PadRef::new(endpoint.entity(), 0), true)
    }

    /// Links an input endpoint to a stage sink pad
    pub fn link_input(&self, endpoint: &Endpoint, sink: PadRef) -> Result<()> {
        if endpoint.ty() != Type::Input {
            return Err(Error::Invalid("not an input endpoint"));
        }
        self.graph
            .link(PadRef::new(endpoint.entity(), 0), sink, true)
    }

    /// Registered endpoints, in registration order
    pub fn endpoints(&self) -> Vec<Arc<Endpoint>> {
        self.endpoints
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Endpoint registered on `port`
    pub fn endpoint(&self, port: u32) -> Option<Arc<Endpoint>> {
        self.endpoints().into_iter().find(|ep| ep.port() == port)
    }
}

//! Pipeline stream management
//!
//! Pipelines carry one or more streams, with the sources and sinks being either live (camera
//! sensors, HDMI receivers) or DMA engines. Output DMA engines don't accept data on their stream
//! interface until they are started, so back-pressure can build up all the way to the source when
//! no stage along the way is able to drop packets. This matters for pipelines with several output
//! engines, and is what [`Mode`] controls.
//!
//! Lock order: the pipeline lock may be held while taking the graph lock or an endpoint's
//! in-flight lock, never the other way around.

use log::{debug, error};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::Mode;
use crate::endpoint::{Endpoint, Type};
use crate::graph::{Graph, PadRef};
use crate::stage::STREAM0;
use crate::{Error, Result};

#[derive(Default)]
struct State {
    use_count: u32,
    endpoints: Vec<Arc<Endpoint>>,
    num_inputs: u32,
    num_outputs: u32,
    input_stream_count: u32,
    output_stream_count: u32,
}

impl State {
    fn each(&self, ty: Type) -> impl DoubleEndedIterator<Item = &Arc<Endpoint>> {
        self.endpoints.iter().filter(move |ep| ep.ty() == ty)
    }

    fn is_last_to_arm(&self) -> bool {
        self.input_stream_count + self.output_stream_count + 1
            == self.num_inputs + self.num_outputs
    }

    fn clear(&mut self) {
        self.endpoints.clear();
        self.num_inputs = 0;
        self.num_outputs = 0;
    }
}

/// Set of DMA endpoints and stages streaming together
///
/// Every endpoint embeds a pipeline, but only the one of the endpoint starting first is used for a
/// streaming session: the others join it through the graph.
pub struct Pipeline {
    mode: Mode,
    graph: Arc<Graph>,
    state: Mutex<State>,
}

impl Pipeline {
    /// Returns an idle pipeline
    ///
    /// # Arguments
    ///
    /// * `graph` - Topology the pipeline discovers its endpoints in
    /// * `mode` - Start and stop policy for multiple output endpoints
    pub fn new(graph: Arc<Graph>, mode: Mode) -> Self {
        Pipeline {
            mode,
            graph,
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Number of endpoints streaming through the pipeline
    pub fn use_count(&self) -> u32 {
        self.lock().use_count
    }

    /// Discovered endpoints, empty while the pipeline is unused
    pub fn endpoints(&self) -> Vec<Arc<Endpoint>> {
        self.lock().endpoints.clone()
    }

    /// Number of discovered `(input, output)` endpoints
    pub fn num_endpoints(&self) -> (u32, u32) {
        let state = self.lock();
        (state.num_inputs, state.num_outputs)
    }

    /// Number of `(input, output)` endpoints armed so far
    pub fn stream_counts(&self) -> (u32, u32) {
        let state = self.lock();
        (state.input_stream_count, state.output_stream_count)
    }

    /// Prepare the pipeline for streaming
    ///
    /// The first user discovers the endpoints reachable from `endpoint`, later users only
    /// increase the use count.
    pub fn prepare(&self, endpoint: &Endpoint) -> Result<()> {
        let mut state = self.lock();

        if state.use_count == 0 {
            if let Err(e) = self.init(&mut state, endpoint) {
                state.clear();
                return Err(e);
            }
        }

        state.use_count += 1;
        Ok(())
    }

    fn init(&self, state: &mut State, start: &Endpoint) -> Result<()> {
        let endpoints = self.graph.endpoints(start.entity());

        let num_outputs = endpoints.iter().filter(|ep| ep.ty() == Type::Output).count() as u32;
        let num_inputs = endpoints.len() as u32 - num_outputs;
        if endpoints.is_empty() {
            return Err(Error::NotFound);
        }

        debug!(
            "pipeline of {}: {} inputs, {} outputs",
            start.name(),
            num_inputs,
            num_outputs
        );
        state.endpoints = endpoints;
        state.num_inputs = num_inputs;
        state.num_outputs = num_outputs;
        Ok(())
    }

    /// Drop one user, clearing the membership after the last one
    pub fn release(&self) {
        let mut state = self.lock();

        state.use_count = state.use_count.saturating_sub(1);
        if state.use_count == 0 {
            state.clear();
        }
    }

    /// Start a DMA endpoint on the pipeline
    ///
    /// In sync mode the endpoint is only counted as armed, and the whole pipeline is started by
    /// the last endpoint to arm. In async mode the endpoint's branch is started on its own. The
    /// counters are not updated when the start fails.
    pub fn start_dma(&self, endpoint: &Endpoint) -> Result<()> {
        let mut state = self.lock();

        match self.mode {
            Mode::Sync => {
                if state.is_last_to_arm() {
                    self.start(&state)?;
                }

                match endpoint.ty() {
                    Type::Output => state.output_stream_count += 1,
                    Type::Input => state.input_stream_count += 1,
                }
            }
            Mode::Async => {
                endpoint.dma_start()?;
                if let Err(e) = self.enable_branch(endpoint) {
                    endpoint.dma_stop();
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    /// Stop a DMA endpoint on the pipeline
    ///
    /// In sync mode the whole pipeline stops as soon as one endpoint stops.
    pub fn stop_dma(&self, endpoint: &Endpoint) {
        let mut state = self.lock();

        match self.mode {
            Mode::Sync => {
                match endpoint.ty() {
                    Type::Output => {
                        state.output_stream_count = state.output_stream_count.saturating_sub(1)
                    }
                    Type::Input => {
                        state.input_stream_count = state.input_stream_count.saturating_sub(1)
                    }
                }

                if state.is_last_to_arm() {
                    self.stop(&state);
                }
            }
            Mode::Async => {
                // failures are logged, teardown goes on
                self.disable_branch(endpoint).ok();
                endpoint.dma_stop();
            }
        }
    }

    /// Start the full pipeline
    ///
    /// Output engines are started first so they accept data as soon as the stages run, then every
    /// branch ending at an output is enabled, and the input engines start feeding the pipeline
    /// last.
    fn start(&self, state: &State) -> Result<()> {
        let outputs: Vec<_> = state.each(Type::Output).collect();
        let inputs: Vec<_> = state.each(Type::Input).collect();

        for (i, ep) in outputs.iter().enumerate() {
            if let Err(e) = ep.dma_start() {
                outputs[..i].iter().rev().for_each(|ep| ep.dma_stop());
                return Err(e);
            }
        }

        for (i, ep) in outputs.iter().enumerate() {
            if let Err(e) = self.enable_branch(ep) {
                for ep in outputs[..i].iter().rev() {
                    self.disable_branch(ep).ok();
                }
                outputs.iter().rev().for_each(|ep| ep.dma_stop());
                return Err(e);
            }
        }

        for (i, ep) in inputs.iter().enumerate() {
            if let Err(e) = ep.dma_start() {
                inputs[..i].iter().rev().for_each(|ep| ep.dma_stop());
                for ep in outputs.iter().rev() {
                    self.disable_branch(ep).ok();
                }
                outputs.iter().rev().for_each(|ep| ep.dma_stop());
                return Err(e);
            }
        }

        debug!("pipeline started with {} endpoints", state.endpoints.len());
        Ok(())
    }

    /// Stop the full pipeline
    ///
    /// Best effort: a stage failing to stop is logged and the remaining steps still run.
    fn stop(&self, state: &State) {
        state.each(Type::Input).for_each(|ep| ep.dma_stop());
        for ep in state.each(Type::Output) {
            self.disable_branch(ep).ok();
        }
        state.each(Type::Output).for_each(|ep| ep.dma_stop());

        debug!("pipeline stopped");
    }

    /// Enable streaming on all stages of the branch ending at `endpoint`
    fn enable_branch(&self, endpoint: &Endpoint) -> Result<()> {
        debug!("enabling streams on {}", endpoint.name());

        let pad = self.branch_pad(endpoint)?;
        self.graph.enable_streams(pad, STREAM0).map_err(|e| {
            error!("failed to enable streams for {}", endpoint.name());
            e
        })
    }

    /// Disable streaming on all stages of the branch ending at `endpoint`
    fn disable_branch(&self, endpoint: &Endpoint) -> Result<()> {
        debug!("disabling streams on {}", endpoint.name());

        let pad = self.branch_pad(endpoint)?;
        self.graph.disable_streams(pad, STREAM0).map_err(|e| {
            error!("failed to disable streams for {}", endpoint.name());
            e
        })
    }

    fn branch_pad(&self, endpoint: &Endpoint) -> Result<PadRef> {
        self.graph
            .remote_stage(endpoint.entity())
            .map(|(_, pad)| pad)
            .ok_or(Error::NotConnected)
    }
}

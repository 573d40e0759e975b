//! Processing graph
//!
//! The graph holds the topology of a device: stages and DMA endpoints (entities), their pads and
//! the links between them. Topology changes and streaming sessions are serialized by the graph
//! lock. Stage stream operations are always called with the lock released.

use bitflags::bitflags;
use log::{debug, error};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::endpoint::Endpoint;
use crate::format::{info, FieldOrder};
use crate::pipeline::Pipeline;
use crate::stage::Stage;
use crate::{Error, Result};

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct PadFlags: u32 {
        /// data flows into the entity
        const SINK      = 0x1;
        /// data flows out of the entity
        const SOURCE    = 0x2;
    }
}

impl fmt::Display for PadFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Entity handle, only meaningful for the graph that returned it
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntityId(pub usize);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Pad of an entity
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PadRef {
    pub entity: EntityId,
    pub pad: u32,
}

impl PadRef {
    pub const fn new(entity: EntityId, pad: u32) -> Self {
        PadRef { entity, pad }
    }
}

enum Node {
    Stage(Arc<dyn Stage>),
    Video {
        name: String,
        endpoint: Weak<Endpoint>,
        pad: PadFlags,
    },
}

impl Node {
    fn name(&self) -> &str {
        match self {
            Node::Stage(stage) => stage.name(),
            Node::Video { name, .. } => name,
        }
    }

    fn pad(&self, pad: u32) -> Option<PadFlags> {
        match self {
            Node::Stage(stage) => stage.pads().get(pad as usize).copied(),
            Node::Video { pad: flags, .. } if pad == 0 => Some(*flags),
            Node::Video { .. } => None,
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct Link {
    source: PadRef,
    sink: PadRef,
    enabled: bool,
}

impl Link {
    /// Returns the other end of the link if it touches `pad`
    fn remote(&self, pad: PadRef) -> Option<PadRef> {
        if self.source == pad {
            Some(self.sink)
        } else if self.sink == pad {
            Some(self.source)
        } else {
            None
        }
    }

    fn touches(&self, entity: EntityId) -> bool {
        self.source.entity == entity || self.sink.entity == entity
    }
}

struct Session {
    pipe: Arc<Pipeline>,
    members: Vec<EntityId>,
    start_count: u32,
}

#[derive(Default)]
struct Topology {
    nodes: Vec<Node>,
    links: Vec<Link>,
    sessions: Vec<Session>,
}

impl Topology {
    fn node(&self, id: EntityId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(Error::Invalid("no such entity"))
    }

    fn session_of(&self, id: EntityId) -> Option<usize> {
        self.sessions.iter().position(|s| s.members.contains(&id))
    }

    /// Breadth-first walk over enabled links, in both directions
    fn walk(&self, start: EntityId) -> Vec<EntityId> {
        let mut visited = vec![start];
        let mut pending = VecDeque::from([start]);

        while let Some(entity) = pending.pop_front() {
            for link in self.links.iter().filter(|l| l.enabled && l.touches(entity)) {
                let next = if link.source.entity == entity {
                    link.sink.entity
                } else {
                    link.source.entity
                };
                if !visited.contains(&next) {
                    visited.push(next);
                    pending.push_back(next);
                }
            }
        }

        visited
    }

    fn remote_pad(&self, pad: PadRef) -> Option<PadRef> {
        self.links
            .iter()
            .filter(|l| l.enabled)
            .find_map(|l| l.remote(pad))
    }

    fn stage(&self, id: EntityId) -> Option<Arc<dyn Stage>> {
        match self.nodes.get(id.0) {
            Some(Node::Stage(stage)) => Some(stage.clone()),
            _ => None,
        }
    }

    /// Checks every enabled link between two stages of `members`
    fn validate(&self, members: &[EntityId]) -> Result<()> {
        for link in &self.links {
            if !link.enabled || !members.contains(&link.source.entity) {
                continue;
            }

            let (Some(source), Some(sink)) =
                (self.stage(link.source.entity), self.stage(link.sink.entity))
            else {
                continue;
            };

            let src_fmt = source.format(link.source.pad)?;
            let sink_fmt = sink.format(link.sink.pad)?;
            debug!(
                "validating link {}/{} -> {}/{}",
                source.name(),
                link.source.pad,
                sink.name(),
                link.sink.pad
            );

            if src_fmt.width != sink_fmt.width || src_fmt.height != sink_fmt.height {
                return Err(Error::LinkMismatch("frame size"));
            }
            if src_fmt.field != sink_fmt.field && sink_fmt.field != FieldOrder::Progressive {
                return Err(Error::LinkMismatch("field order"));
            }
            if info::by_code(src_fmt.code).is_none() || info::by_code(sink_fmt.code).is_none() {
                return Err(Error::LinkMismatch("media bus code"));
            }
        }

        Ok(())
    }
}

/// Topology of a device
#[derive(Default)]
pub struct Graph {
    inner: Mutex<Topology>,
}

impl Graph {
    /// Returns an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Topology> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds a processing stage
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use vipp::format::{mbus::code, MbusFormat};
    /// use vipp::graph::Graph;
    /// use vipp::stage::{Kind, Passthrough};
    ///
    /// let graph = Graph::new();
    /// let fmt = MbusFormat::new(code::UYVY8_1X16, 1920, 1080);
    /// let csc = graph.add_stage(Arc::new(Passthrough::new("csc", Kind::Converter, 1, 1, fmt)));
    /// assert_eq!(graph.name(csc).as_deref(), Some("csc"));
    /// ```
    pub fn add_stage(&self, stage: Arc<dyn Stage>) -> EntityId {
        let mut topo = self.lock();
        topo.nodes.push(Node::Stage(stage));
        EntityId(topo.nodes.len() - 1)
    }

    pub(crate) fn add_video(&self, name: &str, endpoint: Weak<Endpoint>, pad: PadFlags) -> EntityId {
        let mut topo = self.lock();
        topo.nodes.push(Node::Video {
            name: name.to_string(),
            endpoint,
            pad,
        });
        EntityId(topo.nodes.len() - 1)
    }

    /// Name of an entity
    pub fn name(&self, id: EntityId) -> Option<String> {
        self.lock().node(id).ok().map(|n| n.name().to_string())
    }

    /// Creates a link from a source pad to a sink pad
    ///
    /// # Arguments
    ///
    /// * `source` - Pad the data leaves through
    /// * `sink` - Pad the data enters through
    /// * `enabled` - Initial state of the link
    pub fn link(&self, source: PadRef, sink: PadRef, enabled: bool) -> Result<()> {
        let mut topo = self.lock();

        let src_flags = topo
            .node(source.entity)?
            .pad(source.pad)
            .ok_or(Error::Invalid("no such source pad"))?;
        let sink_flags = topo
            .node(sink.entity)?
            .pad(sink.pad)
            .ok_or(Error::Invalid("no such sink pad"))?;
        if !src_flags.contains(PadFlags::SOURCE) || !sink_flags.contains(PadFlags::SINK) {
            return Err(Error::Invalid("link must go from a source pad to a sink pad"));
        }
        if topo
            .links
            .iter()
            .any(|l| l.source == source && l.sink == sink)
        {
            return Err(Error::Invalid("link already exists"));
        }

        topo.links.push(Link {
            source,
            sink,
            enabled,
        });
        Ok(())
    }

    /// Enables or disables an existing link
    ///
    /// Links touching an entity of a running pipeline are frozen.
    pub fn set_link_enabled(&self, source: PadRef, sink: PadRef, enabled: bool) -> Result<()> {
        let mut topo = self.lock();

        let index = topo
            .links
            .iter()
            .position(|l| l.source == source && l.sink == sink)
            .ok_or(Error::NotConnected)?;
        if topo.session_of(source.entity).is_some() || topo.session_of(sink.entity).is_some() {
            return Err(Error::Busy);
        }

        topo.links[index].enabled = enabled;
        Ok(())
    }

    /// Enabled links of an entity, as `(local, remote)` pad pairs
    pub fn enabled_links(&self, entity: EntityId) -> Vec<(PadRef, PadRef)> {
        self.lock()
            .links
            .iter()
            .filter(|l| l.enabled && l.touches(entity))
            .map(|l| {
                if l.source.entity == entity {
                    (l.source, l.sink)
                } else {
                    (l.sink, l.source)
                }
            })
            .collect()
    }

    /// Entities reachable from `start` over enabled links, `start` first
    pub fn walk(&self, start: EntityId) -> Vec<EntityId> {
        self.lock().walk(start)
    }

    /// DMA endpoints reachable from `start`, in walk order
    pub fn endpoints(&self, start: EntityId) -> Vec<Arc<Endpoint>> {
        let topo = self.lock();
        topo.walk(start)
            .into_iter()
            .filter_map(|id| match topo.nodes.get(id.0) {
                Some(Node::Video { endpoint, .. }) => endpoint.upgrade(),
                _ => None,
            })
            .collect()
    }

    /// Stage connected to pad 0 of `entity` over an enabled link, with the pad it is reached on
    pub fn remote_stage(&self, entity: EntityId) -> Option<(Arc<dyn Stage>, PadRef)> {
        let topo = self.lock();
        let remote = topo.remote_pad(PadRef::new(entity, 0))?;
        topo.stage(remote.entity).map(|stage| (stage, remote))
    }

    /// Pipeline `entity` currently streams in
    pub fn pipeline(&self, entity: EntityId) -> Option<Arc<Pipeline>> {
        let topo = self.lock();
        topo.session_of(entity)
            .map(|index| topo.sessions[index].pipe.clone())
    }

    /// Starts streaming on `entity`
    ///
    /// If the entity is part of a running pipeline, that pipeline is returned. Otherwise every
    /// entity reachable from it is claimed for `candidate`, after validating the links between
    /// them. Each successful call must be balanced by [`Graph::pipeline_stop`].
    pub fn pipeline_start(&self, entity: EntityId, candidate: &Arc<Pipeline>) -> Result<Arc<Pipeline>> {
        let mut topo = self.lock();
        topo.node(entity)?;

        if let Some(index) = topo.session_of(entity) {
            let session = &mut topo.sessions[index];
            session.start_count += 1;
            return Ok(session.pipe.clone());
        }

        let members = topo.walk(entity);
        if members.iter().any(|&id| topo.session_of(id).is_some()) {
            return Err(Error::Busy);
        }
        topo.validate(&members)?;

        debug!(
            "starting pipeline from {} with {} entities",
            topo.node(entity)?.name(),
            members.len()
        );
        topo.sessions.push(Session {
            pipe: candidate.clone(),
            members,
            start_count: 1,
        });
        Ok(candidate.clone())
    }

    /// Stops streaming on `entity`, ending the session after the last stop
    pub fn pipeline_stop(&self, entity: EntityId) {
        let mut topo = self.lock();
        let Some(index) = topo.session_of(entity) else {
            return;
        };

        let session = &mut topo.sessions[index];
        session.start_count = session.start_count.saturating_sub(1);
        if session.start_count == 0 {
            topo.sessions.swap_remove(index);
        }
    }

    /// Stage pads on the other side of `pad` and the stage pads linked to them
    fn connected(&self, pad: PadRef) -> Result<(Arc<dyn Stage>, Vec<PadRef>)> {
        let topo = self.lock();
        let stage = topo
            .stage(pad.entity)
            .ok_or(Error::Invalid("entity is not a stage"))?;
        let local = stage
            .pads()
            .get(pad.pad as usize)
            .copied()
            .ok_or(Error::Invalid("no such pad"))?;

        let mut remotes = Vec::new();
        for (index, flags) in stage.pads().iter().enumerate() {
            if (local ^ *flags) != (PadFlags::SINK | PadFlags::SOURCE) {
                continue;
            }
            let other = PadRef::new(pad.entity, index as u32);
            for link in topo.links.iter().filter(|l| l.enabled) {
                if let Some(remote) = link.remote(other) {
                    if topo.stage(remote.entity).is_some() {
                        remotes.push(remote);
                    }
                }
            }
        }

        Ok((stage, remotes))
    }

    /// Enables streams on a stage pad and on every stage feeding it or fed by it
    ///
    /// The stage is enabled first, then the request travels over the enabled links of the pads on
    /// the other side of the stage. Each pad is entered at most once, so loops in the graph end
    /// the walk. On failure everything enabled by the call is disabled again.
    pub fn enable_streams(&self, pad: PadRef, streams: u64) -> Result<()> {
        self.enable_from(pad, streams, &mut Vec::new())
    }

    fn enable_from(&self, pad: PadRef, streams: u64, visited: &mut Vec<PadRef>) -> Result<()> {
        if visited.contains(&pad) {
            return Ok(());
        }
        visited.push(pad);
        let (stage, remotes) = self.connected(pad)?;

        debug!(
            "enabling streams 0x{:x} on {}/{}",
            streams,
            stage.name(),
            pad.pad
        );
        stage.enable_streams(pad.pad, streams).map_err(|e| {
            error!("failed to enable streams on {}: {}", stage.name(), e);
            e
        })?;

        let mark = visited.len();
        for (i, remote) in remotes.iter().enumerate() {
            if let Err(e) = self.enable_from(*remote, streams, visited) {
                let mut seen = visited[..mark].to_vec();
                for done in remotes[..i].iter().rev() {
                    self.disable_from(*done, streams, &mut seen).ok();
                }
                stage.disable_streams(pad.pad, streams).ok();
                return Err(e);
            }
        }

        Ok(())
    }

    /// Disables streams on a stage pad, connected stages first
    pub fn disable_streams(&self, pad: PadRef, streams: u64) -> Result<()> {
        self.disable_from(pad, streams, &mut Vec::new())
    }

    fn disable_from(&self, pad: PadRef, streams: u64, visited: &mut Vec<PadRef>) -> Result<()> {
        if visited.contains(&pad) {
            return Ok(());
        }
        visited.push(pad);
        let (stage, remotes) = self.connected(pad)?;

        let mut result = Ok(());
        for remote in remotes.iter().rev() {
            if let Err(e) = self.disable_from(*remote, streams, visited) {
                result = result.and(Err(e));
            }
        }

        debug!(
            "disabling streams 0x{:x} on {}/{}",
            streams,
            stage.name(),
            pad.pad
        );
        if let Err(e) = stage.disable_streams(pad.pad, streams) {
            error!("failed to disable streams on {}: {}", stage.name(), e);
            result = result.and(Err(e));
        }

        result
    }
}

//! Signal graph: typed nodes wired source → stages → master.
//!
//! Every node has at most one input and at most one output, so a source and the
//! stages hanging off it form a chain that ends at the master bus (or nowhere,
//! while it is still being wired). Chains that never reach the master are
//! silent and do not advance.
//!
//! Nodes are addressed by generational [`NodeId`]s; releasing a node bumps the
//! slot generation so stale handles are rejected instead of aliasing a reused slot.
//! Each node is tagged with an [`Owner`]; a session's nodes are released in one
//! sweep with [`Graph::remove_owner`]. Transient chains release themselves once
//! their source reports it has finished.

use murmur_core::filters::StereoSvf;

use crate::error::GraphError;
use crate::nodes::{ChirpVoice, Frame, LoopPlayer, OneShot, Osc, PanLaw};

/// Generational handle to a graph node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Identifies one playback session of a soundscape.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

/// Who a node belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Part of a session's continuous subgraph.
    Session(SessionId),
    /// Short-lived burst chain; released by the graph when its source finishes.
    Transient,
}

/// Signal producers. Sources take no input.
#[derive(Clone, Debug)]
pub enum Source {
    Loop(LoopPlayer),
    /// Sine tone at a fixed level.
    Tone(Osc),
    Burst(OneShot),
    Chirp(ChirpVoice),
}

impl Source {
    #[inline]
    fn next(&mut self, sr: f32) -> Frame {
        match self {
            Source::Loop(p) => p.next(),
            Source::Tone(o) => {
                let s = o.next(sr);
                [s, s]
            }
            Source::Burst(b) => {
                let s = b.next();
                [s, s]
            }
            Source::Chirp(c) => {
                let s = c.next(sr);
                [s, s]
            }
        }
    }

    /// Continuous sources never finish.
    #[inline]
    pub fn is_finished(&self) -> bool {
        match self {
            Source::Loop(_) | Source::Tone(_) => false,
            Source::Burst(b) => b.is_finished(),
            Source::Chirp(c) => c.is_finished(),
        }
    }
}

/// Single-input processing stages.
#[derive(Clone, Debug)]
pub enum Stage {
    Filter(StereoSvf),
    Gain(f32),
    /// Mono fold + constant-power placement in [-1, 1].
    Pan(f32),
}

impl Stage {
    #[inline]
    fn process(&mut self, x: Frame) -> Frame {
        match self {
            Stage::Filter(f) => f.process(x),
            Stage::Gain(g) => [x[0] * *g, x[1] * *g],
            Stage::Pan(p) => PanLaw::place(x, *p),
        }
    }
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Source(Source),
    Stage(Stage),
}

/// Where a node's output goes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Output {
    Unconnected,
    Node(NodeId),
    Master,
}

#[derive(Debug)]
struct Node {
    owner: Owner,
    kind: NodeKind,
    output: Output,
    has_input: bool,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Fixed-capacity node arena plus the list of sources to pull each frame.
#[derive(Debug)]
pub struct Graph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    sources: Vec<NodeId>,
    finished: Vec<NodeId>,
    live: usize,
    capacity: usize,
}

impl Graph {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            sources: Vec::with_capacity(capacity),
            finished: Vec::with_capacity(capacity),
            live: 0,
            capacity,
        }
    }

    /// Live node count.
    #[inline] pub fn len(&self) -> usize { self.live }
    #[inline] pub fn is_empty(&self) -> bool { self.live == 0 }
    #[inline] pub fn capacity(&self) -> usize { self.capacity }

    pub fn contains(&self, id: NodeId) -> bool { self.node(id).is_some() }

    pub fn owned_count(&self, owner: Owner) -> usize {
        self.slots
            .iter()
            .filter(|s| s.node.as_ref().is_some_and(|n| n.owner == owner))
            .count()
    }

    pub fn output_of(&self, id: NodeId) -> Option<Output> { self.node(id).map(|n| n.output) }

    pub fn add(&mut self, owner: Owner, kind: NodeKind) -> Result<NodeId, GraphError> {
        if self.live >= self.capacity {
            return Err(GraphError::Full { capacity: self.capacity });
        }
        let is_source = matches!(kind, NodeKind::Source(_));
        let node = Node { owner, kind, output: Output::Unconnected, has_input: false };
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeId { index, generation: slot.generation }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, node: Some(node) });
                NodeId { index, generation: 0 }
            }
        };
        if is_source {
            self.sources.push(id);
        }
        self.live += 1;
        Ok(id)
    }

    /// Wire `from`'s output into `to`.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        let src = self.node(from).ok_or(GraphError::UnknownNode(from))?;
        if src.output != Output::Unconnected {
            return Err(GraphError::OutputTaken(from));
        }
        let dst = self.node(to).ok_or(GraphError::UnknownNode(to))?;
        if matches!(dst.kind, NodeKind::Source(_)) {
            return Err(GraphError::SourceInput(to));
        }
        if dst.has_input {
            return Err(GraphError::InputTaken(to));
        }
        if self.reaches(to, from) {
            return Err(GraphError::Cycle { from, to });
        }
        if let Some(n) = self.node_mut(to) {
            n.has_input = true;
        }
        if let Some(n) = self.node_mut(from) {
            n.output = Output::Node(to);
        }
        Ok(())
    }

    pub fn connect_to_master(&mut self, from: NodeId) -> Result<(), GraphError> {
        let n = self.node_mut(from).ok_or(GraphError::UnknownNode(from))?;
        if n.output != Output::Unconnected {
            return Err(GraphError::OutputTaken(from));
        }
        n.output = Output::Master;
        Ok(())
    }

    /// Connect `ids` in order and the last one to master.
    pub fn chain_to_master(&mut self, ids: &[NodeId]) -> Result<(), GraphError> {
        for pair in ids.windows(2) {
            self.connect(pair[0], pair[1])?;
        }
        match ids.last() {
            Some(&last) => self.connect_to_master(last),
            None => Ok(()),
        }
    }

    /// Disconnect and release one node. Returns false for unknown/stale ids.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(node) = self.slots.get_mut(id.index as usize).and_then(|s| {
            if s.generation == id.generation { s.node.take() } else { None }
        }) else {
            return false;
        };
        let slot = &mut self.slots[id.index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;

        if let Output::Node(next) = node.output {
            if let Some(n) = self.node_mut(next) {
                n.has_input = false;
            }
        }
        if node.has_input {
            for s in &mut self.slots {
                if let Some(n) = s.node.as_mut() {
                    if n.output == Output::Node(id) {
                        n.output = Output::Unconnected;
                    }
                }
            }
        }
        if matches!(node.kind, NodeKind::Source(_)) {
            self.sources.retain(|&s| s != id);
        }
        true
    }

    /// Release every node tagged with `owner`. Returns how many were released.
    pub fn remove_owner(&mut self, owner: Owner) -> usize {
        let ids: Vec<NodeId> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| {
                s.node
                    .as_ref()
                    .filter(|n| n.owner == owner)
                    .map(|_| NodeId { index: i as u32, generation: s.generation })
            })
            .collect();
        ids.iter().filter(|&&id| self.remove(id)).count()
    }

    /// Pull one frame from every source through its chain and sum at master.
    pub fn render_frame(&mut self, sr: f32) -> Frame {
        let mut sum = [0.0f32; 2];
        for i in 0..self.sources.len() {
            let id = self.sources[i];
            let Some(node) = self.node_mut(id) else { continue };
            if node.output == Output::Unconnected {
                continue;
            }
            let NodeKind::Source(src) = &mut node.kind else { continue };
            let mut x = src.next(sr);
            let done = node.owner == Owner::Transient && src.is_finished();
            let mut out = node.output;
            loop {
                match out {
                    Output::Master => {
                        sum[0] += x[0];
                        sum[1] += x[1];
                        break;
                    }
                    Output::Unconnected => break,
                    Output::Node(next) => {
                        let Some(n) = self.node_mut(next) else { break };
                        if let NodeKind::Stage(stage) = &mut n.kind {
                            x = stage.process(x);
                        }
                        out = n.output;
                    }
                }
            }
            if done {
                self.finished.push(id);
            }
        }
        if !self.finished.is_empty() {
            self.reclaim_finished();
        }
        sum
    }

    fn reclaim_finished(&mut self) {
        while let Some(src) = self.finished.pop() {
            let mut cur = Some(src);
            while let Some(id) = cur {
                cur = match self.output_of(id) {
                    Some(Output::Node(next)) => Some(next),
                    _ => None,
                };
                if self.node(id).is_some_and(|n| n.owner == Owner::Transient) {
                    self.remove(id);
                } else {
                    break;
                }
            }
        }
    }

    /// True if following outputs from `start` arrives at `target`.
    fn reaches(&self, start: NodeId, target: NodeId) -> bool {
        let mut cur = start;
        for _ in 0..=self.live {
            if cur == target {
                return true;
            }
            match self.node(cur).map(|n| n.output) {
                Some(Output::Node(next)) => cur = next,
                _ => return false,
            }
        }
        false
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
    }
}

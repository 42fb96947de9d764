//! Master bus: owns the graph, the shared master gain and the sample clock.
//!
//! The master gain node lives for the whole engine lifetime; sessions come and
//! go underneath it. Volume changes are smoothed so they never click.

use murmur_core::dsp::{clamp, clamp01};
use murmur_core::envelopes::TargetRamp;

use crate::graph::Graph;

#[derive(Debug)]
pub struct Mixer {
    graph: Graph,
    master: TargetRamp,
    sr: f32,
    clock: u64,
}

impl Mixer {
    pub fn new(sample_rate: f32, max_nodes: usize, volume: f32, ramp_ms: f32) -> Self {
        Self {
            graph: Graph::new(max_nodes),
            master: TargetRamp::new(clamp01(volume), ramp_ms, sample_rate),
            sr: sample_rate,
            clock: 0,
        }
    }

    #[inline] pub fn sample_rate(&self) -> f32 { self.sr }
    #[inline] pub fn graph(&self) -> &Graph { &self.graph }
    #[inline] pub fn graph_mut(&mut self) -> &mut Graph { &mut self.graph }

    /// Frames rendered since construction.
    #[inline] pub fn clock(&self) -> u64 { self.clock }

    /// Retarget the master gain (clamped to [0, 1]); the change is ramped.
    pub fn set_volume(&mut self, v: f32) { self.master.set_target(clamp01(v)); }

    /// Volume the master gain is heading to.
    #[inline] pub fn volume(&self) -> f32 { self.master.target() }

    /// Current (smoothed) master gain.
    #[inline] pub fn master_gain(&self) -> f32 { self.master.value() }

    /// Fill an interleaved buffer of `channels`-wide frames.
    ///
    /// Mono outputs get the L/R average; wider layouts repeat L/R across pairs.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for frame in out.chunks_mut(channels) {
            let [l, r] = self.graph.render_frame(self.sr);
            let g = self.master.next();
            let (l, r) = (clamp(l * g, -1.0, 1.0), clamp(r * g, -1.0, 1.0));
            if channels == 1 {
                frame[0] = 0.5 * (l + r);
            } else {
                for (i, s) in frame.iter_mut().enumerate() {
                    *s = if i % 2 == 0 { l } else { r };
                }
            }
            self.clock += 1;
        }
    }
}

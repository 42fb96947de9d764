//! Transient voices: randomized one-shot bursts layered over a soundscape bed.
//!
//! A [`TransientProfile`] is static data describing *when* bursts happen
//! (startup delay, cluster size and spacing, inter-cluster delay) and *what*
//! each burst sounds like ([`Voice`]). [`TransientProfile::prepare`] renders
//! any per-session template once; [`PreparedVoice::spawn`] then wires one
//! randomized burst chain into the graph as [`Owner::Transient`] nodes that
//! release themselves when they finish.

use std::sync::Arc;

use murmur_core::envelopes::BurstEnvelope;
use murmur_core::filters::{StereoSvf, SvfMode};
use murmur_core::noise::decaying_burst;
use rand::{Rng, RngCore};

use crate::error::GraphError;
use crate::graph::{Graph, NodeId, NodeKind, Owner, Source, Stage};
use crate::nodes::{ChirpVoice, OneShot};

/// Uniform range `[lo, hi)`; `lo == hi` is a fixed value.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Span {
    pub lo: f32,
    pub hi: f32,
}

impl Span {
    pub const fn new(lo: f32, hi: f32) -> Self { Self { lo, hi } }
    pub const fn fixed(v: f32) -> Self { Self { lo: v, hi: v } }

    pub fn sample<R: RngCore + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.hi > self.lo { rng.gen_range(self.lo..self.hi) } else { self.lo }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TransientKind {
    /// Campfire crackles: tight clusters of high-passed clicks.
    Crackle,
    /// Café cup clinks: single band-passed taps.
    Clatter,
    /// Forest bird chirps: clusters of swept tones.
    Chirp,
}

/// What one burst sounds like.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Voice {
    /// Exponentially decaying white-noise template → filter → gain → pan.
    NoiseBurst {
        length_ms: f32,
        decay_ms: f32,
        filter: SvfMode,
        hz: Span,
        q: f32,
        gain: Span,
    },
    /// Swept sine under a burst envelope → pan.
    Chirp {
        start_hz: Span,
        end_ratio: Span,
        sweep_ms: Span,
        peak: Span,
        attack_ms: f32,
        floor: f32,
        decay_end_ms: Span,
        stop_ms: f32,
    },
}

/// Timing and sound of a soundscape's transient layer. All times in ms.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TransientProfile {
    pub kind: TransientKind,
    /// Delay from session start to the first cluster.
    pub startup_ms: Span,
    /// Delay from one cluster to the next.
    pub next_ms: Span,
    /// Bursts per cluster, inclusive.
    pub cluster: (u32, u32),
    /// Gap between consecutive bursts of a cluster.
    pub spacing_ms: Span,
    pub pan: Span,
    pub voice: Voice,
}

impl TransientProfile {
    pub fn cluster_size<R: RngCore + ?Sized>(&self, rng: &mut R) -> u32 {
        let (lo, hi) = self.cluster;
        if hi > lo { rng.gen_range(lo..=hi) } else { lo }
    }

    /// Render what every burst of a session shares.
    pub fn prepare<R: RngCore + ?Sized>(&'static self, sr: f32, rng: &mut R) -> PreparedVoice {
        let template = match self.voice {
            Voice::NoiseBurst { length_ms, decay_ms, .. } => {
                Some(Arc::from(decaying_burst(length_ms * 1e-3, decay_ms * 1e-3, sr, rng)))
            }
            Voice::Chirp { .. } => None,
        };
        PreparedVoice { profile: self, template }
    }
}

/// A profile bound to a session's pre-rendered template.
#[derive(Clone, Debug)]
pub struct PreparedVoice {
    profile: &'static TransientProfile,
    template: Option<Arc<[f32]>>,
}

impl PreparedVoice {
    #[inline] pub fn profile(&self) -> &'static TransientProfile { self.profile }

    /// Wire one randomized burst into `graph`. Returns the burst's source node.
    pub fn spawn<R: RngCore + ?Sized>(
        &self,
        graph: &mut Graph,
        sr: f32,
        rng: &mut R,
    ) -> Result<NodeId, GraphError> {
        let p = self.profile;
        let mut chain: Vec<NodeKind> = Vec::with_capacity(4);
        match p.voice {
            Voice::NoiseBurst { filter, hz, q, gain, .. } => {
                let samples = self.template.clone().unwrap_or_else(|| Arc::from(Vec::new()));
                chain.push(NodeKind::Source(Source::Burst(OneShot::new(samples))));
                chain.push(NodeKind::Stage(Stage::Filter(StereoSvf::new(filter, hz.sample(rng), q, sr))));
                chain.push(NodeKind::Stage(Stage::Gain(gain.sample(rng))));
            }
            Voice::Chirp { start_hz, end_ratio, sweep_ms, peak, attack_ms, floor, decay_end_ms, stop_ms } => {
                let f0 = start_hz.sample(rng);
                let f1 = f0 * end_ratio.sample(rng);
                let sweep_s = sweep_ms.sample(rng) * 1e-3;
                let env = BurstEnvelope::new(
                    peak.sample(rng),
                    attack_ms * 1e-3,
                    floor,
                    decay_end_ms.sample(rng) * 1e-3,
                    stop_ms * 1e-3,
                    sr,
                );
                chain.push(NodeKind::Source(Source::Chirp(ChirpVoice::new(f0, f1, sweep_s, env, sr))));
            }
        }
        chain.push(NodeKind::Stage(Stage::Pan(p.pan.sample(rng))));

        if graph.len() + chain.len() > graph.capacity() {
            return Err(GraphError::Full { capacity: graph.capacity() });
        }
        let mut ids = Vec::with_capacity(chain.len());
        for kind in chain {
            ids.push(graph.add(Owner::Transient, kind)?);
        }
        graph.chain_to_master(&ids)?;
        Ok(ids[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soundscapes::{lookup, SoundscapeId};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SR: f32 = 48_000.0;

    fn profile(id: SoundscapeId) -> &'static TransientProfile {
        lookup(id.as_str()).and_then(|d| d.recipe.transient.as_ref()).unwrap()
    }

    #[test]
    fn span_samples_within_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let s = Span::new(200.0, 1000.0);
        for _ in 0..1000 {
            let x = s.sample(&mut rng);
            assert!((200.0..1000.0).contains(&x));
        }
        assert_eq!(Span::fixed(300.0).sample(&mut rng), 300.0);
    }

    #[test]
    fn cluster_sizes_cover_inclusive_range() {
        let mut rng = StdRng::seed_from_u64(4);
        let p = profile(SoundscapeId::Forest);
        let mut seen = [false; 5];
        for _ in 0..500 {
            let n = p.cluster_size(&mut rng);
            assert!((1..=4).contains(&n));
            seen[n as usize] = true;
        }
        assert!(seen[1] && seen[4]);
    }

    #[test]
    fn crackle_burst_plays_out_and_releases() {
        let mut rng = StdRng::seed_from_u64(5);
        let voice = profile(SoundscapeId::Fire).prepare(SR, &mut rng);
        let mut g = Graph::new(16);
        voice.spawn(&mut g, SR, &mut rng).unwrap();
        assert_eq!(g.len(), 4);

        let mut energy = 0.0;
        for _ in 0..(0.05 * SR) as usize {
            let f = g.render_frame(SR);
            energy += f[0] * f[0] + f[1] * f[1];
        }
        assert!(energy > 0.0);
        assert_eq!(g.len(), 0);
    }

    #[test]
    fn chirp_releases_after_hard_stop() {
        let mut rng = StdRng::seed_from_u64(6);
        let voice = profile(SoundscapeId::Forest).prepare(SR, &mut rng);
        let mut g = Graph::new(16);
        voice.spawn(&mut g, SR, &mut rng).unwrap();
        assert_eq!(g.len(), 2);
        for _ in 0..(0.2 * SR) as usize {
            g.render_frame(SR);
        }
        assert_eq!(g.len(), 0);
    }

    #[test]
    fn spawn_fails_cleanly_when_graph_is_full() {
        let mut rng = StdRng::seed_from_u64(7);
        let voice = profile(SoundscapeId::Cafe).prepare(SR, &mut rng);
        let mut g = Graph::new(3);
        assert!(matches!(voice.spawn(&mut g, SR, &mut rng), Err(GraphError::Full { .. })));
        assert!(g.is_empty());
    }
}

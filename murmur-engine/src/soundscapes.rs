//! Soundscape catalog and recipes.
//!
//! A recipe is static data: one or more continuous layers (looping noise or a
//! steady tone, each through its filter stages and gain into master) plus an
//! optional transient profile.
//!
//! Building a session has two halves. [`PreparedSoundscape::render`] does the
//! expensive part (noise beds, burst templates) and touches no engine state,
//! so a realtime host can run it without holding the engine lock.
//! [`RenderedRecipe::build`] then only wires nodes into the graph under the
//! session's owner; on failure the caller releases whatever was already added
//! with [`Graph::remove_owner`].

use core::fmt;
use core::str::FromStr;

use murmur_core::filters::{StereoSvf, SvfMode, DEFAULT_Q};
use murmur_core::noise::{generate, NoiseKind};
use rand::RngCore;

use crate::error::{EngineError, GraphError};
use crate::graph::{Graph, NodeId, NodeKind, Owner, Source, Stage};
use crate::nodes::{LoopPlayer, Osc};
use crate::transient::{PreparedVoice, Span, TransientKind, TransientProfile, Voice};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SoundscapeId {
    Rain,
    Cafe,
    Forest,
    White,
    Fire,
}

impl SoundscapeId {
    /// Catalog order.
    pub const ALL: [SoundscapeId; 5] =
        [SoundscapeId::Rain, SoundscapeId::Cafe, SoundscapeId::Forest, SoundscapeId::White, SoundscapeId::Fire];

    pub fn as_str(self) -> &'static str {
        match self {
            SoundscapeId::Rain => "rain",
            SoundscapeId::Cafe => "cafe",
            SoundscapeId::Forest => "forest",
            SoundscapeId::White => "white",
            SoundscapeId::Fire => "fire",
        }
    }

    pub fn definition(self) -> &'static SoundscapeDefinition {
        &CATALOG[self as usize]
    }
}

impl fmt::Display for SoundscapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for SoundscapeId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SoundscapeId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| EngineError::UnknownSoundscape(s.to_string()))
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LayerSource {
    /// Looping stereo noise bed.
    Noise(NoiseKind),
    Sine { hz: f32 },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FilterSpec {
    pub mode: SvfMode,
    pub hz: f32,
    pub q: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Layer {
    pub source: LayerSource,
    pub filters: &'static [FilterSpec],
    /// Unity when `None`.
    pub gain: Option<f32>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Recipe {
    pub layers: &'static [Layer],
    pub transient: Option<TransientProfile>,
}

#[derive(Debug)]
pub struct SoundscapeDefinition {
    pub id: SoundscapeId,
    pub display_name: &'static str,
    pub icon: &'static str,
    pub recipe: Recipe,
}

const fn lowpass(hz: f32, q: f32) -> FilterSpec { FilterSpec { mode: SvfMode::Lowpass, hz, q } }
const fn highpass(hz: f32, q: f32) -> FilterSpec { FilterSpec { mode: SvfMode::Highpass, hz, q } }
const fn bandpass(hz: f32, q: f32) -> FilterSpec { FilterSpec { mode: SvfMode::Bandpass, hz, q } }

const CRACKLE: TransientProfile = TransientProfile {
    kind: TransientKind::Crackle,
    startup_ms: Span::fixed(300.0),
    next_ms: Span::new(200.0, 1000.0),
    cluster: (1, 3),
    spacing_ms: Span::new(30.0, 110.0),
    pan: Span::new(-0.6, 0.6),
    voice: Voice::NoiseBurst {
        length_ms: 30.0,
        decay_ms: 5.0,
        filter: SvfMode::Highpass,
        hz: Span::new(800.0, 2800.0),
        q: DEFAULT_Q,
        gain: Span::new(0.08, 0.23),
    },
};

const CLATTER: TransientProfile = TransientProfile {
    kind: TransientKind::Clatter,
    startup_ms: Span::new(800.0, 2800.0),
    next_ms: Span::new(1500.0, 6500.0),
    cluster: (1, 1),
    spacing_ms: Span::fixed(0.0),
    pan: Span::new(-1.0, 1.0),
    voice: Voice::NoiseBurst {
        length_ms: 80.0,
        decay_ms: 15.0,
        filter: SvfMode::Bandpass,
        hz: Span::new(2000.0, 5000.0),
        q: 2.0,
        gain: Span::new(0.04, 0.10),
    },
};

const CHIRP: TransientProfile = TransientProfile {
    kind: TransientKind::Chirp,
    startup_ms: Span::new(500.0, 2000.0),
    next_ms: Span::new(2000.0, 8000.0),
    cluster: (1, 4),
    spacing_ms: Span::new(80.0, 230.0),
    pan: Span::new(-0.8, 0.8),
    voice: Voice::Chirp {
        start_hz: Span::new(2000.0, 5000.0),
        end_ratio: Span::new(0.8, 1.4),
        sweep_ms: Span::new(60.0, 140.0),
        peak: Span::new(0.03, 0.07),
        attack_ms: 10.0,
        floor: 0.001,
        decay_end_ms: Span::new(60.0, 160.0),
        stop_ms: 150.0,
    },
};

pub static CATALOG: [SoundscapeDefinition; 5] = [
    SoundscapeDefinition {
        id: SoundscapeId::Rain,
        display_name: "Mưa",
        icon: "🌧️",
        recipe: Recipe {
            layers: &[Layer {
                source: LayerSource::Noise(NoiseKind::Brown),
                filters: &[highpass(40.0, DEFAULT_Q), lowpass(800.0, 0.5)],
                gain: None,
            }],
            transient: None,
        },
    },
    SoundscapeDefinition {
        id: SoundscapeId::Cafe,
        display_name: "Quán Cafe",
        icon: "☕",
        recipe: Recipe {
            layers: &[
                Layer {
                    source: LayerSource::Noise(NoiseKind::Pink),
                    filters: &[bandpass(500.0, 0.4)],
                    gain: Some(0.7),
                },
                Layer { source: LayerSource::Sine { hz: 85.0 }, filters: &[], gain: Some(0.03) },
            ],
            transient: Some(CLATTER),
        },
    },
    SoundscapeDefinition {
        id: SoundscapeId::Forest,
        display_name: "Rừng",
        icon: "🌲",
        recipe: Recipe {
            layers: &[Layer {
                source: LayerSource::Noise(NoiseKind::Pink),
                filters: &[lowpass(1200.0, 0.3)],
                gain: Some(0.45),
            }],
            transient: Some(CHIRP),
        },
    },
    SoundscapeDefinition {
        id: SoundscapeId::White,
        display_name: "White Noise",
        icon: "📻",
        recipe: Recipe {
            layers: &[Layer {
                source: LayerSource::Noise(NoiseKind::White),
                filters: &[lowpass(14_000.0, 0.3)],
                gain: Some(0.35),
            }],
            transient: None,
        },
    },
    SoundscapeDefinition {
        id: SoundscapeId::Fire,
        display_name: "Lửa Trại",
        icon: "🔥",
        recipe: Recipe {
            layers: &[Layer {
                source: LayerSource::Noise(NoiseKind::Brown),
                filters: &[lowpass(400.0, 0.5)],
                gain: Some(0.5),
            }],
            transient: Some(CRACKLE),
        },
    },
];

/// The fixed catalog, in display order.
pub fn catalog() -> &'static [SoundscapeDefinition] { &CATALOG }

pub fn lookup(id: &str) -> Option<&'static SoundscapeDefinition> {
    id.parse::<SoundscapeId>().ok().map(SoundscapeId::definition)
}

/// Inputs a recipe needs besides the graph.
#[derive(Copy, Clone, Debug)]
pub struct BuildParams {
    pub sample_rate: f32,
    pub loop_seconds: f32,
}

impl Recipe {
    /// Render every layer's source. Nothing is added to a graph yet.
    pub fn render<R: RngCore + ?Sized>(&self, params: BuildParams, rng: &mut R) -> RenderedRecipe {
        let layers: &'static [Layer] = self.layers;
        let sr = params.sample_rate;
        let layers = layers
            .iter()
            .map(|layer| {
                let source = match layer.source {
                    LayerSource::Noise(kind) => {
                        Source::Loop(LoopPlayer::new(generate(kind, params.loop_seconds, sr, 2, rng)))
                    }
                    LayerSource::Sine { hz } => Source::Tone(Osc::new(hz)),
                };
                (source, layer)
            })
            .collect();
        RenderedRecipe { layers, sample_rate: sr }
    }

    /// Render and wire every continuous layer into `graph` under `owner`.
    pub fn build<R: RngCore + ?Sized>(
        &self,
        graph: &mut Graph,
        owner: Owner,
        params: BuildParams,
        rng: &mut R,
    ) -> Result<Vec<NodeId>, GraphError> {
        self.render(params, rng).build(graph, owner)
    }
}

/// Continuous layers with their sources rendered.
#[derive(Clone, Debug)]
pub struct RenderedRecipe {
    layers: Vec<(Source, &'static Layer)>,
    sample_rate: f32,
}

impl RenderedRecipe {
    #[inline] pub fn sample_rate(&self) -> f32 { self.sample_rate }

    /// Add every layer to `graph` under `owner`, wired to master.
    pub fn build(self, graph: &mut Graph, owner: Owner) -> Result<Vec<NodeId>, GraphError> {
        let sr = self.sample_rate;
        let mut nodes = Vec::new();
        for (source, layer) in self.layers {
            let mut chain = vec![graph.add(owner, NodeKind::Source(source))?];
            for f in layer.filters {
                let svf = StereoSvf::new(f.mode, f.hz, f.q, sr);
                chain.push(graph.add(owner, NodeKind::Stage(Stage::Filter(svf)))?);
            }
            if let Some(g) = layer.gain {
                chain.push(graph.add(owner, NodeKind::Stage(Stage::Gain(g)))?);
            }
            graph.chain_to_master(&chain)?;
            nodes.extend(chain);
        }
        Ok(nodes)
    }
}

/// Everything a session of one soundscape needs, rendered ahead of time.
#[derive(Clone, Debug)]
pub struct PreparedSoundscape {
    definition: &'static SoundscapeDefinition,
    beds: RenderedRecipe,
    voice: Option<PreparedVoice>,
}

impl PreparedSoundscape {
    /// Render soundscape `id`. `None` for unknown ids.
    pub fn render<R: RngCore + ?Sized>(id: &str, params: BuildParams, rng: &mut R) -> Option<Self> {
        let definition = lookup(id)?;
        let beds = definition.recipe.render(params, rng);
        let voice = definition.recipe.transient.as_ref().map(|p| p.prepare(params.sample_rate, rng));
        Some(Self { definition, beds, voice })
    }

    #[inline] pub fn id(&self) -> SoundscapeId { self.definition.id }
    #[inline] pub fn sample_rate(&self) -> f32 { self.beds.sample_rate() }

    pub fn into_parts(self) -> (RenderedRecipe, Option<PreparedVoice>) { (self.beds, self.voice) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SessionId;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const PARAMS: BuildParams = BuildParams { sample_rate: 48_000.0, loop_seconds: 2.0 };

    #[test]
    fn catalog_order_and_ids() {
        let ids: Vec<&str> = catalog().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["rain", "cafe", "forest", "white", "fire"]);
        for (i, d) in catalog().iter().enumerate() {
            assert_eq!(d.id as usize, i);
            assert_eq!(d.id.definition().display_name, d.display_name);
        }
        assert_eq!(catalog()[4].display_name, "Lửa Trại");
    }

    #[test]
    fn parse_rejects_unknown() {
        assert_eq!("forest".parse::<SoundscapeId>().unwrap(), SoundscapeId::Forest);
        assert!(matches!("ocean".parse::<SoundscapeId>(), Err(EngineError::UnknownSoundscape(_))));
        assert!(lookup("Rain").is_none());
    }

    #[test]
    fn transient_layers_match_soundscapes() {
        let kind = |id: SoundscapeId| id.definition().recipe.transient.map(|t| t.kind);
        assert_eq!(kind(SoundscapeId::Rain), None);
        assert_eq!(kind(SoundscapeId::White), None);
        assert_eq!(kind(SoundscapeId::Cafe), Some(TransientKind::Clatter));
        assert_eq!(kind(SoundscapeId::Forest), Some(TransientKind::Chirp));
        assert_eq!(kind(SoundscapeId::Fire), Some(TransientKind::Crackle));
    }

    #[test]
    fn every_recipe_builds_and_sounds() {
        for def in catalog() {
            let owner = Owner::Session(SessionId(def.id as u64));
            let mut rng = StdRng::seed_from_u64(11);
            let mut g = Graph::new(32);
            let nodes = def.recipe.build(&mut g, owner, PARAMS, &mut rng).unwrap();
            assert_eq!(nodes.len(), g.owned_count(owner));

            let mut energy = 0.0;
            for _ in 0..4_800 {
                let f = g.render_frame(PARAMS.sample_rate);
                assert!(f[0].is_finite() && f[1].is_finite());
                energy += f[0] * f[0];
            }
            assert!(energy > 0.0, "{} is silent", def.id);
        }
    }

    #[test]
    fn cafe_has_two_layers() {
        let mut g = Graph::new(32);
        let mut rng = StdRng::seed_from_u64(12);
        let owner = Owner::Session(SessionId(9));
        let nodes = SoundscapeId::Cafe.definition().recipe.build(&mut g, owner, PARAMS, &mut rng).unwrap();
        // pink → bandpass → gain, sine → gain
        assert_eq!(nodes.len(), 5);
    }

    #[test]
    fn build_failure_leaves_only_owner_tagged_nodes() {
        let mut g = Graph::new(2);
        let mut rng = StdRng::seed_from_u64(13);
        let owner = Owner::Session(SessionId(3));
        let err = SoundscapeId::Rain.definition().recipe.build(&mut g, owner, PARAMS, &mut rng);
        assert!(matches!(err, Err(GraphError::Full { capacity: 2 })));
        assert_eq!(g.remove_owner(owner), 2);
        assert!(g.is_empty());
    }
}

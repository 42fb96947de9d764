//! Murmur Engine: soundscape graph, transient scheduler and playback controller.
//!
//! Crate layout:
//! - [`graph`]       : typed node arena wired source → stages → master
//! - [`nodes`]       : players, oscillators and panning used by graph nodes
//! - [`mixer`]       : master bus with the shared, smoothed master gain
//! - [`scheduler`]   : sample-clock timer queue with liveness tokens
//! - [`transient`]   : randomized burst voices (crackle, clatter, chirp)
//! - [`soundscapes`] : the fixed catalog and its recipes
//! - [`controller`]  : [`SoundEngine`], the single-session playback controller
//! - [`prefs`]       : persisted volume / last soundscape
//! - [`context`]     : output device abstraction and the offline context
//! - [`realtime`]    : CPAL stream host (feature `realtime`)
//!
//! ```
//! use murmur_engine::{EngineConfig, SoundEngine};
//!
//! let mut engine = SoundEngine::builder(EngineConfig::default()).seed(7).build()?;
//! engine.play("rain");
//! let mut block = vec![0.0f32; 512 * engine.channels()];
//! engine.render(&mut block);
//! engine.stop();
//! # Ok::<(), murmur_engine::EngineError>(())
//! ```

pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod graph;
pub mod mixer;
pub mod nodes;
pub mod prefs;
pub mod scheduler;
pub mod soundscapes;
pub mod transient;

#[cfg(feature = "realtime")]
pub mod realtime;

// Re-export some commonly used items to make downstream imports ergonomic.
pub use config::EngineConfig;
pub use context::{OfflineContext, OutputContext};
pub use controller::{EngineBuilder, PlaybackState, SoundEngine};
pub use error::{DeviceError, EngineError, GraphError, PrefsError, Result};
pub use prefs::{JsonFileStore, MemoryStore, NullStore, PreferenceStore, Preferences};
pub use soundscapes::{catalog, BuildParams, PreparedSoundscape, SoundscapeDefinition, SoundscapeId};

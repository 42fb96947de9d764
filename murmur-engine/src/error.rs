//! Error types for murmur-engine.
//!
//! None of these cross the public control surface of [`SoundEngine`](crate::SoundEngine):
//! `play`/`stop`/`toggle`/`set_volume` log and degrade to "no sound" instead.
//! They are returned by construction, by the graph/scheduler internals and by
//! the realtime host.

use thiserror::Error;

use crate::graph::NodeId;

/// Output device / context failures.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Output device is closed")]
    Closed,

    #[error("No output device available")]
    Unavailable,

    #[error("Output device could not be resumed: {0}")]
    Resume(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[cfg(feature = "realtime")]
    #[error("Audio device not available")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[cfg(feature = "realtime")]
    #[error("Failed to build audio stream")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[cfg(feature = "realtime")]
    #[error("Failed to play audio stream")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[cfg(feature = "realtime")]
    #[error("Failed to query supported stream configs")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[cfg(feature = "realtime")]
    #[error("Failed to enumerate devices")]
    Devices(#[from] cpal::DevicesError),

    #[cfg(feature = "realtime")]
    #[error("Failed to get device name")]
    DeviceName(#[from] cpal::DeviceNameError),
}

/// Signal-graph construction failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Graph is full ({capacity} nodes)")]
    Full { capacity: usize },

    #[error("Unknown or released node {0:?}")]
    UnknownNode(NodeId),

    #[error("Node {0:?} already has an input")]
    InputTaken(NodeId),

    #[error("Node {0:?} is already connected downstream")]
    OutputTaken(NodeId),

    #[error("Source node {0:?} cannot take an input")]
    SourceInput(NodeId),

    #[error("Connecting {from:?} -> {to:?} would form a cycle")]
    Cycle { from: NodeId, to: NodeId },
}

/// Preference persistence failures. Always swallowed by the engine.
#[derive(Error, Debug)]
pub enum PrefsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed preferences: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Preference store unavailable: {0}")]
    Unavailable(String),
}

/// Umbrella error for murmur-engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown soundscape: {0}")]
    UnknownSoundscape(String),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Prefs(#[from] PrefsError),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, EngineError>;

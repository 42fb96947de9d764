//! Engine configuration.

use crate::{EngineError, Result};

/// Configuration for the soundscape engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Sample rate used by offline contexts; realtime contexts report the device rate.
    pub sample_rate: f32,
    /// Output channel count used by offline contexts.
    pub channels: usize,
    /// Length of the looping noise beds, in seconds.
    pub loop_seconds: f32,
    /// Time for the master gain to cover ~95% of a volume change.
    pub volume_ramp_ms: f32,
    /// Volume used when no stored preference exists.
    pub default_volume: f32,
    /// Upper bound on live graph nodes (session beds + in-flight transients).
    pub max_nodes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            channels: 2,
            loop_seconds: 2.0,
            volume_ramp_ms: 50.0,
            default_volume: 0.3,
            max_nodes: 256,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(8_000.0..=384_000.0).contains(&self.sample_rate) {
            return Err(EngineError::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if self.channels == 0 {
            return Err(EngineError::InvalidConfig("channels must be at least 1".into()));
        }
        if !(0.5..=10.0).contains(&self.loop_seconds) {
            return Err(EngineError::InvalidConfig(format!(
                "loop_seconds {} out of range (0.5-10 s)",
                self.loop_seconds
            )));
        }
        if !(self.volume_ramp_ms > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "volume_ramp_ms {} must be positive",
                self.volume_ramp_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err(EngineError::InvalidConfig(format!(
                "default_volume {} out of range (0-1)",
                self.default_volume
            )));
        }
        if self.max_nodes == 0 {
            return Err(EngineError::InvalidConfig("max_nodes must be at least 1".into()));
        }
        Ok(())
    }
}

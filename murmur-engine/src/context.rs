//! Output device contexts.
//!
//! The engine only needs to know the device's sample rate and channel count,
//! whether it is still usable, and a way to wake it before playback starts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::DeviceError;

pub trait OutputContext: Send {
    fn sample_rate(&self) -> f32;
    fn channels(&self) -> usize;
    /// Bring a suspended device back; fails once the device is gone.
    fn resume(&mut self) -> Result<(), DeviceError>;
    fn is_open(&self) -> bool;
}

/// Context for rendering without a device (files, tests, FFI hosts that pull
/// samples themselves). Clones share the open flag, so a holder can close the
/// "device" out from under an engine.
#[derive(Debug, Clone)]
pub struct OfflineContext {
    sample_rate: f32,
    channels: usize,
    open: Arc<AtomicBool>,
    resumes: Arc<AtomicBool>,
}

impl OfflineContext {
    pub fn new(sample_rate: f32, channels: usize) -> Self {
        Self {
            sample_rate,
            channels: channels.max(1),
            open: Arc::new(AtomicBool::new(true)),
            resumes: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn close(&self) { self.open.store(false, Ordering::Release); }

    /// Make subsequent `resume` calls fail while the context stays open.
    pub fn fail_resume(&self, fail: bool) { self.resumes.store(!fail, Ordering::Release); }
}

impl OutputContext for OfflineContext {
    fn sample_rate(&self) -> f32 { self.sample_rate }
    fn channels(&self) -> usize { self.channels }

    fn resume(&mut self) -> Result<(), DeviceError> {
        if !self.is_open() {
            return Err(DeviceError::Closed);
        }
        if !self.resumes.load(Ordering::Acquire) {
            return Err(DeviceError::Resume("offline context refused to resume".into()));
        }
        Ok(())
    }

    fn is_open(&self) -> bool { self.open.load(Ordering::Acquire) }
}

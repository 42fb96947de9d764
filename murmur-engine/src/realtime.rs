//! Realtime output through CPAL.
//!
//! The stream callback locks the shared [`SoundEngine`] and renders straight
//! into the device buffer. The stream starts suspended: it outputs silence
//! until the engine's first `play` resumes the [`StreamContext`]. A stream
//! error marks the context closed, after which `play` fails and the engine
//! stays idle.
//!
//! [`RealtimeOutput::play`] renders the soundscape before taking the engine
//! lock, so the callback only ever waits for graph wiring.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use murmur_core::dsp::{lin_to_db, PeakMeter};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error};

use crate::context::OutputContext;
use crate::controller::{EngineBuilder, SoundEngine};
use crate::error::{DeviceError, Result};
use crate::soundscapes::PreparedSoundscape;

/// Engine handle shared between the control thread and the audio callback.
pub type SharedEngine = Arc<Mutex<SoundEngine>>;

#[derive(Debug, Default)]
struct StreamState {
    running: AtomicBool,
    closed: AtomicBool,
}

/// [`OutputContext`] backed by a CPAL stream.
#[derive(Debug, Clone)]
pub struct StreamContext {
    state: Arc<StreamState>,
    sample_rate: f32,
    channels: usize,
}

impl OutputContext for StreamContext {
    fn sample_rate(&self) -> f32 { self.sample_rate }
    fn channels(&self) -> usize { self.channels }

    fn resume(&mut self) -> core::result::Result<(), DeviceError> {
        if self.state.closed.load(Ordering::Acquire) {
            return Err(DeviceError::Closed);
        }
        if !self.state.running.swap(true, Ordering::AcqRel) {
            debug!("output stream resumed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool { !self.state.closed.load(Ordering::Acquire) }
}

/// A running output stream driving a [`SoundEngine`].
pub struct RealtimeOutput {
    _stream: cpal::Stream,
    engine: SharedEngine,
    state: Arc<StreamState>,
    config: cpal::StreamConfig,
    rng: Mutex<StdRng>,
}

impl RealtimeOutput {
    /// Build the engine against `device` and start its stream.
    pub fn open(
        device: &cpal::Device,
        supported: &cpal::SupportedStreamConfig,
        builder: EngineBuilder,
    ) -> Result<Self> {
        let config = supported.config();
        let state = Arc::new(StreamState::default());
        let ctx = StreamContext {
            state: Arc::clone(&state),
            sample_rate: config.sample_rate.0 as f32,
            channels: usize::from(config.channels),
        };
        let engine: SharedEngine = Arc::new(Mutex::new(builder.context(ctx).build()?));

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(device, &config, &engine, &state)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(device, &config, &engine, &state)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(device, &config, &engine, &state)?,
            other => return Err(DeviceError::UnsupportedFormat(format!("{other:?}")).into()),
        };
        stream.play().map_err(DeviceError::from)?;

        Ok(Self { _stream: stream, engine, state, config, rng: Mutex::new(StdRng::from_entropy()) })
    }

    pub fn engine(&self) -> SharedEngine { Arc::clone(&self.engine) }

    /// [`SoundEngine::play`] with the noise beds rendered outside the engine lock.
    pub fn play(&self, id: &str) -> bool {
        let params = {
            let engine = self.engine.lock();
            if engine.current_soundscape().is_some_and(|cur| cur.as_str() == id) {
                return true;
            }
            engine.build_params()
        };
        let Some(prepared) = PreparedSoundscape::render(id, params, &mut *self.rng.lock()) else {
            debug!(id, "ignoring unknown soundscape");
            return false;
        };
        self.engine.lock().play_prepared(prepared)
    }

    pub fn stream_config(&self) -> &cpal::StreamConfig { &self.config }

    pub fn is_closed(&self) -> bool { self.state.closed.load(Ordering::Acquire) }
}

fn build_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    engine: &SharedEngine,
    state: &Arc<StreamState>,
) -> core::result::Result<cpal::Stream, DeviceError>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    let engine = Arc::clone(engine);
    let cb_state = Arc::clone(state);
    let err_state = Arc::clone(state);

    // ~1 second meter at the stream rate
    let mut meter = PeakMeter::new(cfg.sample_rate.0 as usize * usize::from(cfg.channels));
    let mut scratch: Vec<f32> = Vec::new();

    let stream = device.build_output_stream(
        cfg,
        move |output: &mut [T], _| {
            if !cb_state.running.load(Ordering::Acquire) {
                output.fill(T::EQUILIBRIUM);
                return;
            }
            scratch.resize(output.len(), 0.0);
            engine.lock().render(&mut scratch);
            for (o, &s) in output.iter_mut().zip(&scratch) {
                *o = T::from_sample(s);
                if let Some(peak) = meter.tick(s) {
                    debug!(peak, peak_db = lin_to_db(peak), "output peak");
                }
            }
        },
        move |e: cpal::StreamError| {
            error!(error = %e, "stream error; closing output");
            err_state.running.store(false, Ordering::Release);
            err_state.closed.store(true, Ordering::Release);
        },
        None,
    )?;

    Ok(stream)
}

pub fn output_device_names() -> core::result::Result<Vec<String>, DeviceError> {
    let host = cpal::default_host();
    let mut names = Vec::new();
    for dev in host.output_devices()? {
        names.push(dev.name()?);
    }
    Ok(names)
}

/// Named output device, or the host default.
pub fn pick_device(name: Option<&str>) -> core::result::Result<cpal::Device, DeviceError> {
    let host = cpal::default_host();
    if let Some(name) = name {
        for d in host.output_devices()? {
            if d.name()? == name {
                return Ok(d);
            }
        }
        return Err(DeviceError::Unavailable);
    }
    host.default_output_device().ok_or(DeviceError::Unavailable)
}

/// The device default config, or the supported range closest to the request.
pub fn choose_config(
    device: &cpal::Device,
    req_sr: Option<u32>,
    req_ch: Option<u16>,
) -> core::result::Result<cpal::SupportedStreamConfig, DeviceError> {
    if req_sr.is_none() && req_ch.is_none() {
        return Ok(device.default_output_config()?);
    }

    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in device.supported_output_configs()? {
        let ch = range.channels();
        let sr_min = range.min_sample_rate().0;
        let sr_max = range.max_sample_rate().0;

        let ch_pen = match req_ch { Some(c) => u64::from(ch.abs_diff(c)), None => 0 };
        let sr_pen = match req_sr {
            Some(sr) if !(sr_min..=sr_max).contains(&sr) => u64::from(sr_min.abs_diff(sr).min(sr_max.abs_diff(sr))),
            _ => 0,
        };

        let score = sr_pen.saturating_mul(1000) + ch_pen;
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, range));
        }
    }

    let (_, range) = best.ok_or(DeviceError::Unavailable)?;
    let pick_sr = match req_sr {
        Some(sr) => cpal::SampleRate(sr.clamp(range.min_sample_rate().0, range.max_sample_rate().0)),
        None => range.max_sample_rate(),
    };
    Ok(range.with_sample_rate(pick_sr))
}

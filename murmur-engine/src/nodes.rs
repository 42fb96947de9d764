//! Building blocks (nodes) for soundscape graphs.
//!
//! Per-sample components; the only heap data are the pre-rendered buffers the
//! players own, which are built before a node joins the graph.
//!
//! Contents:
//! - `Osc`        : sine oscillator with stable phase wrap (steady hum layers)
//! - `LoopPlayer` : seamlessly looping stereo buffer (noise beds)
//! - `OneShot`    : mono buffer played once (noise bursts)
//! - `ChirpVoice` : exponentially swept sine under a `BurstEnvelope` (bird chirps)
//! - `PanLaw`     : constant-power panning helper
//!
//! Frequency is **Hz**; methods expect the current **sample rate** when stepping.

use std::sync::Arc;

use murmur_core::dsp::{exp_step_ratio, fast_sin, wrap_phase01, TAU};
use murmur_core::envelopes::BurstEnvelope;

/// One stereo sample frame `[left, right]`.
pub type Frame = [f32; 2];

/// Free-running sine oscillator.
#[derive(Copy, Clone, Debug)]
pub struct Osc {
    phase: f32, // [0,1)
    freq: f32,  // Hz
}

impl Osc {
    #[inline] pub fn new(freq_hz: f32) -> Self { Self { phase: 0.0, freq: freq_hz.max(0.0) } }
    #[inline] pub fn freq(&self) -> f32 { self.freq }

    /// Advance one sample and return the oscillator sample.
    #[inline]
    pub fn next(&mut self, sr: f32) -> f32 {
        let s = fast_sin(TAU * self.phase);
        self.phase = wrap_phase01(self.phase + self.freq / sr);
        s
    }
}

/// Stereo buffer that wraps around with no gap at the seam.
#[derive(Clone, Debug)]
pub struct LoopPlayer {
    left: Vec<f32>,
    right: Vec<f32>,
    pos: usize,
}

impl LoopPlayer {
    /// Takes per-channel buffers as produced by `murmur_core::noise::generate`.
    /// A single channel is used for both sides; extra channels are ignored.
    pub fn new(mut channels: Vec<Vec<f32>>) -> Self {
        let left = if channels.is_empty() { Vec::new() } else { channels.remove(0) };
        let right = if channels.is_empty() { left.clone() } else { channels.remove(0) };
        let len = left.len().min(right.len());
        let (mut left, mut right) = (left, right);
        left.truncate(len);
        right.truncate(len);
        Self { left, right, pos: 0 }
    }

    #[inline] pub fn len(&self) -> usize { self.left.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.left.is_empty() }

    #[inline]
    pub fn next(&mut self) -> Frame {
        if self.left.is_empty() {
            return [0.0; 2];
        }
        let f = [self.left[self.pos], self.right[self.pos]];
        self.pos += 1;
        if self.pos == self.left.len() {
            self.pos = 0;
        }
        f
    }
}

/// Mono buffer played once, then silent. The buffer is shared so repeated
/// bursts of one template don't copy it.
#[derive(Clone, Debug)]
pub struct OneShot {
    samples: Arc<[f32]>,
    pos: usize,
}

impl OneShot {
    pub fn new(samples: impl Into<Arc<[f32]>>) -> Self { Self { samples: samples.into(), pos: 0 } }

    #[inline]
    pub fn next(&mut self) -> f32 {
        match self.samples.get(self.pos) {
            Some(&s) => {
                self.pos += 1;
                s
            }
            None => 0.0,
        }
    }

    #[inline] pub fn is_finished(&self) -> bool { self.pos >= self.samples.len() }
}

/// Short tonal burst: sine swept exponentially from `start_hz` to `end_hz`
/// over `sweep_s`, shaped by a linear-attack / exponential-decay envelope.
#[derive(Copy, Clone, Debug)]
pub struct ChirpVoice {
    osc: Osc,
    ratio: f32,
    end_hz: f32,
    sweep_left: u32,
    env: BurstEnvelope,
}

impl ChirpVoice {
    pub fn new(start_hz: f32, end_hz: f32, sweep_s: f32, env: BurstEnvelope, sr: f32) -> Self {
        let n = (sweep_s * sr).max(1.0);
        Self {
            osc: Osc::new(start_hz),
            ratio: exp_step_ratio(start_hz.max(1.0), end_hz.max(1.0), n),
            end_hz,
            sweep_left: n as u32,
            env,
        }
    }

    #[inline]
    pub fn next(&mut self, sr: f32) -> f32 {
        let s = self.osc.next(sr) * self.env.next();
        if self.sweep_left > 0 {
            self.sweep_left -= 1;
            self.osc.freq = if self.sweep_left == 0 { self.end_hz } else { self.osc.freq * self.ratio };
        }
        s
    }

    #[inline] pub fn freq(&self) -> f32 { self.osc.freq }
    #[inline] pub fn is_finished(&self) -> bool { self.env.is_done() }
}

/// Constant-power panner helper.
#[derive(Copy, Clone, Debug)]
pub struct PanLaw;
impl PanLaw {
    /// Return (left, right) gains given `pan` in [-1..1], where -1 = hard left, +1 = hard right.
    #[inline]
    pub fn gains(pan: f32) -> (f32, f32) {
        let p = (pan.clamp(-1.0, 1.0) + 1.0) * 0.25 * core::f32::consts::PI; // map to [0, π/2]
        (p.cos(), p.sin())
    }

    /// Fold a frame to mono and place it at `pan`.
    #[inline]
    pub fn place(frame: Frame, pan: f32) -> Frame {
        let (gl, gr) = Self::gains(pan);
        let m = 0.5 * (frame[0] + frame[1]);
        [m * gl, m * gr]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn loop_player_wraps_seamlessly() {
        let mut p = LoopPlayer::new(vec![vec![1.0, 2.0, 3.0], vec![-1.0, -2.0, -3.0]]);
        let got: Vec<Frame> = (0..7).map(|_| p.next()).collect();
        assert_eq!(got[3], [1.0, -1.0]);
        assert_eq!(got[6], [1.0, -1.0]);
        assert_eq!(got[5], [3.0, -3.0]);
    }

    #[test]
    fn loop_player_mono_feeds_both_sides() {
        let mut p = LoopPlayer::new(vec![vec![0.5, 0.25]]);
        assert_eq!(p.next(), [0.5, 0.5]);
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn one_shot_finishes() {
        let mut s = OneShot::new(vec![0.1, 0.2]);
        assert!(!s.is_finished());
        s.next();
        s.next();
        assert!(s.is_finished());
        assert_eq!(s.next(), 0.0);
    }

    #[test]
    fn pan_is_constant_power() {
        for pan in [-1.0, -0.6, 0.0, 0.3, 1.0] {
            let (l, r) = PanLaw::gains(pan);
            assert_abs_diff_eq!(l * l + r * r, 1.0, epsilon = 1e-5);
        }
        let (l, r) = PanLaw::gains(-1.0);
        assert_abs_diff_eq!(l, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(r, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn chirp_sweeps_to_end_frequency_and_stops() {
        let sr = 48_000.0;
        let env = BurstEnvelope::new(0.05, 0.010, 0.001, 0.100, 0.150, sr);
        let mut v = ChirpVoice::new(3_000.0, 3_900.0, 0.080, env, sr);
        for _ in 0..(0.080 * sr) as usize {
            v.next(sr);
        }
        assert_abs_diff_eq!(v.freq(), 3_900.0, epsilon = 1.0);

        let mut peak = 0.0f32;
        for _ in 0..(0.2 * sr) as usize {
            peak = peak.max(v.next(sr).abs());
        }
        assert!(v.is_finished());
        assert!(peak <= 0.05 + 1e-4);
        assert_eq!(v.next(sr), 0.0);
    }

    #[test]
    fn osc_stays_bounded() {
        let mut o = Osc::new(85.0);
        for _ in 0..48_000 {
            assert!(o.next(48_000.0).abs() <= 1.001);
        }
    }
}

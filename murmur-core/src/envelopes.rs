//! Envelope generators and parameter ramps.
//!
//! Provided:
//! - `BurstEnvelope` : one-shot linear attack + exponential decay with a hard stop,
//!                     for short transient voices
//! - `TargetRamp`    : one-pole approach toward a target value (click-free gain moves)
//!
//! All envelopes are `no_std` friendly and avoid heap allocations.

use crate::dsp::{exp_step_ratio, settle_coeff_ms};

// ------------------------------- Burst envelope ----------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum BurstStage {
    Attack,
    Decay,
    Done,
}

/// One-shot envelope for short tonal bursts.
///
/// Rises linearly from 0 to `peak` over `attack_s`, then falls exponentially so
/// that it reaches `floor` at `decay_end_s` (measured from the trigger), and is
/// forced to zero at `stop_s`.
#[derive(Copy, Clone, Debug)]
pub struct BurstEnvelope {
    env: f32,
    peak: f32,
    stage: BurstStage,
    attack_inc: f32,
    decay_mul: f32,
    pos: u32,
    stop_at: u32,
}

impl BurstEnvelope {
    pub fn new(peak: f32, attack_s: f32, floor: f32, decay_end_s: f32, stop_s: f32, sr: f32) -> Self {
        let sr = sr.max(1.0);
        let peak = peak.max(floor.max(1e-6));
        let attack_n = (attack_s * sr).max(1.0);
        let decay_n = ((decay_end_s - attack_s) * sr).max(1.0);
        Self {
            env: 0.0,
            peak,
            stage: BurstStage::Attack,
            attack_inc: peak / attack_n,
            decay_mul: exp_step_ratio(peak, floor.max(1e-6), decay_n),
            pos: 0,
            stop_at: (stop_s * sr).max(1.0) as u32,
        }
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.pos >= self.stop_at {
            self.stage = BurstStage::Done;
        }
        match self.stage {
            BurstStage::Attack => {
                self.env += self.attack_inc;
                if self.env >= self.peak {
                    self.env = self.peak;
                    self.stage = BurstStage::Decay;
                }
            }
            BurstStage::Decay => {
                self.env *= self.decay_mul;
            }
            BurstStage::Done => {
                self.env = 0.0;
            }
        }
        self.pos = self.pos.saturating_add(1);
        self.env
    }

    #[inline] pub fn value(&self) -> f32 { self.env }
    #[inline] pub fn is_done(&self) -> bool { self.stage == BurstStage::Done }
}

// -------------------------------- Target ramp ------------------------------------

/// One-pole approach `y += (target - y) * (1 - a)`.
///
/// `settle_ms` is the time to cover ~95% of a step, so a move from 0 to 1
/// reads 0.95 after `settle_ms` regardless of the sample rate.
#[derive(Copy, Clone, Debug)]
pub struct TargetRamp {
    alpha: f32,
    y: f32,
    target: f32,
}

impl TargetRamp {
    #[inline]
    pub fn new(initial: f32, settle_ms: f32, sr: f32) -> Self {
        Self { alpha: settle_coeff_ms(settle_ms, sr), y: initial, target: initial }
    }

    #[inline] pub fn set_target(&mut self, target: f32) { self.target = target; }
    #[inline] pub fn target(&self) -> f32 { self.target }

    #[inline]
    pub fn next(&mut self) -> f32 {
        self.y += (self.target - self.y) * (1.0 - self.alpha);
        self.y
    }

    #[inline] pub fn value(&self) -> f32 { self.y }
}

// ------------------------------------ Tests --------------------------------------

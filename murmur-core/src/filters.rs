//! Filters: the second-order state-variable filter used by every soundscape stage.
//!
//! Goals
//! - `no_std`-friendly, allocation free
//! - Stable, musically-pleasant responses under parameter changes
//! - Clear APIs and predictable parameterization (cutoff Hz + Q)
//!
//! Contents
//! - `SvfMode`    : LP/HP/BP taps
//! - `SvfTpt`     : State-Variable Filter via Topology Preserving Transform
//! - `StereoSvf`  : two independent `SvfTpt` states sharing one parameter set
//!
//! Notes
//! - `SvfTpt` uses the “g = tan(π fc / sr)” formulation with `R = 1/(2Q)`.
//!   It is robust to high resonance and parameter modulation, and its
//!   LP/HP/BP responses match the classic second-order (biquad) shapes.

use crate::dsp::{kill_denormals, tpt_g};

/// Q used when a recipe does not specify one.
pub const DEFAULT_Q: f32 = 1.0;

/// SVF output tap selection.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SvfMode {
    Lowpass,
    Highpass,
    Bandpass,
}

/// Topology-Preserving Transform SVF (State-Variable Filter).
///
/// Parameters:
/// - `cut_hz`  : cutoff / center frequency in Hz
/// - `q`       : quality factor (>= ~0.3 typical; lower increases damping)
///
/// Internals:
/// - `g = tan(π fc / sr)`
/// - `R = 1 / (2Q)`
///
/// This implementation follows common SVF/TPT references (Vadim Zavalishin et al.).
#[derive(Copy, Clone, Debug)]
pub struct SvfTpt {
    mode: SvfMode,
    // derived
    g: f32,
    r: f32,
    h: f32,
    // states
    ic1eq: f32,
    ic2eq: f32,
}

impl SvfTpt {
    #[inline]
    pub fn new(mode: SvfMode, cut_hz: f32, q: f32, sr: f32) -> Self {
        let g = tpt_g(cut_hz.max(0.0), sr.max(1.0)); // tan(π fc / sr)
        let r = 1.0 / (2.0 * q.max(1e-4));            // damping
        Self {
            mode,
            g,
            r,
            h: 1.0 / (1.0 + 2.0 * r * g + g * g),
            ic1eq: 0.0,
            ic2eq: 0.0,
        }
    }

    /// Process one sample, returning the taps `(lp, bp, hp)`.
    #[inline]
    pub fn process_all(&mut self, x: f32) -> (f32, f32, f32) {
        // Zero-delay-feedback solve (Zavalishin, ch. 4):
        // hp = (x - (2R + g) s1 - s2) / (1 + 2Rg + g^2)
        // bp = g hp + s1 ; lp = g bp + s2
        let hp = (x - (2.0 * self.r + self.g) * self.ic1eq - self.ic2eq) * self.h;
        let v1 = self.g * hp;
        let bp = v1 + self.ic1eq;
        let v2 = self.g * bp;
        let lp = v2 + self.ic2eq;

        self.ic1eq = kill_denormals(bp + v1);
        self.ic2eq = kill_denormals(lp + v2);

        (lp, bp, hp)
    }

    /// Process one sample through the configured tap.
    ///
    /// The band-pass tap is normalized by `2R` so its peak gain is unity at the
    /// center frequency regardless of Q.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let (lp, bp, hp) = self.process_all(x);
        match self.mode {
            SvfMode::Lowpass => lp,
            SvfMode::Highpass => hp,
            SvfMode::Bandpass => 2.0 * self.r * bp,
        }
    }
}

/// Two channels of the same SVF; each channel keeps its own state.
#[derive(Copy, Clone, Debug)]
pub struct StereoSvf {
    l: SvfTpt,
    r: SvfTpt,
}

impl StereoSvf {
    #[inline]
    pub fn new(mode: SvfMode, cut_hz: f32, q: f32, sr: f32) -> Self {
        let f = SvfTpt::new(mode, cut_hz, q, sr);
        Self { l: f, r: f }
    }

    #[inline]
    pub fn process(&mut self, frame: [f32; 2]) -> [f32; 2] {
        [self.l.process(frame[0]), self.r.process(frame[1])]
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{fast_sin, TAU};
    use approx::assert_abs_diff_eq;

    /// Peak output level of `filter` driven by a unit sine at `hz`, measured after settling.
    fn sine_gain(mut filter: SvfTpt, hz: f32, sr: f32) -> f32 {
        let n = sr as usize;
        let mut peak: f32 = 0.0;
        for i in 0..n {
            let x = fast_sin(TAU * hz * i as f32 / sr);
            let y = filter.process(x);
            if i > n / 2 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn lowpass_passes_lows_and_cuts_highs() {
        let sr = 48_000.0;
        let lp = SvfTpt::new(SvfMode::Lowpass, 800.0, 0.5, sr);
        assert!(sine_gain(lp, 100.0, sr) > 0.8);
        assert!(sine_gain(lp, 8_000.0, sr) < 0.05);
    }

    #[test]
    fn highpass_blocks_dc() {
        let sr = 48_000.0;
        let mut hp = SvfTpt::new(SvfMode::Highpass, 40.0, DEFAULT_Q, sr);
        let mut y = 1.0;
        for _ in 0..(sr as usize) {
            y = hp.process(1.0);
        }
        assert_abs_diff_eq!(y, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn bandpass_is_unity_at_center() {
        let sr = 48_000.0;
        let bp = SvfTpt::new(SvfMode::Bandpass, 2_000.0, 2.0, sr);
        let center = sine_gain(bp, 2_000.0, sr);
        assert_abs_diff_eq!(center, 1.0, epsilon = 0.05);
        assert!(sine_gain(bp, 200.0, sr) < 0.2);
    }

    #[test]
    fn step_response_stays_bounded() {
        let sr = 48_000.0;
        let mut svf = SvfTpt::new(SvfMode::Lowpass, 1_000.0, 0.707, sr);
        let mut acc = 0.0;
        for _ in 0..(sr as usize) {
            acc = svf.process(1.0);
        }
        assert!(acc <= 2.0, "svf runaway? {}", acc);
    }

    #[test]
    fn stereo_channels_keep_separate_state() {
        let mut f = StereoSvf::new(SvfMode::Lowpass, 500.0, 0.7, 48_000.0);
        for _ in 0..1000 {
            f.process([1.0, 0.0]);
        }
        let [l, r] = f.process([1.0, 0.0]);
        assert!(l > 0.5);
        assert_eq!(r, 0.0);
    }
}

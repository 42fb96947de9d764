//! Generic DSP utilities and math helpers.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Optional `fast-math` approximations for hot paths
//! - Clean, side-effect free helpers that are easy to test
//!
//! Features used by this file:
//! - `fast-math` : enables polynomial approximations for the trig helpers
//!
//! Conventions:
//! - All functions are `#[inline]` where useful to help the optimizer.
//! - Argument and return domains are documented per function.

#![allow(clippy::excessive_precision)]

use core::f32::consts::PI;

use cfg_if::cfg_if;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // micromath preferred if explicitly requested (works in no_std)
    if #[cfg(feature = "micromath")] {
        use micromath::F32Ext as _;
        #[inline] fn m_sin(x: f32) -> f32 { x.sin() }
        #[inline] fn m_cos(x: f32) -> f32 { x.cos() }
        #[inline] fn m_exp(x: f32) -> f32 { x.exp() }
        #[inline] fn m_ln(x: f32) -> f32 { x.ln() }
        #[inline] fn m_tan(x: f32) -> f32 { (x.sin()) / (x.cos()) }
    // libm (C math) in no_std
    } else if #[cfg(feature = "no-std")] {
        #[inline] fn m_sin(x: f32) -> f32 { libm::sinf(x) }
        #[inline] fn m_cos(x: f32) -> f32 { libm::cosf(x) }
        #[inline] fn m_exp(x: f32) -> f32 { libm::expf(x) }
        #[inline] fn m_ln(x: f32) -> f32 { libm::logf(x) }
        #[inline] fn m_tan(x: f32) -> f32 { libm::tanf(x) }
    // std backend
    } else {
        #[inline] fn m_sin(x: f32) -> f32 { x.sin() }
        #[inline] fn m_cos(x: f32) -> f32 { x.cos() }
        #[inline] fn m_exp(x: f32) -> f32 { x.exp() }
        #[inline] fn m_ln(x: f32) -> f32 { x.ln() }
        #[inline] fn m_tan(x: f32) -> f32 { x.tan() }
    }
}

// --------------------------------- Constants -------------------------------------

/// 2π (commonly useful)
pub const TAU: f32 = 2.0 * PI;

/// A very small epsilon used in denormal handling and safe divisions.
pub const EPS_SMALL: f32 = 1.0e-20;

/// Number of time constants after which a one-pole approach has covered ~95%
/// of the distance to its target (`1 - e^-3 ≈ 0.950`).
pub const SETTLE_TIME_CONSTANTS: f32 = 3.0;

// --------------------------------- Utilities -------------------------------------

#[inline]
pub fn clamp(x: f32, lo: f32, hi: f32) -> f32 {
    if x < lo { lo } else if x > hi { hi } else { x }
}

/// Clamp into [0, 1]; NaN maps to 0.
#[inline]
pub fn clamp01(x: f32) -> f32 {
    if x.is_nan() { 0.0 } else { clamp(x, 0.0, 1.0) }
}

/// Wrap phase into [0, 1).
#[inline]
pub fn wrap_phase01(mut p: f32) -> f32 {
    p -= p as i32 as f32;
    if p < 0.0 { p += 1.0; }
    if p >= 1.0 { p - 1.0 } else { p }
}

/// Kill denormal/subnormal values. Returns 0.0 if |x| < EPS_SMALL.
#[inline]
pub fn kill_denormals(x: f32) -> f32 {
    if x.abs() < EPS_SMALL { 0.0 } else { x }
}

// --------------------------------- dB / linear -----------------------------------

/// Convert linear gain to dB: db = 20*log10(lin).
#[inline]
pub fn lin_to_db(lin: f32) -> f32 {
    if lin <= EPS_SMALL { -120.0 }
    else { 8.685889638065036553_f32 * m_ln(lin) } // 20/ln(10)
}

// --------------------------------- Fast trig -------------------------------------

/// Fast sine with range reduction into [-π, π] and 5th-order minimax-style poly.
/// Max abs error ~1e-3 for musical uses when `fast-math` is enabled; falls back to exact otherwise.
#[inline]
pub fn fast_sin(x: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            let mut xr = x;
            let k = (xr / TAU).round();
            xr -= k * TAU;

            // 5th-order odd polynomial: sin(x) ≈ x * (a + b x^2 + c x^4)
            let x2 = xr * xr;
            xr * (0.999_979_313_3 + x2 * (-0.166_624_432_0 + x2 * 0.008_308_978_98))
        } else {
            m_sin(x)
        }
    }
}

#[inline]
pub fn fast_cos(x: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            // cos(x) = sin(x + π/2)
            fast_sin(x + core::f32::consts::PI * 0.5)
        } else {
            m_cos(x)
        }
    }
}

// --------------------------------- Exponentials / smoothing ----------------------

/// One-pole smoothing coefficient for a time constant `t_ms` (milliseconds).
///
/// The discrete one-pole form: `y[n] += (1 - a) * (x[n] - y[n])`
/// where `a = exp(-1/(tau * sr))` for first-order lag with time constant `tau`.
///
/// We interpret `t_ms` as the time to reach ~63% (1 - 1/e).
#[inline]
pub fn one_pole_coeff_ms(t_ms: f32, sr: f32) -> f32 {
    if t_ms <= 0.0 { return 0.0; }
    let tau = t_ms * 0.001;
    m_exp(-1.0 / (tau * sr))
}

/// Like [`one_pole_coeff_ms`], but `settle_ms` is the time to cover ~95% of a step.
#[inline]
pub fn settle_coeff_ms(settle_ms: f32, sr: f32) -> f32 {
    one_pole_coeff_ms(settle_ms / SETTLE_TIME_CONSTANTS, sr)
}

/// Per-sample multiplier that takes a value from `from` to `to` in `samples`
/// steps along an exponential curve. Both endpoints must be positive.
#[inline]
pub fn exp_step_ratio(from: f32, to: f32, samples: f32) -> f32 {
    if samples <= 0.0 || from <= 0.0 || to <= 0.0 { return 1.0; }
    m_exp(m_ln(to / from) / samples)
}

/// Per-sample multiplier for an exponential decay with time constant `tau_s` seconds.
#[inline]
pub fn decay_ratio(tau_s: f32, sr: f32) -> f32 {
    if tau_s <= 0.0 { return 0.0; }
    m_exp(-1.0 / (tau_s * sr))
}

/// TPT (Topology-Preserving Transform) `g = tan(π fc / sr)` helper for state-variable filters.
///
/// `fc` is kept just below Nyquist so the tangent stays finite.
#[inline]
pub fn tpt_g(cut_hz: f32, sr: f32) -> f32 {
    let fc = clamp(cut_hz, 1.0, 0.49 * sr);
    let x = core::f32::consts::PI * (fc / sr);
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            let s = fast_sin(x);
            let c = fast_cos(x);
            s / c
        } else {
            m_tan(x)
        }
    }
}

// --------------------------------- Simple meters ---------------------------------

/// Peak-hold meter over a fixed number of samples. `tick` returns the window
/// peak once every `window` samples and `None` otherwise.
#[derive(Copy, Clone, Debug)]
pub struct PeakMeter {
    window: usize,
    count: usize,
    peak: f32,
}
impl PeakMeter {
    #[inline]
    pub fn new(window: usize) -> Self { Self { window: window.max(1), count: 0, peak: 0.0 } }

    #[inline]
    pub fn tick(&mut self, x: f32) -> Option<f32> {
        let a = x.abs();
        if a > self.peak { self.peak = a; }
        self.count += 1;
        if self.count >= self.window {
            let p = self.peak;
            self.peak = 0.0;
            self.count = 0;
            Some(p)
        } else {
            None
        }
    }
}

// --------------------------------- Tests (std only) ------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn lin_to_db_known_points() {
        assert_abs_diff_eq!(lin_to_db(1.0), 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(lin_to_db(0.5), -6.0206, epsilon = 1e-2);
        assert_eq!(lin_to_db(0.0), -120.0);
    }

    #[test]
    fn clamp_keeps_upper_bound() {
        assert_eq!(clamp(3.0, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-3.0, 0.0, 1.0), 0.0);
        assert_eq!(clamp01(f32::NAN), 0.0);
    }

    #[test]
    fn settle_coeff_reaches_95_percent() {
        let sr = 48_000.0;
        let a = settle_coeff_ms(50.0, sr);
        let mut y = 0.0;
        for _ in 0..(sr as usize / 20) {
            y += (1.0 - y) * (1.0 - a);
        }
        assert!(y > 0.945 && y < 0.96, "y={y}");
    }

    #[test]
    fn exp_step_ratio_lands_on_target() {
        let r = exp_step_ratio(2000.0, 1600.0, 480.0);
        let mut f = 2000.0_f32;
        for _ in 0..480 { f *= r; }
        assert_abs_diff_eq!(f, 1600.0, epsilon = 1.0);
    }

    #[test]
    fn wrap_phase_stays_in_unit_interval() {
        for p in [-2.25_f32, -0.5, 0.0, 0.25, 1.0, 3.75] {
            let w = wrap_phase01(p);
            assert!((0.0..1.0).contains(&w), "p={p} w={w}");
        }
    }

    #[test]
    fn peak_meter_reports_once_per_window() {
        let mut m = PeakMeter::new(4);
        assert_eq!(m.tick(0.1), None);
        assert_eq!(m.tick(-0.7), None);
        assert_eq!(m.tick(0.2), None);
        assert_eq!(m.tick(0.0), Some(0.7));
    }
}

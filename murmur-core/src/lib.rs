#![cfg_attr(not(feature = "std"), no_std)]
//! Murmur Core: no_std-ready DSP primitives for procedural ambient soundscapes.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` (+ `alloc`) and use the `libm` math backend
//! - `micromath`: use `micromath` for the math backend instead
//! - `fast-math`: enable polynomial approximations for trig helpers
//!
//! Modules
//! - [`dsp`]       : math backend, utils (clamping, smoothing coefficients, meters)
//! - [`envelopes`] : one-shot burst envelope, target ramp
//! - [`filters`]   : TPT state-variable filter (LP/HP/BP), stereo wrapper
//! - [`noise`]     : white / brown / pink generators and looping buffers
//!
//! Design
//! - No heap allocations per sample; buffers are rendered up front
//! - Randomness is always injected (`rand::Rng`), never ambient

extern crate alloc;

pub mod dsp;
pub mod envelopes;
pub mod filters;
pub mod noise;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{
        clamp, clamp01, fast_cos, fast_sin, kill_denormals, lin_to_db, settle_coeff_ms,
        tpt_g, wrap_phase01, PeakMeter, TAU,
    };
    pub use crate::envelopes::{BurstEnvelope, TargetRamp};
    pub use crate::filters::{StereoSvf, SvfMode, SvfTpt, DEFAULT_Q};
    pub use crate::noise::{
        decaying_burst, generate, BrownNoise, NoiseKind, PinkNoise, WhiteNoise, BROWN_PEAK,
    };
}

#[cfg(test)]
mod smoke {

    #[test]
    fn prelude_exists() {
        use crate::prelude::*;
        let _ = clamp01(1.5);
        let _ = TargetRamp::new(0.3, 50.0, 48_000.0);
        let mut lp = SvfTpt::new(SvfMode::Lowpass, 1000.0, DEFAULT_Q, 48_000.0);
        let _ = lp.process(0.1);
    }
}

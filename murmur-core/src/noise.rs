//! Colored-noise synthesis.
//!
//! Three recurrences, all driven by a caller-supplied random source so that
//! hosts can inject a seeded generator:
//! - `WhiteNoise` : i.i.d. uniform samples in [-1, 1]
//! - `BrownNoise` : leaky integrator of white noise, hard-bounded by [`BROWN_PEAK`]
//! - `PinkNoise`  : Paul Kellet's "economy" bank of six leaky bands plus white taps,
//!                  approximately -3 dB/octave
//!
//! [`generate`] renders a fixed-length buffer per channel for seamless looping.
//! Every channel is an independent run (fresh filter state, fresh random draws),
//! never a copy, which decorrelates stereo channels.

use alloc::vec::Vec;
use rand::Rng;

use crate::dsp::decay_ratio;

/// Blend weight of the previous output in the brown recurrence:
/// `y = (y + 0.02·w) / 1.02`, i.e. `y = LEAK·y + (1 - LEAK)·w`.
pub const BROWN_LEAK: f32 = 1.0 / 1.02;

/// Output scale applied to the brown integrator.
pub const BROWN_GAIN: f32 = 3.5;

/// Hard bound on `|BrownNoise::next|`: the integrator state never leaves [-1, 1].
pub const BROWN_PEAK: f32 = BROWN_GAIN;

/// Output scale applied to the summed pink bands.
pub const PINK_GAIN: f32 = 0.11;

/// Noise color.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NoiseKind {
    White,
    Brown,
    Pink,
}

impl NoiseKind {
    pub const ALL: [NoiseKind; 3] = [NoiseKind::White, NoiseKind::Brown, NoiseKind::Pink];

    pub fn name(self) -> &'static str {
        match self {
            NoiseKind::White => "white",
            NoiseKind::Brown => "brown",
            NoiseKind::Pink => "pink",
        }
    }
}

/// One uniform draw in [-1, 1].
#[inline]
pub fn uniform<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.gen_range(-1.0_f32..=1.0)
}

// ------------------------------------ White --------------------------------------

#[derive(Copy, Clone, Debug, Default)]
pub struct WhiteNoise;

impl WhiteNoise {
    #[inline]
    pub fn next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f32 {
        uniform(rng)
    }
}

// ------------------------------------ Brown --------------------------------------

/// Leaky integrator. Since `|w| ≤ 1` and the leak is `< 1`, the state obeys
/// `|y| ≤ LEAK·|y| + (1 - LEAK)`, whose fixed point is 1; starting at 0 it can
/// never exceed 1, for any run length.
#[derive(Copy, Clone, Debug, Default)]
pub struct BrownNoise {
    last: f32,
}

impl BrownNoise {
    #[inline]
    pub fn next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f32 {
        let w = uniform(rng);
        self.last = BROWN_LEAK * self.last + (1.0 - BROWN_LEAK) * w;
        self.last * BROWN_GAIN
    }
}

// ------------------------------------ Pink ---------------------------------------

/// `(decay, input weight)` per band. The fifth band has a negative pole and
/// flattens the top octave.
const PINK_BANDS: [(f32, f32); 6] = [
    (0.99886, 0.0555179),
    (0.99332, 0.0750759),
    (0.96900, 0.1538520),
    (0.86650, 0.3104856),
    (0.55000, 0.5329522),
    (-0.7616, -0.0168980),
];
const PINK_DIRECT: f32 = 0.5362;
const PINK_DELAYED: f32 = 0.115926;

#[derive(Copy, Clone, Debug, Default)]
pub struct PinkNoise {
    bands: [f32; 6],
    delayed: f32,
}

impl PinkNoise {
    #[inline]
    pub fn next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f32 {
        let w = uniform(rng);
        let mut sum = 0.0;
        for (b, &(decay, weight)) in self.bands.iter_mut().zip(PINK_BANDS.iter()) {
            *b = decay * *b + weight * w;
            sum += *b;
        }
        let y = (sum + self.delayed + w * PINK_DIRECT) * PINK_GAIN;
        self.delayed = w * PINK_DELAYED;
        y
    }
}

// ------------------------------------ Buffers ------------------------------------

/// Render `duration_s` seconds of `kind` noise for each of `channels` channels.
///
/// Returns one `Vec<f32>` per channel, each `round(duration_s · sample_rate)`
/// samples long (at least one sample when the duration is positive).
pub fn generate<R: Rng + ?Sized>(
    kind: NoiseKind,
    duration_s: f32,
    sample_rate: f32,
    channels: usize,
    rng: &mut R,
) -> Vec<Vec<f32>> {
    let len = if duration_s > 0.0 && sample_rate > 0.0 {
        ((duration_s * sample_rate) + 0.5).max(1.0) as usize
    } else {
        0
    };

    (0..channels)
        .map(|_| {
            let mut buf = Vec::with_capacity(len);
            match kind {
                NoiseKind::White => {
                    let mut g = WhiteNoise;
                    buf.extend((0..len).map(|_| g.next(rng)));
                }
                NoiseKind::Brown => {
                    let mut g = BrownNoise::default();
                    buf.extend((0..len).map(|_| g.next(rng)));
                }
                NoiseKind::Pink => {
                    let mut g = PinkNoise::default();
                    buf.extend((0..len).map(|_| g.next(rng)));
                }
            }
            buf
        })
        .collect()
}

/// White noise shaped by `exp(-t / tau_s)`, `len_s` seconds long (mono).
pub fn decaying_burst<R: Rng + ?Sized>(len_s: f32, tau_s: f32, sample_rate: f32, rng: &mut R) -> Vec<f32> {
    let len = (len_s * sample_rate + 0.5).max(0.0) as usize;
    let k = decay_ratio(tau_s, sample_rate);
    let mut env = 1.0_f32;
    (0..len)
        .map(|_| {
            let s = uniform(rng) * env;
            env *= k;
            s
        })
        .collect()
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x6d75_726d_7572)
    }

    #[test]
    fn buffers_have_requested_shape() {
        let mut r = rng();
        for kind in NoiseKind::ALL {
            let bufs = generate(kind, 2.0, 48_000.0, 2, &mut r);
            assert_eq!(bufs.len(), 2, "{}", kind.name());
            assert!(bufs.iter().all(|b| b.len() == 96_000));
        }
        assert!(generate(NoiseKind::White, 0.0, 48_000.0, 2, &mut r).iter().all(Vec::is_empty));
    }

    #[test]
    fn white_is_within_unit_range_and_centered() {
        let mut r = rng();
        let buf = &generate(NoiseKind::White, 4.0, 48_000.0, 1, &mut r)[0];
        assert!(buf.iter().all(|s| (-1.0..=1.0).contains(s)));
        let mean = buf.iter().sum::<f32>() / buf.len() as f32;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 0.01);
    }

    #[test]
    fn brown_stays_bounded_for_a_minute() {
        let mut r = rng();
        let buf = &generate(NoiseKind::Brown, 60.0, 48_000.0, 1, &mut r)[0];
        let peak = buf.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(peak <= BROWN_PEAK, "peak={peak}");
        assert!(peak > 0.05, "brown noise went silent: peak={peak}");
    }

    #[test]
    fn brown_state_cannot_escape_even_with_adversarial_input() {
        // Constant +1 input is the worst case for the integrator.
        let mut last = 0.0_f32;
        for _ in 0..1_000_000 {
            last = BROWN_LEAK * last + (1.0 - BROWN_LEAK);
        }
        assert!(last <= 1.0 + 1e-5, "last={last}");
    }

    #[test]
    fn channels_are_independent_runs() {
        let mut r = rng();
        let bufs = generate(NoiseKind::Pink, 4.0, 48_000.0, 2, &mut r);
        assert_ne!(bufs[0], bufs[1]);
        let n = bufs[0].len() as f32;
        let dot: f32 = bufs[0].iter().zip(&bufs[1]).map(|(a, b)| a * b).sum::<f32>() / n;
        let p0: f32 = bufs[0].iter().map(|a| a * a).sum::<f32>() / n;
        let p1: f32 = bufs[1].iter().map(|b| b * b).sum::<f32>() / n;
        let corr = dot / (p0 * p1).sqrt();
        assert!(corr.abs() < 0.3, "corr={corr}");
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let a = generate(NoiseKind::Brown, 0.1, 48_000.0, 2, &mut rng());
        let b = generate(NoiseKind::Brown, 0.1, 48_000.0, 2, &mut rng());
        assert_eq!(a, b);
    }

    #[test]
    fn burst_decays() {
        let mut r = rng();
        let b = decaying_burst(0.03, 0.005, 48_000.0, &mut r);
        assert_eq!(b.len(), 1440);
        let head = b[..240].iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        let tail = b[1200..].iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(head > 0.2);
        assert!(tail < 0.01, "tail={tail}");
    }
}

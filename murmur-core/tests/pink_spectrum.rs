//! Long-run spectral checks for the noise colors, via an averaged periodogram.

use approx::assert_abs_diff_eq;
use murmur_core::noise::{generate, NoiseKind};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rustfft::{num_complex::Complex, FftPlanner};

const SR: f32 = 48_000.0;
const SEG: usize = 4096;

/// One-sided averaged power spectrum (Hann window), `SEG / 2` bins.
fn averaged_psd(signal: &[f32]) -> Vec<f64> {
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(SEG);
    let window: Vec<f64> = (0..SEG)
        .map(|i| 0.5 - 0.5 * (std::f64::consts::TAU * i as f64 / SEG as f64).cos())
        .collect();

    let mut acc = vec![0.0_f64; SEG / 2];
    let mut segments = 0usize;
    for chunk in signal.chunks_exact(SEG) {
        let mut buf: Vec<Complex<f64>> = chunk
            .iter()
            .zip(&window)
            .map(|(&x, &w)| Complex::new(f64::from(x) * w, 0.0))
            .collect();
        fft.process(&mut buf);
        for (a, c) in acc.iter_mut().zip(&buf) {
            *a += c.norm_sqr();
        }
        segments += 1;
    }
    acc.iter_mut().for_each(|a| *a /= segments as f64);
    acc
}

/// Mean power density (dB) of the octave `[lo, 2·lo)`.
fn octave_db(psd: &[f64], lo: f64) -> f64 {
    let hz_per_bin = f64::from(SR) / SEG as f64;
    let a = (lo / hz_per_bin).ceil() as usize;
    let b = (2.0 * lo / hz_per_bin).floor() as usize;
    let mean = psd[a..b].iter().sum::<f64>() / (b - a) as f64;
    10.0 * mean.log10()
}

/// Least-squares slope of octave density in dB per octave.
fn slope_db_per_octave(kind: NoiseKind) -> f64 {
    let mut rng = StdRng::seed_from_u64(7);
    let signal = &generate(kind, 30.0, SR, 1, &mut rng)[0];
    let psd = averaged_psd(signal);

    let points: Vec<(f64, f64)> = (0..6)
        .map(|k| {
            let lo = 200.0 * 2f64.powi(k);
            (k as f64, octave_db(&psd, lo))
        })
        .collect();
    let n = points.len() as f64;
    let mx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let my = points.iter().map(|p| p.1).sum::<f64>() / n;
    let num: f64 = points.iter().map(|(x, y)| (x - mx) * (y - my)).sum();
    let den: f64 = points.iter().map(|(x, _)| (x - mx).powi(2)).sum();
    num / den
}

#[test]
fn pink_slopes_three_db_per_octave() {
    let slope = slope_db_per_octave(NoiseKind::Pink);
    assert_abs_diff_eq!(slope, -3.0, epsilon = 1.0);
}

#[test]
fn white_is_flat() {
    let slope = slope_db_per_octave(NoiseKind::White);
    assert_abs_diff_eq!(slope, 0.0, epsilon = 0.5);
}

#[test]
fn brown_falls_faster_than_pink() {
    let brown = slope_db_per_octave(NoiseKind::Brown);
    assert!(brown < -4.5, "brown slope {brown:.2} dB/oct");
}

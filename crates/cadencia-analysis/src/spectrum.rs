//! Frequency-domain measurement utilities.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f64::consts::TAU;

/// Amplitude of the component at `cycles` periods per window.
///
/// Direct single-bin DFT, normalized so a unit-amplitude sine landing on
/// an exact bin measures 1.0. Off-bin tones leak; keep probes on-bin.
pub fn goertzel_magnitude(signal: &[f64], cycles: f64) -> f64 {
    let n = signal.len() as f64;
    let (mut re, mut im) = (0.0f64, 0.0f64);
    for (i, &s) in signal.iter().enumerate() {
        let angle = TAU * cycles * i as f64 / n;
        re += s * angle.cos();
        im += s * angle.sin();
    }
    2.0 * (re * re + im * im).sqrt() / n
}

/// Magnitude spectrum of `signal` zero-padded to `fft_len` (power of two);
/// returns `fft_len/2 + 1` bins covering DC to Nyquist.
pub fn magnitude_spectrum(signal: &[f64], fft_len: usize) -> Vec<f64> {
    assert!(fft_len.is_power_of_two() && fft_len >= signal.len());
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_len);
    let mut buf: Vec<Complex<f64>> = signal
        .iter()
        .map(|&x| Complex::new(x, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(fft_len)
        .collect();
    fft.process(&mut buf);
    buf[..=fft_len / 2].iter().map(|c| c.norm()).collect()
}

fn band_range(len: usize, fft_len: usize, lo: f64, hi: f64) -> std::ops::RangeInclusive<usize> {
    debug_assert!(len == fft_len / 2 + 1);
    let lo_bin = (lo * fft_len as f64).ceil() as usize;
    let hi_bin = ((hi * fft_len as f64).floor() as usize).min(len - 1);
    lo_bin..=hi_bin
}

/// Stop-band rejection of an impulse response, in dB.
///
/// Compares the strongest pass-band bin (`0..=pass_hi` cycles per sample)
/// against the strongest stop-band bin (`stop_lo..=0.5`).
pub fn stopband_rejection_db(ir: &[f64], pass_hi: f64, stop_lo: f64) -> f64 {
    let fft_len = (4 * ir.len().max(2048)).next_power_of_two();
    let spectrum = magnitude_spectrum(ir, fft_len);
    let reference = band_range(spectrum.len(), fft_len, 0.0, pass_hi)
        .map(|i| spectrum[i])
        .fold(0.0f64, f64::max);
    let worst = band_range(spectrum.len(), fft_len, stop_lo, 0.5)
        .map(|i| spectrum[i])
        .fold(0.0f64, f64::max);
    if worst == 0.0 {
        return 400.0;
    }
    20.0 * (reference / worst).log10()
}

/// Pass-band ripple of an impulse response: the dB spread between the
/// strongest and weakest bin in `0..=pass_hi` cycles per sample.
pub fn passband_ripple_db(ir: &[f64], pass_hi: f64) -> f64 {
    let fft_len = (4 * ir.len().max(2048)).next_power_of_two();
    let spectrum = magnitude_spectrum(ir, fft_len);
    let (mut lo, mut hi) = (f64::INFINITY, 0.0f64);
    for i in band_range(spectrum.len(), fft_len, 0.0, pass_hi) {
        lo = lo.min(spectrum[i]);
        hi = hi.max(spectrum[i]);
    }
    20.0 * (hi / lo).log10()
}

//! Low-pass prototype design and phase transformation.
//!
//! Filters are Kaiser-windowed sincs. [`design_lpf`] speaks the same
//! parameter language as the stage planner: a pass-band edge, a stop-band
//! edge, a normalizing frequency, a stop-band attenuation target, and an
//! optional phase count for building oversampled polyphase prototypes.
//!
//! [`fir_to_phase`] rotates a linear-phase design toward minimum (0) or
//! maximum (100) phase through the real cepstrum, reporting where the
//! impulse peak lands so the caller can preload exactly that much silence.

use crate::fft::FftCache;
use realfft::num_complex::Complex;
use std::f64::consts::{PI, TAU};

/// Ratio of the 6 dB transition point to the full transition width.
pub const TO_6DB: f64 = 0.5869;

/// Ratio of the 3 dB transition point to the full transition width.
pub const TO_3DB: f64 = (2.0 / 3.0) * (0.5 + TO_6DB);

/// Widest permitted transition band, percent of the pass band.
pub const MAX_TBW0: f64 = 36.0;

/// As [`MAX_TBW0`], rescaled for aliasing-tolerant designs.
pub const MAX_TBW0A: f64 = MAX_TBW0 / (1.0 + TO_3DB);

/// Modified Bessel function of the first kind, order zero.
pub fn bessel_i0(x: f64) -> f64 {
    let mut sum = 1.0;
    let mut term = 1.0;
    let half_x = x / 2.0;
    for k in 1..=64 {
        term *= half_x / f64::from(k);
        let t2 = term * term;
        sum += t2;
        if t2 < sum * 1e-17 {
            break;
        }
    }
    sum
}

/// Kaiser window shape parameter for a stop-band attenuation in dB.
pub fn kaiser_beta(att: f64) -> f64 {
    if att > 50.0 {
        0.1102 * (att - 8.7)
    } else if att > 21.0 {
        0.5842 * (att - 21.0).powf(0.4) + 0.07886 * (att - 21.0)
    } else {
        0.0
    }
}

/// Kaiser tap-count estimate for attenuation `att` (dB) and transition
/// half-width `tr_bw` (cycles per sample).
pub fn lpf_taps_estimate(att: f64, tr_bw: f64) -> usize {
    ((att - 7.95) / (2.285 * TAU * tr_bw)).ceil() as usize + 1
}

/// Kaiser-windowed sinc with cutoff `fc` in cycles per sample.
///
/// The DC gain is `scale`; symmetric, linear phase.
pub fn make_lpf(num_taps: usize, fc: f64, beta: f64, scale: f64) -> Vec<f64> {
    let center = (num_taps - 1) as f64 / 2.0;
    let inv_i0 = 1.0 / bessel_i0(beta);
    (0..num_taps)
        .map(|i| {
            let x = i as f64 - center;
            let sinc = if x.abs() < 1e-9 {
                1.0
            } else {
                (TAU * fc * x).sin() / (TAU * fc * x)
            };
            let r = x / (center.max(1.0));
            let window = bessel_i0(beta * (1.0 - r * r).max(0.0).sqrt()) * inv_i0;
            2.0 * fc * sinc * window * scale
        })
        .collect()
}

/// Designs a low-pass prototype.
///
/// `fp` and `fc` are the pass-band and stop-band edges; `fnyq` is the
/// Nyquist frequency expressed in the same units, so `fp / fnyq` is a
/// fraction of Nyquist (pass `fnyq = 1.0` for edges already given that
/// way). `allow_aliasing` trades stop-band placement for a shallower
/// filter by pushing `fc` outward. `att` is the stop-band target in dB.
/// `num_taps` forces the length when given; otherwise it is estimated
/// from `att` and the transition width. With `phases > 0` the result is
/// an oversampled prototype of length `m·phases − 1` and DC gain
/// `phases`, ready for polyphase decomposition; with `phases == 0` the
/// length is rounded up to odd.
pub fn design_lpf(
    fp: f64,
    fc: f64,
    fnyq: f64,
    allow_aliasing: bool,
    att: f64,
    num_taps: Option<usize>,
    phases: usize,
) -> Vec<f64> {
    let fc = if allow_aliasing { fc + (fc - fp) * TO_3DB } else { fc };
    // Normalize to cycles per sample: value / fnyq is a fraction of the
    // Nyquist frequency, which itself is half a cycle per sample.
    let fp = fp / fnyq / 2.0;
    let fc = fc / fnyq / 2.0;
    debug_assert!(fc > fp, "stop-band edge must exceed pass-band edge");

    let tr_bw = TO_6DB * (fc - fp);
    let beta = kaiser_beta(att);
    let mut n = num_taps.unwrap_or_else(|| {
        let est = lpf_taps_estimate(att, tr_bw);
        if phases > 0 { est * phases } else { est }
    });
    if phases > 0 {
        let per_phase = (n + 1).div_ceil(phases);
        n = per_phase * phases - 1;
    } else {
        n |= 1;
    }

    let k = phases.max(1) as f64;
    let h = make_lpf(n, (fc - tr_bw) / k, beta, k);
    tracing::debug!(
        num_taps = n,
        pass = fp,
        stop = fc,
        att,
        phases,
        "designed low-pass prototype"
    );
    h
}

/// Rotates a linear-phase FIR toward the requested phase response.
///
/// `phase` runs from 0 (minimum phase) through 50 (linear, identity — the
/// caller skips this function) to 100 (maximum phase). Returns the
/// transformed taps, same length as the input, together with the index of
/// the impulse peak (`post_peak`).
pub fn fir_to_phase(h: &[f64], phase: f64, cache: &mut FftCache) -> (Vec<f64>, usize) {
    let phase1 = (if phase > 50.0 { 100.0 - phase } else { phase }) / 50.0;
    let mut work_len = 32usize;
    let mut i = h.len();
    while i > 1 {
        work_len <<= 1;
        i >>= 1;
    }
    let half = work_len / 2;

    let mut time = vec![0.0; work_len];
    time[..h.len()].copy_from_slice(h);
    let mut spectrum: Vec<Complex<f64>> = Vec::new();
    cache.forward(&mut time, &mut spectrum);

    // Unwrap the prototype's phase, tracking accumulated half-turns; the
    // wrap count doubles as the linear-phase reference during blending.
    let mut pi_wraps = vec![0.0f64; half + 1];
    let (mut prev_angle2, mut cum_2pi) = (0.0f64, 0.0f64);
    let (mut prev_angle1, mut cum_1pi) = (0.0f64, 0.0f64);
    for (k, wrap) in pi_wraps.iter_mut().enumerate() {
        let bin = spectrum[k];
        let mut angle = bin.im.atan2(bin.re);
        let detect = TAU;
        let delta = angle - prev_angle2;
        let adjust = detect
            * f64::from(i32::from(delta < -detect * 0.7) - i32::from(delta > detect * 0.7));
        prev_angle2 = angle;
        cum_2pi += adjust;
        angle += cum_2pi;
        let detect = PI;
        let delta = angle - prev_angle1;
        let adjust = detect
            * f64::from(i32::from(delta < -detect * 0.7) - i32::from(delta > detect * 0.7));
        prev_angle1 = angle;
        cum_1pi += adjust.abs();
        *wrap = cum_1pi;

        let magnitude = bin.norm().max(f64::MIN_POSITIVE);
        spectrum[k] = Complex::new(magnitude.ln(), 0.0);
    }

    // Real cepstrum of the log magnitude, folded causal.
    let mut cepstrum = vec![0.0; work_len];
    cache.inverse(&mut spectrum, &mut cepstrum);
    let norm = 1.0 / work_len as f64;
    for v in &mut cepstrum {
        *v *= norm;
    }
    for k in 1..half {
        cepstrum[k] *= 2.0;
        cepstrum[k + half] = 0.0;
    }
    cache.forward(&mut cepstrum, &mut spectrum);

    // Interpolate between minimum phase and the zero-phase reference, then
    // exponentiate back to a spectrum.
    let total = pi_wraps[half];
    for k in 1..half {
        let blended = phase1 * (k as f64 / half as f64) * total
            + (1.0 - phase1) * (spectrum[k].im + pi_wraps[k])
            - pi_wraps[k];
        let magnitude = spectrum[k].re.exp();
        spectrum[k] = Complex::new(magnitude * blended.cos(), magnitude * blended.sin());
    }
    spectrum[0] = Complex::new(spectrum[0].re.exp(), 0.0);
    spectrum[half] = Complex::new(spectrum[half].re.exp(), 0.0);

    let mut impulse = vec![0.0; work_len];
    cache.inverse(&mut spectrum, &mut impulse);
    for v in &mut impulse {
        *v *= norm;
    }

    // The peak of the running sum marks the group-delay center.
    let search = ((total / PI + 0.5) as usize).min(work_len - 1);
    let (mut running, mut peak_sum, mut peak) = (0.0f64, 0.0f64, 0usize);
    for (idx, &v) in impulse.iter().enumerate().take(search + 1) {
        running += v;
        if running.abs() > peak_sum.abs() {
            peak_sum = running;
            peak = idx;
        }
    }
    while peak > 0 && impulse[peak - 1].abs() > impulse[peak].abs()
        && impulse[peak - 1] * impulse[peak] > 0.0
    {
        peak -= 1;
    }

    let len = h.len();
    let begin = if phase1 == 0.0 {
        0isize
    } else {
        peak as isize - (phase1 * (len / 2) as f64) as isize
    };
    let mut out = vec![0.0; len];
    for (idx, tap) in out.iter_mut().enumerate() {
        let pick = if phase > 50.0 { len - 1 - idx } else { idx };
        let src = (begin + pick as isize).rem_euclid(work_len as isize) as usize;
        *tap = impulse[src];
    }
    let peak_in = ((peak as isize - begin).max(0) as usize).min(len - 1);
    let post_peak = if phase > 50.0 { len - 1 - peak_in } else { peak_in };
    tracing::debug!(len, phase, post_peak, "transformed filter phase");
    (out, post_peak)
}

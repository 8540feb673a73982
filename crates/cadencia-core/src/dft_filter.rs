//! Frequency-domain half-band filters and the shared filter bank.
//!
//! A [`DftFilter`] is an FIR stored as its forward transform, sized for
//! overlap-save convolution; building one is the expensive part of pipeline
//! setup, so a [`FilterBank`] memoizes the two half-band slots and the
//! polyphase table. The bank is write-once: every slot is a [`OnceLock`],
//! which makes repeated initialization idempotent and lets fully built
//! banks be shared across pipelines and threads.

use crate::design::{design_lpf, fir_to_phase};
use crate::fft::{FftCache, dft_length_for};
use crate::poly_fir::PolyFirTable;
use realfft::num_complex::Complex;
use std::sync::{Arc, OnceLock};

/// A half-band FIR pre-transformed for overlap-save convolution.
#[derive(Debug)]
pub struct DftFilter {
    /// Tap count of the underlying FIR; always odd.
    pub num_taps: usize,
    /// Impulse-peak index, used by stages to size their silence preload.
    pub post_peak: usize,
    /// Transform block length.
    pub dft_length: usize,
    /// Forward transform of the rotated, scaled taps (`dft_length/2 + 1`
    /// bins, carrying the inverse normalization and the stage gain).
    pub coefs: Vec<Complex<f64>>,
}

/// Construction parameters for one half-band slot.
pub(crate) struct HalfBandSpec<'a> {
    /// One-sided prototype (center tap first); designed when `None`.
    pub h: Option<&'a [f64]>,
    /// Pass-band edge as a fraction of the post-decimation Nyquist.
    pub fp: f64,
    /// Stop-band attenuation target, dB.
    pub att: f64,
    /// Linear gain folded into the coefficients.
    pub multiplier: f64,
    /// Phase response selector, 0..=100 with 50 = linear.
    pub phase: f64,
    /// Trade stop-band placement for a cheaper filter.
    pub allow_aliasing: bool,
}

impl DftFilter {
    pub(crate) fn build(spec: &HalfBandSpec<'_>, cache: &mut FftCache) -> Self {
        let (taps, post_peak) = match spec.h {
            Some(one_sided) => {
                let num_taps = 2 * one_sided.len() - 1;
                let mut h = vec![0.0; num_taps];
                for (i, tap) in h.iter_mut().enumerate() {
                    *tap = one_sided[(num_taps / 2).abs_diff(i)];
                }
                (h, num_taps / 2)
            }
            None => {
                let h = design_lpf(spec.fp, 1.0, 2.0, spec.allow_aliasing, spec.att, None, 0);
                if spec.phase == 50.0 {
                    let post_peak = h.len() / 2;
                    (h, post_peak)
                } else {
                    let (h, post_peak) = fir_to_phase(&h, spec.phase, cache);
                    (h, post_peak)
                }
            }
        };

        let num_taps = taps.len();
        assert!(num_taps % 2 == 1, "half-band filters use odd tap counts");
        let dft_length = dft_length_for(num_taps);

        let mut buf = vec![0.0; dft_length];
        let scale = spec.multiplier / dft_length as f64;
        for (i, &tap) in taps.iter().enumerate() {
            buf[(i + dft_length - num_taps + 1) & (dft_length - 1)] = tap * scale;
        }
        let mut coefs = Vec::new();
        cache.forward(&mut buf, &mut coefs);

        tracing::debug!(num_taps, dft_length, post_peak, "built half-band filter");
        Self {
            num_taps,
            post_peak,
            dft_length,
            coefs,
        }
    }

    /// Samples of overlap carried between blocks.
    #[inline]
    pub fn overlap(&self) -> usize {
        self.num_taps - 1
    }
}

/// Memoized filter state shared by every pipeline built from one
/// configuration: the two half-band slots (0 = halve, 1 = halve-or-double)
/// and the polyphase coefficient table.
#[derive(Default)]
pub struct FilterBank {
    half_band: [OnceLock<Arc<DftFilter>>; 2],
    poly_fir: OnceLock<Arc<PolyFirTable>>,
}

impl FilterBank {
    /// Creates an empty bank; slots fill on first pipeline init.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds half-band slot `which` if empty; no-op (and no re-design)
    /// otherwise.
    pub(crate) fn init_half_band(
        &self,
        which: usize,
        spec: &HalfBandSpec<'_>,
        cache: &mut FftCache,
    ) -> Arc<DftFilter> {
        Arc::clone(
            self.half_band[which].get_or_init(|| Arc::new(DftFilter::build(spec, cache))),
        )
    }

    /// Points slot `to` at the filter already in slot `from`.
    pub(crate) fn alias_half_band(&self, to: usize, from: usize) {
        if let Some(filter) = self.half_band[from].get() {
            let _ = self.half_band[to].set(Arc::clone(filter));
        }
    }

    /// The filter in slot `which`, if built.
    pub fn half_band(&self, which: usize) -> Option<&Arc<DftFilter>> {
        self.half_band[which].get()
    }

    /// Builds the polyphase table if empty.
    pub(crate) fn init_poly_fir(
        &self,
        build: impl FnOnce() -> PolyFirTable,
    ) -> Arc<PolyFirTable> {
        Arc::clone(self.poly_fir.get_or_init(|| Arc::new(build())))
    }

    /// The polyphase table, if built.
    pub fn poly_fir(&self) -> Option<&Arc<PolyFirTable>> {
        self.poly_fir.get()
    }
}

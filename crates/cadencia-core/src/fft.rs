//! Real-valued FFT plumbing shared by the frequency-domain stages.
//!
//! Wraps a [`realfft`] planner together with reusable spectrum and scratch
//! buffers. One `FftCache` belongs to one pipeline; plans are cached per
//! transform length inside the planner, so repeated [`FftCache::convolve`]
//! calls at a stage's block size do not replan or reallocate.
//!
//! Normalization convention: `realfft` round trips scale by the transform
//! length, and no scaling is applied here. Filter spectra are expected to
//! carry the `1/len` factor in their coefficients, which makes the
//! per-block convolution a plain forward / multiply / inverse.

use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

/// Per-pipeline FFT planner plus reusable work buffers.
pub struct FftCache {
    planner: RealFftPlanner<f64>,
    spectrum: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl FftCache {
    /// Creates an empty cache; plans are built on first use.
    pub fn new() -> Self {
        Self {
            planner: RealFftPlanner::new(),
            spectrum: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Forward real DFT of `time` into `spectrum` (`len/2 + 1` bins).
    ///
    /// `time` is used as working storage and left in an unspecified state.
    pub fn forward(&mut self, time: &mut [f64], spectrum: &mut Vec<Complex<f64>>) {
        let r2c = self.planner.plan_fft_forward(time.len());
        self.grow_scratch(r2c.get_scratch_len());
        spectrum.clear();
        spectrum.resize(time.len() / 2 + 1, Complex::default());
        r2c.process_with_scratch(time, spectrum, &mut self.scratch)
            .expect("forward FFT buffer mismatch");
    }

    /// Inverse real DFT of `spectrum` into `time` (unnormalized).
    ///
    /// `spectrum` is used as working storage and left in an unspecified
    /// state. The imaginary parts of the DC and Nyquist bins are forced to
    /// zero, as the packed real transform requires.
    pub fn inverse(&mut self, spectrum: &mut [Complex<f64>], time: &mut [f64]) {
        let c2r = self.planner.plan_fft_inverse(time.len());
        self.grow_scratch(c2r.get_scratch_len());
        spectrum[0].im = 0.0;
        if let Some(last) = spectrum.last_mut() {
            last.im = 0.0;
        }
        c2r.process_with_scratch(spectrum, time, &mut self.scratch)
            .expect("inverse FFT buffer mismatch");
    }

    /// Cyclic convolution of `block` with a pre-transformed filter spectrum.
    ///
    /// `filter` must hold `block.len()/2 + 1` bins and carry the inverse
    /// normalization in its coefficients.
    pub fn convolve(&mut self, block: &mut [f64], filter: &[Complex<f64>]) {
        let n = block.len();
        debug_assert_eq!(filter.len(), n / 2 + 1);
        let r2c = self.planner.plan_fft_forward(n);
        let c2r = self.planner.plan_fft_inverse(n);
        self.grow_scratch(r2c.get_scratch_len().max(c2r.get_scratch_len()));
        self.spectrum.clear();
        self.spectrum.resize(n / 2 + 1, Complex::default());
        r2c.process_with_scratch(block, &mut self.spectrum, &mut self.scratch)
            .expect("forward FFT buffer mismatch");
        for (bin, coef) in self.spectrum.iter_mut().zip(filter) {
            *bin *= coef;
        }
        self.spectrum[0].im = 0.0;
        self.spectrum[n / 2].im = 0.0;
        c2r.process_with_scratch(&mut self.spectrum, block, &mut self.scratch)
            .expect("inverse FFT buffer mismatch");
    }

    fn grow_scratch(&mut self, len: usize) {
        if self.scratch.len() < len {
            self.scratch.resize(len, Complex::default());
        }
    }
}

impl Default for FftCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Smallest acceptable DFT block length for a filter of `num_taps` taps.
///
/// Roughly four times the next power of two, clamped to [4096, 131072];
/// overlap-save wants the block to dwarf the filter so most of each
/// transform produces usable output.
pub fn dft_length_for(num_taps: usize) -> usize {
    let mut result = 8usize;
    let mut n = num_taps;
    while n > 2 {
        result <<= 1;
        n >>= 1;
    }
    let result = result.clamp(4096, 131072);
    assert!(num_taps * 2 < result, "filter too long for DFT block");
    result
}

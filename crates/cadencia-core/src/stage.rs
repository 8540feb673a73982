//! Per-stage state and the sample-processing kernels.
//!
//! Every stage owns its input FIFO and a kernel selector; the evaluator
//! pumps each stage into the next stage's FIFO. Kernels share one
//! contract: consume what the `pre`/`pre_post` bracket allows, reserve
//! output pessimistically, write, and trim back the unused tail.
//!
//! The fractional stages track their position as 32.32 fixed point in a
//! plain `i64`: upper half is the input-sample offset, lower half the
//! inter-sample position scaled by 2³². For exactly rational ratios the
//! integer half instead counts in units of 1/divisor of an input sample,
//! which keeps the phase selection exact forever.

use crate::dft_filter::{DftFilter, FilterBank};
use crate::fft::FftCache;
use crate::fifo::Fifo;
use crate::half_fir::{HALF_FIR_25, HALF_FIR_LOW, convolve_half};
use crate::poly_fir::PolyFirTable;

/// One in 32.32 fixed point.
pub(crate) const MULT32: f64 = 4294967296.0;

#[inline]
pub(crate) fn integer_part(x: i64) -> i64 {
    x >> 32
}

#[inline]
pub(crate) fn fraction_part(x: i64) -> u32 {
    (x & 0xFFFF_FFFF) as u32
}

/// Kernel selector for a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum StageKind {
    /// Slot exists but is outside the active range.
    #[default]
    Unused,
    /// Overlap-save halving against half-band slot `which`.
    HalfSampleDft { which: usize },
    /// Overlap-save doubling against half-band slot 1.
    DoubleSample,
    /// Direct-convolution halving, interior-stage table.
    HalfFir25,
    /// Direct-convolution halving, Low-quality table.
    HalfFirLow,
    /// Fractional resampling through the polyphase table.
    PolyFir,
    /// Fractional resampling through an on-the-fly four-point cubic.
    CubicSpline,
}

/// Mutable per-stage state.
#[derive(Debug, Default)]
pub(crate) struct Stage {
    pub fifo: Fifo,
    pub kind: StageKind,
    /// Past samples kept readable behind the read cursor.
    pub pre: usize,
    /// Past plus future margin the kernel insists on.
    pub pre_post: usize,
    /// Zero samples stuffed at init to absorb filter pre-ring.
    pub preload: usize,
    /// 32.32 position within the input stream.
    pub at: i64,
    /// 32.32 position increment per output sample.
    pub step: i64,
    /// Phase denominator; > 1 exactly when the ratio is rational.
    pub divisor: i64,
    /// Upper bound on outputs per input, for sizing reservations.
    pub out_in_ratio: f64,
}

impl Stage {
    /// Samples available to the kernel once the margin is honored.
    #[inline]
    pub fn occupancy(&self) -> usize {
        self.fifo.occupancy().saturating_sub(self.pre_post)
    }

    /// Runs this stage's kernel, draining `self.fifo` into `out`.
    pub fn process(&mut self, out: &mut Fifo, bank: &FilterBank, cache: &mut FftCache) {
        match self.kind {
            StageKind::Unused => {}
            StageKind::HalfSampleDft { which } => {
                let filter = bank.half_band(which).expect("half-band filter missing");
                half_sample(self, out, filter, cache);
            }
            StageKind::DoubleSample => {
                let filter = bank.half_band(1).expect("doubler filter missing");
                double_sample(self, out, filter, cache);
            }
            StageKind::HalfFir25 => half_fir(self, out, &HALF_FIR_25),
            StageKind::HalfFirLow => half_fir(self, out, &HALF_FIR_LOW),
            StageKind::PolyFir => {
                let table = bank.poly_fir().expect("polyphase table missing");
                poly_fir(self, out, table);
            }
            StageKind::CubicSpline => cubic_spline(self, out),
        }
    }
}

/// Overlap-save decimation by two in the frequency domain.
fn half_sample(st: &mut Stage, out: &mut Fifo, filter: &DftFilter, cache: &mut FftCache) {
    let d = filter.dft_length;
    let overlap = filter.overlap();
    while st.fifo.occupancy() >= d {
        let block = out.reserve(d);
        block.copy_from_slice(&st.fifo.peek()[..d]);
        st.fifo.advance(d - overlap);
        cache.convolve(block, &filter.coefs);
        let emit = (d - overlap) / 2;
        for j in 0..emit {
            block[j] = block[2 * j];
        }
        out.trim_by(d - emit);
    }
}

/// Overlap-save zero-stuffed doubling in the frequency domain.
fn double_sample(st: &mut Stage, out: &mut Fifo, filter: &DftFilter, cache: &mut FftCache) {
    let d = filter.dft_length;
    let overlap = filter.overlap();
    while st.fifo.occupancy() > d / 2 {
        let block = out.reserve(d);
        let input = st.fifo.peek();
        for j in 0..d / 2 {
            block[2 * j] = input[j];
            block[2 * j + 1] = 0.0;
        }
        st.fifo.advance((d - overlap) / 2);
        cache.convolve(block, &filter.coefs);
        out.trim_by(overlap);
    }
}

/// Direct-convolution decimation by two.
fn half_fir(st: &mut Stage, out: &mut Fifo, coefs: &[f64]) {
    let num_out = (st.occupancy() + 1) / 2;
    let output = out.reserve(num_out);
    convolve_half(st.fifo.peek(), st.pre, coefs, output);
    st.fifo.advance(2 * num_out);
}

/// Fractional resampling against the prepared polyphase table.
fn poly_fir(st: &mut Stage, out: &mut Fifo, table: &PolyFirTable) {
    let num_in = st.occupancy();
    let max_out = 1 + (num_in as f64 * st.out_in_ratio) as usize;
    let num_coefs = table.num_coefs();
    let mut at = st.at;
    let mut produced = 0usize;

    {
        let output = out.reserve(max_out);
        let input = st.fifo.peek();
        if st.divisor > 1 {
            while (integer_part(at) / st.divisor) < num_in as i64 {
                let units = integer_part(at);
                let idx = (units / st.divisor) as usize;
                let phase = (units % st.divisor) as usize;
                let mut sum = 0.0;
                for tap in 0..num_coefs {
                    sum += table.block(phase, tap)[0] * input[idx + tap];
                }
                output[produced] = sum;
                produced += 1;
                at += st.step;
            }
        } else {
            let bits = table.num_phases().trailing_zeros();
            while integer_part(at) < num_in as i64 {
                let idx = integer_part(at) as usize;
                let frac = fraction_part(at);
                let phase = (frac >> (32 - bits)) as usize;
                let x = f64::from(frac.wrapping_shl(bits)) / MULT32;
                let mut sum = 0.0;
                for tap in 0..num_coefs {
                    sum += table.tap_at(phase, tap, x) * input[idx + tap];
                }
                output[produced] = sum;
                produced += 1;
                at += st.step;
            }
        }
    }

    out.trim_by(max_out - produced);
    if st.divisor > 1 {
        let consumed = integer_part(at) / st.divisor;
        st.fifo.advance(consumed as usize);
        st.at = at - ((consumed * st.divisor) << 32);
    } else {
        st.fifo.advance(integer_part(at) as usize);
        st.at = at & 0xFFFF_FFFF;
    }
}

/// Catmull-Rom-style cubic, coefficients computed per output sample.
fn cubic_spline(st: &mut Stage, out: &mut Fifo) {
    let num_in = st.occupancy();
    let max_out = 1 + (num_in as f64 * st.out_in_ratio) as usize;
    let mut at = st.at;
    let mut produced = 0usize;

    {
        let output = out.reserve(max_out);
        let input = st.fifo.peek();
        while integer_part(at) < num_in as i64 {
            let base = st.pre + integer_part(at) as usize;
            let x = f64::from(fraction_part(at)) / MULT32;
            let (sm1, s0, s1, s2) = (input[base - 1], input[base], input[base + 1], input[base + 2]);
            let b = 0.5 * (s1 + sm1) - s0;
            let a = (1.0 / 6.0) * (s2 - s1 + sm1 - s0 - 4.0 * b);
            let c = s1 - s0 - a - b;
            output[produced] = ((a * x + b) * x + c) * x + s0;
            produced += 1;
            at += st.step;
        }
    }

    out.trim_by(max_out - produced);
    st.fifo.advance(integer_part(at) as usize);
    st.at = at & 0xFFFF_FFFF;
}

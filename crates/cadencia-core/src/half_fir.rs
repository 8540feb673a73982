//! Short time-domain half-band FIRs.
//!
//! Interior halving stages and the Low-quality output stage convolve
//! directly instead of going through the DFT: their filters are short
//! enough that transform setup would dominate. The two tables are designed
//! once per process and stored one-sided (center tap first), which is all
//! a symmetric FIR needs.

use crate::design::design_lpf;
use std::sync::LazyLock;

/// Interior-stage halver. The signal reaching an interior stage still gets
/// filtered again downstream, so only the lower quarter band needs
/// protecting and the transition can sprawl.
pub(crate) static HALF_FIR_25: LazyLock<Vec<f64>> =
    LazyLock::new(|| one_sided(&design_lpf(0.5, 1.5, 2.0, false, 110.0, None, 0)));

/// Low-quality output halver: shorter, shallower, transition straddling
/// the fold.
pub(crate) static HALF_FIR_LOW: LazyLock<Vec<f64>> =
    LazyLock::new(|| one_sided(&design_lpf(0.8, 1.2, 2.0, false, 80.0, None, 0)));

fn one_sided(h: &[f64]) -> Vec<f64> {
    debug_assert_eq!(h.len() % 2, 1);
    h[h.len() / 2..].to_vec()
}

/// Decimation-by-2 via direct convolution of a one-sided symmetric FIR.
///
/// `input` must expose `coefs.len() - 1` samples of history before index 0
/// and the same margin of future beyond the last center read.
#[inline]
pub(crate) fn convolve_half(input: &[f64], base: usize, coefs: &[f64], output: &mut [f64]) {
    for (i, out) in output.iter_mut().enumerate() {
        let center = base + 2 * i;
        let mut sum = input[center] * coefs[0];
        for (j, &coef) in coefs.iter().enumerate().skip(1) {
            sum += (input[center - j] + input[center + j]) * coef;
        }
        *out = sum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_one_sided_with_dominant_center() {
        for table in [&*HALF_FIR_25, &*HALF_FIR_LOW] {
            assert!(table.len() > 4);
            for &c in &table[1..] {
                assert!(c.abs() < table[0]);
            }
        }
    }

    #[test]
    fn half_fir_25_passes_dc_at_unity() {
        // Full two-sided DC gain: center + 2 * sum(rest).
        let dc = HALF_FIR_25[0] + 2.0 * HALF_FIR_25[1..].iter().sum::<f64>();
        assert!((dc - 1.0).abs() < 1e-3, "DC gain {dc}");
    }

    #[test]
    fn convolve_half_on_dc_input() {
        let coefs = &*HALF_FIR_25;
        let margin = coefs.len() - 1;
        let input = vec![1.0; 2 * margin + 64];
        let mut output = vec![0.0; 16];
        convolve_half(&input, margin, coefs, &mut output);
        for &o in &output {
            assert!((o - 1.0).abs() < 1e-3);
        }
    }
}

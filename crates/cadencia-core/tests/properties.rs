//! Property-based tests: chunking invariance and the flush length law.

use cadencia_core::{Quality, Resampler, ResamplerConfig};
use proptest::prelude::*;

fn noise(seed: u64, len: usize) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0
        })
        .collect()
}

fn convert_in_chunks(
    factor: f64,
    config: &ResamplerConfig,
    input: &[f64],
    chunks: &[usize],
) -> Vec<f64> {
    let mut rate = Resampler::new(factor, config).expect("valid config");
    let mut out = Vec::new();
    let mut buf = vec![0.0f64; 4096];
    let mut fed = 0usize;
    let mut which = 0usize;
    while fed < input.len() {
        let n = chunks[which % chunks.len()].min(input.len() - fed);
        which += 1;
        rate.input(&input[fed..fed + n]);
        fed += n;
        rate.process();
        loop {
            let got = rate.output(&mut buf);
            if got == 0 {
                break;
            }
            out.extend_from_slice(&buf[..got]);
        }
    }
    rate.flush();
    loop {
        let got = rate.output(&mut buf);
        if got == 0 {
            break;
        }
        out.extend_from_slice(&buf[..got]);
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Splitting the input into arbitrary chunks yields bit-identical
    /// output: every kernel consumes by occupancy, never by block shape.
    #[test]
    fn chunking_never_changes_the_samples(
        chunks in prop::collection::vec(1usize..777, 1..12),
        seed in 0u64..1_000_000,
    ) {
        let input = noise(seed, 2000);
        let config = ResamplerConfig::default();
        let factor = 48000.0 / 44100.0;

        let whole = convert_in_chunks(factor, &config, &input, &[input.len()]);
        let split = convert_in_chunks(factor, &config, &input, &chunks);
        prop_assert_eq!(&whole, &split);
        prop_assert!(whole.iter().all(|x| x.is_finite()));
    }

    /// Irrational ratios stream just as deterministically.
    #[test]
    fn chunking_invariance_for_irrational_ratios(
        chunks in prop::collection::vec(1usize..500, 1..8),
        seed in 0u64..1_000_000,
    ) {
        let input = noise(seed, 1500);
        let config = ResamplerConfig {
            quality: Quality::Medium,
            ..ResamplerConfig::default()
        };
        let factor = std::f64::consts::PI / 2.0;

        let whole = convert_in_chunks(factor, &config, &input, &[input.len()]);
        let split = convert_in_chunks(factor, &config, &input, &chunks);
        prop_assert_eq!(&whole, &split);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// After a flush the total output count is exactly
    /// `round(samples_in / factor)`, whatever the ratio and quality.
    #[test]
    fn flushed_length_follows_the_rounding_law(
        factor in 0.05f64..8.0,
        len in 0usize..3000,
        quality_index in 0usize..4,
    ) {
        let quality = [Quality::Quick, Quality::Low, Quality::Medium, Quality::High]
            [quality_index];
        let config = ResamplerConfig { quality, ..ResamplerConfig::default() };
        let input = noise(42, len);
        let out = convert_in_chunks(factor, &config, &input, &[511]);
        let expected = (len as f64 / factor + 0.5) as usize;
        prop_assert_eq!(out.len(), expected, "factor {} quality {:?}", factor, quality);
    }
}

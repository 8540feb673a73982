//! End-to-end conversion scenarios: length laws, pass-band preservation,
//! image and alias suppression, and the Quick cubic path.

use cadencia_analysis::{
    db_to_linear, goertzel_magnitude, impulse, passband_ripple_db, ramp, rms, sine_bin,
    stopband_rejection_db,
};
use cadencia_core::{Quality, Resampler, ResamplerConfig};

/// Streams `input` through a fresh pipeline in 4096-sample blocks,
/// flushes, and returns the whole output.
fn convert(factor: f64, config: &ResamplerConfig, input: &[f64]) -> Vec<f64> {
    let mut rate = Resampler::new(factor, config).expect("valid config");
    let mut out = Vec::new();
    let mut buf = vec![0.0f64; 8192];
    for chunk in input.chunks(4096) {
        rate.input(chunk);
        rate.process();
        loop {
            let n = rate.output(&mut buf);
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
    }
    rate.flush();
    loop {
        let n = rate.output(&mut buf);
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    out
}

fn quality(q: Quality) -> ResamplerConfig {
    ResamplerConfig {
        quality: q,
        ..ResamplerConfig::default()
    }
}

fn expected_len(input_len: usize, factor: f64) -> usize {
    (input_len as f64 / factor + 0.5) as usize
}

#[test]
fn identity_high_is_bit_exact() {
    // Factor 1 collapses to a passthrough: no stage runs at all.
    let input: Vec<f64> = (0..1024)
        .map(|i| ((i * 2654435761u64 as usize) % 2000) as f64 / 1000.0 - 1.0)
        .collect();
    let out = convert(1.0, &quality(Quality::High), &input);
    assert_eq!(out, input);
}

#[test]
fn halving_preserves_a_passband_tone() {
    // 0.125 cycles/sample in -> 0.25 cycles/sample out, well inside the
    // 0.931 pass band.
    let input = sine_bin(8192, 1024.0);
    let out = convert(2.0, &quality(Quality::High), &input);
    assert_eq!(out.len(), 4096);

    // Steady-state segment holding an integer number of cycles.
    let segment = &out[1024..1024 + 2048];
    let amplitude = goertzel_magnitude(segment, 0.25 * 2048.0);
    assert!(
        (amplitude - 1.0).abs() < 0.12,
        "tone amplitude {amplitude} off by more than 1 dB"
    );
}

#[test]
fn doubling_suppresses_the_zero_stuffing_image() {
    // Tone at 820/4096 cycles in; after doubling it sits at bin 410 of a
    // 4096 window and its image would sit at bin 1638.
    let input = sine_bin(4096, 820.0);
    let out = convert(0.5, &quality(Quality::High), &input);
    assert_eq!(out.len(), 8192);

    let segment = &out[2048..2048 + 4096];
    let tone = goertzel_magnitude(segment, 410.0);
    let image = goertzel_magnitude(segment, 1638.0);
    assert!((tone - 1.0).abs() < 0.12, "tone amplitude {tone}");
    assert!(
        image < db_to_linear(-100.0),
        "image at {} dBFS",
        20.0 * image.log10()
    );
}

#[test]
fn very_impulse_response_meets_the_quality_floor() {
    let input = impulse(16384);
    let factor = 44100.0 / 48000.0;
    let out = convert(factor, &quality(Quality::Very), &input);
    assert_eq!(out.len(), expected_len(16384, factor));

    // Pass band reaches 0.931 * 22050 Hz = 0.4277 cycles at 48 kHz; the
    // stop band starts at the input Nyquist, 0.4594 cycles.
    let rejection = stopband_rejection_db(&out, 0.42, 0.47);
    assert!(rejection >= 120.0, "stop-band rejection {rejection} dB");
    let ripple = passband_ripple_db(&out, 0.40);
    assert!(ripple < 1.0, "pass-band ripple {ripple} dB");
}

#[test]
fn downsampling_rejects_tones_above_the_target_nyquist() {
    // 0.46997 cycles/sample at 48 kHz is 22.56 kHz: above the 44.1 kHz
    // Nyquist, so it must not survive the conversion.
    let input = sine_bin(16384, 7700.0);
    let factor = 48000.0 / 44100.0;
    let cases = [
        (Quality::Medium, -90.0),
        (Quality::High, -100.0),
        (Quality::Very, -110.0),
    ];
    for (q, floor_db) in cases {
        let out = convert(factor, &quality(q), &input);
        assert_eq!(out.len(), expected_len(16384, factor));
        let level = rms(&out[4096..12000]);
        assert!(
            level < db_to_linear(floor_db),
            "{q:?}: aliased tone at rms {level:e}, floor {floor_db} dB"
        );
    }
}

#[test]
fn quick_halving_picks_every_other_sample() {
    // With an integer step the cubic always evaluates at x = 0, which is
    // exactly the source sample.
    let input = ramp(1024);
    let out = convert(2.0, &quality(Quality::Quick), &input);
    assert_eq!(out.len(), 512);
    for (i, &v) in out.iter().enumerate() {
        assert_eq!(v, (2 * i) as f64, "at {i}");
    }
}

#[test]
fn quick_fractional_ratio_reproduces_a_linear_ramp() {
    // A cubic through collinear points is the line itself; only samples
    // whose stencil touches the preload or the flush tail may deviate.
    let input = ramp(1024);
    let factor = 0.8;
    let out = convert(factor, &quality(Quality::Quick), &input);
    assert_eq!(out.len(), expected_len(1024, factor));
    for i in 2..1277 {
        let expect = factor * i as f64;
        assert!(
            (out[i] - expect).abs() < 1e-6,
            "at {i}: {} vs {expect}",
            out[i]
        );
    }
}

#[test]
fn flush_length_matches_the_rounding_law() {
    let cases = [
        (2.0, Quality::High, 10000usize),
        (0.5, Quality::High, 5000),
        (48000.0 / 44100.0, Quality::Medium, 12345),
        (44100.0 / 48000.0, Quality::Very, 4321),
        (std::f64::consts::PI, Quality::High, 9999),
        (3.0, Quality::Low, 7777),
        (2.5, Quality::Quick, 1000),
    ];
    for (factor, q, len) in cases {
        let input = vec![0.25f64; len];
        let out = convert(factor, &quality(q), &input);
        assert_eq!(
            out.len(),
            expected_len(len, factor),
            "factor {factor} quality {q:?}"
        );
    }
}

#[test]
fn minimum_phase_output_still_meets_the_length_law() {
    let config = ResamplerConfig {
        quality: Quality::High,
        phase: 0.0,
        ..ResamplerConfig::default()
    };
    let input = sine_bin(8192, 1024.0);
    let out = convert(2.0, &config, &input);
    assert_eq!(out.len(), 4096);
    let segment = &out[1024..1024 + 2048];
    let amplitude = goertzel_magnitude(segment, 512.0);
    assert!((amplitude - 1.0).abs() < 0.12, "tone amplitude {amplitude}");
}

#[test]
fn interp_order_overrides_produce_equivalent_audio() {
    // An irrational ratio exercises the inter-phase interpolation; any
    // order override must still deliver the tone at unity.
    let input = sine_bin(8192, 512.0);
    let factor = std::f64::consts::SQRT_2;
    for order in [0u8, 1, 2, 3] {
        let config = ResamplerConfig {
            quality: Quality::High,
            interp_order: Some(order),
            ..ResamplerConfig::default()
        };
        let out = convert(factor, &config, &input);
        assert_eq!(out.len(), expected_len(8192, factor), "order {order}");
        let segment = &out[1024..1024 + 2048];
        // 512/8192 cycles in, scaled by the rate change.
        let cycles = 512.0 / 8192.0 / factor * 2048.0;
        let amplitude = goertzel_magnitude(segment, cycles);
        assert!(
            (amplitude - 1.0).abs() < 0.15,
            "order {order}: amplitude {amplitude}"
        );
    }
}

//! Cadencia Analysis - spectral measurement for resampler validation
//!
//! Small, deterministic tools the conversion tests lean on:
//!
//! - [`signal`] - test-signal generators and level measures
//! - [`spectrum`] - single-bin Goertzel probes, magnitude spectra, and
//!   stop-band rejection measurement
//!
//! Tone probes are designed around exact DFT bins: generate with
//! [`signal::sine_bin`], measure with [`spectrum::goertzel_magnitude`] over
//! a window holding a whole number of cycles, and spectral leakage drops
//! out of the measurement entirely.

pub mod signal;
pub mod spectrum;

pub use signal::{db_to_linear, impulse, linear_to_db, peak, ramp, rms, sine_bin};
pub use spectrum::{
    goertzel_magnitude, magnitude_spectrum, passband_ripple_db, stopband_rejection_db,
};

//! Cadencia Core - arbitrary-ratio sample rate conversion
//!
//! This crate converts a monophonic stream of `f64` samples between any two
//! sample rates, rational or not, with selectable trade-offs between CPU
//! cost, latency, aliasing suppression and transition-band width.
//!
//! # Architecture
//!
//! A conversion is planned once and then streamed:
//!
//! - [`Resampler`] - the pipeline: plans the stage chain for a factor,
//!   then pumps samples through FIFO-linked stages
//! - [`FilterBank`] - memoized half-band filters and polyphase tables,
//!   shareable across channels and threads once built
//! - [`Quality`] - Quick (cubic spline) through Very (170 dB stop band)
//!
//! Internally the chain composes half-band halving and doubling stages
//! (frequency-domain overlap-save, or direct convolution where the filter
//! is short) around one fractional stage, either a polyphase FIR with
//! polynomial inter-phase interpolation or a cubic spline.
//!
//! # Example
//!
//! ```rust
//! use cadencia_core::{Resampler, ResamplerConfig};
//!
//! // 48 kHz -> 44.1 kHz, default (High) quality.
//! let mut rate = Resampler::new(48000.0 / 44100.0, &ResamplerConfig::default()).unwrap();
//!
//! let input = vec![0.0f64; 4096];
//! rate.input(&input);
//! rate.process();
//!
//! let mut out = vec![0.0f64; 8192];
//! let produced = rate.output(&mut out);
//! // ... feed more blocks, then square the stream off:
//! rate.flush();
//! let tail = rate.output(&mut out);
//! assert!(produced + tail > 0);
//! ```
//!
//! # Design notes
//!
//! - Everything is `f64`; there is no multi-channel coupling. Run one
//!   pipeline per channel, sharing a [`FilterBank`].
//! - Streaming is single-threaded pull: `input`, `process`, `output` in
//!   causal order, [`Resampler::flush`] at end of stream, drop to close.
//! - Construction validates its arguments; processing is infallible.

pub mod design;
pub mod dft_filter;
pub mod fft;
pub mod fifo;
mod half_fir;
mod poly_fir;
mod resampler;
mod stage;

pub use dft_filter::{DftFilter, FilterBank};
pub use fft::FftCache;
pub use fifo::Fifo;
pub use poly_fir::PolyFirTable;
pub use resampler::{Error, Quality, Resampler, ResamplerConfig};

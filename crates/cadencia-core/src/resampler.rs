//! The streaming resampler: ratio planning, stage assembly, and the
//! FIFO-coupled evaluator.
//!
//! A conversion by `factor` (input rate over output rate) decomposes into a
//! chain of elementary stages: an optional ×2 pre-stage for upsampling,
//! `level` halving stages for downsampling, a fractional stage (polyphase
//! FIR, or cubic spline in Quick mode) for the residual ratio, and an
//! optional half-band post-stage. The planner also hunts for an exactly
//! rational residual — `44100 → 48000` becomes 147/160 and stays
//! phase-exact forever — falling back to a 32.32 fixed-point increment for
//! irrational ratios.
//!
//! Stages are linked by FIFOs. Each stage's FIFO is primed with enough
//! silence to swallow its filter's pre-ring, so the first output sample
//! lines up with the caller's time zero. Draining follows the usual
//! `input → process → output` rhythm, with [`Resampler::flush`] squaring
//! the stream off to exactly `round(samples_in / factor)` samples.

use crate::design::{MAX_TBW0, MAX_TBW0A, TO_3DB, design_lpf};
use crate::dft_filter::{FilterBank, HalfBandSpec};
use crate::fft::FftCache;
use crate::half_fir::{HALF_FIR_25, HALF_FIR_LOW};
use crate::poly_fir::{POLY_FIRS, PolyFirTable};
use crate::stage::{MULT32, Stage, StageKind, fraction_part, integer_part};
use std::sync::Arc;

/// Quality / CPU trade-off for a conversion.
///
/// Quick swaps the filtered pipeline for a bare cubic spline; the rest
/// select progressively tighter pass bands and deeper stop bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Quality {
    /// Cubic-spline interpolation, no band-limiting filter.
    Quick = 0,
    /// Short time-domain filters, ~80 dB stop band.
    Low = 1,
    /// 110 dB stop band.
    Medium = 2,
    /// 125 dB stop band.
    High = 3,
    /// 170 dB stop band.
    Very = 4,
}

impl Default for Quality {
    fn default() -> Self {
        Quality::High
    }
}

/// Half-band presets for Medium, High and Very.
struct HalfBandPreset {
    bw: f64,
    att: f64,
}

const HALF_BAND_PRESETS: [HalfBandPreset; 3] = [
    HalfBandPreset { bw: 0.931, att: 110.0 },
    HalfBandPreset { bw: 0.931, att: 125.0 },
    HalfBandPreset { bw: 0.931, att: 170.0 },
];

const FLUSH_BLOCK: usize = 1024;

/// Tuning knobs for [`Resampler::new`].
#[derive(Debug, Clone)]
pub struct ResamplerConfig {
    /// Quality preset; defaults to [`Quality::High`].
    pub quality: Quality,
    /// Inter-phase interpolation order override, `None` for automatic.
    pub interp_order: Option<u8>,
    /// Phase response: 0 minimum, 50 linear, 100 maximum.
    pub phase: f64,
    /// Pass-band percentage; 0 selects the quality preset.
    pub bandwidth: f64,
    /// Permit aliasing/imaging above the pass band for cheaper filters.
    pub allow_aliasing: bool,
}

impl Default for ResamplerConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            interp_order: None,
            phase: 50.0,
            bandwidth: 0.0,
            allow_aliasing: false,
        }
    }
}

/// Construction errors. Steady-state streaming is infallible.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The conversion factor was zero, negative, or not finite.
    #[error("conversion factor must be positive and finite, got {0}")]
    InvalidFactor(f64),
    /// The interpolation-order override was outside 0..=3.
    #[error("interpolation order must be within 0..=3, got {0}")]
    InvalidInterpOrder(u8),
    /// The phase percentage was outside 0..=100.
    #[error("phase must be within 0..=100, got {0}")]
    InvalidPhase(f64),
    /// The bandwidth percentage was outside its usable range.
    #[error("bandwidth must be 0 (preset) or within 74..=99.7, got {0}")]
    InvalidBandwidth(f64),
}

/// A monophonic `f64` stream resampler for one fixed ratio.
pub struct Resampler {
    factor: f64,
    samples_in: u64,
    samples_out: u64,
    level: i32,
    input_stage_num: i32,
    output_stage_num: i32,
    upsample: bool,
    stages: Vec<Stage>,
    shared: Arc<FilterBank>,
    cache: FftCache,
}

/// Stage slots run from logical index −1 (upsampling pre-stage) through
/// `level + 2` (the output FIFO holder).
#[inline]
fn slot(i: i32) -> usize {
    (i + 1) as usize
}

impl Resampler {
    /// Builds a pipeline with its own filter bank.
    ///
    /// `factor` is input rate divided by output rate: 2.0 halves the rate,
    /// 0.5 doubles it.
    pub fn new(factor: f64, config: &ResamplerConfig) -> Result<Self, Error> {
        Self::with_shared(factor, config, Arc::new(FilterBank::new()))
    }

    /// Builds a pipeline on a shared filter bank.
    ///
    /// Passing the bank of an existing pipeline with the same factor and
    /// configuration (the caller's contract) reuses its filters instead of
    /// redesigning them — the multi-channel case. A fully initialized bank
    /// is read-only and safe to share across threads.
    pub fn with_shared(
        factor: f64,
        config: &ResamplerConfig,
        shared: Arc<FilterBank>,
    ) -> Result<Self, Error> {
        if !(factor > 0.0 && factor.is_finite()) {
            return Err(Error::InvalidFactor(factor));
        }
        if let Some(order) = config.interp_order {
            if order > 3 {
                return Err(Error::InvalidInterpOrder(order));
            }
        }
        if !(0.0..=100.0).contains(&config.phase) {
            return Err(Error::InvalidPhase(config.phase));
        }
        if config.bandwidth != 0.0 && !(74.0..=99.7).contains(&config.bandwidth) {
            return Err(Error::InvalidBandwidth(config.bandwidth));
        }

        let quality = config.quality;
        let mut cache = FftCache::new();

        // Ratio planning: halving level, then the rational hunt over the
        // residual. An accepted candidate that rounds to i/i collapses to
        // an exact 1:1 residual.
        let mut frac = factor;
        let mut divisor: i64 = 1;
        let mut upsample = false;
        let mut level: i32 = 0;

        if quality != Quality::Quick {
            const MAX_DIVISOR: i64 = 2048;
            const EPSILON: f64 = 4.0 / MULT32;
            upsample = factor < 1.0;
            let mut i = factor as i64;
            loop {
                i >>= 1;
                if i == 0 {
                    break;
                }
                level += 1;
            }
            frac = factor / f64::from(level + i32::from(!upsample)).exp2();
            let mut i: i64 = 2;
            while i <= MAX_DIVISOR && divisor == 1 {
                let try_d = frac * i as f64;
                let candidate = (try_d + 0.5) as i64;
                let tolerance =
                    candidate as f64 * EPSILON * (1.0 - (0.5 / MAX_DIVISOR as f64) * i as f64);
                if (candidate as f64 - try_d).abs() < tolerance {
                    if candidate == i {
                        frac = 1.0;
                        divisor = 2;
                        upsample = false;
                    } else {
                        frac = candidate as f64;
                        divisor = i;
                    }
                }
                i += 1;
            }
        }

        let mut stages: Vec<Stage> = (0..level + 4).map(|_| Stage::default()).collect();
        let step = (frac * MULT32 + 0.5) as i64;
        let out_in_ratio = MULT32 * divisor as f64 / step as f64;
        {
            let last = &mut stages[slot(level)];
            last.step = step;
            last.out_in_ratio = out_in_ratio;
        }
        if divisor != 1 {
            debug_assert_eq!(fraction_part(step), 0);
        } else if quality != Quality::Quick {
            debug_assert_eq!(integer_part(step), 0);
        }

        let mut mult: i32 = 1 + i32::from(upsample);
        let mut input_stage_num = -i32::from(upsample);
        let mut output_stage_num = level;

        if quality == Quality::Quick {
            output_stage_num += 1;
            let last = &mut stages[slot(level)];
            last.kind = StageKind::CubicSpline;
            last.pre_post = integer_part(step).max(3) as usize;
            last.pre = 1;
            last.preload = 1;
        } else if out_in_ratio != 2.0 || (upsample && quality == Quality::Low) {
            let mut n = 4 * usize::from(upsample) + quality.clamp(Quality::Medium, Quality::Very)
                as usize
                - Quality::Medium as usize;
            let auto = u8::from(quality > Quality::High);
            let user = config.interp_order.unwrap_or(auto);
            let interp_order = if divisor == 1 {
                (1 + user as usize).min(3)
            } else {
                0
            };
            stages[slot(level)].divisor = divisor;
            output_stage_num += 2;
            if upsample && quality == Quality::Low {
                mult = 1;
                input_stage_num += 1;
                output_stage_num -= 1;
                n -= 1;
            }
            let family = &POLY_FIRS[n];
            let phases = if divisor == 1 {
                1usize << family.phase_bits[interp_order]
            } else {
                divisor as usize
            };
            let gain = f64::from(mult);
            shared.init_poly_fir(|| {
                let prototype = design_lpf(
                    family.pass,
                    family.stop,
                    1.0,
                    false,
                    family.att,
                    Some(family.num_coefs * phases - 1),
                    phases,
                );
                PolyFirTable::prepare(&prototype, family.num_coefs, phases, interp_order, gain)
            });
            let last = &mut stages[slot(level)];
            last.kind = StageKind::PolyFir;
            last.pre_post = family.num_coefs - 1;
            last.pre = 0;
            last.preload = last.pre_post >> 1;
            mult = 1;
        }

        if quality > Quality::Low {
            let preset = &HALF_BAND_PRESETS[quality as usize - Quality::Medium as usize];
            let att = if config.allow_aliasing {
                (34.0 / 33.0) * preset.att
            } else {
                preset.att
            };
            let bw = if config.bandwidth != 0.0 {
                1.0 - (1.0 - config.bandwidth / 100.0) / TO_3DB
            } else {
                preset.bw
            };
            let min_pass = 1.0
                - (if config.allow_aliasing {
                    MAX_TBW0A
                } else {
                    MAX_TBW0
                }) / 100.0;

            shared.init_half_band(
                usize::from(upsample),
                &HalfBandSpec {
                    h: None,
                    fp: bw,
                    att,
                    multiplier: f64::from(mult),
                    phase: config.phase,
                    allow_aliasing: config.allow_aliasing,
                },
                &mut cache,
            );
            if upsample {
                let pre = &mut stages[slot(-1)];
                pre.kind = StageKind::DoubleSample;
                pre.preload = shared.half_band(1).expect("doubler filter").post_peak >> 1;
                if (1.0 - factor) / (1.0 - bw) > 2.0 {
                    shared.init_half_band(
                        0,
                        &HalfBandSpec {
                            h: None,
                            fp: factor.max(min_pass),
                            att,
                            multiplier: 1.0,
                            phase: config.phase,
                            allow_aliasing: config.allow_aliasing,
                        },
                        &mut cache,
                    );
                } else {
                    shared.alias_half_band(0, 1);
                }
            } else if level > 0 && output_stage_num > level {
                let pass = bw * divisor as f64 / frac / 2.0;
                if (1.0 - pass) / (1.0 - bw) > 2.0 {
                    shared.init_half_band(
                        1,
                        &HalfBandSpec {
                            h: None,
                            fp: pass.max(min_pass),
                            att,
                            multiplier: 1.0,
                            phase: config.phase,
                            allow_aliasing: config.allow_aliasing,
                        },
                        &mut cache,
                    );
                }
            }
            let post = &mut stages[slot(level + 1)];
            post.kind = StageKind::HalfSampleDft { which: 0 };
            post.preload = shared.half_band(0).expect("post filter").post_peak;
        } else if quality == Quality::Low && !upsample {
            let post = &mut stages[slot(level + 1)];
            post.kind = StageKind::HalfFirLow;
            post.pre_post = 2 * (HALF_FIR_LOW.len() - 1);
            post.pre = post.pre_post >> 1;
            post.preload = post.pre;
        }

        if level > 0 {
            if let Some(f1) = shared.half_band(1) {
                let preload = f1.post_peak;
                let st = &mut stages[slot(level - 1)];
                st.kind = StageKind::HalfSampleDft { which: 1 };
                st.preload = preload;
            } else {
                let post = &stages[slot(level + 1)];
                let (kind, pre, pre_post, preload) =
                    (post.kind, post.pre, post.pre_post, post.preload);
                let st = &mut stages[slot(level - 1)];
                st.kind = kind;
                st.pre = pre;
                st.pre_post = pre_post;
                st.preload = preload;
            }
        }

        for i in input_stage_num..=output_stage_num {
            let st = &mut stages[slot(i)];
            if i >= 0 && i < level - 1 {
                st.kind = StageKind::HalfFir25;
                st.pre_post = 2 * (HALF_FIR_25.len() - 1);
                st.pre = st.pre_post >> 1;
                st.preload = st.pre;
            }
            let preload = st.preload;
            st.fifo.reserve(preload);
        }

        tracing::debug!(
            factor,
            ?quality,
            level,
            divisor,
            step,
            upsample,
            input_stage_num,
            output_stage_num,
            "planned resampling pipeline"
        );

        Ok(Self {
            factor,
            samples_in: 0,
            samples_out: 0,
            level,
            input_stage_num,
            output_stage_num,
            upsample,
            stages,
            shared,
            cache,
        })
    }

    /// The conversion factor this pipeline was built for.
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Whether the plan raises the sample rate.
    pub fn is_upsampling(&self) -> bool {
        self.upsample
    }

    /// Number of cascaded halving stages in the plan.
    pub fn level(&self) -> i32 {
        self.level
    }

    /// The filter bank backing this pipeline.
    pub fn shared(&self) -> &Arc<FilterBank> {
        &self.shared
    }

    /// Samples accepted since construction or the last flush.
    pub fn samples_in(&self) -> u64 {
        self.samples_in
    }

    /// Samples handed out over the pipeline's whole lifetime.
    pub fn samples_out(&self) -> u64 {
        self.samples_out
    }

    /// Appends input samples.
    pub fn input(&mut self, samples: &[f64]) {
        self.samples_in += samples.len() as u64;
        self.stages[slot(self.input_stage_num)].fifo.write(samples);
    }

    /// Pumps every stage once, moving whatever is ready toward the output.
    pub fn process(&mut self) {
        for i in self.input_stage_num..self.output_stage_num {
            let a = slot(i);
            let (left, right) = self.stages.split_at_mut(a + 1);
            left[a].process(&mut right[0].fifo, &self.shared, &mut self.cache);
        }
    }

    /// Samples ready to be read right now.
    pub fn available_output(&self) -> usize {
        self.stages[slot(self.output_stage_num)].fifo.occupancy()
    }

    /// Copies up to `out.len()` processed samples into `out`; returns the
    /// count actually delivered.
    pub fn output(&mut self, out: &mut [f64]) -> usize {
        let n = self.stages[slot(self.output_stage_num)].fifo.read(out);
        self.samples_out += n as u64;
        n
    }

    /// Pushes silence through until the output holds exactly
    /// `round(samples_in / factor) − samples_out` samples, then rearms the
    /// input counter for a fresh stream.
    pub fn flush(&mut self) {
        let target = (self.samples_in as f64 / self.factor + 0.5) as u64;
        let remaining = target.saturating_sub(self.samples_out);
        if remaining > 0 {
            let zeros = [0.0f64; FLUSH_BLOCK];
            while (self.available_output() as u64) < remaining {
                self.input(&zeros);
                self.process();
            }
            self.stages[slot(self.output_stage_num)]
                .fifo
                .trim_to(remaining as usize);
            self.samples_in = 0;
        }
    }
}

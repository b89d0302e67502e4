//! Reverb — synthesized convolution impulse with a feedback-delay fallback.
//!
//! The impulse is a stereo noise burst under an exponential decay envelope,
//! built once per player lifetime and cached. Building can fail (bad rates,
//! absurd durations); failure is swallowed to `None` and the chain then taps
//! a short self-feeding delay line instead, so enabling reverb always yields
//! a connected path.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::delay::FeedbackDelay;

/// Longest impulse we will synthesize. Anything beyond this is treated as a
/// construction failure rather than an allocation hazard.
const MAX_IMPULSE_SECONDS: f64 = 10.0;

/// A cached stereo impulse response.
///
/// Channels are independent noise under the same `(1 - i/len)^decay`
/// envelope. Cheap to clone: sample data is shared.
#[derive(Debug, Clone)]
pub struct ReverbImpulse {
    left: Arc<[f32]>,
    right: Arc<[f32]>,
}

impl ReverbImpulse {
    /// Build the default dashboard impulse: 3 seconds, decay exponent 2.
    pub fn build(sample_rate: f64) -> Option<Self> {
        Self::build_with(sample_rate, 3.0, 2.0)
    }

    /// Build an impulse with explicit duration and decay. Returns `None`
    /// instead of propagating any construction problem.
    pub fn build_with(sample_rate: f64, duration: f64, decay: f64) -> Option<Self> {
        let mut rng = StdRng::from_os_rng();
        Self::build_inner(sample_rate, duration, decay, &mut rng)
    }

    /// Deterministic build for tests and offline rendering.
    pub fn build_seeded(sample_rate: f64, duration: f64, decay: f64, seed: u64) -> Option<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::build_inner(sample_rate, duration, decay, &mut rng)
    }

    fn build_inner(
        sample_rate: f64,
        duration: f64,
        decay: f64,
        rng: &mut StdRng,
    ) -> Option<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            log::warn!("reverb impulse rejected: sample rate {sample_rate}");
            return None;
        }
        if !duration.is_finite() || duration <= 0.0 || duration > MAX_IMPULSE_SECONDS {
            log::warn!("reverb impulse rejected: duration {duration}s");
            return None;
        }
        if !decay.is_finite() || decay < 0.0 {
            log::warn!("reverb impulse rejected: decay {decay}");
            return None;
        }

        let len = (sample_rate * duration) as usize;
        if len == 0 {
            return None;
        }

        let mut channel = |rng: &mut StdRng| -> Arc<[f32]> {
            (0..len)
                .map(|i| {
                    let envelope = (1.0 - i as f64 / len as f64).powf(decay);
                    (rng.random_range(-1.0..1.0) * envelope) as f32
                })
                .collect()
        };

        let left = channel(rng);
        let right = channel(rng);
        Some(ReverbImpulse { left, right })
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

/// Streaming taps the direct FIR can afford per sample. A full 3 s impulse
/// is ~132k taps, two orders of magnitude past what per-sample convolution
/// can sustain at 44.1 kHz, so the streaming unit keeps only the head of
/// the impulse. The tail energy is negligible under the squared decay
/// envelope anyway.
pub const REALTIME_TAP_BUDGET: usize = 4096;

/// Direct-form FIR convolution of the signal with the head of the cached
/// impulse, truncated to [`REALTIME_TAP_BUDGET`] taps.
#[derive(Debug, Clone)]
pub struct ConvolutionReverb {
    impulse: ReverbImpulse,
    history_l: Vec<f32>,
    history_r: Vec<f32>,
    pos: usize,
}

impl ConvolutionReverb {
    pub fn new(impulse: ReverbImpulse) -> Self {
        let taps = impulse.len().clamp(1, REALTIME_TAP_BUDGET);
        ConvolutionReverb {
            impulse,
            history_l: vec![0.0; taps],
            history_r: vec![0.0; taps],
            pos: 0,
        }
    }

    /// Number of impulse taps actually convolved per sample.
    pub fn taps(&self) -> usize {
        self.history_l.len()
    }

    /// Process a stereo sample pair, returning the fully wet signal.
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let taps = self.history_l.len();
        self.history_l[self.pos] = left;
        self.history_r[self.pos] = right;

        // Tap k reads history[pos - k]; the ring wrap splits that into two
        // contiguous runs so the hot loop carries no modulo.
        let mut acc_l = 0.0_f32;
        let mut acc_r = 0.0_f32;
        let mut k = 0;
        for idx in (0..=self.pos).rev() {
            acc_l += self.impulse.left[k] * self.history_l[idx];
            acc_r += self.impulse.right[k] * self.history_r[idx];
            k += 1;
        }
        for idx in (self.pos + 1..taps).rev() {
            acc_l += self.impulse.left[k] * self.history_l[idx];
            acc_r += self.impulse.right[k] * self.history_r[idx];
            k += 1;
        }

        self.pos = (self.pos + 1) % taps;
        (acc_l, acc_r)
    }

    pub fn clear(&mut self) {
        self.history_l.fill(0.0);
        self.history_r.fill(0.0);
        self.pos = 0;
    }
}

/// The reverb tap as wired by the chain: convolution when an impulse is
/// cached, otherwise a short feedback delay standing in.
#[derive(Debug, Clone)]
pub enum ReverbUnit {
    Convolution(ConvolutionReverb),
    Fallback(FeedbackDelay),
}

impl ReverbUnit {
    /// Pick the reverb flavor for the available impulse.
    pub fn for_impulse(impulse: Option<&ReverbImpulse>, sample_rate: f64) -> Self {
        match impulse {
            Some(ir) if !ir.is_empty() => ReverbUnit::Convolution(ConvolutionReverb::new(ir.clone())),
            _ => {
                // 80ms self-feeding line, fully wet; the chain halves the
                // send gain for this flavor to avoid runaway buildup.
                ReverbUnit::Fallback(FeedbackDelay::new(sample_rate, 0.08, 0.55, 1.0))
            }
        }
    }

    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        match self {
            ReverbUnit::Convolution(conv) => conv.process(left, right),
            ReverbUnit::Fallback(delay) => delay.process(left, right),
        }
    }

    pub fn is_convolution(&self) -> bool {
        matches!(self, ReverbUnit::Convolution(_))
    }
}

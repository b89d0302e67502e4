//! Bit-crusher — amplitude quantization plus stochastic sample-and-hold.
//!
//! Each channel holds its last captured quantization level; with probability
//! `downsample_rate` per sample a fresh level is captured as
//! `floor(input / step) * step` where `step = 0.5^bit_depth`. The hold is
//! what produces the characteristic "crushed" downsampling artifact.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::GraphError;

/// A streaming stereo bit-crusher with live-settable parameters.
#[derive(Debug, Clone)]
pub struct BitCrusher {
    bit_depth: u32,
    downsample_rate: f64,
    held_l: f32,
    held_r: f32,
    rng: StdRng,
}

impl BitCrusher {
    /// Construct with explicit parameters. Non-finite rates are a
    /// construction failure; the chain builder routes around an `Err` by
    /// wiring the delay stage straight to the next one.
    pub fn new(bit_depth: u32, downsample_rate: f64) -> Result<Self, GraphError> {
        if !downsample_rate.is_finite() {
            return Err(GraphError::StageUnavailable { stage: "bitcrusher" });
        }
        Ok(BitCrusher {
            bit_depth: bit_depth.clamp(1, 16),
            downsample_rate: downsample_rate.clamp(0.0, 1.0),
            held_l: 0.0,
            held_r: 0.0,
            rng: StdRng::from_os_rng(),
        })
    }

    /// Construct from the UI's crush amount (0-100):
    /// `bit_depth = 16 - floor(amount/100 * 14)`, `downsample = amount/200`.
    pub fn from_amount(amount: f64) -> Result<Self, GraphError> {
        let amount = amount.clamp(0.0, 100.0);
        let bits = 16 - (amount / 100.0 * 14.0).floor() as u32;
        Self::new(bits, amount / 200.0)
    }

    /// Deterministic construction for tests and offline rendering.
    pub fn with_seed(bit_depth: u32, downsample_rate: f64, seed: u64) -> Result<Self, GraphError> {
        let mut crusher = Self::new(bit_depth, downsample_rate)?;
        crusher.rng = StdRng::seed_from_u64(seed);
        Ok(crusher)
    }

    pub fn bit_depth(&self) -> u32 {
        self.bit_depth
    }

    pub fn downsample_rate(&self) -> f64 {
        self.downsample_rate
    }

    pub fn set_bit_depth(&mut self, bits: u32) {
        self.bit_depth = bits.clamp(1, 16);
    }

    pub fn set_downsample_rate(&mut self, rate: f64) {
        if rate.is_finite() {
            self.downsample_rate = rate.clamp(0.0, 1.0);
        }
    }

    #[inline]
    fn quantize(&self, input: f32) -> f32 {
        let step = 0.5_f32.powi(self.bit_depth as i32);
        (input / step).floor() * step
    }

    /// Process a stereo sample pair. Each channel rolls its own capture
    /// decision, so the hold patterns decorrelate between left and right.
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        if self.rng.random::<f64>() < self.downsample_rate {
            self.held_l = self.quantize(left);
        }
        if self.rng.random::<f64>() < self.downsample_rate {
            self.held_r = self.quantize(right);
        }
        (self.held_l, self.held_r)
    }

    /// Drop the held samples (used when the chain restarts playback).
    pub fn reset(&mut self) {
        self.held_l = 0.0;
        self.held_r = 0.0;
    }
}

//! Waveshaping distortion — amount-tiered transfer curve generator.
//!
//! The curve maps input amplitude [-1, 1] to output amplitude through one of
//! four families, selected by the drive amount. Tier thresholds are tuning
//! choices carried over from the dashboard sound design; re-tune them only
//! together with the presets that rely on them.

use std::f64::consts::PI;

/// Number of points in a transfer curve.
pub const CURVE_LEN: usize = 44_100;

/// Build a waveshaping transfer curve for the given drive amount (0-100).
///
/// Pure function: identical amounts yield bit-identical curves.
/// - amount > 80: hard asymmetric clip, output in [-0.7, 0.8], 3x input scale
/// - 70 < amount <= 80: hard symmetric clip at +/-0.8, scaled amount/20
/// - 40 < amount <= 70: tanh soft clip, scaled amount/25
/// - amount <= 40: subtle rational overdrive (arctangent-style)
pub fn distortion_curve(amount: f64) -> Vec<f32> {
    let amount = amount.clamp(0.0, 100.0);
    let mut curve = Vec::with_capacity(CURVE_LEN);
    let deg = PI / 180.0;

    for i in 0..CURVE_LEN {
        let x = (i as f64) * 2.0 / (CURVE_LEN as f64 - 1.0) - 1.0;
        let y = if amount > 80.0 {
            (x * 3.0).clamp(-0.7, 0.8)
        } else if amount > 70.0 {
            (x * amount / 20.0).clamp(-0.8, 0.8)
        } else if amount > 40.0 {
            (x * amount / 25.0).tanh()
        } else {
            (3.0 + amount) * x * 20.0 * deg / (PI + amount * x.abs())
        };
        curve.push(y as f32);
    }

    curve
}

/// Applies a transfer curve to samples via linear-interpolated table lookup.
#[derive(Debug, Clone)]
pub struct WaveShaper {
    curve: Vec<f32>,
}

impl WaveShaper {
    /// Build a shaper for the given drive amount. The curve is not
    /// incrementally updatable: changing the amount rebuilds it whole.
    pub fn new(amount: f64) -> Self {
        WaveShaper {
            curve: distortion_curve(amount),
        }
    }

    pub fn set_amount(&mut self, amount: f64) {
        self.curve = distortion_curve(amount);
    }

    /// Shape one sample. Input outside [-1, 1] clamps to the curve ends.
    #[inline]
    pub fn shape(&self, input: f32) -> f32 {
        let pos = (input.clamp(-1.0, 1.0) + 1.0) * 0.5 * (self.curve.len() - 1) as f32;
        let idx = pos as usize;
        if idx >= self.curve.len() - 1 {
            return self.curve[self.curve.len() - 1];
        }
        let frac = pos - idx as f32;
        self.curve[idx] + frac * (self.curve[idx + 1] - self.curve[idx])
    }
}

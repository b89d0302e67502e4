//! Effect parameters — the live control surface the UI writes into.
//!
//! Every control is a continuous value in [0, 100]. Values are clamped on
//! every set, and a missing key in serialized form falls back to the control's
//! neutral default (50 for tone controls, 0 for effect amounts).

use serde::{Deserialize, Serialize};

/// Named continuous controls exposed to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectControl {
    Reverb,
    Delay,
    Distortion,
    Phaser,
    FilterCutoff,
    FilterResonance,
    Wobble,
    Flanger,
    Bitcrush,
    EqLow,
    EqMid,
    EqHigh,
}

impl EffectControl {
    /// All controls, in UI display order.
    pub const ALL: [EffectControl; 12] = [
        EffectControl::Reverb,
        EffectControl::Delay,
        EffectControl::Distortion,
        EffectControl::Phaser,
        EffectControl::FilterCutoff,
        EffectControl::FilterResonance,
        EffectControl::Wobble,
        EffectControl::Flanger,
        EffectControl::Bitcrush,
        EffectControl::EqLow,
        EffectControl::EqMid,
        EffectControl::EqHigh,
    ];

    /// Neutral value when a control is absent: midpoint for tone-shaping
    /// controls, zero for effect send amounts.
    pub fn neutral(self) -> f64 {
        match self {
            EffectControl::FilterCutoff
            | EffectControl::FilterResonance
            | EffectControl::EqLow
            | EffectControl::EqMid
            | EffectControl::EqHigh => 50.0,
            _ => 0.0,
        }
    }

    /// Whether this control drives a modulation unit (wobble/flanger/phaser).
    /// Modulation amounts are live-patched into an active unit; everything
    /// else requires a chain rebuild to take hold.
    pub fn is_modulation(self) -> bool {
        matches!(
            self,
            EffectControl::Wobble | EffectControl::Flanger | EffectControl::Phaser
        )
    }
}

/// The full set of effect controls, each clamped to [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EffectParameters {
    pub reverb: f64,
    pub delay: f64,
    pub distortion: f64,
    pub phaser: f64,
    pub filter_cutoff: f64,
    pub filter_resonance: f64,
    pub wobble: f64,
    pub flanger: f64,
    pub bitcrush: f64,
    pub eq_low: f64,
    pub eq_mid: f64,
    pub eq_high: f64,
}

impl Default for EffectParameters {
    fn default() -> Self {
        EffectParameters {
            reverb: EffectControl::Reverb.neutral(),
            delay: EffectControl::Delay.neutral(),
            distortion: EffectControl::Distortion.neutral(),
            phaser: EffectControl::Phaser.neutral(),
            filter_cutoff: EffectControl::FilterCutoff.neutral(),
            filter_resonance: EffectControl::FilterResonance.neutral(),
            wobble: EffectControl::Wobble.neutral(),
            flanger: EffectControl::Flanger.neutral(),
            bitcrush: EffectControl::Bitcrush.neutral(),
            eq_low: EffectControl::EqLow.neutral(),
            eq_mid: EffectControl::EqMid.neutral(),
            eq_high: EffectControl::EqHigh.neutral(),
        }
    }
}

impl EffectParameters {
    pub fn get(&self, control: EffectControl) -> f64 {
        match control {
            EffectControl::Reverb => self.reverb,
            EffectControl::Delay => self.delay,
            EffectControl::Distortion => self.distortion,
            EffectControl::Phaser => self.phaser,
            EffectControl::FilterCutoff => self.filter_cutoff,
            EffectControl::FilterResonance => self.filter_resonance,
            EffectControl::Wobble => self.wobble,
            EffectControl::Flanger => self.flanger,
            EffectControl::Bitcrush => self.bitcrush,
            EffectControl::EqLow => self.eq_low,
            EffectControl::EqMid => self.eq_mid,
            EffectControl::EqHigh => self.eq_high,
        }
    }

    /// Set a control, clamping to [0, 100].
    pub fn set(&mut self, control: EffectControl, value: f64) {
        let v = if value.is_finite() {
            value.clamp(0.0, 100.0)
        } else {
            control.neutral()
        };
        match control {
            EffectControl::Reverb => self.reverb = v,
            EffectControl::Delay => self.delay = v,
            EffectControl::Distortion => self.distortion = v,
            EffectControl::Phaser => self.phaser = v,
            EffectControl::FilterCutoff => self.filter_cutoff = v,
            EffectControl::FilterResonance => self.filter_resonance = v,
            EffectControl::Wobble => self.wobble = v,
            EffectControl::Flanger => self.flanger = v,
            EffectControl::Bitcrush => self.bitcrush = v,
            EffectControl::EqLow => self.eq_low = v,
            EffectControl::EqMid => self.eq_mid = v,
            EffectControl::EqHigh => self.eq_high = v,
        }
    }

    /// Re-clamp every control. Used after deserializing untrusted JSON.
    pub fn sanitize(&mut self) {
        for control in EffectControl::ALL {
            self.set(control, self.get(control));
        }
    }

    /// True when any wet-path effect would be audible. The chain builder
    /// still honors its own `enabled` flag independently of this.
    pub fn any_active(&self) -> bool {
        self.reverb > 0.0
            || self.delay > 0.0
            || self.distortion > 0.0
            || self.phaser > 0.0
            || self.wobble > 0.0
            || self.flanger > 0.0
            || self.bitcrush > 0.0
    }
}

// ── Mappings from [0,100] control values to DSP units ───────

/// Map the cutoff control to Hz on a log scale: 0 → 200 Hz, 100 → 20 kHz.
pub fn cutoff_to_hz(value: f64) -> f64 {
    200.0 * (100.0_f64).powf(value.clamp(0.0, 100.0) / 100.0)
}

/// Map the resonance control to filter Q: 0 → 0.707 (Butterworth), 100 → 10.
pub fn resonance_to_q(value: f64) -> f64 {
    0.707 + value.clamp(0.0, 100.0) / 100.0 * 9.293
}

/// Map an EQ band control to gain in dB: 50 → 0 dB, edges → ±12 dB.
pub fn eq_to_db(value: f64) -> f64 {
    (value.clamp(0.0, 100.0) - 50.0) / 50.0 * 12.0
}

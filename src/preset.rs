//! Genre presets — named bundles of effect parameters plus tempo/key.
//!
//! A preset is applied atomically: the live `EffectParameters` snapshot and
//! the tempo are replaced in one step, never merged field-by-field.

use serde::{Deserialize, Serialize};

use crate::params::EffectParameters;

/// An immutable named bundle of effect parameters and tempo metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub parameters: EffectParameters,
    /// Tempo in beats per minute. Drives tempo-synced effects (wobble rate,
    /// delay time, the Trap sidechain LFO).
    pub bpm: f64,
    /// Suggested musical key, when the genre implies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl Preset {
    pub fn new(name: &str, parameters: EffectParameters, bpm: f64, key: Option<&str>) -> Self {
        Preset {
            name: name.to_string(),
            parameters,
            bpm,
            key: key.map(str::to_string),
        }
    }
}

/// The built-in preset registry.
///
/// Lookup by name falls back to the neutral "Default" preset rather than
/// returning nothing, so a stale preset name from the UI can never leave the
/// player without parameters.
#[derive(Debug, Clone)]
pub struct PresetTable {
    presets: Vec<Preset>,
}

impl PresetTable {
    /// Build the registry with the stock genre presets.
    pub fn builtin() -> Self {
        let mut presets = vec![Preset::new(
            "Default",
            EffectParameters::default(),
            120.0,
            None,
        )];

        let mut dubstep = EffectParameters::default();
        dubstep.wobble = 85.0;
        dubstep.distortion = 45.0;
        dubstep.filter_cutoff = 35.0;
        dubstep.filter_resonance = 70.0;
        dubstep.reverb = 20.0;
        presets.push(Preset::new("Dubstep", dubstep, 140.0, Some("F minor")));

        let mut trap = EffectParameters::default();
        trap.delay = 35.0;
        trap.distortion = 25.0;
        trap.eq_low = 75.0;
        trap.reverb = 30.0;
        presets.push(Preset::new("Trap", trap, 140.0, Some("C minor")));

        let mut dnb = EffectParameters::default();
        dnb.delay = 25.0;
        dnb.distortion = 35.0;
        dnb.eq_low = 65.0;
        dnb.eq_high = 60.0;
        dnb.filter_cutoff = 65.0;
        presets.push(Preset::new("Drum & Bass", dnb, 174.0, Some("A minor")));

        let mut house = EffectParameters::default();
        house.delay = 30.0;
        house.reverb = 25.0;
        house.eq_low = 60.0;
        house.flanger = 20.0;
        presets.push(Preset::new("House", house, 124.0, None));

        let mut lofi = EffectParameters::default();
        lofi.bitcrush = 45.0;
        lofi.filter_cutoff = 40.0;
        lofi.reverb = 15.0;
        lofi.eq_high = 35.0;
        presets.push(Preset::new("Lo-Fi", lofi, 82.0, Some("D major")));

        let mut ambient = EffectParameters::default();
        ambient.reverb = 80.0;
        ambient.delay = 50.0;
        ambient.phaser = 30.0;
        ambient.filter_cutoff = 55.0;
        presets.push(Preset::new("Ambient", ambient, 90.0, None));

        PresetTable { presets }
    }

    /// Look up a preset by name (case-insensitive). Unknown names return the
    /// "Default" preset.
    pub fn get(&self, name: &str) -> &Preset {
        self.presets
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .unwrap_or(&self.presets[0])
    }

    pub fn names(&self) -> Vec<String> {
        self.presets.iter().map(|p| p.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

impl Default for PresetTable {
    fn default() -> Self {
        Self::builtin()
    }
}

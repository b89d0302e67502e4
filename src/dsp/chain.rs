//! Effect chain — wires the per-session processing graph.
//!
//! The chain is rebuilt whole whenever effect enablement toggles or playback
//! restarts; nothing re-patches the main path in place (modulation unit
//! parameters are the one exception, see `modulation`). Topology:
//!
//! ```text
//! source ── dry gain (0.3) ──────────────────────────────┐
//!   └─ EQ ─ filter ─ waveshaper ─┬─ delay ─ [crusher] ─ [post] ─┤
//!                                ├─ reverb tap ──────────────────┤
//!                                ├─ flanger tap ─────────────────┤
//!                                └─ phaser tap ──────────────────┴─ wet gain (0.7) ─ out
//! ```
//!
//! Any wiring failure collapses the whole chain to a direct bypass so
//! playback is never silently broken by an effect.

use crate::error::GraphError;
use crate::params::{self, EffectParameters};

use super::bitcrusher::BitCrusher;
use super::compressor::Compressor;
use super::delay::FeedbackDelay;
use super::distortion::WaveShaper;
use super::eq::ThreeBandEq;
use super::filter::{BiquadFilter, FilterType};
use super::modulation::{Lfo, ModulationUnits};
use super::reverb::{ReverbImpulse, ReverbUnit};

/// Dry path weight in the final merge.
const DRY_GAIN: f32 = 0.3;
/// Wet path weight in the final merge.
const WET_GAIN: f32 = 0.7;
/// Frames between control-rate updates (wobble cutoff, duck gain).
const CONTROL_INTERVAL: usize = 64;
/// Fraction of gain removed at the bottom of the Trap duck.
const DUCK_DEPTH: f32 = 0.5;

/// Preset-specific post stage on the delay-stage output. Mutually exclusive.
#[derive(Debug, Clone)]
enum PostStage {
    Passthrough,
    /// "Drum & Bass": fast compressor emphasizing transients.
    TransientShaper(Compressor),
    /// "Trap": tempo-synced gain duck simulating sidechain pumping.
    SidechainDuck { lfo: Lfo, gain: f32 },
}

/// A fully wired effect graph, or a bypass wire when effects are disabled
/// or wiring failed.
#[derive(Debug, Clone)]
pub enum EffectChain {
    Bypass,
    Active(Box<ActiveChain>),
}

#[derive(Debug, Clone)]
pub struct ActiveChain {
    sample_rate: f64,
    bpm: f64,

    eq: ThreeBandEq,
    filter_l: BiquadFilter,
    filter_r: BiquadFilter,
    base_cutoff_hz: f64,
    shaper: Option<WaveShaper>,
    delay: FeedbackDelay,
    crusher: Option<BitCrusher>,
    post: PostStage,
    reverb: Option<(ReverbUnit, f32)>,
    pub modulation: ModulationUnits,

    frames_until_tick: usize,
}

impl EffectChain {
    /// Wire a chain for the given parameters.
    ///
    /// `effects_enabled` false short-circuits to a bypass wire. A wiring
    /// failure is logged and also yields the bypass wire, never an error.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        parameters: &EffectParameters,
        bpm: f64,
        preset_name: &str,
        sample_rate: f64,
        impulse: Option<&ReverbImpulse>,
        effects_enabled: bool,
        playing: bool,
    ) -> EffectChain {
        if !effects_enabled {
            return EffectChain::Bypass;
        }
        match ActiveChain::wire(parameters, bpm, preset_name, sample_rate, impulse, playing) {
            Ok(chain) => EffectChain::Active(Box::new(chain)),
            Err(e) => {
                log::warn!("effect chain wiring failed, bypassing: {e}");
                EffectChain::Bypass
            }
        }
    }

    /// Process a stereo block in place. The bypass wire leaves the samples
    /// untouched (bit-identical to the source).
    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        if let EffectChain::Active(chain) = self {
            chain.process_block(left, right);
        }
    }

    /// Live-patch the modulation units for a parameter tick. Everything
    /// else in the chain requires a rebuild.
    pub fn sync_modulation(&mut self, parameters: &EffectParameters, bpm: f64, playing: bool) {
        if let EffectChain::Active(chain) = self {
            let sample_rate = chain.sample_rate;
            chain.modulation.sync(parameters, bpm, playing, sample_rate);
        }
    }

    /// Tear down all modulation units (playback stopped).
    pub fn stop_modulation(&mut self) {
        if let EffectChain::Active(chain) = self {
            chain.modulation.stop_all();
        }
    }

    pub fn is_bypass(&self) -> bool {
        matches!(self, EffectChain::Bypass)
    }

    pub fn has_bitcrusher(&self) -> bool {
        matches!(self, EffectChain::Active(c) if c.crusher.is_some())
    }

    pub fn reverb_is_convolution(&self) -> Option<bool> {
        match self {
            EffectChain::Active(c) => c.reverb.as_ref().map(|(unit, _)| unit.is_convolution()),
            EffectChain::Bypass => None,
        }
    }

    pub fn modulation(&self) -> Option<&ModulationUnits> {
        match self {
            EffectChain::Active(c) => Some(&c.modulation),
            EffectChain::Bypass => None,
        }
    }
}

impl ActiveChain {
    fn wire(
        parameters: &EffectParameters,
        bpm: f64,
        preset_name: &str,
        sample_rate: f64,
        impulse: Option<&ReverbImpulse>,
        playing: bool,
    ) -> Result<ActiveChain, GraphError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(GraphError::InvalidSampleRate { sample_rate });
        }

        let eq = ThreeBandEq::new(
            sample_rate,
            params::eq_to_db(parameters.eq_low),
            params::eq_to_db(parameters.eq_mid),
            params::eq_to_db(parameters.eq_high),
        );

        let base_cutoff_hz = params::cutoff_to_hz(parameters.filter_cutoff);
        let q = params::resonance_to_q(parameters.filter_resonance);
        let mut filter_l = BiquadFilter::new(FilterType::Lowpass, sample_rate);
        filter_l.set_frequency(base_cutoff_hz);
        filter_l.set_q(q);
        let filter_r = filter_l.clone();

        let shaper = if parameters.distortion > 0.0 {
            Some(WaveShaper::new(parameters.distortion))
        } else {
            None
        };

        let delay = FeedbackDelay::tempo_synced(sample_rate, bpm, parameters.delay);

        // Optional stage: a failed bit-crusher is routed around, wiring the
        // delay output straight to the post stage.
        let crusher = if parameters.bitcrush > 0.0 {
            match BitCrusher::from_amount(parameters.bitcrush) {
                Ok(c) => Some(c),
                Err(e) => {
                    log::warn!("bitcrusher unavailable, routing around: {e}");
                    None
                }
            }
        } else {
            None
        };

        let post = if preset_name.eq_ignore_ascii_case("Drum & Bass") {
            PostStage::TransientShaper(Compressor::transient_shaper(sample_rate))
        } else if preset_name.eq_ignore_ascii_case("Trap") {
            PostStage::SidechainDuck {
                lfo: Lfo::new(sample_rate, bpm.clamp(40.0, 260.0) / 60.0),
                gain: 1.0,
            }
        } else {
            PostStage::Passthrough
        };

        let reverb = if parameters.reverb > 0.0 {
            let unit = ReverbUnit::for_impulse(impulse, sample_rate);
            // The fallback line re-feeds itself, so its send is halved.
            let gain = if unit.is_convolution() {
                (parameters.reverb / 100.0) as f32
            } else {
                (parameters.reverb / 200.0) as f32
            };
            Some((unit, gain))
        } else {
            None
        };

        let mut modulation = ModulationUnits::default();
        modulation.sync(parameters, bpm, playing, sample_rate);

        Ok(ActiveChain {
            sample_rate,
            bpm,
            eq,
            filter_l,
            filter_r,
            base_cutoff_hz,
            shaper,
            delay,
            crusher,
            post,
            reverb,
            modulation,
            frames_until_tick: 0,
        })
    }

    /// Control-rate updates: wobble cutoff sweep and the Trap duck gain.
    fn control_tick(&mut self) {
        if let Some(wobble) = &mut self.modulation.wobble {
            let cutoff = self.base_cutoff_hz + wobble.cutoff_offset(CONTROL_INTERVAL);
            self.filter_l.set_frequency(cutoff);
            self.filter_r.set_frequency(cutoff);
        }
        if let PostStage::SidechainDuck { lfo, gain } = &mut self.post {
            let pump = lfo.advance(CONTROL_INTERVAL) as f32;
            *gain = 1.0 - DUCK_DEPTH * (0.5 + 0.5 * pump);
        }
    }

    fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        for i in 0..frames {
            if self.frames_until_tick == 0 {
                self.control_tick();
                self.frames_until_tick = CONTROL_INTERVAL;
            }
            self.frames_until_tick -= 1;

            let (in_l, in_r) = (left[i], right[i]);
            let (dry_l, dry_r) = (in_l * DRY_GAIN, in_r * DRY_GAIN);

            // Wet path: EQ -> filter -> waveshaper
            let (eq_l, eq_r) = self.eq.process(in_l, in_r);
            let f_l = self.filter_l.process(eq_l as f64) as f32;
            let f_r = self.filter_r.process(eq_r as f64) as f32;
            let (tap_l, tap_r) = match &self.shaper {
                Some(shaper) => (shaper.shape(f_l), shaper.shape(f_r)),
                None => (f_l, f_r),
            };

            // Main line: delay -> optional crusher -> preset post stage
            let (mut main_l, mut main_r) = self.delay.process(tap_l, tap_r);
            if let Some(crusher) = &mut self.crusher {
                (main_l, main_r) = crusher.process(main_l, main_r);
            }
            (main_l, main_r) = match &mut self.post {
                PostStage::Passthrough => (main_l, main_r),
                PostStage::TransientShaper(comp) => comp.process(main_l, main_r),
                PostStage::SidechainDuck { gain, .. } => (main_l * *gain, main_r * *gain),
            };

            // Parallel taps off the waveshaper stage
            let (mut wet_l, mut wet_r) = (main_l, main_r);
            if let Some((unit, gain)) = &mut self.reverb {
                let (rv_l, rv_r) = unit.process(tap_l, tap_r);
                wet_l += rv_l * *gain;
                wet_r += rv_r * *gain;
            }
            if let Some(flanger) = &mut self.modulation.flanger {
                let (fl_l, fl_r) = flanger.process(tap_l, tap_r);
                wet_l += fl_l;
                wet_r += fl_r;
            }
            if let Some(phaser) = &mut self.modulation.phaser {
                let (ph_l, ph_r) = phaser.process(tap_l, tap_r);
                wet_l += ph_l;
                wet_r += ph_r;
            }

            left[i] = dry_l + wet_l * WET_GAIN;
            right[i] = dry_r + wet_r * WET_GAIN;
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_block(len: usize, freq: f64, sample_rate: f64) -> (Vec<f32>, Vec<f32>) {
        let signal: Vec<f32> = (0..len)
            .map(|i| {
                (2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate).sin() as f32 * 0.5
            })
            .collect();
        (signal.clone(), signal)
    }

    #[test]
    fn disabled_effects_bypass_bit_identically() {
        let params = EffectParameters::default();
        let mut chain = EffectChain::build(&params, 120.0, "Dubstep", 44100.0, None, false, true);
        assert!(chain.is_bypass());

        let (mut left, mut right) = sine_block(4096, 440.0, 44100.0);
        let (orig_l, orig_r) = (left.clone(), right.clone());
        chain.process_block(&mut left, &mut right);
        assert_eq!(left, orig_l, "Bypass must be bit-identical");
        assert_eq!(right, orig_r);
    }

    #[test]
    fn invalid_sample_rate_falls_back_to_bypass() {
        let params = EffectParameters::default();
        let chain = EffectChain::build(&params, 120.0, "Default", 0.0, None, true, true);
        assert!(chain.is_bypass(), "Wiring failure must yield a bypass wire");

        let chain = EffectChain::build(&params, 120.0, "Default", f64::NAN, None, true, true);
        assert!(chain.is_bypass());
    }

    #[test]
    fn neutral_chain_produces_audio() {
        let params = EffectParameters::default();
        let mut chain = EffectChain::build(&params, 120.0, "Default", 44100.0, None, true, true);
        assert!(!chain.is_bypass());

        let (mut left, mut right) = sine_block(8192, 440.0, 44100.0);
        chain.process_block(&mut left, &mut right);
        let peak = left.iter().fold(0.0_f32, |m, &s| m.max(s.abs()));
        assert!(peak > 0.05, "Chain output should be audible, peak={peak}");
        assert!(left.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn bitcrusher_wired_only_when_amount_positive() {
        let mut params = EffectParameters::default();
        let chain = EffectChain::build(&params, 120.0, "Default", 44100.0, None, true, true);
        assert!(!chain.has_bitcrusher());

        params.bitcrush = 60.0;
        let chain = EffectChain::build(&params, 120.0, "Default", 44100.0, None, true, true);
        assert!(chain.has_bitcrusher());
    }

    #[test]
    fn reverb_uses_convolution_when_impulse_cached() {
        let mut params = EffectParameters::default();
        params.reverb = 50.0;
        let impulse = ReverbImpulse::build_seeded(44100.0, 0.05, 2.0, 1).unwrap();

        let chain =
            EffectChain::build(&params, 120.0, "Default", 44100.0, Some(&impulse), true, true);
        assert_eq!(chain.reverb_is_convolution(), Some(true));

        let chain = EffectChain::build(&params, 120.0, "Default", 44100.0, None, true, true);
        assert_eq!(chain.reverb_is_convolution(), Some(false));
    }

    #[test]
    fn reverb_fallback_path_stays_audible() {
        // Impulse construction "failed": enabling reverb must still produce
        // a connected, non-silent, non-throwing path.
        let mut params = EffectParameters::default();
        params.reverb = 80.0;
        let mut chain = EffectChain::build(&params, 120.0, "Default", 44100.0, None, true, true);

        let (mut left, mut right) = sine_block(44100, 220.0, 44100.0);
        chain.process_block(&mut left, &mut right);
        let peak = left.iter().fold(0.0_f32, |m, &s| m.max(s.abs()));
        assert!(peak > 0.05, "Fallback reverb path should be audible");
        assert!(left.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn dnb_preset_gets_transient_shaper() {
        let params = EffectParameters::default();
        let chain = EffectChain::build(&params, 174.0, "Drum & Bass", 44100.0, None, true, true);
        match chain {
            EffectChain::Active(c) => {
                assert!(matches!(c.post, PostStage::TransientShaper(_)));
            }
            EffectChain::Bypass => panic!("expected active chain"),
        }
    }

    #[test]
    fn trap_preset_gets_sidechain_duck() {
        let params = EffectParameters::default();
        let chain = EffectChain::build(&params, 140.0, "Trap", 44100.0, None, true, true);
        match chain {
            EffectChain::Active(c) => match c.post {
                PostStage::SidechainDuck { ref lfo, .. } => {
                    let _ = lfo;
                }
                _ => panic!("expected sidechain duck"),
            },
            EffectChain::Bypass => panic!("expected active chain"),
        }
    }

    #[test]
    fn other_presets_pass_straight_through() {
        let params = EffectParameters::default();
        let chain = EffectChain::build(&params, 124.0, "House", 44100.0, None, true, true);
        match chain {
            EffectChain::Active(c) => assert!(matches!(c.post, PostStage::Passthrough)),
            EffectChain::Bypass => panic!("expected active chain"),
        }
    }

    #[test]
    fn trap_duck_pumps_the_level() {
        let mut params = EffectParameters::default();
        params.delay = 0.0;
        let mut chain = EffectChain::build(&params, 140.0, "Trap", 44100.0, None, true, true);

        // Constant-ish signal: the duck should carve visible level dips
        let len = 44100;
        let (mut left, mut right) = sine_block(len, 330.0, 44100.0);
        chain.process_block(&mut left, &mut right);

        // Compare RMS of 20ms windows across one pump cycle (140/60 Hz)
        let window = 882;
        let mut rms = Vec::new();
        for chunk in left[4410..].chunks(window).take(40) {
            let sq: f32 = chunk.iter().map(|s| s * s).sum();
            rms.push((sq / chunk.len() as f32).sqrt());
        }
        let max = rms.iter().cloned().fold(0.0_f32, f32::max);
        let min = rms.iter().cloned().fold(f32::MAX, f32::min);
        assert!(
            min < max * 0.85,
            "Sidechain duck should modulate level: min={min}, max={max}"
        );
    }

    #[test]
    fn wobble_changes_the_output() {
        let mut base = EffectParameters::default();
        base.filter_cutoff = 30.0;
        let mut wobbled = base;
        wobbled.wobble = 90.0;

        let mut plain = EffectChain::build(&base, 140.0, "Dubstep", 44100.0, None, true, true);
        let mut wob = EffectChain::build(&wobbled, 140.0, "Dubstep", 44100.0, None, true, true);
        assert!(wob.modulation().unwrap().wobble.is_some());

        let (mut l1, mut r1) = sine_block(22050, 2000.0, 44100.0);
        let (mut l2, mut r2) = (l1.clone(), r1.clone());
        plain.process_block(&mut l1, &mut r1);
        wob.process_block(&mut l2, &mut r2);

        let diff: f32 = l1.iter().zip(&l2).map(|(a, b)| (a - b).abs()).sum();
        assert!(
            diff > 1.0,
            "Wobble should audibly modulate the filter output, diff={diff}"
        );
    }

    #[test]
    fn modulation_is_patched_not_rebuilt() {
        let mut params = EffectParameters::default();
        params.flanger = 30.0;
        let mut chain = EffectChain::build(&params, 120.0, "Default", 44100.0, None, true, true);
        assert!(chain.modulation().unwrap().flanger.is_some());

        params.flanger = 90.0;
        chain.sync_modulation(&params, 120.0, true);
        let flanger = chain.modulation().unwrap().flanger.as_ref().unwrap();
        assert!((flanger.rate_hz() - 2.3).abs() < 1e-9, "rate follows amount");

        params.flanger = 0.0;
        chain.sync_modulation(&params, 120.0, true);
        assert!(chain.modulation().unwrap().flanger.is_none());
    }

    #[test]
    fn stop_modulation_clears_units() {
        let mut params = EffectParameters::default();
        params.wobble = 50.0;
        params.phaser = 50.0;
        let mut chain = EffectChain::build(&params, 120.0, "Default", 44100.0, None, true, true);
        assert!(chain.modulation().unwrap().any_active());

        chain.stop_modulation();
        assert!(!chain.modulation().unwrap().any_active());
    }
}

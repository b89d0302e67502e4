//! Modulation units — LFO-driven wobble, flanger, and phaser.
//!
//! Each unit is a two-state machine: Idle (absent) and Active (owned by the
//! chain). A unit comes alive when its amount rises above zero while the
//! transport is playing, is live-patched in place on every parameter tick
//! while active, and is dropped when its amount returns to zero or playback
//! stops. `ModulationUnits::sync` is the single place those transitions
//! happen, which is what guarantees at most one live instance per type.

use std::f64::consts::PI;

use crate::error::GraphError;
use crate::params::EffectParameters;

/// A free-running sine LFO.
#[derive(Debug, Clone)]
pub struct Lfo {
    phase: f64,
    rate: f64,
    sample_rate: f64,
}

impl Lfo {
    pub fn new(sample_rate: f64, rate: f64) -> Self {
        Lfo {
            phase: 0.0,
            rate,
            sample_rate,
        }
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate.max(0.0);
    }

    /// Advance one sample and return the new sine value in [-1, 1].
    #[inline]
    pub fn next_sample(&mut self) -> f64 {
        self.phase = (self.phase + self.rate / self.sample_rate) % 1.0;
        (2.0 * PI * self.phase).sin()
    }

    /// Advance `frames` samples at once (control-rate callers) and return
    /// the sine value at the new phase.
    #[inline]
    pub fn advance(&mut self, frames: usize) -> f64 {
        self.phase = (self.phase + self.rate * frames as f64 / self.sample_rate) % 1.0;
        (2.0 * PI * self.phase).sin()
    }
}

// ── Wobble ──────────────────────────────────────────────────

/// Tempo-synced cutoff wobble applied to the chain's main filter.
///
/// Rate is `(bpm/240) * (0.5 + (amount/100) * 2)` Hz; depth maps the amount
/// onto a [500, 8000] Hz swing. The LFO is used unipolar so amount 0 is
/// exactly the unmodulated filter.
#[derive(Debug, Clone)]
pub struct WobbleUnit {
    lfo: Lfo,
    depth_hz: f64,
}

impl WobbleUnit {
    pub fn new(sample_rate: f64, amount: f64, bpm: f64) -> Result<Self, GraphError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(GraphError::InvalidSampleRate { sample_rate });
        }
        let mut unit = WobbleUnit {
            lfo: Lfo::new(sample_rate, 0.0),
            depth_hz: 0.0,
        };
        unit.update(amount, bpm);
        Ok(unit)
    }

    /// In-place parameter patch; never recreates the oscillator.
    pub fn update(&mut self, amount: f64, bpm: f64) {
        let amount = amount.clamp(0.0, 100.0);
        let bpm = bpm.clamp(40.0, 260.0);
        self.lfo.set_rate(bpm / 240.0 * (0.5 + amount / 100.0 * 2.0));
        self.depth_hz = 500.0 + amount / 100.0 * 7500.0;
    }

    /// Cutoff offset in Hz after advancing the LFO by `frames` samples.
    #[inline]
    pub fn cutoff_offset(&mut self, frames: usize) -> f64 {
        let lfo = self.lfo.advance(frames);
        self.depth_hz * (0.5 + 0.5 * lfo)
    }

    pub fn rate_hz(&self) -> f64 {
        self.lfo.rate
    }

    pub fn depth_hz(&self) -> f64 {
        self.depth_hz
    }
}

// ── Flanger ─────────────────────────────────────────────────

/// LFO-modulated short delay with feedback, tapped in parallel off the
/// distortion stage. Stereo spread comes from a 90-degree phase offset
/// between the channel LFOs.
#[derive(Debug, Clone)]
pub struct FlangerUnit {
    buffer_l: Vec<f32>,
    buffer_r: Vec<f32>,
    write_pos: usize,
    sample_rate: f64,
    phase_l: f64,
    phase_r: f64,
    rate: f64,
    depth: f64,
    feedback: f64,
}

/// Center delay of the flanger sweep.
const FLANGER_BASE_DELAY: f64 = 0.005;

impl FlangerUnit {
    pub fn new(sample_rate: f64, amount: f64) -> Result<Self, GraphError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(GraphError::InvalidSampleRate { sample_rate });
        }
        // Base delay + max depth + margin
        let buffer_size = (sample_rate * 0.02) as usize + 2;
        let mut unit = FlangerUnit {
            buffer_l: vec![0.0; buffer_size],
            buffer_r: vec![0.0; buffer_size],
            write_pos: 0,
            sample_rate,
            phase_l: 0.0,
            phase_r: 0.25,
            rate: 0.5,
            depth: 0.002,
            feedback: 0.3,
        };
        unit.update(amount);
        Ok(unit)
    }

    /// In-place patch of rate/depth/feedback from the amount.
    pub fn update(&mut self, amount: f64) {
        let a = amount.clamp(0.0, 100.0) / 100.0;
        self.rate = 0.5 + a * 2.0; // 0.5 .. 2.5 Hz
        self.depth = 0.002 + a * 0.003; // 2 .. 5 ms swing
        self.feedback = 0.3 + a * 0.5; // 0.3 .. 0.8
    }

    #[inline]
    fn read_interpolated(buffer: &[f32], write_pos: usize, delay_samples: f64) -> f32 {
        let len = buffer.len();
        let delay_int = delay_samples as usize;
        let frac = (delay_samples - delay_int as f64) as f32;

        let pos0 = if write_pos >= delay_int {
            write_pos - delay_int
        } else {
            len - (delay_int - write_pos)
        };
        let pos1 = if pos0 == 0 { len - 1 } else { pos0 - 1 };

        buffer[pos0] + frac * (buffer[pos1] - buffer[pos0])
    }

    /// Process a stereo sample pair, returning the wet tap only.
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let len = self.buffer_l.len();
        let max_delay = (len - 1) as f64;

        let lfo_l = (2.0 * PI * self.phase_l).sin();
        let lfo_r = (2.0 * PI * self.phase_r).sin();
        let delay_l = ((FLANGER_BASE_DELAY + self.depth * lfo_l) * self.sample_rate)
            .clamp(1.0, max_delay);
        let delay_r = ((FLANGER_BASE_DELAY + self.depth * lfo_r) * self.sample_rate)
            .clamp(1.0, max_delay);

        let wet_l = Self::read_interpolated(&self.buffer_l, self.write_pos, delay_l);
        let wet_r = Self::read_interpolated(&self.buffer_r, self.write_pos, delay_r);

        let fb = self.feedback as f32;
        self.buffer_l[self.write_pos] = left + wet_l * fb;
        self.buffer_r[self.write_pos] = right + wet_r * fb;
        self.write_pos = (self.write_pos + 1) % len;

        let inc = self.rate / self.sample_rate;
        self.phase_l = (self.phase_l + inc) % 1.0;
        self.phase_r = (self.phase_r + inc) % 1.0;

        (wet_l, wet_r)
    }

    pub fn rate_hz(&self) -> f64 {
        self.rate
    }

    pub fn feedback(&self) -> f64 {
        self.feedback
    }
}

// ── Phaser ──────────────────────────────────────────────────

/// First-order all-pass stage (phase shift, unit gain).
#[derive(Debug, Clone, Copy, Default)]
struct AllpassStage {
    z1: f32,
}

impl AllpassStage {
    #[inline]
    fn process(&mut self, input: f32, coeff: f32) -> f32 {
        let y = -coeff * input + self.z1;
        self.z1 = input + coeff * y;
        y
    }
}

/// Number of all-pass stages per channel.
const PHASER_STAGES: usize = 6;

/// Cascade of all-pass filters, all centers swept by a single LFO.
#[derive(Debug, Clone)]
pub struct PhaserUnit {
    stages_l: [AllpassStage; PHASER_STAGES],
    stages_r: [AllpassStage; PHASER_STAGES],
    lfo: Lfo,
    sample_rate: f64,
    sweep_hz: f64,
}

/// Lowest all-pass center frequency of the sweep.
const PHASER_BASE_HZ: f64 = 300.0;

impl PhaserUnit {
    pub fn new(sample_rate: f64, amount: f64) -> Result<Self, GraphError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(GraphError::InvalidSampleRate { sample_rate });
        }
        let mut unit = PhaserUnit {
            stages_l: [AllpassStage::default(); PHASER_STAGES],
            stages_r: [AllpassStage::default(); PHASER_STAGES],
            lfo: Lfo::new(sample_rate, 0.2),
            sample_rate,
            sweep_hz: 0.0,
        };
        unit.update(amount);
        Ok(unit)
    }

    /// In-place patch of rate and sweep depth from the amount.
    pub fn update(&mut self, amount: f64) {
        let a = amount.clamp(0.0, 100.0) / 100.0;
        self.lfo.set_rate(0.2 + a * 0.8); // 0.2 .. 1.0 Hz
        self.sweep_hz = a * 1200.0;
    }

    /// Process a stereo sample pair, returning the phase-shifted tap.
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        // One LFO drives every stage's center identically.
        let lfo = self.lfo.next_sample();
        let center = PHASER_BASE_HZ + self.sweep_hz * (0.5 + 0.5 * lfo);
        let t = (PI * center / self.sample_rate).tan();
        let coeff = ((t - 1.0) / (t + 1.0)) as f32;

        let mut l = left;
        for stage in &mut self.stages_l {
            l = stage.process(l, coeff);
        }
        let mut r = right;
        for stage in &mut self.stages_r {
            r = stage.process(r, coeff);
        }
        (l, r)
    }

    pub fn rate_hz(&self) -> f64 {
        self.lfo.rate
    }
}

// ── Lifecycle ───────────────────────────────────────────────

/// The chain's modulation slots. At most one live instance per type; a
/// second enable patches the existing unit instead of duplicating it.
#[derive(Debug, Clone, Default)]
pub struct ModulationUnits {
    pub wobble: Option<WobbleUnit>,
    pub flanger: Option<FlangerUnit>,
    pub phaser: Option<PhaserUnit>,
}

impl ModulationUnits {
    /// Apply the Idle/Active transitions for the current parameter values.
    /// Construction failures are logged and leave the slot empty.
    pub fn sync(&mut self, params: &EffectParameters, bpm: f64, playing: bool, sample_rate: f64) {
        if params.wobble > 0.0 && playing {
            match &mut self.wobble {
                Some(unit) => unit.update(params.wobble, bpm),
                None => match WobbleUnit::new(sample_rate, params.wobble, bpm) {
                    Ok(unit) => self.wobble = Some(unit),
                    Err(e) => log::warn!("wobble unavailable: {e}"),
                },
            }
        } else {
            self.wobble = None;
        }

        if params.flanger > 0.0 && playing {
            match &mut self.flanger {
                Some(unit) => unit.update(params.flanger),
                None => match FlangerUnit::new(sample_rate, params.flanger) {
                    Ok(unit) => self.flanger = Some(unit),
                    Err(e) => log::warn!("flanger unavailable: {e}"),
                },
            }
        } else {
            self.flanger = None;
        }

        if params.phaser > 0.0 && playing {
            match &mut self.phaser {
                Some(unit) => unit.update(params.phaser),
                None => match PhaserUnit::new(sample_rate, params.phaser) {
                    Ok(unit) => self.phaser = Some(unit),
                    Err(e) => log::warn!("phaser unavailable: {e}"),
                },
            }
        } else {
            self.phaser = None;
        }
    }

    /// Drop every live unit (playback stopped).
    pub fn stop_all(&mut self) {
        self.wobble = None;
        self.flanger = None;
        self.phaser = None;
    }

    pub fn any_active(&self) -> bool {
        self.wobble.is_some() || self.flanger.is_some() || self.phaser.is_some()
    }
}

//! Transport — owns the loaded clip, the playback position, and the live
//! effect chain.
//!
//! Playback is a two-state machine: `Stopped` and `Playing`. Pause keeps the
//! frame offset so the next `play` resumes in place; stop rewinds to zero.
//! The chain is rebuilt whole on every play, preset change, enablement
//! toggle, or non-modulation parameter change; modulation amounts are the
//! only live-patched path.

use crate::dsp::chain::EffectChain;
use crate::dsp::reverb::ReverbImpulse;
use crate::error::PlaybackError;
use crate::params::{EffectControl, EffectParameters};
use crate::preset::Preset;

/// A decoded stereo clip ready for playback.
#[derive(Debug, Clone)]
pub struct AudioClip {
    left: Vec<f32>,
    right: Vec<f32>,
    sample_rate: f64,
}

impl AudioClip {
    /// Build a clip from stereo channel data. The shorter channel decides
    /// the clip length.
    pub fn new(left: Vec<f32>, right: Vec<f32>, sample_rate: f64) -> Self {
        let frames = left.len().min(right.len());
        let mut left = left;
        let mut right = right;
        left.truncate(frames);
        right.truncate(frames);
        AudioClip {
            left,
            right,
            sample_rate,
        }
    }

    /// Build a mono clip, duplicating the channel.
    pub fn from_mono(samples: Vec<f32>, sample_rate: f64) -> Self {
        let right = samples.clone();
        AudioClip {
            left: samples,
            right,
            sample_rate,
        }
    }

    pub fn frames(&self) -> usize {
        self.left.len()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.left.len() as f64 / self.sample_rate
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Playing,
}

/// The playback controller.
#[derive(Debug)]
pub struct Transport {
    clip: Option<AudioClip>,
    state: TransportState,
    /// Frame position into the clip. Survives pause, reset by stop.
    offset: usize,

    parameters: EffectParameters,
    bpm: f64,
    preset_name: String,
    effects_enabled: bool,

    chain: EffectChain,
    /// Reverb impulse, synthesized once on first play and reused for the
    /// transport's lifetime. `None` after a failed build selects the
    /// chain's fallback reverb.
    impulse: Option<ReverbImpulse>,
    impulse_attempted: bool,

    sample_rate: f64,
}

impl Transport {
    pub fn new(sample_rate: f64) -> Self {
        Transport {
            clip: None,
            state: TransportState::Stopped,
            offset: 0,
            parameters: EffectParameters::default(),
            bpm: 120.0,
            preset_name: "Default".to_string(),
            effects_enabled: true,
            chain: EffectChain::Bypass,
            impulse: None,
            impulse_attempted: false,
            sample_rate,
        }
    }

    /// Load a clip, stopping any current playback and rewinding.
    pub fn load_clip(&mut self, clip: AudioClip) {
        self.stop();
        self.sample_rate = clip.sample_rate();
        self.clip = Some(clip);
    }

    /// Start (or resume) playback at the retained offset.
    ///
    /// Fails without touching the state when no playable clip is loaded,
    /// so a failed play leaves the transport `Stopped`.
    pub fn play(&mut self) -> Result<(), PlaybackError> {
        let clip = self.clip.as_ref().ok_or(PlaybackError::NoBufferLoaded)?;
        if clip.frames() == 0 {
            return Err(PlaybackError::EmptyBuffer);
        }

        if !self.impulse_attempted {
            self.impulse = ReverbImpulse::build(self.sample_rate);
            self.impulse_attempted = true;
        }

        self.state = TransportState::Playing;
        self.rebuild_chain();
        Ok(())
    }

    /// Pause, retaining the offset. A no-op when already stopped.
    pub fn pause(&mut self) {
        if self.state == TransportState::Playing {
            self.state = TransportState::Stopped;
            self.chain.stop_modulation();
        }
    }

    /// Stop and rewind. Idempotent.
    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.offset = 0;
        self.chain.stop_modulation();
    }

    /// Jump to a position in seconds.
    pub fn seek(&mut self, seconds: f64) -> Result<(), PlaybackError> {
        let clip = self.clip.as_ref().ok_or(PlaybackError::NoBufferLoaded)?;
        let duration = clip.duration_seconds();
        if !seconds.is_finite() || seconds < 0.0 || seconds > duration {
            return Err(PlaybackError::SeekOutOfRange { seconds, duration });
        }
        self.offset = ((seconds * self.sample_rate) as usize).min(clip.frames());
        Ok(())
    }

    /// Set one effect control. Modulation controls are patched into the
    /// live chain; anything else re-wires the chain at the current offset.
    pub fn set_parameter(&mut self, control: EffectControl, value: f64) {
        self.parameters.set(control, value);
        if control.is_modulation() {
            self.chain.sync_modulation(
                &self.parameters,
                self.bpm,
                self.state == TransportState::Playing,
            );
        } else {
            self.rebuild_chain();
        }
    }

    /// Replace all parameters and the tempo as one bundle, then re-wire.
    /// Listeners never observe the new parameters with the old tempo.
    pub fn apply_preset(&mut self, preset: &Preset) {
        self.parameters = preset.parameters;
        self.bpm = preset.bpm;
        self.preset_name = preset.name.clone();
        self.rebuild_chain();
    }

    /// Toggle the whole wet path. Disabled playback is bit-identical to
    /// the source clip.
    pub fn set_effects_enabled(&mut self, enabled: bool) {
        if self.effects_enabled != enabled {
            self.effects_enabled = enabled;
            self.rebuild_chain();
        }
    }

    fn rebuild_chain(&mut self) {
        self.chain = EffectChain::build(
            &self.parameters,
            self.bpm,
            &self.preset_name,
            self.sample_rate,
            self.impulse.as_ref(),
            self.effects_enabled,
            self.state == TransportState::Playing,
        );
    }

    /// Render the next block of processed audio into the output slices.
    ///
    /// Returns the number of frames produced; fewer than requested means
    /// the clip ended and the transport stopped and rewound itself.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) -> usize {
        if self.state != TransportState::Playing {
            return 0;
        }
        let Some(clip) = &self.clip else {
            return 0;
        };

        let remaining = clip.frames().saturating_sub(self.offset);
        let frames = remaining.min(left.len()).min(right.len());
        left[..frames].copy_from_slice(&clip.left[self.offset..self.offset + frames]);
        right[..frames].copy_from_slice(&clip.right[self.offset..self.offset + frames]);
        self.offset += frames;

        self.chain
            .process_block(&mut left[..frames], &mut right[..frames]);

        if self.offset >= self.clip.as_ref().map_or(0, AudioClip::frames) {
            self.stop();
        }
        frames
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn position_seconds(&self) -> f64 {
        self.offset as f64 / self.sample_rate
    }

    pub fn duration_seconds(&self) -> f64 {
        self.clip.as_ref().map_or(0.0, AudioClip::duration_seconds)
    }

    pub fn parameters(&self) -> &EffectParameters {
        &self.parameters
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn preset_name(&self) -> &str {
        &self.preset_name
    }

    pub fn effects_enabled(&self) -> bool {
        self.effects_enabled
    }

    pub fn chain(&self) -> &EffectChain {
        &self.chain
    }
}

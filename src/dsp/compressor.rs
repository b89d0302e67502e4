//! Dynamics compressor — matches WebAudio DynamicsCompressorNode behavior.
//!
//! In the remix chain this runs as the "Drum & Bass" preset's post stage:
//! a fast-attack/fast-release setting that pins sustained level down and
//! lets note onsets punch through.

/// A stereo feed-forward compressor with a soft knee.
#[derive(Debug, Clone)]
pub struct Compressor {
    sample_rate: f64,

    /// Threshold in dB.
    pub threshold: f64,
    /// Compression ratio (e.g. 12.0 = 12:1).
    pub ratio: f64,
    /// Knee width in dB (0 = hard knee).
    pub knee: f64,
    /// Attack time in seconds.
    pub attack: f64,
    /// Release time in seconds.
    pub release: f64,

    envelope: f64,
}

impl Compressor {
    pub fn new(sample_rate: f64, threshold: f64, ratio: f64, attack: f64, release: f64) -> Self {
        Compressor {
            sample_rate,
            threshold: threshold.clamp(-60.0, 0.0),
            ratio: ratio.clamp(1.0, 20.0),
            knee: 6.0,
            attack: attack.clamp(0.0001, 1.0),
            release: release.clamp(0.001, 5.0),
            envelope: 0.0,
        }
    }

    /// The transient-emphasis setting used by the "Drum & Bass" preset:
    /// -24 dB threshold, 12:1, 1 ms attack, 100 ms release.
    pub fn transient_shaper(sample_rate: f64) -> Self {
        Self::new(sample_rate, -24.0, 12.0, 0.001, 0.1)
    }

    #[inline]
    fn linear_to_db(linear: f64) -> f64 {
        if linear <= 0.0 {
            -120.0
        } else {
            20.0 * linear.log10()
        }
    }

    #[inline]
    fn db_to_linear(db: f64) -> f64 {
        10.0_f64.powf(db / 20.0)
    }

    /// Gain reduction in dB (non-positive) for an input level in dB.
    #[inline]
    fn gain_reduction_db(&self, input_db: f64) -> f64 {
        let slope = 1.0 - 1.0 / self.ratio;
        let half_knee = self.knee / 2.0;
        if input_db <= self.threshold - half_knee {
            0.0
        } else if input_db >= self.threshold + half_knee {
            (self.threshold - input_db) * slope
        } else {
            // Quadratic interpolation through the knee
            let x = input_db - (self.threshold - half_knee);
            let k = x / self.knee;
            -k * k * slope * half_knee
        }
    }

    /// Process a stereo sample pair.
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let input_level = (left.abs()).max(right.abs()) as f64;

        let attack_coef = (-1.0 / (self.attack * self.sample_rate)).exp();
        let release_coef = (-1.0 / (self.release * self.sample_rate)).exp();
        if input_level > self.envelope {
            self.envelope = attack_coef * self.envelope + (1.0 - attack_coef) * input_level;
        } else {
            self.envelope = release_coef * self.envelope + (1.0 - release_coef) * input_level;
        }

        let gain = Self::db_to_linear(self.gain_reduction_db(Self::linear_to_db(self.envelope))) as f32;
        (left * gain, right * gain)
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}

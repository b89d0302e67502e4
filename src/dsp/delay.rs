//! Feedback delay — the tempo-synced echo stage of the wet path.

/// A stereo delay line with feedback and dry/wet mix.
///
/// Delay time is normally derived from the transport tempo (a dotted eighth
/// of the active BPM) so echoes land on the groove, but free-running times
/// are supported for the fallback reverb, which reuses this type as a short
/// self-feeding line.
#[derive(Debug, Clone)]
pub struct FeedbackDelay {
    buffer_l: Vec<f32>,
    buffer_r: Vec<f32>,
    write_pos: usize,
    sample_rate: f64,

    /// Delay time in seconds.
    pub delay_time: f64,
    /// Feedback amount (0.0 = single echo, capped below 1.0).
    pub feedback: f64,
    /// Dry/wet mix (0.0 = fully dry, 1.0 = fully wet).
    pub mix: f64,
}

/// Longest supported delay time.
const MAX_DELAY_SECONDS: f64 = 2.0;

impl FeedbackDelay {
    pub fn new(sample_rate: f64, delay_time: f64, feedback: f64, mix: f64) -> Self {
        let buffer_size = (sample_rate * MAX_DELAY_SECONDS) as usize + 1;
        FeedbackDelay {
            buffer_l: vec![0.0; buffer_size],
            buffer_r: vec![0.0; buffer_size],
            write_pos: 0,
            sample_rate,
            delay_time: delay_time.clamp(0.001, MAX_DELAY_SECONDS),
            feedback: feedback.clamp(0.0, 0.95),
            mix: mix.clamp(0.0, 1.0),
        }
    }

    /// Delay sized from the delay control and tempo: time is a dotted eighth
    /// at `bpm`, feedback and mix scale linearly with the amount.
    pub fn tempo_synced(sample_rate: f64, bpm: f64, amount: f64) -> Self {
        let amount = amount.clamp(0.0, 100.0);
        let beat = 60.0 / bpm.clamp(40.0, 260.0);
        Self::new(
            sample_rate,
            beat * 0.75,
            amount / 100.0 * 0.6,
            amount / 100.0,
        )
    }

    /// Process a stereo sample pair.
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let buffer_len = self.buffer_l.len();
        let delay_samples = ((self.delay_time * self.sample_rate) as usize).min(buffer_len - 1);

        let read_pos = if self.write_pos >= delay_samples {
            self.write_pos - delay_samples
        } else {
            buffer_len - (delay_samples - self.write_pos)
        };

        let delayed_l = self.buffer_l[read_pos];
        let delayed_r = self.buffer_r[read_pos];

        let fb = self.feedback as f32;
        self.buffer_l[self.write_pos] = left + delayed_l * fb;
        self.buffer_r[self.write_pos] = right + delayed_r * fb;

        self.write_pos = (self.write_pos + 1) % buffer_len;

        let mix = self.mix as f32;
        (
            left * (1.0 - mix) + delayed_l * mix,
            right * (1.0 - mix) + delayed_r * mix,
        )
    }

    /// Clear the delay buffers.
    pub fn clear(&mut self) {
        self.buffer_l.fill(0.0);
        self.buffer_r.fill(0.0);
        self.write_pos = 0;
    }
}

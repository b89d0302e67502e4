//! Three-band EQ — low shelf, mid peak, high shelf in series.
//!
//! The first stage of the wet path. Band centers match the dashboard's
//! fixed low/mid/high split; only the gains move with the UI sliders.

use super::filter::{BiquadFilter, FilterType};

const LOW_SHELF_HZ: f64 = 320.0;
const MID_PEAK_HZ: f64 = 1000.0;
const HIGH_SHELF_HZ: f64 = 3200.0;

/// One channel's worth of EQ stages.
#[derive(Debug, Clone)]
struct EqChannel {
    low: BiquadFilter,
    mid: BiquadFilter,
    high: BiquadFilter,
}

impl EqChannel {
    fn new(sample_rate: f64) -> Self {
        let mut low = BiquadFilter::new(FilterType::Lowshelf, sample_rate);
        low.set_frequency(LOW_SHELF_HZ);
        let mut mid = BiquadFilter::new(FilterType::Peaking, sample_rate);
        mid.set_frequency(MID_PEAK_HZ);
        mid.set_q(1.0);
        let mut high = BiquadFilter::new(FilterType::Highshelf, sample_rate);
        high.set_frequency(HIGH_SHELF_HZ);
        EqChannel { low, mid, high }
    }

    #[inline]
    fn process(&mut self, input: f64) -> f64 {
        self.high.process(self.mid.process(self.low.process(input)))
    }

    fn set_gains(&mut self, low_db: f64, mid_db: f64, high_db: f64) {
        self.low.set_gain_db(low_db);
        self.mid.set_gain_db(mid_db);
        self.high.set_gain_db(high_db);
    }

    fn reset(&mut self) {
        self.low.reset();
        self.mid.reset();
        self.high.reset();
    }
}

/// A stereo three-band EQ.
#[derive(Debug, Clone)]
pub struct ThreeBandEq {
    left: EqChannel,
    right: EqChannel,
}

impl ThreeBandEq {
    pub fn new(sample_rate: f64, low_db: f64, mid_db: f64, high_db: f64) -> Self {
        let mut eq = ThreeBandEq {
            left: EqChannel::new(sample_rate),
            right: EqChannel::new(sample_rate),
        };
        eq.set_gains(low_db, mid_db, high_db);
        eq
    }

    /// Process a stereo sample pair.
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        (
            self.left.process(left as f64) as f32,
            self.right.process(right as f64) as f32,
        )
    }

    pub fn set_gains(&mut self, low_db: f64, mid_db: f64, high_db: f64) {
        self.left.set_gains(low_db, mid_db, high_db);
        self.right.set_gains(low_db, mid_db, high_db);
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_eq_is_near_transparent() {
        let mut eq = ThreeBandEq::new(44100.0, 0.0, 0.0, 0.0);
        for i in 0..4410 {
            let t = i as f64 / 44100.0;
            let x = (2.0 * std::f64::consts::PI * 440.0 * t).sin() as f32;
            let (l, r) = eq.process(x, x);
            assert!(l.is_finite() && r.is_finite());
            assert!((l - r).abs() < 1e-6, "Identical inputs stay identical");
        }
    }

    #[test]
    fn low_boost_raises_bass_level() {
        let mut flat = ThreeBandEq::new(44100.0, 0.0, 0.0, 0.0);
        let mut boosted = ThreeBandEq::new(44100.0, 12.0, 0.0, 0.0);

        let mut flat_max = 0.0_f32;
        let mut boost_max = 0.0_f32;
        for i in 0..22050 {
            let t = i as f64 / 44100.0;
            let x = (2.0 * std::f64::consts::PI * 80.0 * t).sin() as f32;
            let (fl, _) = flat.process(x, x);
            let (bl, _) = boosted.process(x, x);
            if i > 4410 {
                flat_max = flat_max.max(fl.abs());
                boost_max = boost_max.max(bl.abs());
            }
        }
        assert!(
            boost_max > flat_max * 2.0,
            "+12dB low shelf should roughly 4x an 80Hz tone: flat={flat_max}, boosted={boost_max}"
        );
    }

    #[test]
    fn high_cut_attenuates_treble() {
        let mut flat = ThreeBandEq::new(44100.0, 0.0, 0.0, 0.0);
        let mut cut = ThreeBandEq::new(44100.0, 0.0, 0.0, -12.0);

        let mut flat_max = 0.0_f32;
        let mut cut_max = 0.0_f32;
        for i in 0..22050 {
            let t = i as f64 / 44100.0;
            let x = (2.0 * std::f64::consts::PI * 10000.0 * t).sin() as f32;
            let (fl, _) = flat.process(x, x);
            let (cl, _) = cut.process(x, x);
            if i > 4410 {
                flat_max = flat_max.max(fl.abs());
                cut_max = cut_max.max(cl.abs());
            }
        }
        assert!(
            cut_max < flat_max * 0.5,
            "-12dB high shelf should attenuate 10kHz: flat={flat_max}, cut={cut_max}"
        );
    }
}

//! DSP building blocks for the remix effect chain.
//!
//! Every processor follows the same streaming shape: per-sample stereo
//! `process(left, right) -> (left, right)` with internal state, plus a
//! reset/clear where replay needs one. All of them are wired together by
//! [`chain::EffectChain`].

pub mod bitcrusher;
pub mod chain;
pub mod compressor;
pub mod delay;
pub mod distortion;
pub mod eq;
pub mod filter;
pub mod modulation;
pub mod renderer;
pub mod reverb;

pub use bitcrusher::BitCrusher;
pub use chain::EffectChain;
pub use compressor::Compressor;
pub use delay::FeedbackDelay;
pub use distortion::{WaveShaper, distortion_curve};
pub use eq::ThreeBandEq;
pub use filter::{BiquadFilter, FilterType};
pub use modulation::{FlangerUnit, ModulationUnits, PhaserUnit, WobbleUnit};
pub use reverb::{ConvolutionReverb, ReverbImpulse, ReverbUnit};

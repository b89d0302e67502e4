pub mod dsp;
pub mod error;
pub mod params;
pub mod preset;
pub mod providers;
pub mod transport;

use crate::preset::PresetTable;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the remixforge-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: the names of the built-in genre presets, in display order.
#[wasm_bindgen]
pub fn preset_names() -> Result<JsValue, JsValue> {
    let table = PresetTable::builtin();
    serde_wasm_bindgen::to_value(&table.names()).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: the full preset bundle (parameters, tempo, key) by name.
/// Unknown names resolve to the "Default" preset.
#[wasm_bindgen]
pub fn preset_details(name: &str) -> Result<JsValue, JsValue> {
    let table = PresetTable::builtin();
    serde_wasm_bindgen::to_value(table.get(name)).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: the waveshaper transfer curve for a distortion amount,
/// for feeding a WaveShaperNode directly.
#[wasm_bindgen]
pub fn distortion_curve_js(amount: f64) -> Vec<f32> {
    dsp::distortion::distortion_curve(amount)
}

/// WASM-exposed: process interleaved stereo f32 samples through the named
/// preset's effect chain. Returns the processed interleaved buffer.
#[wasm_bindgen]
pub fn process_samples(samples: &[f32], sample_rate: u32, preset: &str) -> Vec<f32> {
    dsp::renderer::process_interleaved(samples, sample_rate, preset)
}

/// WASM-exposed: process interleaved stereo samples and encode the result
/// as a 16-bit PCM WAV byte array for download.
#[wasm_bindgen]
pub fn render_remix_wav(samples: &[f32], sample_rate: u32, preset: &str) -> Vec<u8> {
    dsp::renderer::render_wav(samples, sample_rate, preset)
}

//! Offline renderer — runs a clip through a preset's effect chain and
//! encodes the result as a WAV byte buffer.

use crate::preset::PresetTable;

use super::chain::EffectChain;
use super::reverb::ReverbImpulse;

const BLOCK_FRAMES: usize = 1024;

/// Process interleaved stereo samples through the chain wired for the named
/// preset. Unknown preset names process with the neutral "Default" chain.
pub fn process_interleaved(samples: &[f32], sample_rate: u32, preset_name: &str) -> Vec<f32> {
    let table = PresetTable::builtin();
    let preset = table.get(preset_name);
    let sample_rate = sample_rate as f64;

    let impulse = if preset.parameters.reverb > 0.0 {
        ReverbImpulse::build(sample_rate)
    } else {
        None
    };
    let mut chain = EffectChain::build(
        &preset.parameters,
        preset.bpm,
        &preset.name,
        sample_rate,
        impulse.as_ref(),
        true,
        true,
    );

    let frames = samples.len() / 2;
    let mut left: Vec<f32> = (0..frames).map(|i| samples[i * 2]).collect();
    let mut right: Vec<f32> = (0..frames).map(|i| samples[i * 2 + 1]).collect();

    let mut pos = 0;
    while pos < frames {
        let end = (pos + BLOCK_FRAMES).min(frames);
        chain.process_block(&mut left[pos..end], &mut right[pos..end]);
        pos = end;
    }

    let mut out = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        out.push(left[i]);
        out.push(right[i]);
    }
    out
}

/// Process interleaved stereo samples and encode 16-bit stereo PCM WAV.
pub fn render_wav(samples: &[f32], sample_rate: u32, preset_name: &str) -> Vec<u8> {
    let processed = process_interleaved(samples, sample_rate, preset_name);
    let pcm: Vec<i16> = processed
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect();
    encode_wav(&pcm, sample_rate, 2)
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}

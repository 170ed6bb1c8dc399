use serde::{Deserialize, Serialize};

use crate::io::SampleBuffer;

/// Threshold for the leading/trailing silence scan, relative to the loudest
/// frame in the recording.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrimConfig {
    pub top_db: f32,
    pub frame_length: usize,
    pub hop_length: usize,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            top_db: 60.0,
            frame_length: 2048,
            hop_length: 512,
        }
    }
}

/// Strips leading and trailing near-silence. A fully silent recording trims
/// to a zero-length buffer; callers treat that as a degenerate input, not an
/// error here.
pub fn trim_silence(buffer: &SampleBuffer, config: &TrimConfig) -> SampleBuffer {
    let samples = &buffer.samples;
    let empty = SampleBuffer {
        samples: Vec::new(),
        sample_rate: buffer.sample_rate,
    };
    if samples.is_empty() {
        return empty;
    }

    let hop = config.hop_length.max(1);
    let n_frames = (samples.len() + hop - 1) / hop;
    let mut rms = Vec::with_capacity(n_frames);
    for i in 0..n_frames {
        let start = i * hop;
        let end = (start + config.frame_length).min(samples.len());
        let frame = &samples[start..end];
        let energy = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
        rms.push(energy.sqrt());
    }

    let peak = rms.iter().copied().fold(0.0f32, f32::max);
    if peak <= 0.0 {
        return empty;
    }

    let keep: Vec<bool> = rms
        .iter()
        .map(|&level| 20.0 * (level.max(1e-10) / peak).log10() > -config.top_db)
        .collect();
    let (first, last) = match (
        keep.iter().position(|&k| k),
        keep.iter().rposition(|&k| k),
    ) {
        (Some(first), Some(last)) => (first, last),
        _ => return empty,
    };

    let start = first * hop;
    let end = ((last + 1) * hop).min(samples.len());
    SampleBuffer {
        samples: samples[start..end].to_vec(),
        sample_rate: buffer.sample_rate,
    }
}

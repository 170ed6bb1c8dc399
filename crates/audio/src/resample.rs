use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::AudioError;

const CHUNK_SIZE: usize = 1024;

/// Band-limited sinc resampling of a mono buffer. Pass-through when the rates
/// already match.
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>, AudioError> {
    if source_rate == target_rate {
        return Ok(samples.to_vec());
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let ratio = target_rate as f64 / source_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_SIZE, 1)
        .map_err(|err| AudioError::Decode(format!("failed to create resampler: {err}")))?;

    let mut output = Vec::with_capacity((samples.len() as f64 * ratio).ceil() as usize + CHUNK_SIZE);
    let mut chunks = samples.chunks(CHUNK_SIZE).peekable();
    while let Some(chunk) = chunks.next() {
        let input = vec![chunk.to_vec()];
        let frames = if chunks.peek().is_none() && chunk.len() < CHUNK_SIZE {
            resampler.process_partial(Some(&input), None)
        } else {
            resampler.process(&input, None)
        }
        .map_err(|err| AudioError::Decode(format!("resampling failed: {err}")))?;
        if let Some(channel) = frames.into_iter().next() {
            output.extend(channel);
        }
    }

    // flush the filter tail
    let tail = resampler
        .process_partial::<Vec<f32>>(None, None)
        .map_err(|err| AudioError::Decode(format!("resampling failed: {err}")))?;
    if let Some(channel) = tail.into_iter().next() {
        output.extend(channel);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_rate_is_identity() {
        let samples = vec![0.1, -0.2, 0.3];
        let out = resample(&samples, 22_050, 22_050).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn halves_length_for_two_to_one() {
        let samples = vec![0.5f32; 44_100];
        let out = resample(&samples, 44_100, 22_050).unwrap();
        assert!((out.len() as i64 - 22_050).abs() < 1_024, "len = {}", out.len());
    }

    #[test]
    fn empty_input_stays_empty() {
        let out = resample(&[], 44_100, 22_050).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn short_input_survives_partial_processing() {
        let samples = vec![0.25f32; 100];
        let out = resample(&samples, 48_000, 22_050).unwrap();
        assert!(!out.is_empty());
    }
}

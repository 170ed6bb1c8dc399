use std::f32::consts::PI;
use std::sync::Arc;

use ndarray::{Array1, Array2};
use realfft::{RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::error::AudioError;
use crate::io::{SampleBuffer, DEFAULT_SAMPLE_RATE};

const AMIN: f32 = 1e-10;
const TOP_DB: f32 = 80.0;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct MfccConfig {
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    /// Cepstral coefficients kept per frame; fixes the feature-vector length.
    pub n_coefficients: usize,
    pub fmin: f32,
    /// Upper filterbank edge; `None` means Nyquist.
    pub fmax: Option<f32>,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            n_coefficients: 13,
            fmin: 0.0,
            fmax: None,
        }
    }
}

/// Computes a fixed-length mean-MFCC vector from a mono buffer: Hann-windowed
/// STFT, mel filterbank, log power, DCT-II, then a mean over all frames.
/// Window, filterbank, and DCT basis are precomputed at construction.
pub struct MfccExtractor {
    config: MfccConfig,
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    mel_basis: Array2<f32>,
    dct_basis: Array2<f32>,
}

impl MfccExtractor {
    pub fn new(config: MfccConfig) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(config.n_fft);
        let fmax = config.fmax.unwrap_or(config.sample_rate as f32 / 2.0);
        let mel_basis = mel_filterbank(
            config.sample_rate,
            config.n_fft,
            config.n_mels,
            config.fmin,
            fmax,
        );
        let dct_basis = dct_basis(config.n_coefficients, config.n_mels);
        let window = hann_window(config.n_fft);
        Self {
            config,
            fft,
            window,
            mel_basis,
            dct_basis,
        }
    }

    pub fn config(&self) -> &MfccConfig {
        &self.config
    }

    pub fn extract(&self, buffer: &SampleBuffer) -> Result<Array1<f32>, AudioError> {
        if buffer.samples.is_empty() {
            return Err(AudioError::EmptyAudio);
        }
        if buffer.sample_rate != self.config.sample_rate {
            return Err(AudioError::Feature(format!(
                "buffer sample rate {} does not match configured rate {}",
                buffer.sample_rate, self.config.sample_rate
            )));
        }

        let mel = self.mel_power_frames(&buffer.samples)?;

        // log power in dB with a floor 80 dB below the loudest bin
        let mut db = mel.mapv(|power| 10.0 * power.max(AMIN).log10());
        let max_db = db.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        db.mapv_inplace(|v| v.max(max_db - TOP_DB));

        let n_frames = db.nrows();
        let mut mean = Array1::<f32>::zeros(self.config.n_coefficients);
        for frame in db.rows() {
            mean += &self.dct_basis.dot(&frame);
        }
        mean /= n_frames as f32;

        if mean.iter().any(|v| !v.is_finite()) {
            return Err(AudioError::Feature("non-finite coefficient".into()));
        }
        Ok(mean)
    }

    /// Mel-filtered power spectrogram, one row per centered frame.
    fn mel_power_frames(&self, samples: &[f32]) -> Result<Array2<f32>, AudioError> {
        let n_fft = self.config.n_fft;
        let hop = self.config.hop_length.max(1);
        let padded = reflect_pad(samples, n_fft / 2);
        let n_frames = 1 + (padded.len() - n_fft) / hop;

        let mut frames = Array2::<f32>::zeros((n_frames, self.config.n_mels));
        let mut input = self.fft.make_input_vec();
        let mut spectrum = self.fft.make_output_vec();
        let mut power = Array1::<f32>::zeros(n_fft / 2 + 1);
        for i in 0..n_frames {
            let start = i * hop;
            for (j, slot) in input.iter_mut().enumerate() {
                *slot = padded[start + j] * self.window[j];
            }
            self.fft
                .process(&mut input, &mut spectrum)
                .map_err(|err| AudioError::Feature(err.to_string()))?;
            for (bin, value) in spectrum.iter().enumerate() {
                power[bin] = value.norm_sqr();
            }
            frames.row_mut(i).assign(&self.mel_basis.dot(&power));
        }
        Ok(frames)
    }
}

/// Centered framing: pad by reflection so the first frame is centered on
/// sample zero. Short inputs clamp the mirror index instead of failing.
fn reflect_pad(samples: &[f32], pad: usize) -> Vec<f32> {
    let n = samples.len();
    let mut padded = Vec::with_capacity(n + 2 * pad);
    for i in (1..=pad).rev() {
        padded.push(samples[i.min(n - 1)]);
    }
    padded.extend_from_slice(samples);
    for i in 0..pad {
        let idx = n.saturating_sub(2).saturating_sub(i);
        padded.push(samples[idx.min(n - 1)]);
    }
    padded
}

fn hann_window(length: usize) -> Vec<f32> {
    (0..length)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / length as f32).cos()))
        .collect()
}

/// Hz to mel, Slaney scale: linear below 1 kHz, logarithmic above.
fn hz_to_mel(f: f32) -> f32 {
    const F_SP: f32 = 200.0 / 3.0;
    const MIN_LOG_HZ: f32 = 1000.0;
    const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;
    const LOGSTEP: f32 = 0.068_751_74;

    if f < MIN_LOG_HZ {
        f / F_SP
    } else {
        MIN_LOG_MEL + (f / MIN_LOG_HZ).ln() / LOGSTEP
    }
}

fn mel_to_hz(m: f32) -> f32 {
    const F_SP: f32 = 200.0 / 3.0;
    const MIN_LOG_HZ: f32 = 1000.0;
    const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;
    const LOGSTEP: f32 = 0.068_751_74;

    if m < MIN_LOG_MEL {
        m * F_SP
    } else {
        MIN_LOG_HZ * ((m - MIN_LOG_MEL) * LOGSTEP).exp()
    }
}

/// Triangular mel filterbank with Slaney area normalization,
/// shape `n_mels x (n_fft / 2 + 1)`.
fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize, fmin: f32, fmax: f32) -> Array2<f32> {
    let n_bins = n_fft / 2 + 1;
    let mel_min = hz_to_mel(fmin);
    let mel_max = hz_to_mel(fmax);
    let hz_points: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32))
        .collect();

    let mut basis = Array2::<f32>::zeros((n_mels, n_bins));
    for m in 0..n_mels {
        let lower = hz_points[m];
        let center = hz_points[m + 1];
        let upper = hz_points[m + 2];
        for bin in 0..n_bins {
            let freq = bin as f32 * sample_rate as f32 / n_fft as f32;
            basis[[m, bin]] = if freq >= lower && freq <= center && center > lower {
                (freq - lower) / (center - lower)
            } else if freq > center && freq <= upper && upper > center {
                (upper - freq) / (upper - center)
            } else {
                0.0
            };
        }
        let band = upper - lower;
        if band > 0.0 {
            let enorm = 2.0 / band;
            basis.row_mut(m).mapv_inplace(|w| w * enorm);
        }
    }
    basis
}

/// Orthonormal DCT-II basis, shape `n_coefficients x n_mels`.
fn dct_basis(n_coefficients: usize, n_mels: usize) -> Array2<f32> {
    let scale0 = (1.0 / n_mels as f32).sqrt();
    let scale = (2.0 / n_mels as f32).sqrt();
    let mut basis = Array2::<f32>::zeros((n_coefficients, n_mels));
    for k in 0..n_coefficients {
        for n in 0..n_mels {
            basis[[k, n]] = if k == 0 {
                scale0
            } else {
                scale * (PI * (n as f32 + 0.5) * k as f32 / n_mels as f32).cos()
            };
        }
    }
    basis
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tone_buffer(seconds: f32) -> SampleBuffer {
        let sample_rate = 22_050u32;
        let count = (sample_rate as f32 * seconds) as usize;
        let samples = (0..count)
            .map(|i| (2.0 * PI * 440.0 * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect();
        SampleBuffer {
            samples,
            sample_rate,
        }
    }

    #[test]
    fn feature_vector_has_configured_length() {
        let extractor = MfccExtractor::new(MfccConfig::default());
        for seconds in [0.3, 1.0, 3.0] {
            let features = extractor.extract(&tone_buffer(seconds)).unwrap();
            assert_eq!(features.len(), 13);
        }
    }

    #[test]
    fn extraction_is_deterministic() {
        let extractor = MfccExtractor::new(MfccConfig::default());
        let buffer = tone_buffer(1.0);
        let first = extractor.extract(&buffer).unwrap();
        let second = extractor.extract(&buffer).unwrap();
        for (a, b) in first.iter().zip(second.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-6);
        }
    }

    #[test]
    fn empty_buffer_fails_with_empty_audio() {
        let extractor = MfccExtractor::new(MfccConfig::default());
        let buffer = SampleBuffer {
            samples: Vec::new(),
            sample_rate: 22_050,
        };
        assert!(matches!(
            extractor.extract(&buffer),
            Err(AudioError::EmptyAudio)
        ));
    }

    #[test]
    fn mismatched_sample_rate_is_rejected() {
        let extractor = MfccExtractor::new(MfccConfig::default());
        let buffer = SampleBuffer {
            samples: vec![0.1f32; 4_096],
            sample_rate: 16_000,
        };
        assert!(matches!(
            extractor.extract(&buffer),
            Err(AudioError::Feature(_))
        ));
    }

    #[test]
    fn coefficients_are_finite_for_silence_padded_tone() {
        let extractor = MfccExtractor::new(MfccConfig::default());
        let mut buffer = tone_buffer(0.5);
        buffer.samples.extend(vec![0.0f32; 4_096]);
        let features = extractor.extract(&buffer).unwrap();
        assert!(features.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn digital_silence_yields_finite_features() {
        // all-zero frames hit the dB floor rather than -inf
        let extractor = MfccExtractor::new(MfccConfig::default());
        let buffer = SampleBuffer {
            samples: vec![0.0f32; 22_050],
            sample_rate: 22_050,
        };
        let features = extractor.extract(&buffer).unwrap();
        assert!(features.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn short_input_still_produces_a_vector() {
        let extractor = MfccExtractor::new(MfccConfig::default());
        let buffer = SampleBuffer {
            samples: vec![0.3f32; 64],
            sample_rate: 22_050,
        };
        let features = extractor.extract(&buffer).unwrap();
        assert_eq!(features.len(), 13);
    }

    #[test]
    fn different_tones_produce_different_features() {
        let extractor = MfccExtractor::new(MfccConfig::default());
        let low = extractor.extract(&tone_buffer(1.0)).unwrap();
        let mut high_buffer = tone_buffer(1.0);
        let sample_rate = high_buffer.sample_rate as f32;
        high_buffer.samples = (0..high_buffer.samples.len())
            .map(|i| (2.0 * PI * 3_000.0 * i as f32 / sample_rate).sin() * 0.5)
            .collect();
        let high = extractor.extract(&high_buffer).unwrap();
        let distance: f32 = low
            .iter()
            .zip(high.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum();
        assert!(distance > 1.0);
    }

    #[test]
    fn hz_mel_conversion_round_trips() {
        for hz in [100.0f32, 440.0, 1_000.0, 4_000.0, 10_000.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert_relative_eq!(back, hz, max_relative = 1e-3);
        }
    }

    #[test]
    fn dct_of_constant_vector_loads_only_the_first_coefficient() {
        let basis = dct_basis(13, 128);
        let constant = Array1::from_elem(128, 1.0f32);
        let coefficients = basis.dot(&constant);
        assert!(coefficients[0] > 0.0);
        for value in coefficients.iter().skip(1) {
            assert_relative_eq!(*value, 0.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn filterbank_rows_cover_the_spectrum() {
        let basis = mel_filterbank(22_050, 2048, 128, 0.0, 11_025.0);
        assert_eq!(basis.shape(), &[128, 1025]);
        for row in basis.rows() {
            assert!(row.iter().any(|&w| w > 0.0));
        }
    }
}

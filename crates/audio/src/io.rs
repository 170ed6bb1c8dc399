use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use serde::{Deserialize, Serialize};
use symphonia::core::audio::SampleBuffer as SymSampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::error::AudioError;
use crate::resample;

/// Sample rate recordings are normalized to unless a caller overrides it.
/// Must match the rate used when the classifier was trained.
pub const DEFAULT_SAMPLE_RATE: u32 = 22_050;

/// Mono PCM samples in [-1, 1] at a known sample rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

pub struct AudioDecoder;

impl AudioDecoder {
    /// Decodes an audio file into a mono buffer at `target_sample_rate`.
    pub fn open<P: AsRef<Path>>(path: P, target_sample_rate: u32) -> Result<SampleBuffer, AudioError> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref)
            .map_err(|err| AudioError::Decode(format!("open audio file {path_ref:?}: {err}")))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());
        let mut hint = Hint::new();
        if let Some(ext) = path_ref.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(ext);
        }
        Self::decode(mss, hint, target_sample_rate)
    }

    /// Decodes an in-memory byte stream, e.g. an upload body. The extension
    /// hint narrows container probing but is not required.
    pub fn from_bytes(
        bytes: &[u8],
        extension: Option<&str>,
        target_sample_rate: u32,
    ) -> Result<SampleBuffer, AudioError> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }
        Self::decode(mss, hint, target_sample_rate)
    }

    fn decode(
        mss: MediaSourceStream,
        hint: Hint,
        target_sample_rate: u32,
    ) -> Result<SampleBuffer, AudioError> {
        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|err| AudioError::Decode(err.to_string()))?;
        let mut format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| AudioError::Decode("no default track found".into()))?;
        let track_id = track.id;
        let source_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| AudioError::Decode("track does not declare a sample rate".into()))?;
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|err| AudioError::Decode(err.to_string()))?;

        let mut samples = Vec::new();
        loop {
            match format.next_packet() {
                Ok(packet) => {
                    if packet.track_id() != track_id {
                        continue;
                    }
                    let decoded = decoder
                        .decode(&packet)
                        .map_err(|err| AudioError::Decode(err.to_string()))?;
                    let spec = *decoded.spec();
                    let channels = spec.channels.count().max(1);
                    let mut pcm = SymSampleBuffer::<f32>::new(decoded.frames() as u64, spec);
                    pcm.copy_interleaved_ref(decoded);
                    for frame in pcm.samples().chunks_exact(channels) {
                        samples.push(frame.iter().sum::<f32>() / channels as f32);
                    }
                }
                Err(err) => {
                    use symphonia::core::errors::Error as SymphError;
                    match err {
                        SymphError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                            break;
                        }
                        SymphError::DecodeError(_) => {
                            // skip undecodable packet
                        }
                        other => return Err(AudioError::Decode(other.to_string())),
                    }
                }
            }
        }

        if samples.is_empty() {
            return Err(AudioError::Decode("decoded zero audio samples".into()));
        }
        debug!(
            source_rate,
            target_sample_rate,
            decoded = samples.len(),
            "decoded audio stream"
        );

        let samples = resample::resample(&samples, source_rate, target_sample_rate)?;
        Ok(SampleBuffer {
            samples,
            sample_rate: target_sample_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(sample_rate: u32, frequency: f32, seconds: f32) -> Vec<f32> {
        let count = (sample_rate as f32 * seconds) as usize;
        (0..count)
            .map(|i| (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect()
    }

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[f32]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for sample in samples {
            writer
                .write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                .unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn open_handles_missing_file() {
        let result = AudioDecoder::open("does-not-exist.wav", DEFAULT_SAMPLE_RATE);
        assert!(matches!(result, Err(AudioError::Decode(_))));
    }

    #[test]
    fn empty_byte_stream_is_a_decode_error() {
        let result = AudioDecoder::from_bytes(&[], Some("wav"), DEFAULT_SAMPLE_RATE);
        assert!(matches!(result, Err(AudioError::Decode(_))));
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let result = AudioDecoder::from_bytes(b"definitely not audio", None, DEFAULT_SAMPLE_RATE);
        assert!(matches!(result, Err(AudioError::Decode(_))));
    }

    #[test]
    fn decodes_mono_wav_at_native_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, DEFAULT_SAMPLE_RATE, 1, &sine(DEFAULT_SAMPLE_RATE, 440.0, 1.0));

        let buffer = AudioDecoder::open(&path, DEFAULT_SAMPLE_RATE).unwrap();
        assert_eq!(buffer.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(buffer.len(), DEFAULT_SAMPLE_RATE as usize);
        assert!(buffer.samples.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn downmixes_stereo_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let mono = sine(DEFAULT_SAMPLE_RATE, 330.0, 0.5);
        let interleaved: Vec<f32> = mono.iter().flat_map(|&s| [s, s]).collect();
        write_wav(&path, DEFAULT_SAMPLE_RATE, 2, &interleaved);

        let buffer = AudioDecoder::open(&path, DEFAULT_SAMPLE_RATE).unwrap();
        assert_eq!(buffer.len(), mono.len());
    }

    #[test]
    fn resamples_to_target_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hi-rate.wav");
        write_wav(&path, 44_100, 1, &sine(44_100, 440.0, 1.0));

        let buffer = AudioDecoder::open(&path, DEFAULT_SAMPLE_RATE).unwrap();
        assert_eq!(buffer.sample_rate, DEFAULT_SAMPLE_RATE);
        let expected = DEFAULT_SAMPLE_RATE as i64;
        assert!((buffer.len() as i64 - expected).abs() < 1_024);
    }

    #[test]
    fn byte_stream_round_trips_like_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, DEFAULT_SAMPLE_RATE, 1, &sine(DEFAULT_SAMPLE_RATE, 440.0, 0.25));

        let bytes = std::fs::read(&path).unwrap();
        let from_file = AudioDecoder::open(&path, DEFAULT_SAMPLE_RATE).unwrap();
        let from_bytes = AudioDecoder::from_bytes(&bytes, Some("wav"), DEFAULT_SAMPLE_RATE).unwrap();
        assert_eq!(from_file.len(), from_bytes.len());
    }
}

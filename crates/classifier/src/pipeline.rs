use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use emotune_audio::{
    trim_silence, AudioDecoder, MfccConfig, MfccExtractor, SampleBuffer, TrimConfig,
    DEFAULT_SAMPLE_RATE,
};
use emotune_domain::UNKNOWN_LABEL;

use crate::error::ClassifierError;
use crate::store::ModelStore;

/// Amplitude below which a sample counts as silence when screening degenerate
/// input (half a 16-bit quantization step).
const SILENCE_FLOOR: f32 = 1.5e-5;

/// Front-end parameters; must match the configuration the model was trained
/// with, not be chosen per call.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClassifierConfig {
    pub sample_rate: u32,
    pub n_coefficients: usize,
    /// Trim leading/trailing silence before extraction. Enable when the
    /// training set was built from trimmed audio so both paths see the same
    /// input shape.
    pub trim_silence: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            n_coefficients: 13,
            trim_silence: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub scores: Vec<f32>,
}

/// Decode → (optional trim) → mean-MFCC → predict → label lookup.
/// Stateless per call; the shared store is read-only.
pub struct EmotionClassifier {
    store: Arc<ModelStore>,
    extractor: MfccExtractor,
    config: ClassifierConfig,
}

impl EmotionClassifier {
    pub fn new(store: Arc<ModelStore>, config: ClassifierConfig) -> Self {
        let extractor = MfccExtractor::new(MfccConfig {
            sample_rate: config.sample_rate,
            n_coefficients: config.n_coefficients,
            ..MfccConfig::default()
        });
        Self {
            store,
            extractor,
            config,
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    #[instrument(skip(self))]
    pub fn classify(&self, path: &Path) -> Result<Classification, ClassifierError> {
        let buffer = AudioDecoder::open(path, self.config.sample_rate)?;
        self.classify_buffer(buffer)
    }

    pub fn classify_bytes(
        &self,
        bytes: &[u8],
        extension: Option<&str>,
    ) -> Result<Classification, ClassifierError> {
        let buffer = AudioDecoder::from_bytes(bytes, extension, self.config.sample_rate)?;
        self.classify_buffer(buffer)
    }

    fn classify_buffer(&self, buffer: SampleBuffer) -> Result<Classification, ClassifierError> {
        let buffer = if self.config.trim_silence {
            trim_silence(&buffer, &TrimConfig::default())
        } else {
            buffer
        };
        if buffer.samples.iter().all(|s| s.abs() <= SILENCE_FLOOR) {
            return Err(ClassifierError::Audio(emotune_audio::AudioError::EmptyAudio));
        }

        let features = self.extractor.extract(&buffer)?;
        let scores = self.store.predict(&features)?;
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(ClassifierError::Inference(
                "non-finite score in distribution".into(),
            ));
        }
        let (index, _) = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .ok_or_else(|| ClassifierError::Inference("empty distribution".into()))?;
        let label = match self.store.resolve(index) {
            Some(label) => label.to_string(),
            None => {
                warn!(index, "predicted class missing from metadata");
                UNKNOWN_LABEL.to_string()
            }
        };
        debug!(%label, "classification complete");
        Ok(Classification {
            label,
            scores: scores.to_vec(),
        })
    }
}

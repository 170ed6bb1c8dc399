use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::Array1;
use tracing::{info, warn};

use emotune_domain::{ClassMetadata, EmotionLabel};

use crate::error::ClassifierError;
use crate::model::{EmotionModel, OnnxEmotionModel};

/// Owns the trained model and its class metadata for the process lifetime.
/// Construct once (eagerly, before serving) and share behind an `Arc`; it is
/// read-only after load.
pub struct ModelStore {
    model: Box<dyn EmotionModel>,
    metadata: ClassMetadata,
}

impl ModelStore {
    /// Loads the classifier and its sibling metadata as a pair. Either both
    /// artifacts load or the call fails; no partial state escapes.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        model_path: P,
        metadata_path: Q,
    ) -> Result<Self, ClassifierError> {
        let metadata_path = metadata_path.as_ref();
        let file = File::open(metadata_path).map_err(|err| {
            ClassifierError::ModelLoad(format!("open metadata {metadata_path:?}: {err}"))
        })?;
        let metadata = ClassMetadata::from_reader(BufReader::new(file))
            .map_err(|err| ClassifierError::ModelLoad(err.to_string()))?;
        for (index, label) in metadata.iter() {
            if label.parse::<EmotionLabel>().is_err() {
                warn!(index, label, "metadata label outside the emotion vocabulary");
            }
        }
        let model = OnnxEmotionModel::load(model_path)?;
        info!(classes = metadata.len(), "model artifacts loaded");
        Ok(Self {
            model: Box::new(model),
            metadata,
        })
    }

    /// Assemble a store from preloaded parts; the seam tests use to swap in
    /// a model double.
    pub fn from_parts(model: Box<dyn EmotionModel>, metadata: ClassMetadata) -> Self {
        Self { model, metadata }
    }

    pub fn predict(&self, features: &Array1<f32>) -> Result<Array1<f32>, ClassifierError> {
        self.model.predict(features)
    }

    pub fn resolve(&self, index: usize) -> Option<&str> {
        self.metadata.label(index)
    }

    pub fn metadata(&self) -> &ClassMetadata {
        &self.metadata
    }
}

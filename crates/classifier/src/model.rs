use std::path::Path;

use ndarray::{Array1, Axis, CowArray};
use ort::{Environment, GraphOptimizationLevel, Session, SessionBuilder};
use tracing::info;

use crate::error::ClassifierError;

/// Inference seam: maps one feature vector to one row of class scores.
/// Implementations must be shareable across concurrent classification calls.
pub trait EmotionModel: Send + Sync {
    fn predict(&self, features: &Array1<f32>) -> Result<Array1<f32>, ClassifierError>;
}

/// Trained classifier exported to ONNX, served through onnxruntime.
pub struct OnnxEmotionModel {
    session: Session,
}

impl OnnxEmotionModel {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ClassifierError::ModelLoad(format!(
                "model file not found: {path:?}"
            )));
        }
        info!(path = %path.display(), "loading onnx model");
        let environment = Environment::builder()
            .with_name("emotune")
            .build()
            .map_err(|err| ClassifierError::ModelLoad(err.to_string()))?
            .into_arc();
        let session = SessionBuilder::new(&environment)
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|builder| builder.with_model_from_file(path))
            .map_err(|err| ClassifierError::ModelLoad(err.to_string()))?;
        Ok(Self { session })
    }
}

impl EmotionModel for OnnxEmotionModel {
    fn predict(&self, features: &Array1<f32>) -> Result<Array1<f32>, ClassifierError> {
        // batch dimension of one, as at training time
        let batch = CowArray::from(features.view().insert_axis(Axis(0)).into_dyn());
        let input = ort::Value::from_array(self.session.allocator(), &batch)
            .map_err(|err| ClassifierError::Inference(err.to_string()))?;
        let outputs = self
            .session
            .run(vec![input])
            .map_err(|err| ClassifierError::Inference(err.to_string()))?;
        let tensor = outputs
            .first()
            .ok_or_else(|| ClassifierError::Inference("model produced no outputs".into()))?
            .try_extract::<f32>()
            .map_err(|err| ClassifierError::Inference(err.to_string()))?;
        let view = tensor.view();
        let scores: Vec<f32> = view.iter().copied().collect();
        if scores.is_empty() {
            return Err(ClassifierError::Inference(
                "model produced an empty distribution".into(),
            ));
        }
        Ok(Array1::from(scores))
    }
}

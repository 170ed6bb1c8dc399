use emotune_audio::AudioError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error("failed to load model artifacts: {0}")]
    ModelLoad(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

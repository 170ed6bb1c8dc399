use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to decode audio: {0}")]
    Decode(String),
    #[error("audio contains no samples")]
    EmptyAudio,
    #[error("feature extraction failed: {0}")]
    Feature(String),
}

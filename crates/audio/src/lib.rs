pub mod error;
pub mod io;
pub mod mfcc;
pub mod resample;
pub mod trim;

pub use error::AudioError;
pub use io::{AudioDecoder, SampleBuffer, DEFAULT_SAMPLE_RATE};
pub use mfcc::{MfccConfig, MfccExtractor};
pub use trim::{trim_silence, TrimConfig};

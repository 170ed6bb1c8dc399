use std::path::{Path, PathBuf};

use ndarray::Array1;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use emotune_audio::{AudioDecoder, MfccConfig, MfccExtractor, DEFAULT_SAMPLE_RATE};

/// Extensions accepted at discovery time; decode success is still the final
/// arbiter per file.
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "flac"];

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("dataset root not found: {0}")]
    RootNotFound(PathBuf),
    #[error("dataset root is not a directory: {0}")]
    NotADirectory(PathBuf),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatchConfig {
    pub sample_rate: u32,
    pub n_coefficients: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            n_coefficients: 13,
        }
    }
}

/// Drives the loader and extractor over a directory tree to build a training
/// feature table. Read-only over its input; re-running over an unchanged tree
/// yields the same sequence.
pub struct BatchPipeline {
    extractor: MfccExtractor,
    sample_rate: u32,
}

impl BatchPipeline {
    pub fn new(config: BatchConfig) -> Self {
        let extractor = MfccExtractor::new(MfccConfig {
            sample_rate: config.sample_rate,
            n_coefficients: config.n_coefficients,
            ..MfccConfig::default()
        });
        Self {
            extractor,
            sample_rate: config.sample_rate,
        }
    }

    /// Lazily yields `(path, feature_vector)` for every audio file under
    /// `root`, in file-name order. Files that fail to decode or extract are
    /// logged and skipped; only a bad root fails the run.
    pub fn run(&self, root: &Path) -> Result<FeatureIter<'_>, BatchError> {
        if !root.exists() {
            return Err(BatchError::RootNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(BatchError::NotADirectory(root.to_path_buf()));
        }
        let walker = WalkDir::new(root).sort_by_file_name().into_iter();
        Ok(FeatureIter {
            walker,
            pipeline: self,
        })
    }

    fn extract_file(&self, path: &Path) -> Option<Array1<f32>> {
        let buffer = match AudioDecoder::open(path, self.sample_rate) {
            Ok(buffer) => buffer,
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping undecodable file");
                return None;
            }
        };
        match self.extractor.extract(&buffer) {
            Ok(features) => Some(features),
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping file without features");
                None
            }
        }
    }
}

pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

pub struct FeatureIter<'a> {
    walker: walkdir::IntoIter,
    pipeline: &'a BatchPipeline,
}

impl Iterator for FeatureIter<'_> {
    type Item = (PathBuf, Array1<f32>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(%err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if !is_audio_file(&path) {
                continue;
            }
            debug!(path = %path.display(), "extracting features");
            if let Some(features) = self.pipeline.extract_file(&path) {
                return Some((path, features));
            }
        }
    }
}

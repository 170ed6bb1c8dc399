use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};
use walkdir::WalkDir;

use emotune_audio::{trim_silence, AudioDecoder, SampleBuffer, TrimConfig};

use crate::batch::is_audio_file;

/// Trims every audio file under `input_root` and writes the result as 16-bit
/// mono WAV to the mirrored path under `output_root`. Recordings that trim to
/// silence are dropped. Returns the number of files written.
pub fn preprocess_tree(
    input_root: &Path,
    output_root: &Path,
    sample_rate: u32,
    trim: &TrimConfig,
) -> Result<usize> {
    if !input_root.is_dir() {
        anyhow::bail!("input root is not a directory: {input_root:?}");
    }
    let mut written = 0usize;
    for entry in WalkDir::new(input_root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_audio_file(entry.path()) {
            continue;
        }
        let path = entry.path();
        let buffer = match AudioDecoder::open(path, sample_rate) {
            Ok(buffer) => buffer,
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping undecodable file");
                continue;
            }
        };
        let trimmed = trim_silence(&buffer, trim);
        if trimmed.is_empty() {
            warn!(path = %path.display(), "skipping fully silent recording");
            continue;
        }

        let relative = path.strip_prefix(input_root).unwrap_or(path);
        let target = output_root.join(relative).with_extension("wav");
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {parent:?}"))?;
        }
        write_wav(&target, &trimmed).with_context(|| format!("write {target:?}"))?;
        info!(path = %target.display(), samples = trimmed.len(), "wrote trimmed audio");
        written += 1;
    }
    Ok(written)
}

fn write_wav(path: &Path, buffer: &SampleBuffer) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for sample in &buffer.samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dataset_pipeline::batch::{BatchConfig, BatchPipeline};
use dataset_pipeline::csv::write_features_csv;
use dataset_pipeline::preprocess::preprocess_tree;
use emotune_audio::TrimConfig;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Prepare emotion-dataset features from audio recordings"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract mean-MFCC feature vectors for every audio file under a root
    Features {
        /// Directory tree of (preprocessed) audio recordings
        root: PathBuf,
        /// Output CSV path
        #[arg(short, long, default_value = "features.csv")]
        output: PathBuf,
        #[arg(long, default_value_t = 22_050)]
        sample_rate: u32,
        #[arg(long, default_value_t = 13)]
        n_coefficients: usize,
    },
    /// Trim silence from raw recordings into a parallel directory tree
    Preprocess {
        /// Directory tree of raw recordings
        input: PathBuf,
        /// Root of the mirrored output tree
        output: PathBuf,
        #[arg(long, default_value_t = 22_050)]
        sample_rate: u32,
        #[arg(long, default_value_t = 60.0)]
        top_db: f32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match Cli::parse().command {
        Command::Features {
            root,
            output,
            sample_rate,
            n_coefficients,
        } => {
            let pipeline = BatchPipeline::new(BatchConfig {
                sample_rate,
                n_coefficients,
            });
            let records = pipeline.run(&root)?;
            let file = File::create(&output).with_context(|| format!("create {output:?}"))?;
            let rows = write_features_csv(BufWriter::new(file), n_coefficients, records)?;
            info!(rows, output = %output.display(), "feature table written");
            println!("Wrote {rows} feature row(s) to {}", output.display());
        }
        Command::Preprocess {
            input,
            output,
            sample_rate,
            top_db,
        } => {
            let trim = TrimConfig {
                top_db,
                ..TrimConfig::default()
            };
            let written = preprocess_tree(&input, &output, sample_rate, &trim)?;
            println!("Processed {written} file(s) into {}", output.display());
        }
    }
    Ok(())
}

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use emotune_classifier::{ClassifierConfig, EmotionClassifier, ModelStore};

#[derive(Parser, Debug)]
#[command(author, version, about = "Predict the emotion of a speech recording", long_about = None)]
struct Cli {
    /// Path to the audio file to classify
    input: PathBuf,
    /// Path to the trained ONNX classifier
    #[arg(long, default_value = "models/model.onnx")]
    model: PathBuf,
    /// Path to the sibling class metadata JSON
    #[arg(long, default_value = "models/model_metadata.json")]
    metadata: PathBuf,
    /// Trim leading/trailing silence before extracting features
    #[arg(long)]
    trim: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let store = Arc::new(ModelStore::load(&cli.model, &cli.metadata)?);
    let config = ClassifierConfig {
        trim_silence: cli.trim,
        ..ClassifierConfig::default()
    };
    let classifier = EmotionClassifier::new(store, config);
    let classification = classifier.classify(&cli.input)?;
    println!("{}", serde_json::to_string_pretty(&classification)?);
    Ok(())
}

use clap::{Parser, Subcommand};
use image::ImageReader;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use catdog::classifier::load_classifier;
use catdog::config::{ModelArgs, ServeArgs};

#[derive(Parser)]
#[command(name = "catdog")]
#[command(version, about = "Serve a pretrained cat vs dog image classifier")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),

    /// Classify image files and print the predictions
    Classify {
        #[command(flatten)]
        model: ModelArgs,

        /// Images to classify
        #[arg(value_name = "IMAGE", required = true)]
        images: Vec<PathBuf>,

        /// Print per-class confidences
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Cli::parse();

    match args.command {
        Command::Serve(serve) => {
            catdog::server::serve(serve.server_config(), serve.model.classifier_config()).await
        }
        Command::Classify {
            model,
            images,
            verbose,
        } => classify_files(&model, &images, verbose),
    }
}

fn classify_files(model: &ModelArgs, images: &[PathBuf], verbose: bool) -> anyhow::Result<()> {
    let classifier = load_classifier(&model.classifier_config())?;

    for path in images {
        let img = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| anyhow::anyhow!("Failed to decode {}: {}", path.display(), e))?;

        let prediction = classifier.classify_image(&img)?;
        println!(
            "{}: {} ({:.2}%)",
            path.display(),
            prediction.class_name,
            prediction.confidence
        );

        if verbose {
            for score in &prediction.scores {
                println!("  {}: {:.2}%", score.class, score.confidence);
            }
        }
    }

    Ok(())
}

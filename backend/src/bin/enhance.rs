//! Forces super-resolution on one image and writes the result next to it.

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use cropguard_backend::config::AppConfig;
use cropguard_backend::inference::{self, Enhancer, quality};

#[derive(Parser, Debug)]
#[command(name = "cropguard-enhance", about = "Run the super-resolution model on a single image")]
struct Cli {
    /// Image to enhance
    input: PathBuf,

    /// TorchScript weights; defaults to the configured enhancer path
    #[arg(long)]
    model: Option<PathBuf>,

    /// Upscale factor the weights were trained for
    #[arg(long)]
    scale: Option<u32>,
}

fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    if !cli.input.is_file() {
        return Err(format!("Input file not found at path: {}", cli.input.display()).into());
    }

    let config = AppConfig::load()?;
    let model_path = cli.model.clone().unwrap_or(config.models.enhancer_path);
    let scale = cli.scale.unwrap_or(config.models.enhancer_scale);

    println!("Loading x{} enhancer from {}", scale, model_path.display());
    let started = Instant::now();
    let model = inference::load_upscale_model(&model_path, scale)?;
    println!("Model loaded in {:.2} seconds.", started.elapsed().as_secs_f64());

    let original = fs::read(&cli.input)?;
    println!(
        "Processing input: {} ({:.2} KB)",
        cli.input.display(),
        original.len() as f64 / 1024.0
    );
    if let Some(variance) = quality::blur_variance(&original) {
        println!("Laplacian variance: {:.2}", variance);
    }

    let enhancer = Enhancer::new(model, config.models.blur_variance_threshold);
    let started = Instant::now();
    let outcome = enhancer.enhance(&original, true);
    let elapsed = started.elapsed();

    let suffix = if outcome.is_enhanced() {
        "ENHANCED"
    } else {
        println!("WARNING: enhancement failed, writing the original bytes instead.");
        "SKIPPED"
    };
    let stem = cli
        .input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let output = cli.input.with_file_name(format!("{}_{}.png", stem, suffix));
    fs::write(&output, outcome.bytes())?;

    println!("Enhancement took {:.2} seconds.", elapsed.as_secs_f64());
    println!(
        "Saved {} ({:.2} KB)",
        output.display(),
        outcome.bytes().len() as f64 / 1024.0
    );
    Ok(())
}

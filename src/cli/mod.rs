// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes to Layer 2.
//
//   hred train  <data> <vocab> [flags]
//   hred sample <data> <vocab> [flags]
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, SampleArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "hred",
    version = "0.1.0",
    about = "Train a hierarchical recurrent encoder-decoder on dialogue, then sample from it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)  => run_train(args),
            Commands::Sample(args) => run_sample(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}'", args.data);
    let summary = TrainUseCase::new(args.into()).execute()?;

    match summary.last_avg_loss {
        Some(loss) => println!("Training stopped after {} iterations, loss {:.4}.", summary.iterations, loss),
        None       => println!("Training stopped after {} iterations.", summary.iterations),
    }
    Ok(())
}

fn run_sample(args: SampleArgs) -> Result<()> {
    use crate::application::sample_use_case::SampleUseCase;

    let use_case: SampleUseCase = args.into();
    let samples = use_case.execute()?;
    tracing::info!("Decoded {} conversations", samples.len());
    Ok(())
}

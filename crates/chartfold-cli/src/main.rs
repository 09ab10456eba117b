//! Chartfold CLI - fold per-service Kubernetes manifests into shared Helm templates

use clap::{Parser, Subcommand};
use miette::Result;
use std::path::PathBuf;

mod commands;
mod display;
mod exit_codes;

#[derive(Parser)]
#[command(name = "chartfold")]
#[command(author = "Chartfold Contributors")]
#[command(version)]
#[command(about = "Fold per-service Kubernetes manifests into shared Helm templates", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Refactor a chart directory into shared templates plus values
    Refactor {
        /// Input directory containing per-service manifests
        input: PathBuf,

        /// Output directory for the folded chart
        output: PathBuf,

        /// Overwrite an existing output directory
        #[arg(long)]
        force: bool,

        /// Show what would be written without writing files
        #[arg(long)]
        dry_run: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Inspect a chart directory without writing anything
    Inspect {
        /// Input directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Show the per-kind feature breakdown
        #[arg(long)]
        features: bool,
    },
}

fn main() -> Result<()> {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();

    if cli.debug {
        // SAFETY: We're the only thread at this point (start of main)
        unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    }

    match cli.command {
        Commands::Refactor {
            input,
            output,
            force,
            dry_run,
            verbose,
        } => commands::refactor::run(&input, &output, force, dry_run, verbose),

        Commands::Inspect { path, features } => commands::inspect::run(&path, features),
    }
}

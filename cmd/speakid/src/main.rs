//! speakid - enroll speakers and verify voice embeddings from the command line.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod input;

use commands::{ConfigCommand, EnrollCommand, ForgetCommand, ListCommand, VerifyCommand};

/// speakid - open-set speaker verification over voice embeddings.
///
/// Embeddings are produced by an external extractor and passed in as files:
/// a JSON array of numbers, or raw little-endian f32 bytes.
///
/// Configuration is stored in ~/.speakid/config.yaml. Enrollments live in a
/// single redb file (default ~/.speakid/data/enrollment.redb).
#[derive(Parser)]
#[command(name = "speakid")]
#[command(about = "Speaker verification CLI tool")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.speakid/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Enrollment database (overrides the config file)
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage CLI configuration
    Config(ConfigCommand),
    /// Add embeddings to a speaker's enrollment
    Enroll(EnrollCommand),
    /// Match an embedding against the enrolled speakers
    Verify(VerifyCommand),
    /// List enrolled speakers and their thresholds
    List(ListCommand),
    /// Remove a speaker's enrollment
    Forget(ForgetCommand),
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Config(cmd) => cmd.run(&cli).map(|_| ExitCode::SUCCESS),
        Commands::Enroll(cmd) => cmd.run(&cli).map(|_| ExitCode::SUCCESS),
        Commands::Verify(cmd) => cmd.run(&cli),
        Commands::List(cmd) => cmd.run(&cli).map(|_| ExitCode::SUCCESS),
        Commands::Forget(cmd) => cmd.run(&cli).map(|_| ExitCode::SUCCESS),
    }
}

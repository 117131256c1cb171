//! Verification command.

use std::process::ExitCode;

use clap::Args;

use super::{get_config, open_verifier_for_read, output_result, print_warning, read_input};
use crate::Cli;
use crate::input::EmbeddingFormat;

/// Match an embedding against the enrolled speakers.
///
/// Prints the verdict and exits with status 1 when the speaker is not
/// recognized.
#[derive(Args)]
pub struct VerifyCommand {
    /// Embedding file
    file: String,

    /// Embedding file format
    #[arg(long, value_enum, default_value_t = EmbeddingFormat::Auto)]
    format: EmbeddingFormat,
}

impl VerifyCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<ExitCode> {
        let cfg = get_config(cli)?;
        let data = read_input(&self.file)?;
        let verifier = open_verifier_for_read(cli, &cfg, self.format);

        let verdict = verifier.verify(&data);
        output_result(&verdict, cli.output.as_deref(), cli.json)?;

        if verdict.is_accepted() {
            Ok(ExitCode::SUCCESS)
        } else {
            print_warning("not recognized, please try again");
            Ok(ExitCode::from(1))
        }
    }
}

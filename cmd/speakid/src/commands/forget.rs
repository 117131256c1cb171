//! Removal command.

use clap::Args;

use super::{get_config, open_verifier_for_write, parse_speaker, print_success, print_warning};
use crate::Cli;
use crate::input::EmbeddingFormat;

/// Remove a speaker's enrollment.
#[derive(Args)]
pub struct ForgetCommand {
    /// Speaker name
    name: String,
}

impl ForgetCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = get_config(cli)?;
        let speaker = parse_speaker(&self.name)?;
        let verifier = open_verifier_for_write(cli, &cfg, EmbeddingFormat::Auto)?;

        if verifier.forget(&speaker)? {
            print_success(&format!("Speaker \"{}\" removed", speaker));
        } else {
            print_warning(&format!("speaker \"{}\" is not enrolled", speaker));
        }
        Ok(())
    }
}

//! Enrollment command.

use clap::Args;
use serde::Serialize;
use speakid_voiceprint::{Embedding, VoiceprintModel};

use super::{
    get_config, open_verifier_for_write, output_result, parse_speaker, print_success, read_input,
};
use crate::Cli;
use crate::input::{EmbeddingFileModel, EmbeddingFormat};

/// Add embeddings to a speaker's enrollment.
///
/// Each file is one embedding. Files are appended in the order given;
/// with --replace the speaker's existing embeddings are discarded first.
#[derive(Args)]
pub struct EnrollCommand {
    /// Speaker name
    name: String,

    /// Embedding files
    #[arg(required = true)]
    files: Vec<String>,

    /// Replace the existing enrollment instead of appending
    #[arg(long)]
    replace: bool,

    /// Embedding file format
    #[arg(long, value_enum, default_value_t = EmbeddingFormat::Auto)]
    format: EmbeddingFormat,
}

#[derive(Serialize)]
struct EnrollOutput {
    speaker: String,
    embeddings: usize,
}

impl EnrollCommand {
    /// Reads and extracts every file, failing on the first one that does not
    /// yield a usable embedding.
    fn decode_files(&self) -> anyhow::Result<Vec<Vec<f32>>> {
        let model = EmbeddingFileModel::new(self.format);
        let mut raws = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let data = read_input(file)?;
            let raw = model
                .extract(&data)
                .map_err(|e| anyhow::anyhow!("{}: {}", file, e))?;
            Embedding::normalize(&raw).map_err(|e| anyhow::anyhow!("{}: {}", file, e))?;
            raws.push(raw);
        }
        Ok(raws)
    }

    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = get_config(cli)?;
        let speaker = parse_speaker(&self.name)?;
        let verifier = open_verifier_for_write(cli, &cfg, self.format)?;

        // Decode everything up front so a bad file leaves the enrollment
        // untouched.
        let raws = self.decode_files()?;
        let count = if self.replace {
            verifier.reenroll(&speaker, &raws)?;
            raws.len()
        } else {
            let mut count = 0;
            for raw in &raws {
                count = verifier.enroll_embedding(&speaker, raw)?;
            }
            count
        };

        print_success(&format!(
            "Speaker \"{}\" enrolled ({} embedding(s))",
            speaker, count
        ));
        output_result(
            &EnrollOutput {
                speaker: speaker.to_string(),
                embeddings: count,
            },
            cli.output.as_deref(),
            cli.json,
        )
    }
}

//! Listing command.

use clap::Args;
use serde::Serialize;
use speakid_voiceprint::Snapshot;

use super::{get_config, open_verifier_for_read, output_result, print_warning};
use crate::Cli;
use crate::input::EmbeddingFormat;

/// List enrolled speakers with their calibrated thresholds.
#[derive(Args)]
pub struct ListCommand {}

#[derive(Serialize)]
struct SpeakerRow {
    speaker: String,
    embeddings: usize,
    threshold: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    cached_threshold: Option<f32>,
}

/// One row per enrolled speaker. Every loaded speaker has a calibrated
/// threshold in the same snapshot.
fn speaker_rows(snap: &Snapshot) -> Vec<SpeakerRow> {
    snap.enrollments
        .iter()
        .filter_map(|record| {
            let threshold = snap.thresholds.get(record.speaker.as_str())?;
            Some(SpeakerRow {
                speaker: record.speaker.to_string(),
                embeddings: record.embeddings.len(),
                threshold,
                cached_threshold: record.cached_threshold,
            })
        })
        .collect()
}

impl ListCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = get_config(cli)?;
        let verifier = open_verifier_for_read(cli, &cfg, EmbeddingFormat::Auto);
        let snap = verifier.snapshot();

        if let Some(reason) = &snap.degraded {
            print_warning(&format!("enrollment store unavailable: {}", reason));
        }

        let rows = speaker_rows(&snap);
        output_result(&rows, cli.output.as_deref(), cli.json)
    }
}

//! Utility functions for CLI commands.

use std::path::Path;
use std::sync::Arc;

use speakid_voiceprint::{
    Calibrator, Embedding, EnrollmentStore, Enrollments, RedbStore, SpeakerId, Verifier,
    VoiceprintError,
};

use crate::Cli;
use crate::config::{Config, load_config};
use crate::input::{EmbeddingFileModel, EmbeddingFormat};

/// Gets the global configuration.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    load_config(cli.config.as_deref())
}

/// Stand-in for a store file that does not exist or cannot be opened.
/// Every read fails, so the verifier sees an empty, degraded set.
struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    fn err(&self) -> VoiceprintError {
        VoiceprintError::StorageUnavailable(self.reason.clone())
    }
}

impl EnrollmentStore for UnavailableStore {
    fn load(&self) -> Result<Enrollments, VoiceprintError> {
        Err(self.err())
    }

    fn append(&self, _: &SpeakerId, _: &Embedding) -> Result<usize, VoiceprintError> {
        Err(self.err())
    }

    fn replace(&self, _: &SpeakerId, _: &[Embedding]) -> Result<(), VoiceprintError> {
        Err(self.err())
    }

    fn remove(&self, _: &SpeakerId) -> Result<bool, VoiceprintError> {
        Err(self.err())
    }
}

fn build_verifier(
    cfg: &Config,
    store: Box<dyn EnrollmentStore>,
    format: EmbeddingFormat,
) -> Verifier {
    Verifier::with_calibrator(
        Arc::new(EmbeddingFileModel::new(format)),
        store,
        Calibrator::with_config(cfg.calibration),
    )
}

/// Opens the enrollment database for writing, creating it if needed.
pub fn open_verifier_for_write(
    cli: &Cli,
    cfg: &Config,
    format: EmbeddingFormat,
) -> anyhow::Result<Verifier> {
    let path = cfg.store_path(cli.store.as_deref());
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = RedbStore::open(&path)
        .map_err(|e| anyhow::anyhow!("open {}: {}", path.display(), e))?
        .with_calibrator(Calibrator::with_config(cfg.calibration));
    Ok(build_verifier(cfg, Box::new(store), format))
}

/// Opens the enrollment database for reading. A database that does not
/// exist yet is not an error: everyone is Unknown until someone enrolls.
pub fn open_verifier_for_read(cli: &Cli, cfg: &Config, format: EmbeddingFormat) -> Verifier {
    let path = cfg.store_path(cli.store.as_deref());
    let store: Box<dyn EnrollmentStore> = match RedbStore::open_existing(&path) {
        Ok(store) => Box::new(store),
        Err(e) => Box::new(UnavailableStore {
            reason: format!("{}: {}", path.display(), e),
        }),
    };
    build_verifier(cfg, store, format)
}

/// Parses a speaker name argument.
pub fn parse_speaker(name: &str) -> anyhow::Result<SpeakerId> {
    Ok(SpeakerId::new(name)?)
}

/// Reads an embedding file.
pub fn read_input(path: &str) -> anyhow::Result<Vec<u8>> {
    std::fs::read(Path::new(path)).map_err(|e| anyhow::anyhow!("read {}: {}", path, e))
}

/// Outputs result as JSON or YAML.
pub fn output_result<T: serde::Serialize>(
    result: &T,
    output_path: Option<&str>,
    as_json: bool,
) -> anyhow::Result<()> {
    let output = if as_json {
        serde_json::to_string_pretty(result)? + "\n"
    } else {
        serde_yaml::to_string(result)?
    };

    match output_path {
        Some(path) => std::fs::write(path, output)?,
        None => print!("{}", output),
    }

    Ok(())
}

/// Prints success message.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}

/// Prints warning message.
pub fn print_warning(msg: &str) {
    eprintln!("\x1b[33m⚠\x1b[0m {}", msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["speakid"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn missing_store_reads_as_degraded_empty() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("config.yaml");
        let store = dir.path().join("none.redb");
        let cli = cli(&[
            "--config",
            config.to_str().unwrap(),
            "--store",
            store.to_str().unwrap(),
            "list",
        ]);
        let cfg = get_config(&cli).unwrap();
        let verifier = open_verifier_for_read(&cli, &cfg, EmbeddingFormat::Auto);
        let snap = verifier.snapshot();
        assert!(snap.enrollments.is_empty());
        assert!(snap.degraded.is_some());
        assert!(!store.exists());
    }

    #[test]
    fn write_then_read_same_store() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("config.yaml");
        let store = dir.path().join("data").join("enroll.redb");
        let cli = cli(&[
            "--config",
            config.to_str().unwrap(),
            "--store",
            store.to_str().unwrap(),
            "list",
        ]);
        let cfg = get_config(&cli).unwrap();
        {
            let writer = open_verifier_for_write(&cli, &cfg, EmbeddingFormat::Json).unwrap();
            let alice = parse_speaker("alice").unwrap();
            assert_eq!(writer.enroll(&alice, b"[1.0, 0.0]").unwrap(), 1);
        }
        let reader = open_verifier_for_read(&cli, &cfg, EmbeddingFormat::Json);
        let verdict = reader.verify(b"[1.0, 0.0]");
        assert_eq!(verdict.speaker, "alice");
        assert!(verdict.is_accepted());
    }

    #[test]
    fn blank_speaker_rejected() {
        assert!(parse_speaker("   ").is_err());
    }
}

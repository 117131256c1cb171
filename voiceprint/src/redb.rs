//! Redb-backed persistent enrollment store.
//!
//! Two tables keyed by speaker name:
//!
//! - `enrollment_embedding`: blob of concatenated embeddings (see [`crate::codec`])
//! - `enrollment_threshold`: advisory threshold cached at the last write

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition, TableError};
use tracing::{info, warn};

use crate::VoiceprintError;
use crate::calibrate::Calibrator;
use crate::codec::{decode_embeddings, encode_embeddings};
use crate::embedding::Embedding;
use crate::speaker::{EnrollmentRecord, Enrollments, SpeakerId};
use crate::store::{EnrollmentStore, require_embeddings};

const EMBEDDINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("enrollment_embedding");
const THRESHOLDS: TableDefinition<&str, f64> = TableDefinition::new("enrollment_threshold");

fn storage<E: std::fmt::Display>(e: E) -> VoiceprintError {
    VoiceprintError::Storage(e.to_string())
}

fn unavailable<E: std::fmt::Display>(e: E) -> VoiceprintError {
    VoiceprintError::StorageUnavailable(e.to_string())
}

/// A persistent [`EnrollmentStore`] backed by redb.
///
/// Redb runs one write transaction at a time, and every mutation here is a
/// single read-modify-write transaction, so concurrent appends for the same
/// speaker are applied one after another. A returned write has been
/// committed and is visible to the next `load`.
pub struct RedbStore {
    db: Database,
    calibrator: Calibrator,
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VoiceprintError> {
        let db = Database::create(path.as_ref()).map_err(unavailable)?;

        // Create the tables if they don't exist.
        let tx = db.begin_write().map_err(storage)?;
        {
            let _ = tx.open_table(EMBEDDINGS).map_err(storage)?;
            let _ = tx.open_table(THRESHOLDS).map_err(storage)?;
        }
        tx.commit().map_err(storage)?;

        Ok(Self {
            db,
            calibrator: Calibrator::new(),
        })
    }

    /// Open a store that must already exist. A missing or unreadable file
    /// fails with [`VoiceprintError::StorageUnavailable`].
    pub fn open_existing<P: AsRef<Path>>(path: P) -> Result<Self, VoiceprintError> {
        let db = Database::open(path.as_ref()).map_err(unavailable)?;
        Ok(Self {
            db,
            calibrator: Calibrator::new(),
        })
    }

    /// Uses `calibrator` for the advisory threshold written with each record.
    pub fn with_calibrator(mut self, calibrator: Calibrator) -> Self {
        self.calibrator = calibrator;
        self
    }

    fn write_record(
        &self,
        speaker: &SpeakerId,
        embeddings: &[Embedding],
        tx: &redb::WriteTransaction,
    ) -> Result<(), VoiceprintError> {
        let blob = encode_embeddings(embeddings);
        let threshold = self.calibrator.calibrate_speaker(embeddings);
        let mut emb_table = tx.open_table(EMBEDDINGS).map_err(storage)?;
        emb_table
            .insert(speaker.as_str(), blob.as_slice())
            .map_err(storage)?;
        let mut thr_table = tx.open_table(THRESHOLDS).map_err(storage)?;
        thr_table
            .insert(speaker.as_str(), threshold as f64)
            .map_err(storage)?;
        Ok(())
    }
}

impl EnrollmentStore for RedbStore {
    fn load(&self) -> Result<Enrollments, VoiceprintError> {
        let tx = self.db.begin_read().map_err(unavailable)?;
        let emb_table = match tx.open_table(EMBEDDINGS) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Enrollments::new()),
            Err(e) => return Err(unavailable(e)),
        };
        let thr_table = match tx.open_table(THRESHOLDS) {
            Ok(t) => Some(t),
            Err(TableError::TableDoesNotExist(_)) => None,
            Err(e) => return Err(unavailable(e)),
        };

        let mut out = Enrollments::new();
        for item in emb_table.iter().map_err(unavailable)? {
            let (key, value) = item.map_err(unavailable)?;
            let name = key.value();
            let speaker = match SpeakerId::new(name) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "voiceprint: skipping enrollment record");
                    continue;
                }
            };
            let embeddings = match decode_embeddings(value.value()) {
                Ok(v) => v,
                Err(e) => {
                    warn!(speaker = %speaker, error = %e, "voiceprint: skipping enrollment record");
                    continue;
                }
            };
            let canonical = speaker.as_str() == name;
            if !canonical {
                warn!(
                    key = ?name,
                    speaker = %speaker,
                    "voiceprint: enrollment key is not trimmed"
                );
            }
            if out.get(speaker.as_str()).is_some() {
                // Keys that trim to the same name keep the exactly matching one.
                if !canonical {
                    warn!(
                        key = ?name,
                        speaker = %speaker,
                        "voiceprint: duplicate enrollment key skipped"
                    );
                    continue;
                }
                warn!(
                    speaker = %speaker,
                    "voiceprint: duplicate enrollment key replaced by exact match"
                );
            }
            let cached_threshold = match &thr_table {
                Some(t) => t
                    .get(name)
                    .map_err(unavailable)?
                    .map(|v| v.value() as f32),
                None => None,
            };
            out.insert(EnrollmentRecord {
                speaker,
                embeddings,
                cached_threshold,
            });
        }
        Ok(out)
    }

    fn append(&self, speaker: &SpeakerId, embedding: &Embedding) -> Result<usize, VoiceprintError> {
        let tx = self.db.begin_write().map_err(storage)?;
        let count = {
            let existing = {
                let table = tx.open_table(EMBEDDINGS).map_err(storage)?;
                table
                    .get(speaker.as_str())
                    .map_err(storage)?
                    .map(|v| v.value().to_vec())
            };
            let mut embeddings = match existing {
                Some(blob) => decode_embeddings(&blob)?,
                None => Vec::new(),
            };
            embeddings.push(embedding.clone());
            self.write_record(speaker, &embeddings, &tx)?;
            embeddings.len()
        };
        tx.commit().map_err(storage)?;
        info!(speaker = %speaker, count, "voiceprint: enrollment appended");
        Ok(count)
    }

    fn replace(&self, speaker: &SpeakerId, embeddings: &[Embedding]) -> Result<(), VoiceprintError> {
        require_embeddings(embeddings)?;
        let tx = self.db.begin_write().map_err(storage)?;
        self.write_record(speaker, embeddings, &tx)?;
        tx.commit().map_err(storage)?;
        info!(speaker = %speaker, count = embeddings.len(), "voiceprint: enrollment replaced");
        Ok(())
    }

    fn remove(&self, speaker: &SpeakerId) -> Result<bool, VoiceprintError> {
        let tx = self.db.begin_write().map_err(storage)?;
        let existed = {
            let mut emb_table = tx.open_table(EMBEDDINGS).map_err(storage)?;
            let existed = emb_table
                .remove(speaker.as_str())
                .map_err(storage)?
                .is_some();
            let mut thr_table = tx.open_table(THRESHOLDS).map_err(storage)?;
            thr_table.remove(speaker.as_str()).map_err(storage)?;
            existed
        };
        tx.commit().map_err(storage)?;
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use tempfile::tempdir;

    fn emb(raw: &[f32]) -> Embedding {
        Embedding::normalize(raw).unwrap()
    }

    fn id(name: &str) -> SpeakerId {
        SpeakerId::new(name).unwrap()
    }

    #[test]
    fn test_redb_append_and_load() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("enroll.redb")).unwrap();
        assert!(store.load().unwrap().is_empty());

        let a = emb(&[1.0, 0.0]);
        let b = emb(&[0.9, 0.1]);
        assert_eq!(store.append(&id("alice"), &a).unwrap(), 1);
        assert_eq!(store.append(&id("alice"), &b).unwrap(), 2);

        let loaded = store.load().unwrap();
        let alice = loaded.get("alice").unwrap();
        assert_eq!(alice.embeddings.len(), 2);
        assert!(alice.embeddings[0].distance(&a) < 1e-6);
        assert!(alice.embeddings[1].distance(&b) < 1e-6);
        let cached = alice.cached_threshold.unwrap();
        assert!((cached - a.distance(&b) * 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_redb_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("enroll.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            store.append(&id("bob"), &emb(&[0.0, 1.0])).unwrap();
        }
        let store = RedbStore::open_existing(&path).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.get("bob").unwrap().embeddings.len(), 1);
    }

    #[test]
    fn test_redb_open_existing_missing() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            RedbStore::open_existing(dir.path().join("missing.redb")),
            Err(VoiceprintError::StorageUnavailable(_))
        ));
    }

    #[test]
    fn test_redb_skips_bad_blob() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("enroll.redb")).unwrap();
        store.append(&id("alice"), &emb(&[1.0])).unwrap();

        let tx = store.db.begin_write().unwrap();
        {
            let mut t = tx.open_table(EMBEDDINGS).unwrap();
            t.insert("mallory", [1u8, 2, 3].as_slice()).unwrap();
        }
        tx.commit().unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.get("alice").is_some());
        assert!(loaded.get("mallory").is_none());
    }

    #[test]
    fn test_redb_untrimmed_keys_collapse_to_exact_match() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("enroll.redb")).unwrap();
        let exact = emb(&[1.0, 0.0]);
        let padded = emb(&[0.0, 1.0]);

        let tx = store.db.begin_write().unwrap();
        {
            let mut t = tx.open_table(EMBEDDINGS).unwrap();
            t.insert(" Alice", encode_embeddings(&[padded.clone(), padded]).as_slice())
                .unwrap();
            t.insert("Alice", encode_embeddings(&[exact.clone()]).as_slice())
                .unwrap();
            t.insert("Bob ", encode_embeddings(&[exact.clone()]).as_slice())
                .unwrap();
        }
        tx.commit().unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        let alice = loaded.get("Alice").unwrap();
        assert_eq!(alice.embeddings.len(), 1);
        assert!(alice.embeddings[0].distance(&exact) < 1e-6);
        assert_eq!(loaded.get("Bob").unwrap().embeddings.len(), 1);
    }

    #[test]
    fn test_redb_replace_and_remove() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("enroll.redb")).unwrap();
        store.append(&id("alice"), &emb(&[1.0])).unwrap();
        store.append(&id("alice"), &emb(&[0.0, 1.0])).unwrap();

        store.replace(&id("alice"), &[emb(&[0.0, 0.0, 1.0])]).unwrap();
        let loaded = store.load().unwrap();
        let alice = loaded.get("alice").unwrap();
        assert_eq!(alice.embeddings.len(), 1);
        assert_eq!(alice.cached_threshold, Some(0.70));

        assert!(store.remove(&id("alice")).unwrap());
        assert!(!store.remove(&id("alice")).unwrap());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_redb_concurrent_same_speaker() {
        let dir = tempdir().unwrap();
        let store = Arc::new(RedbStore::open(dir.path().join("enroll.redb")).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..10 {
                        store
                            .append(&id("alice"), &emb(&[1.0, t as f32, i as f32]))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.load().unwrap().get("alice").unwrap().embeddings.len(), 40);
    }
}

use std::collections::BTreeMap;
use std::sync::Mutex;

use tracing::warn;

use crate::VoiceprintError;
use crate::calibrate::Calibrator;
use crate::embedding::Embedding;
use crate::speaker::{EnrollmentRecord, Enrollments, SpeakerId};

/// Durable mapping from speaker to enrollment embeddings.
///
/// Per speaker the embedding list is append-only: `append` never removes or
/// reorders existing entries. Only `replace` (re-enrollment) and `remove`
/// discard embeddings.
///
/// Implementations must serialize writers that touch the same speaker so
/// that concurrent appends are never lost, and a write that has returned
/// must be visible to every later `load`.
pub trait EnrollmentStore: Send + Sync {
    /// Reads every enrollment record.
    ///
    /// Storage that has never been written yields an empty set. Storage that
    /// exists but cannot be read fails with
    /// [`VoiceprintError::StorageUnavailable`].
    fn load(&self) -> Result<Enrollments, VoiceprintError>;

    /// Adds one embedding to the end of the speaker's set, creating the
    /// record if needed. Returns the speaker's new embedding count.
    fn append(&self, speaker: &SpeakerId, embedding: &Embedding) -> Result<usize, VoiceprintError>;

    /// Replaces the speaker's whole set. `embeddings` must not be empty.
    fn replace(&self, speaker: &SpeakerId, embeddings: &[Embedding]) -> Result<(), VoiceprintError>;

    /// Deletes the speaker. Returns whether a record existed.
    fn remove(&self, speaker: &SpeakerId) -> Result<bool, VoiceprintError>;
}

/// Enrolled set as seen by a verifier, with the reason it is empty when the
/// store could not be read.
#[derive(Debug, Clone, Default)]
pub struct Loaded {
    pub enrollments: Enrollments,
    pub degraded: Option<String>,
}

/// Loads the store, turning a read failure into an empty set plus the
/// failure reason. Everyone is Unknown until the store becomes readable.
pub fn load_or_empty(store: &dyn EnrollmentStore) -> Loaded {
    match store.load() {
        Ok(enrollments) => Loaded {
            enrollments,
            degraded: None,
        },
        Err(e) => {
            warn!(error = %e, "voiceprint: enrollment store unreadable, treating as empty");
            Loaded {
                enrollments: Enrollments::new(),
                degraded: Some(e.to_string()),
            }
        }
    }
}

pub(crate) fn require_embeddings(embeddings: &[Embedding]) -> Result<(), VoiceprintError> {
    if embeddings.is_empty() {
        return Err(VoiceprintError::Storage(
            "cannot enroll a speaker with no embeddings".into(),
        ));
    }
    Ok(())
}

/// In-memory [`EnrollmentStore`].
/// Data is lost on restart. Suitable for testing or ephemeral use.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<SpeakerId, EnrollmentRecord>>,
    calibrator: Calibrator,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_calibrator(calibrator: Calibrator) -> Self {
        Self {
            records: Mutex::default(),
            calibrator,
        }
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<SpeakerId, EnrollmentRecord>>, VoiceprintError>
    {
        self.records
            .lock()
            .map_err(|e| VoiceprintError::Storage(e.to_string()))
    }
}

impl EnrollmentStore for MemoryStore {
    fn load(&self) -> Result<Enrollments, VoiceprintError> {
        let records = self.lock()?;
        let mut out = Enrollments::new();
        for record in records.values() {
            out.insert(record.clone());
        }
        Ok(out)
    }

    fn append(&self, speaker: &SpeakerId, embedding: &Embedding) -> Result<usize, VoiceprintError> {
        let mut records = self.lock()?;
        let record = records
            .entry(speaker.clone())
            .or_insert_with(|| EnrollmentRecord {
                speaker: speaker.clone(),
                embeddings: Vec::new(),
                cached_threshold: None,
            });
        record.embeddings.push(embedding.clone());
        record.cached_threshold = Some(self.calibrator.calibrate_speaker(&record.embeddings));
        Ok(record.embeddings.len())
    }

    fn replace(&self, speaker: &SpeakerId, embeddings: &[Embedding]) -> Result<(), VoiceprintError> {
        require_embeddings(embeddings)?;
        let mut records = self.lock()?;
        records.insert(
            speaker.clone(),
            EnrollmentRecord {
                speaker: speaker.clone(),
                embeddings: embeddings.to_vec(),
                cached_threshold: Some(self.calibrator.calibrate_speaker(embeddings)),
            },
        );
        Ok(())
    }

    fn remove(&self, speaker: &SpeakerId) -> Result<bool, VoiceprintError> {
        let mut records = self.lock()?;
        Ok(records.remove(speaker).is_some())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn emb(raw: &[f32]) -> Embedding {
        Embedding::normalize(raw).unwrap()
    }

    fn id(name: &str) -> SpeakerId {
        SpeakerId::new(name).unwrap()
    }

    #[test]
    fn memory_store_append_and_load() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_empty());

        let a = emb(&[1.0, 0.0]);
        let b = emb(&[0.0, 1.0]);
        assert_eq!(store.append(&id("alice"), &a).unwrap(), 1);
        assert_eq!(store.append(&id("alice"), &b).unwrap(), 2);
        assert_eq!(store.append(&id("bob"), &a).unwrap(), 1);

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        let alice = loaded.get("alice").unwrap();
        assert_eq!(alice.embeddings, vec![a, b]);
        assert_eq!(alice.cached_threshold, Some(0.70));
    }

    #[test]
    fn memory_store_replace_and_remove() {
        let store = MemoryStore::new();
        store.append(&id("alice"), &emb(&[1.0])).unwrap();
        store.append(&id("alice"), &emb(&[1.0, 1.0])).unwrap();

        let fresh = emb(&[0.0, 0.0, 1.0]);
        store.replace(&id("alice"), &[fresh.clone()]).unwrap();
        assert_eq!(store.load().unwrap().get("alice").unwrap().embeddings, vec![fresh]);

        assert!(store.replace(&id("alice"), &[]).is_err());

        assert!(store.remove(&id("alice")).unwrap());
        assert!(!store.remove(&id("alice")).unwrap());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn memory_store_concurrent_same_speaker() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..25 {
                        let e = emb(&[1.0, t as f32, i as f32]);
                        store.append(&id("alice"), &e).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let loaded = store.load().unwrap();
        assert_eq!(loaded.get("alice").unwrap().embeddings.len(), 200);
    }

    struct Broken;

    impl EnrollmentStore for Broken {
        fn load(&self) -> Result<Enrollments, VoiceprintError> {
            Err(VoiceprintError::StorageUnavailable("disk on fire".into()))
        }
        fn append(&self, _: &SpeakerId, _: &Embedding) -> Result<usize, VoiceprintError> {
            Err(VoiceprintError::StorageUnavailable("disk on fire".into()))
        }
        fn replace(&self, _: &SpeakerId, _: &[Embedding]) -> Result<(), VoiceprintError> {
            Err(VoiceprintError::StorageUnavailable("disk on fire".into()))
        }
        fn remove(&self, _: &SpeakerId) -> Result<bool, VoiceprintError> {
            Err(VoiceprintError::StorageUnavailable("disk on fire".into()))
        }
    }

    #[test]
    fn load_or_empty_reports_reason() {
        let loaded = load_or_empty(&Broken);
        assert!(loaded.enrollments.is_empty());
        assert!(loaded.degraded.unwrap().contains("disk on fire"));

        let ok = load_or_empty(&MemoryStore::new());
        assert!(ok.degraded.is_none());
    }
}

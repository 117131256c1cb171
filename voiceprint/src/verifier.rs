use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::VoiceprintError;
use crate::calibrate::{Calibrator, ThresholdTable};
use crate::embedding::{EMBEDDING_DIM, Embedding};
use crate::model::VoiceprintModel;
use crate::recognizer::{RecognitionResult, recognize};
use crate::speaker::{Enrollments, SpeakerId, UNKNOWN_SPEAKER};
use crate::store::{EnrollmentStore, load_or_empty};

/// Serializable outcome of one verification attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    /// Matched speaker name, or `"Unknown"`.
    pub speaker: String,

    /// Best distance found. Infinite when nothing could be compared.
    pub distance: f32,

    /// Present only when the probe was accepted.
    pub accepted_distance: Option<f32>,

    /// Why the attempt was rejected without a comparison, or why the
    /// enrolled set was empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Verdict {
    fn from_result(result: &RecognitionResult, reason: Option<String>) -> Self {
        Self {
            speaker: result.identity.to_string(),
            distance: result.best_distance,
            accepted_distance: result.accepted_distance(),
            reason,
        }
    }

    fn rejected(reason: String) -> Self {
        Self {
            speaker: UNKNOWN_SPEAKER.to_string(),
            distance: f32::INFINITY,
            accepted_distance: None,
            reason: Some(reason),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted_distance.is_some()
    }
}

/// Enrolled set and its calibrated thresholds, computed together.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub enrollments: Enrollments,
    pub thresholds: ThresholdTable,
    /// Set when the store could not be read and the snapshot is empty.
    pub degraded: Option<String>,
}

/// Runs the extract → normalize → recognize pipeline against an enrollment
/// store.
///
/// Thresholds are calibrated once per loaded snapshot and reused until the
/// next enrollment or [`Verifier::refresh`]. Verification never fails:
/// every problem ends in an Unknown [`Verdict`] carrying a reason.
///
/// Thread-safe: all methods can be called concurrently.
pub struct Verifier {
    model: Arc<dyn VoiceprintModel>,
    store: Box<dyn EnrollmentStore>,
    calibrator: Calibrator,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
}

impl Verifier {
    /// Creates a Verifier with the default calibrator.
    pub fn new(model: Arc<dyn VoiceprintModel>, store: Box<dyn EnrollmentStore>) -> Self {
        Self::with_calibrator(model, store, Calibrator::new())
    }

    pub fn with_calibrator(
        model: Arc<dyn VoiceprintModel>,
        store: Box<dyn EnrollmentStore>,
        calibrator: Calibrator,
    ) -> Self {
        let dim = model.dimension();
        if dim != EMBEDDING_DIM {
            debug!(dim, "voiceprint: model output will be fitted to {EMBEDDING_DIM} components");
        }
        Self {
            model,
            store,
            calibrator,
            snapshot: RwLock::new(None),
        }
    }

    /// Returns the current snapshot, loading and calibrating it if needed.
    ///
    /// Only snapshots from a successful load are kept. While the store is
    /// unreadable every call loads again and gets an empty, degraded set.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        if let Some(snap) = self.read_cached() {
            return snap;
        }

        let mut slot = match self.snapshot.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(snap) = slot.as_ref() {
            return Arc::clone(snap);
        }
        let loaded = load_or_empty(self.store.as_ref());
        let thresholds = self.calibrator.calibrate(&loaded.enrollments);
        debug!(
            speakers = loaded.enrollments.len(),
            embeddings = loaded.enrollments.embedding_count(),
            "voiceprint: enrollment snapshot loaded"
        );
        let snap = Arc::new(Snapshot {
            enrollments: loaded.enrollments,
            thresholds,
            degraded: loaded.degraded,
        });
        // A degraded snapshot is not cached; the next call retries the store.
        if snap.degraded.is_none() {
            *slot = Some(Arc::clone(&snap));
        }
        snap
    }

    fn read_cached(&self) -> Option<Arc<Snapshot>> {
        let guard = match self.snapshot.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.as_ref().map(Arc::clone)
    }

    /// Drops the cached snapshot so the next call reloads the store.
    pub fn refresh(&self) {
        let mut slot = match self.snapshot.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = None;
    }

    /// Verifies captured audio.
    pub fn verify(&self, audio: &[u8]) -> Verdict {
        match self.model.extract(audio) {
            Ok(raw) => self.verify_embedding(&raw),
            Err(e) => {
                warn!(error = %e, "voiceprint: embedding extraction failed");
                Verdict::rejected(e.to_string())
            }
        }
    }

    /// Verifies an already extracted embedding.
    pub fn verify_embedding(&self, raw: &[f32]) -> Verdict {
        let probe = match Embedding::normalize(raw) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "voiceprint: probe discarded");
                return Verdict::rejected(e.to_string());
            }
        };
        let snap = self.snapshot();
        let result = recognize(&probe, &snap.enrollments, &snap.thresholds);
        Verdict::from_result(&result, snap.degraded.clone())
    }

    /// Extracts an embedding from audio and appends it to the speaker's
    /// enrollment. Returns the speaker's new embedding count.
    pub fn enroll(&self, speaker: &SpeakerId, audio: &[u8]) -> Result<usize, VoiceprintError> {
        let raw = self.model.extract(audio)?;
        self.enroll_embedding(speaker, &raw)
    }

    /// Normalizes and appends an already extracted embedding.
    pub fn enroll_embedding(
        &self,
        speaker: &SpeakerId,
        raw: &[f32],
    ) -> Result<usize, VoiceprintError> {
        let emb = Embedding::normalize(raw)?;
        let count = self.store.append(speaker, &emb)?;
        self.refresh();
        info!(speaker = %speaker, count, "voiceprint: speaker enrolled");
        Ok(count)
    }

    /// Replaces a speaker's enrollment with freshly extracted embeddings.
    /// Nothing is written unless every input normalizes.
    pub fn reenroll(&self, speaker: &SpeakerId, raws: &[Vec<f32>]) -> Result<(), VoiceprintError> {
        let embeddings = raws
            .iter()
            .map(|raw| Embedding::normalize(raw))
            .collect::<Result<Vec<_>, _>>()?;
        self.store.replace(speaker, &embeddings)?;
        self.refresh();
        Ok(())
    }

    /// Removes a speaker. Returns whether they were enrolled.
    pub fn forget(&self, speaker: &SpeakerId) -> Result<bool, VoiceprintError> {
        let existed = self.store.remove(speaker)?;
        self.refresh();
        Ok(existed)
    }
}

use tracing::debug;

use crate::calibrate::{DEFAULT_THRESHOLD, ThresholdTable};
use crate::embedding::Embedding;
use crate::speaker::{Enrollments, Identity, SpeakerId};

/// Result of matching one probe against the enrolled set.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    /// Matched speaker, or [`Identity::Unknown`] on rejection.
    pub identity: Identity,

    /// Distance that qualified (or failed to qualify) the winner.
    /// `+inf` when nothing is enrolled.
    pub distance: f32,

    /// Smallest distance found, reported regardless of the decision.
    pub best_distance: f32,
}

impl RecognitionResult {
    fn rejected_empty() -> Self {
        Self {
            identity: Identity::Unknown,
            distance: f32::INFINITY,
            best_distance: f32::INFINITY,
        }
    }

    pub fn is_accepted(&self) -> bool {
        !self.identity.is_unknown()
    }

    /// The qualifying distance, only when the probe was accepted.
    pub fn accepted_distance(&self) -> Option<f32> {
        self.is_accepted().then_some(self.distance)
    }
}

/// Matches `probe` against every enrolled embedding and applies the winning
/// speaker's threshold.
///
/// The winner is the owner of the single closest embedding across all
/// speakers. Only that speaker's threshold is consulted; a probe rejected by
/// the nearest speaker is never handed to a farther one with a looser
/// threshold.
///
/// Ties keep the first embedding visited. Speakers are visited in ascending
/// name order (the iteration order of [`Enrollments`]) and each speaker's
/// embeddings in enrollment order.
///
/// A winner missing from `thresholds` is judged against
/// [`DEFAULT_THRESHOLD`].
pub fn recognize(
    probe: &Embedding,
    enrolled: &Enrollments,
    thresholds: &ThresholdTable,
) -> RecognitionResult {
    let mut best: Option<(&SpeakerId, f32)> = None;
    for record in enrolled {
        for emb in &record.embeddings {
            let d = probe.distance(emb);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((&record.speaker, d));
            }
        }
    }

    let Some((speaker, best_distance)) = best else {
        debug!("voiceprint: no enrolled speakers, rejecting probe");
        return RecognitionResult::rejected_empty();
    };

    let threshold = thresholds
        .get(speaker.as_str())
        .unwrap_or(DEFAULT_THRESHOLD);
    let accepted = best_distance <= threshold;
    debug!(
        speaker = %speaker,
        distance = best_distance,
        threshold,
        accepted,
        "voiceprint: nearest enrolled embedding"
    );

    RecognitionResult {
        identity: if accepted {
            Identity::Speaker(speaker.clone())
        } else {
            Identity::Unknown
        },
        distance: best_distance,
        best_distance,
    }
}

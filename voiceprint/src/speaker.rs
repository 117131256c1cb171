use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::VoiceprintError;
use crate::embedding::Embedding;

/// Label reported for a probe that matches no enrolled speaker.
pub const UNKNOWN_SPEAKER: &str = "Unknown";

/// Unique, non-empty display name of an enrolled speaker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpeakerId(String);

impl SpeakerId {
    /// Validates and wraps a speaker name. Surrounding whitespace is trimmed.
    pub fn new(name: impl AsRef<str>) -> Result<Self, VoiceprintError> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(VoiceprintError::InvalidSpeaker(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpeakerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SpeakerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Serialize for SpeakerId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

/// Outcome identity of a recognition: an enrolled speaker or the open-set
/// rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Speaker(SpeakerId),
    Unknown,
}

impl Identity {
    pub fn speaker(&self) -> Option<&SpeakerId> {
        match self {
            Self::Speaker(id) => Some(id),
            Self::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Speaker(id) => write!(f, "{id}"),
            Self::Unknown => f.write_str(UNKNOWN_SPEAKER),
        }
    }
}

/// Embeddings captured for one speaker at enrollment.
#[derive(Debug, Clone)]
pub struct EnrollmentRecord {
    pub speaker: SpeakerId,

    /// Enrollment order. Never empty.
    pub embeddings: Vec<Embedding>,

    /// Threshold written alongside the record the last time it changed.
    /// Advisory only: decisions always use a freshly calibrated value.
    pub cached_threshold: Option<f32>,
}

/// All enrolled speakers, iterated in ascending speaker-name order.
///
/// That order, followed by each speaker's enrollment order, is the order in
/// which the recognizer visits embeddings and therefore breaks ties.
#[derive(Debug, Clone, Default)]
pub struct Enrollments {
    records: BTreeMap<SpeakerId, EnrollmentRecord>,
}

impl Enrollments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record for `record.speaker`.
    /// Records with no embeddings are ignored.
    pub fn insert(&mut self, record: EnrollmentRecord) {
        if record.embeddings.is_empty() {
            return;
        }
        self.records.insert(record.speaker.clone(), record);
    }

    /// Convenience for building an enrolled set without a cached threshold.
    pub fn with_speaker(mut self, speaker: SpeakerId, embeddings: Vec<Embedding>) -> Self {
        self.insert(EnrollmentRecord {
            speaker,
            embeddings,
            cached_threshold: None,
        });
        self
    }

    pub fn get(&self, speaker: &str) -> Option<&EnrollmentRecord> {
        self.records.get(speaker)
    }

    pub fn iter(&self) -> btree_map::Values<'_, SpeakerId, EnrollmentRecord> {
        self.records.values()
    }

    /// Number of speakers.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total number of embeddings across all speakers.
    pub fn embedding_count(&self) -> usize {
        self.records.values().map(|r| r.embeddings.len()).sum()
    }
}

impl<'a> IntoIterator for &'a Enrollments {
    type Item = &'a EnrollmentRecord;
    type IntoIter = btree_map::Values<'a, SpeakerId, EnrollmentRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speaker_id_rejects_blank() {
        assert!(SpeakerId::new("").is_err());
        assert!(SpeakerId::new("   ").is_err());
        assert_eq!(SpeakerId::new("  Alice ").unwrap().as_str(), "Alice");
    }

    #[test]
    fn identity_display() {
        let alice = SpeakerId::new("Alice").unwrap();
        assert_eq!(Identity::Speaker(alice).to_string(), "Alice");
        assert_eq!(Identity::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn enrollments_iterate_by_name() {
        let e = Embedding::normalize(&[1.0]).unwrap();
        let set = Enrollments::new()
            .with_speaker(SpeakerId::new("carol").unwrap(), vec![e.clone()])
            .with_speaker(SpeakerId::new("alice").unwrap(), vec![e.clone(), e.clone()])
            .with_speaker(SpeakerId::new("bob").unwrap(), vec![e]);
        let names: Vec<&str> = set.iter().map(|r| r.speaker.as_str()).collect();
        assert_eq!(names, ["alice", "bob", "carol"]);
        assert_eq!(set.embedding_count(), 4);
    }

    #[test]
    fn enrollments_skip_empty_records() {
        let set = Enrollments::new().with_speaker(SpeakerId::new("ghost").unwrap(), vec![]);
        assert!(set.is_empty());
    }
}

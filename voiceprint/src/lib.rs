//! Open-set speaker verification over fixed-length voice embeddings.
//!
//! # Architecture
//!
//! A decision is made in four steps:
//!
//! 1. [`Embedding::normalize`]: raw vector -> 512-dim unit embedding
//! 2. [`EnrollmentStore::load`]: durable store -> [`Enrollments`]
//! 3. [`Calibrator::calibrate`]: enrollments -> per-speaker [`ThresholdTable`]
//! 4. [`recognize`]: probe + enrollments + thresholds -> [`RecognitionResult`]
//!
//! [`Verifier`] wires these together behind a [`VoiceprintModel`] and caches
//! the calibrated snapshot between calls.
//!
//! # Thresholds
//!
//! Each speaker is judged against their own spread:
//!
//! ```text
//! threshold = min(1.1 * max pairwise distance, 0.70)   if >= 2 embeddings
//! threshold = 0.70                                     otherwise
//! ```
//!
//! The recognizer takes the single nearest embedding across all speakers and
//! accepts only if that distance is within its owner's threshold.

mod calibrate;
pub mod codec;
mod cosine;
mod embedding;
mod error;
mod model;
mod recognizer;
mod redb;
mod speaker;
mod store;
mod verifier;


pub use calibrate::{
    Calibrator, CalibratorConfig, DEFAULT_THRESHOLD, MAX_THRESHOLD, THRESHOLD_MARGIN,
    ThresholdTable, calibrate,
};
pub use codec::{EMBEDDING_STRIDE, decode_embeddings, encode_embeddings};
pub use cosine::cosine_distance;
pub use embedding::{EMBEDDING_DIM, Embedding};
pub use error::VoiceprintError;
pub use model::VoiceprintModel;
pub use recognizer::{RecognitionResult, recognize};
pub use self::redb::RedbStore;
pub use speaker::{EnrollmentRecord, Enrollments, Identity, SpeakerId, UNKNOWN_SPEAKER};
pub use store::{EnrollmentStore, Loaded, MemoryStore, load_or_empty};
pub use verifier::{Snapshot, Verdict, Verifier};

use thiserror::Error;

/// Errors returned by voiceprint operations.
#[derive(Debug, Error)]
pub enum VoiceprintError {
    #[error("degenerate embedding: zero or non-finite norm over {len} components")]
    DegenerateEmbedding { len: usize },

    #[error("invalid speaker name: {0:?}")]
    InvalidSpeaker(String),

    #[error("invalid embedding blob: {len} bytes is not a positive multiple of {stride}")]
    InvalidBlob { len: usize, stride: usize },

    #[error("enrollment storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("enrollment storage error: {0}")]
    Storage(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("model is closed")]
    Closed,
}

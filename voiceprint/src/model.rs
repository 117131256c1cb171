use crate::VoiceprintError;

/// Extracts speaker embedding vectors from captured audio.
///
/// This is the seam to the embedding extractor. The verifier only relies on
/// `extract` returning a finite-length vector; it fits and normalizes the
/// result itself (see [`crate::Embedding::normalize`]), so models whose
/// native dimension is not 512 still work. Band-pass filtering or resampling,
/// if any, belongs inside the implementation.
///
/// A model is constructed once, shared behind an `Arc`, and dropped when the
/// owning application shuts down. Calls after shutdown should fail with
/// [`VoiceprintError::Closed`].
///
/// # Thread Safety
///
/// Implementations must be safe for concurrent use.
pub trait VoiceprintModel: Send + Sync {
    /// Computes a raw speaker embedding from audio bytes.
    fn extract(&self, audio: &[u8]) -> Result<Vec<f32>, VoiceprintError>;

    /// Returns the dimensionality of the vectors produced by `extract`.
    fn dimension(&self) -> usize;
}

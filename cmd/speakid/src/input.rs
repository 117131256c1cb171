//! Embedding file decoding.
//!
//! The CLI does not run an acoustic model. Its "audio" is a file that an
//! external extractor already turned into an embedding, in one of two forms:
//!
//! - JSON: an array of numbers, e.g. `[0.12, -0.4, ...]`
//! - raw: little-endian f32 values, 4 bytes each

use clap::ValueEnum;
use speakid_voiceprint::{EMBEDDING_DIM, VoiceprintError, VoiceprintModel};

/// Embedding file layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum EmbeddingFormat {
    /// JSON when the file looks like an array, raw otherwise
    #[default]
    Auto,
    /// JSON array of numbers
    Json,
    /// Little-endian f32 bytes
    Raw,
}

/// A [`VoiceprintModel`] whose input is an embedding file rather than audio.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddingFileModel {
    format: EmbeddingFormat,
}

impl EmbeddingFileModel {
    pub fn new(format: EmbeddingFormat) -> Self {
        Self { format }
    }
}

fn model_err(msg: impl Into<String>) -> VoiceprintError {
    VoiceprintError::Model(msg.into())
}

fn decode_json(data: &[u8]) -> Result<Vec<f32>, VoiceprintError> {
    serde_json::from_slice::<Vec<f32>>(data)
        .map_err(|e| model_err(format!("invalid JSON embedding: {e}")))
}

fn decode_raw(data: &[u8]) -> Result<Vec<f32>, VoiceprintError> {
    if data.is_empty() {
        return Err(model_err("empty embedding file"));
    }
    if data.len() % 4 != 0 {
        return Err(model_err(format!(
            "raw embedding length {} is not a multiple of 4",
            data.len()
        )));
    }
    Ok(data
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn looks_like_json(data: &[u8]) -> bool {
    data.iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'[')
}

impl VoiceprintModel for EmbeddingFileModel {
    fn extract(&self, audio: &[u8]) -> Result<Vec<f32>, VoiceprintError> {
        match self.format {
            EmbeddingFormat::Json => decode_json(audio),
            EmbeddingFormat::Raw => decode_raw(audio),
            EmbeddingFormat::Auto => {
                if looks_like_json(audio) {
                    // A raw file can start with 0x5b by chance.
                    decode_json(audio).or_else(|_| decode_raw(audio))
                } else {
                    decode_raw(audio)
                }
            }
        }
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }
}

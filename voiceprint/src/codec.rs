//! Byte layout of a stored enrollment blob.
//!
//! A blob is one or more consecutive embeddings, each [`EMBEDDING_DIM`]
//! little-endian `f32` values with no header or separator:
//!
//! ```text
//! [e0[0] .. e0[511]][e1[0] .. e1[511]] ...
//!  4 bytes each      stride = 2048 bytes
//! ```

use crate::VoiceprintError;
use crate::embedding::{EMBEDDING_DIM, Embedding};

/// Bytes occupied by one embedding in a blob.
pub const EMBEDDING_STRIDE: usize = EMBEDDING_DIM * 4;

/// Concatenates embeddings into a blob.
pub fn encode_embeddings(embeddings: &[Embedding]) -> Vec<u8> {
    let mut out = Vec::with_capacity(embeddings.len() * EMBEDDING_STRIDE);
    for emb in embeddings {
        for &x in emb.as_slice() {
            out.extend_from_slice(&x.to_le_bytes());
        }
    }
    out
}

/// Splits a blob back into embeddings.
///
/// The length must be a positive multiple of [`EMBEDDING_STRIDE`]. Each
/// vector is passed back through [`Embedding::normalize`], so a corrupted
/// all-zero vector is reported as degenerate instead of being admitted.
pub fn decode_embeddings(blob: &[u8]) -> Result<Vec<Embedding>, VoiceprintError> {
    if blob.is_empty() || blob.len() % EMBEDDING_STRIDE != 0 {
        return Err(VoiceprintError::InvalidBlob {
            len: blob.len(),
            stride: EMBEDDING_STRIDE,
        });
    }

    let mut raw = vec![0.0f32; EMBEDDING_DIM];
    blob.chunks_exact(EMBEDDING_STRIDE)
        .map(|chunk| {
            for (dst, b) in raw.iter_mut().zip(chunk.chunks_exact(4)) {
                *dst = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
            }
            Embedding::normalize(&raw)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_little_endian_fixed_stride() {
        let e = Embedding::normalize(&[1.0]).unwrap();
        let blob = encode_embeddings(&[e.clone(), e]);
        assert_eq!(blob.len(), 2 * EMBEDDING_STRIDE);
        assert_eq!(&blob[..4], &1.0f32.to_le_bytes());
        assert_eq!(&blob[4..8], &[0, 0, 0, 0]);
        assert_eq!(&blob[EMBEDDING_STRIDE..EMBEDDING_STRIDE + 4], &1.0f32.to_le_bytes());
    }

    #[test]
    fn decode_preserves_order() {
        let a = Embedding::normalize(&[1.0, 0.0]).unwrap();
        let b = Embedding::normalize(&[0.0, 1.0]).unwrap();
        let c = Embedding::normalize(&[1.0, 1.0]).unwrap();
        let decoded =
            decode_embeddings(&encode_embeddings(&[a.clone(), b.clone(), c.clone()])).unwrap();
        assert_eq!(decoded.len(), 3);
        for (got, want) in decoded.iter().zip([&a, &b, &c]) {
            assert!(got.distance(want) < 1e-6);
        }
    }

    #[test]
    fn decode_reads_externally_written_blob() {
        let mut blob = Vec::new();
        for i in 0..EMBEDDING_DIM {
            let v: f32 = if i == 3 { 2.0 } else { 0.0 };
            blob.extend_from_slice(&v.to_le_bytes());
        }
        let decoded = decode_embeddings(&blob).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].as_slice()[3], 1.0);
    }

    #[test]
    fn decode_rejects_partial_stride() {
        let blob = vec![0u8; EMBEDDING_STRIDE + 4];
        assert!(matches!(
            decode_embeddings(&blob),
            Err(VoiceprintError::InvalidBlob { len, .. }) if len == EMBEDDING_STRIDE + 4
        ));
    }

    #[test]
    fn decode_rejects_empty() {
        assert!(matches!(
            decode_embeddings(&[]),
            Err(VoiceprintError::InvalidBlob { len: 0, .. })
        ));
    }

    #[test]
    fn decode_rejects_zero_vector() {
        let blob = vec![0u8; EMBEDDING_STRIDE];
        assert!(matches!(
            decode_embeddings(&blob),
            Err(VoiceprintError::DegenerateEmbedding { .. })
        ));
    }
}

use std::fmt;

use crate::VoiceprintError;
use crate::cosine::cosine_distance;

/// Number of components in every [`Embedding`].
pub const EMBEDDING_DIM: usize = 512;

/// A unit-length speaker embedding of exactly [`EMBEDDING_DIM`] components.
///
/// The only way to build one is [`Embedding::normalize`], so every value of
/// this type satisfies the fixed-dimension and unit-norm invariants.
#[derive(Clone, PartialEq)]
pub struct Embedding {
    values: Box<[f32]>,
}

impl Embedding {
    /// Fits `raw` to [`EMBEDDING_DIM`] components and scales it to unit norm.
    ///
    /// Shorter inputs are right-padded with zeros; longer inputs keep only the
    /// first [`EMBEDDING_DIM`] components. The norm is taken after fitting.
    ///
    /// Fails with [`VoiceprintError::DegenerateEmbedding`] when the input is
    /// empty or the fitted vector has a zero or non-finite norm.
    pub fn normalize(raw: &[f32]) -> Result<Self, VoiceprintError> {
        if raw.is_empty() {
            return Err(VoiceprintError::DegenerateEmbedding { len: 0 });
        }

        let mut values = vec![0.0f32; EMBEDDING_DIM];
        let n = raw.len().min(EMBEDDING_DIM);
        values[..n].copy_from_slice(&raw[..n]);

        let mut norm: f64 = 0.0;
        for &x in &values {
            norm += (x as f64) * (x as f64);
        }
        norm = norm.sqrt();
        if norm == 0.0 || !norm.is_finite() {
            return Err(VoiceprintError::DegenerateEmbedding { len: raw.len() });
        }

        for x in &mut values {
            *x = (*x as f64 / norm) as f32;
        }
        Ok(Self {
            values: values.into_boxed_slice(),
        })
    }

    /// Returns the components.
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Cosine distance to another embedding, in `[0, 2]`.
    pub fn distance(&self, other: &Embedding) -> f32 {
        cosine_distance(&self.values, &other.values)
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.values
    }
}

impl fmt::Debug for Embedding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Embedding")
            .field("dim", &self.values.len())
            .field("head", &&self.values[..4])
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f64 {
        v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt()
    }

    #[test]
    fn pads_short_input() {
        let e = Embedding::normalize(&[3.0, 4.0]).unwrap();
        let v = e.as_slice();
        assert_eq!(v.len(), EMBEDDING_DIM);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        assert!(v[2..].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn truncates_long_input() {
        let mut raw = vec![0.0f32; 600];
        raw[0] = 1.0;
        raw[550] = 100.0; // dropped by truncation
        let e = Embedding::normalize(&raw).unwrap();
        assert_eq!(e.as_slice().len(), EMBEDDING_DIM);
        assert!((e.as_slice()[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_when_only_truncated_part_is_nonzero() {
        let mut raw = vec![0.0f32; 700];
        raw[600] = 1.0;
        assert!(matches!(
            Embedding::normalize(&raw),
            Err(VoiceprintError::DegenerateEmbedding { len: 700 })
        ));
    }

    #[test]
    fn degenerate_zero_and_empty() {
        assert!(matches!(
            Embedding::normalize(&[0.0; 512]),
            Err(VoiceprintError::DegenerateEmbedding { .. })
        ));
        assert!(matches!(
            Embedding::normalize(&[]),
            Err(VoiceprintError::DegenerateEmbedding { len: 0 })
        ));
    }

    #[test]
    fn degenerate_non_finite() {
        assert!(Embedding::normalize(&[1.0, f32::NAN]).is_err());
        assert!(Embedding::normalize(&[1.0, f32::INFINITY]).is_err());
    }

    #[test]
    fn fixed_dimension_and_unit_norm_for_all_lengths() {
        for len in 1..=2000usize {
            let raw: Vec<f32> = (0..len)
                .map(|i| ((i * 7 + len) % 13) as f32 - 6.0 + 0.5)
                .collect();
            let e = Embedding::normalize(&raw).unwrap();
            assert_eq!(e.as_slice().len(), EMBEDDING_DIM, "len {len}");
            let n = norm(e.as_slice());
            assert!((n - 1.0).abs() < 1e-6, "len {len}: norm {n}");
        }
    }

    #[test]
    fn idempotent() {
        let raw: Vec<f32> = (0..300).map(|i| (i as f32 * 0.37).sin()).collect();
        let once = Embedding::normalize(&raw).unwrap();
        let twice = Embedding::normalize(once.as_slice()).unwrap();
        for (a, b) in once.as_slice().iter().zip(twice.as_slice()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn distance_to_self_is_zero() {
        let e = Embedding::normalize(&[0.2, -0.4, 0.9, 0.1]).unwrap();
        assert_eq!(e.distance(&e), 0.0);
    }
}

/// Cosine distance `1 - cos(a, b)`, in `[0, 2]`.
///
/// Callers pass [`crate::Embedding`] components, which are already unit
/// length, but the norms are still computed: stored vectors pick up f32
/// rounding when re-read, and dividing by `sqrt(|a|² |b|²)` makes an
/// embedding's distance to itself exactly 0 regardless.
///
/// Sums run in f64. Length mismatch or a zero vector gives 2.0, the
/// farthest possible distance, so such a pair never wins a match.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 2.0;
    }
    let (dot, aa, bb) = a
        .iter()
        .zip(b)
        .fold((0.0f64, 0.0f64, 0.0f64), |(dot, aa, bb), (&x, &y)| {
            let (x, y) = (x as f64, y as f64);
            (dot + x * y, aa + x * x, bb + y * y)
        });
    if aa == 0.0 || bb == 0.0 {
        return 2.0;
    }
    let cos = (dot / (aa * bb).sqrt()).clamp(-1.0, 1.0);
    (1.0 - cos) as f32
}

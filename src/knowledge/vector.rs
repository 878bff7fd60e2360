//! Pure numeric routines over embedding vectors.

/// Dot product. Callers must pass equal-length slices.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean norm.
pub fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Cosine similarity, or `None` when the dimensions differ.
///
/// A zero vector carries no direction and scores `0.0` against anything.
/// The result is clamped to `[-1.0, 1.0]` to absorb rounding.
pub fn checked_similarity(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    let denom = norm(a) * norm(b);
    if denom == 0.0 || !denom.is_finite() {
        return Some(0.0);
    }
    let sim = dot(a, b) / denom;
    if sim.is_nan() {
        return Some(0.0);
    }
    Some(sim.clamp(-1.0, 1.0))
}

/// Cosine similarity in `[-1.0, 1.0]`.
///
/// Returns `0.0` for mismatched dimensions. Use [`checked_similarity`] when a
/// mismatch has to be told apart from a real orthogonal pair.
pub fn similarity(a: &[f64], b: &[f64]) -> f64 {
    checked_similarity(a, b).unwrap_or(0.0)
}

/// L2-normalize a vector. Returns the input unchanged if its norm is zero.
pub fn l2_normalize(v: &[f64]) -> Vec<f64> {
    let n = norm(v);
    if n > 0.0 {
        v.iter().map(|x| x / n).collect()
    } else {
        v.to_vec()
    }
}

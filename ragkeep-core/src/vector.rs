//! Helpers shared by stores and retrievers for reconciling and comparing
//! embedding vectors.

/// Truncates or zero-pads `vector` to exactly `dim` components.
///
/// Padding uses zeros so that missing components never add similarity.
pub fn fit_to_dimension(mut vector: Vec<f32>, dim: usize) -> Vec<f32> {
    vector.resize(dim, 0.0);
    vector
}

/// L2 norm, with zero reported as `1.0` so division is always defined.
pub fn safe_norm(vector: &[f32]) -> f32 {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        1.0
    } else {
        norm
    }
}

pub fn normalize(vector: &[f32]) -> Vec<f32> {
    let norm = safe_norm(vector);
    vector.iter().map(|x| x / norm).collect()
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Cosine similarity of `a` against an already normalized `b_unit`.
///
/// A zero vector on either side scores `0.0`.
pub fn cosine_similarity(a: &[f32], b_unit: &[f32]) -> f32 {
    dot(a, b_unit) / safe_norm(a)
}

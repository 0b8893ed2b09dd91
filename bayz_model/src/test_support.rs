// Shared fixtures for unit tests.

use crate::embedding::KeyedVectors;

pub fn words(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

/// Six tokens on the positive and negative coordinate axes of 3-space, in
/// the order +x, -x, +y, -y, +z, -z. Every token is equally far from the
/// centroid, so a single fitted component gives them equal densities.
pub fn axis_embedding(tokens: [&str; 6]) -> KeyedVectors {
    let axes = [
        [1.0, 0.0, 0.0],
        [-1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, -1.0, 0.0],
        [0.0, 0.0, 1.0],
        [0.0, 0.0, -1.0],
    ];
    let entries = tokens
        .iter()
        .zip(axes)
        .map(|(token, axis)| (token.to_string(), axis.to_vec()))
        .collect::<Vec<_>>();
    KeyedVectors::new(3, entries).unwrap()
}

/// `n` copies of the two-token sequence `[a, b]`.
pub fn repeated_pairs(a: &str, b: &str, n: usize) -> Vec<Vec<String>> {
    vec![vec![a.to_string(), b.to_string()]; n]
}

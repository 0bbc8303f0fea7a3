//! Damerau–Levenshtein edit distance (optimal string alignment variant).
//!
//! Used by the phrase comparator to score how close two normalized tokens
//! are. Lengths are measured in Unicode scalar values, never bytes.

/// Longest token, in characters, for which the full distance is computed.
///
/// Past this the cost is quadratic in input the caller does not control, so
/// the pessimistic `max(m, n)` is returned instead.
pub const MAX_TOKEN_CHARS: usize = 1_000;

/// Compute the Damerau–Levenshtein distance between two tokens.
///
/// Returns the minimum number of single-character insertions, deletions,
/// substitutions and adjacent transpositions required to turn `a` into `b`.
/// The result is symmetric and never exceeds `max(len(a), len(b))`.
///
/// If either token is longer than [`MAX_TOKEN_CHARS`], returns `max(m, n)`
/// without filling the matrix.
pub fn distance(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }
    if m > MAX_TOKEN_CHARS || n > MAX_TOKEN_CHARS {
        return m.max(n);
    }

    // Three rolling rows: transposition looks two rows back.
    let mut prev2 = vec![0usize; n + 1];
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);

            curr[j] = (prev[j] + 1) // deletion
                .min(curr[j - 1] + 1) // insertion
                .min(prev[j - 1] + cost); // substitution

            if i > 1
                && j > 1
                && a_chars[i - 1] == b_chars[j - 2]
                && a_chars[i - 2] == b_chars[j - 1]
            {
                curr[j] = curr[j].min(prev2[j - 2] + cost); // transposition
            }
        }
        std::mem::swap(&mut prev2, &mut prev);
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Similarity ratio between two tokens (0.0 = nothing in common, 1.0 = identical).
///
/// Two empty tokens are considered identical.
#[allow(clippy::cast_precision_loss)]
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let dist = distance(a, b);
    (max_len - dist) as f64 / max_len as f64
}

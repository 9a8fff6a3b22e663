//! Fuzzy matching of free-text answers against a known-correct string.
//!
//! Human input rarely matches byte-for-byte, so a round's answer is scored by
//! similarity instead of equality: character n-grams retrieve the reference
//! when the two strings share enough material, and a normalized edit-distance
//! ratio produces the final score. An answer is accepted when at least one
//! candidate scores at or above the configured acceptance threshold.

use std::collections::HashMap;

/// Gram sizes probed from most to least selective.
const GRAM_SIZES: [usize; 2] = [3, 2];
/// Floor below which a candidate is not worth returning at all.
const MIN_CANDIDATE_SCORE: f32 = 0.33;

/// Per-task fuzzy scorer built from the task's `rightAnswer`.
///
/// Matchers are session-local: they are attached to the round snapshot at
/// session start and never persisted.
#[derive(Debug, Clone)]
pub struct AnswerMatcher {
    reference: String,
    normalized: String,
    vectors: Vec<GramVector>,
}

#[derive(Debug, Clone)]
struct GramVector {
    size: usize,
    counts: HashMap<String, u32>,
    norm: f32,
}

impl GramVector {
    fn build(normalized: &str, size: usize) -> Self {
        let counts = gram_counts(normalized, size);
        let norm = vector_norm(&counts);
        Self { size, counts, norm }
    }

    /// Cosine similarity between this vector and `candidate`'s grams of the
    /// same size. Zero when the strings share no grams.
    fn cosine(&self, candidate: &str) -> f32 {
        let other = gram_counts(candidate, self.size);
        let dot: u64 = other
            .iter()
            .filter_map(|(gram, count)| {
                self.counts
                    .get(gram)
                    .map(|own| u64::from(*own) * u64::from(*count))
            })
            .sum();
        if dot == 0 {
            return 0.0;
        }
        dot as f32 / (self.norm * vector_norm(&other))
    }
}

impl AnswerMatcher {
    /// Build a matcher for `right_answer`.
    pub fn new(right_answer: &str) -> Self {
        let reference = right_answer.trim().to_string();
        let normalized = normalize(right_answer);
        let vectors = GRAM_SIZES
            .iter()
            .map(|size| GramVector::build(&normalized, *size))
            .collect();
        Self {
            reference,
            normalized,
            vectors,
        }
    }

    /// The known-correct string this matcher was built from.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Score `candidate` against the reference.
    ///
    /// Returns `(similarity, reference)` pairs ordered by descending
    /// similarity, or an empty list when nothing plausible matched. Empty and
    /// whitespace-only candidates always produce an empty list.
    pub fn score(&self, candidate: &str) -> Vec<(f32, String)> {
        let candidate = normalize(candidate);
        if candidate.is_empty() || self.normalized.is_empty() {
            return Vec::new();
        }
        if candidate == self.normalized {
            return vec![(1.0, self.reference.clone())];
        }

        // Most selective gram size first; fall back to the next size only
        // when the current one retrieves nothing above the floor.
        for vector in &self.vectors {
            if vector.cosine(&candidate) <= 0.0 {
                continue;
            }
            let similarity = distance_ratio(&candidate, &self.normalized);
            if similarity >= MIN_CANDIDATE_SCORE {
                return vec![(similarity, self.reference.clone())];
            }
        }

        Vec::new()
    }
}

/// Lower-case, strip everything but alphanumerics and spaces, collapse runs
/// of whitespace.
fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;
    for c in input.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else if c.is_whitespace() {
            pending_space = true;
        }
    }
    out
}

/// Count character n-grams of `size` over the '-'-padded input.
fn gram_counts(normalized: &str, size: usize) -> HashMap<String, u32> {
    let padded: Vec<char> = std::iter::once('-')
        .chain(normalized.chars())
        .chain(std::iter::once('-'))
        .collect();

    let mut counts = HashMap::new();
    if padded.len() < size {
        return counts;
    }
    for window in padded.windows(size) {
        let gram: String = window.iter().collect();
        *counts.entry(gram).or_insert(0) += 1;
    }
    counts
}

fn vector_norm(counts: &HashMap<String, u32>) -> f32 {
    let sum: u64 = counts.values().map(|c| u64::from(*c) * u64::from(*c)).sum();
    (sum as f32).sqrt()
}

/// Similarity as `1 - levenshtein / max_len`, in `[0, 1]`.
fn distance_ratio(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f32 / longest as f32
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

//! String similarity for fuzzy agent matching
//!
//! Trigram similarity follows the PostgreSQL `pg_trgm` definition: each word is
//! lowercased and padded with two leading spaces and one trailing space, and
//! the score is the Jaccard index of the two trigram sets.

use std::collections::HashSet;

/// Trigram set of a string
pub fn trigrams(value: &str) -> HashSet<String> {
    let mut grams = HashSet::new();

    for word in value
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let padded: Vec<char> = format!("  {} ", word).chars().collect();
        for window in padded.windows(3) {
            grams.insert(window.iter().collect());
        }
    }

    grams
}

/// Trigram similarity (0.0-1.0)
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    let grams_a = trigrams(a);
    let grams_b = trigrams(b);

    if grams_a.is_empty() || grams_b.is_empty() {
        return 0.0;
    }

    let shared = grams_a.intersection(&grams_b).count();
    let union = grams_a.len() + grams_b.len() - shared;

    shared as f64 / union as f64
}

/// Case-insensitive Jaro-Winkler similarity (0.0-1.0)
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a_normalized = a.to_lowercase();
    let b_normalized = b.to_lowercase();

    strsim::jaro_winkler(a_normalized.trim(), b_normalized.trim())
}

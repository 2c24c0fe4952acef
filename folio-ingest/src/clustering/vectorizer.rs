//! Character n-gram TF-IDF
//!
//! N-grams are taken inside word boundaries: each word is padded with one
//! space on either side and n-grams never span two words. IDF is smoothed
//! (`ln((1 + n) / (1 + df)) + 1`) and rows are L2-normalized.

use std::collections::{BTreeMap, HashMap};

/// Fit on `documents` and return their dense vectors, one row per document
pub fn fit_transform(ngram_min: usize, ngram_max: usize, documents: &[String]) -> Vec<Vec<f64>> {
    let counts: Vec<HashMap<String, usize>> = documents
        .iter()
        .map(|doc| count_ngrams(doc, ngram_min, ngram_max))
        .collect();

    let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
    for doc in &counts {
        for gram in doc.keys() {
            *document_frequency.entry(gram.clone()).or_insert(0) += 1;
        }
    }

    let n = documents.len() as f64;
    let mut vocabulary = HashMap::with_capacity(document_frequency.len());
    let mut idf = Vec::with_capacity(document_frequency.len());
    for (column, (gram, df)) in document_frequency.into_iter().enumerate() {
        vocabulary.insert(gram, column);
        idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
    }

    counts
        .iter()
        .map(|doc| weigh(doc, &vocabulary, &idf))
        .collect()
}

fn weigh(counts: &HashMap<String, usize>, vocabulary: &HashMap<String, usize>, idf: &[f64]) -> Vec<f64> {
    let mut row = vec![0.0; idf.len()];
    for (gram, count) in counts {
        if let Some(&column) = vocabulary.get(gram) {
            row[column] = *count as f64 * idf[column];
        }
    }

    let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        for v in &mut row {
            *v /= norm;
        }
    }
    row
}

/// Word-bounded character n-gram counts
fn count_ngrams(document: &str, ngram_min: usize, ngram_max: usize) -> HashMap<String, usize> {
    let mut counts = HashMap::new();

    for word in document.split_whitespace() {
        let padded: Vec<char> = format!(" {} ", word).chars().collect();
        for n in ngram_min..=ngram_max {
            if padded.len() <= n {
                // A word no longer than n is counted once, whole
                *counts.entry(padded.iter().collect()).or_insert(0) += 1;
                break;
            }
            for window in padded.windows(n) {
                *counts.entry(window.iter().collect()).or_insert(0) += 1;
            }
        }
    }

    counts
}

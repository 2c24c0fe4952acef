//! k-means with k-means++ seeding
//!
//! Single seeded run followed by Lloyd iterations. Deterministic for a given
//! seed and input order.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use thiserror::Error;

/// Structural clustering failures
#[derive(Debug, Error, PartialEq)]
pub enum KMeansError {
    #[error("No points to cluster")]
    EmptyInput,

    #[error("Cannot form {k} clusters from {points} points")]
    InvalidClusterCount { k: usize, points: usize },

    /// Fewer distinct points than requested clusters
    #[error("Only {distinct} distinct points for {k} clusters")]
    Degenerate { distinct: usize, k: usize },
}

/// Fitted clustering
#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone)]
pub struct KMeans {
    pub k: usize,
    pub max_iterations: usize,
    pub seed: u64,
}

impl KMeans {
    pub fn new(k: usize, max_iterations: usize, seed: u64) -> Self {
        Self {
            k,
            max_iterations,
            seed,
        }
    }

    pub fn fit(&self, points: &[Vec<f64>]) -> Result<KMeansFit, KMeansError> {
        if points.is_empty() {
            return Err(KMeansError::EmptyInput);
        }
        if self.k == 0 || self.k > points.len() {
            return Err(KMeansError::InvalidClusterCount {
                k: self.k,
                points: points.len(),
            });
        }
        let distinct = count_distinct(points);
        if distinct < self.k {
            return Err(KMeansError::Degenerate {
                distinct,
                k: self.k,
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = seed_centroids(points, self.k, &mut rng);
        let mut labels = assign(points, &centroids);
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;
            centroids = recompute_centroids(points, &labels, centroids);
            let next = assign(points, &centroids);
            if next == labels {
                break;
            }
            labels = next;
        }

        let inertia = points
            .iter()
            .zip(&labels)
            .map(|(p, &l)| squared_distance(p, &centroids[l]))
            .sum();

        Ok(KMeansFit {
            labels,
            centroids,
            inertia,
            iterations,
        })
    }
}

pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn count_distinct(points: &[Vec<f64>]) -> usize {
    points
        .iter()
        .map(|p| p.iter().map(|v| v.to_bits()).collect::<Vec<u64>>())
        .collect::<HashSet<_>>()
        .len()
}

/// k-means++: first centre uniform, later ones with probability ∝ D²
fn seed_centroids(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = vec![points[rng.gen_range(0..points.len())].clone()];
    let mut nearest: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = nearest.iter().sum();
        let chosen = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            let mut chosen = None;
            for (i, d) in nearest.iter().enumerate() {
                cumulative += d;
                if *d > 0.0 && cumulative >= target {
                    chosen = Some(i);
                    break;
                }
            }
            chosen.unwrap_or_else(|| farthest(&nearest))
        } else {
            farthest(&nearest)
        };

        let centre = points[chosen].clone();
        for (d, p) in nearest.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &centre));
        }
        centroids.push(centre);
    }

    centroids
}

fn farthest(distances: &[f64]) -> usize {
    let mut best = 0;
    for (i, d) in distances.iter().enumerate() {
        if *d > distances[best] {
            best = i;
        }
    }
    best
}

/// Nearest centroid per point; ties go to the lower centroid index
fn assign(points: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
    points
        .iter()
        .map(|p| {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (i, c) in centroids.iter().enumerate() {
                let d = squared_distance(p, c);
                if d < best_distance {
                    best = i;
                    best_distance = d;
                }
            }
            best
        })
        .collect()
}

/// Mean of each cluster; an emptied cluster takes the point farthest from its centroid
fn recompute_centroids(points: &[Vec<f64>], labels: &[usize], previous: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    let k = previous.len();
    let dims = points[0].len();
    let mut sums = vec![vec![0.0; dims]; k];
    let mut sizes = vec![0usize; k];

    for (p, &l) in points.iter().zip(labels) {
        sizes[l] += 1;
        for (s, v) in sums[l].iter_mut().zip(p) {
            *s += v;
        }
    }

    let mut centroids: Vec<Vec<f64>> = sums
        .into_iter()
        .zip(&sizes)
        .zip(previous)
        .map(|((sum, &size), old)| {
            if size == 0 {
                old
            } else {
                sum.into_iter().map(|s| s / size as f64).collect()
            }
        })
        .collect();

    for cluster in (0..k).filter(|&c| sizes[c] == 0) {
        let distances: Vec<f64> = points
            .iter()
            .zip(labels)
            .map(|(p, &l)| squared_distance(p, &centroids[l]))
            .collect();
        centroids[cluster] = points[farthest(&distances)].clone();
    }

    centroids
}

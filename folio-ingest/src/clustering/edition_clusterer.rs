//! Edition clustering
//!
//! Groups one work's instances into editions: instances sharing essentially
//! the same publisher, place and date profile. Runs as a batch pass over a
//! store snapshot and writes nothing.
//!
//! **Cluster count selection:**
//! 1. `max_k` = instance count (at least 2), scaled down for large works
//! 2. Coarse inertia curve over `1..=max_k` in steps of `⌊ln(max_k)^1.5 − 1⌋`
//! 3. Elbow: point farthest from the chord between first and last point
//! 4. Step-1 refinement around the coarse elbow

use crate::clustering::features::{EditionAttributes, EditionFeatures, EditionSource};
use crate::clustering::kmeans::{KMeans, KMeansError};
use crate::clustering::vectorizer;
use crate::config::ClusteringConfig;
use crate::db::agents::agent_names_with_role;
use crate::db::dates::load_date;
use crate::db::instances::instances_for_work;
use crate::db::OwnerKind;
use crate::error::IngestResult;
use crate::models::date_range::DateType;
use serde::Serialize;
use sqlx::SqliteConnection;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Role whose agents supply the publisher signal
pub const PUBLISHER_ROLE: &str = "publisher";

/// Instances of one edition sharing one year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditionGroup {
    pub year: i32,
    pub editions: Vec<EditionAttributes>,
}

/// Upper bound on k for `n` instances
pub fn max_k(n: usize) -> usize {
    let raw = n.max(2);
    if raw > 1000 {
        raw * 2 / 9
    } else if raw > 500 {
        raw * 3 / 9
    } else if raw > 250 {
        raw * 4 / 9
    } else {
        raw
    }
}

/// Coarse search step: `⌊ln(max_k)^1.5 − 1⌋`, at least 1
pub fn coarse_step(max_k: usize) -> usize {
    let step = (max_k as f64).ln().powf(1.5) - 1.0;
    if step.is_finite() && step >= 1.0 {
        step.floor() as usize
    } else {
        1
    }
}

/// k whose point lies farthest from the chord joining the curve's endpoints
///
/// Both axes are min-max scaled first so k and inertia weigh equally. Ties go
/// to the lowest k.
pub fn elbow(curve: &[(usize, f64)]) -> Option<usize> {
    let (first, last) = match (curve.first(), curve.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return None,
    };

    let k_span = (last.0 as f64 - first.0 as f64).max(f64::EPSILON);
    let (min_inertia, max_inertia) = curve
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, i)| (lo.min(*i), hi.max(*i)));
    let inertia_span = (max_inertia - min_inertia).max(f64::EPSILON);

    let scale = |(k, inertia): (usize, f64)| {
        (
            (k as f64 - first.0 as f64) / k_span,
            (inertia - min_inertia) / inertia_span,
        )
    };

    let (x1, y1) = scale(first);
    let (x2, y2) = scale(last);
    let chord = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();

    let mut best = first.0;
    let mut best_distance = 0.0;
    for &point in curve {
        let (x, y) = scale(point);
        let distance = if chord > 0.0 {
            ((y2 - y1) * x - (x2 - x1) * y + x2 * y1 - y2 * x1).abs() / chord
        } else {
            0.0
        };
        if distance > best_distance + 1e-12 {
            best = point.0;
            best_distance = distance;
        }
    }

    Some(best)
}

/// Edition clusterer
pub struct EditionClusterer {
    config: ClusteringConfig,
}

impl EditionClusterer {
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    /// Load a work's instances with their publishers and publication dates
    pub async fn load_sources(conn: &mut SqliteConnection, work_id: Uuid) -> IngestResult<Vec<EditionSource>> {
        let mut sources = Vec::new();

        for instance in instances_for_work(conn, work_id).await? {
            let publishers = agent_names_with_role(conn, OwnerKind::Instance, instance.guid, PUBLISHER_ROLE).await?;
            let pub_date = load_date(conn, OwnerKind::Instance, instance.guid, &DateType::Publication).await?;
            sources.push(EditionSource {
                instance,
                publishers,
                pub_date,
            });
        }

        Ok(sources)
    }

    /// Editions of one work, ordered by year
    pub async fn editions_for_work(&self, conn: &mut SqliteConnection, work_id: Uuid) -> IngestResult<Vec<EditionGroup>> {
        let sources = Self::load_sources(conn, work_id).await?;
        let groups = self.cluster(&sources);

        info!(
            work_id = %work_id,
            instances = sources.len(),
            groups = groups.len(),
            "Edition clustering complete"
        );

        Ok(groups)
    }

    /// Group instances into editions; ineligible instances are left out
    pub fn cluster(&self, sources: &[EditionSource]) -> Vec<EditionGroup> {
        let eligible: Vec<(&EditionSource, EditionFeatures)> = sources
            .iter()
            .map(|s| (s, EditionFeatures::extract(s)))
            .filter(|(_, f)| f.is_eligible())
            .collect();

        if eligible.is_empty() {
            return Vec::new();
        }

        let features: Vec<&EditionFeatures> = eligible.iter().map(|(_, f)| f).collect();
        let labels = if eligible.len() == 1 {
            vec![0]
        } else {
            let points = self.feature_matrix(&features);
            let k = self.select_k(&points);
            match KMeans::new(k, self.config.max_iterations, self.config.seed).fit(&points) {
                Ok(fit) => fit.labels,
                Err(e) => {
                    warn!(k, error = %e, "Edition clustering failed, using a single cluster");
                    vec![0; eligible.len()]
                }
            }
        };

        let mut grouped: BTreeMap<(usize, i32), Vec<EditionAttributes>> = BTreeMap::new();
        for ((source, features), label) in eligible.iter().zip(labels) {
            grouped
                .entry((label, features.year))
                .or_default()
                .push(EditionAttributes::from_source(source));
        }

        let mut groups: Vec<EditionGroup> = grouped
            .into_iter()
            .map(|((_, year), editions)| EditionGroup { year, editions })
            .collect();
        // Stable: equal years keep cluster-label order
        groups.sort_by_key(|g| g.year);
        groups
    }

    /// Weighted place n-grams, publisher n-grams and min-max scaled year
    fn feature_matrix(&self, features: &[&EditionFeatures]) -> Vec<Vec<f64>> {
        let cfg = &self.config;
        let places: Vec<String> = features.iter().map(|f| f.place.clone()).collect();
        let publishers: Vec<String> = features.iter().map(|f| f.publisher.clone()).collect();

        let place_vectors = vectorizer::fit_transform(cfg.ngram_min, cfg.ngram_max, &places);
        let publisher_vectors = vectorizer::fit_transform(cfg.ngram_min, cfg.ngram_max, &publishers);

        let min_year = features.iter().map(|f| f.year).min().unwrap_or(0);
        let max_year = features.iter().map(|f| f.year).max().unwrap_or(0);
        let year_span = (max_year - min_year) as f64;

        features
            .iter()
            .zip(place_vectors)
            .zip(publisher_vectors)
            .map(|((f, place), publisher)| {
                let scaled_year = if year_span > 0.0 {
                    (f.year - min_year) as f64 / year_span
                } else {
                    0.0
                };

                place
                    .into_iter()
                    .map(|v| v * cfg.place_weight)
                    .chain(publisher.into_iter().map(|v| v * cfg.publisher_weight))
                    .chain(std::iter::once(scaled_year * cfg.year_weight))
                    .collect()
            })
            .collect()
    }

    /// Inertia for each k until clustering degenerates
    fn inertia_curve(&self, points: &[Vec<f64>], ks: impl Iterator<Item = usize>) -> Vec<(usize, f64)> {
        let mut curve = Vec::new();

        for k in ks {
            match KMeans::new(k, self.config.max_iterations, self.config.seed).fit(points) {
                Ok(fit) => curve.push((k, fit.inertia)),
                Err(KMeansError::Degenerate { distinct, .. }) => {
                    debug!(k, distinct, "Clustering degenerate, stopping k search");
                    break;
                }
                Err(e) => {
                    debug!(k, error = %e, "Clustering failed, stopping k search");
                    break;
                }
            }
        }

        curve
    }

    /// Cluster count by coarse then step-1 elbow search
    pub fn select_k(&self, points: &[Vec<f64>]) -> usize {
        if points.len() <= 1 {
            return 1;
        }

        let upper = max_k(points.len()).min(points.len());
        let step = coarse_step(upper);

        let coarse = self.inertia_curve(points, (1..=upper).step_by(step));
        let coarse_k = elbow(&coarse).unwrap_or(1);

        if step == 1 {
            debug!(k = coarse_k, "Selected cluster count");
            return coarse_k;
        }

        let low = coarse_k.saturating_sub(step).max(1);
        let high = (coarse_k + step).min(upper);
        let refined = self.inertia_curve(points, low..=high);
        let k = elbow(&refined).unwrap_or(coarse_k);

        debug!(coarse_k, k, step, "Selected cluster count");
        k
    }
}

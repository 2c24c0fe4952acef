//! Edition clustering
//!
//! - `features`: publisher / place / year signals per instance
//! - `vectorizer`: character n-gram TF-IDF
//! - `kmeans`: seeded k-means++
//! - `edition_clusterer`: cluster-count selection and edition grouping

pub mod edition_clusterer;
pub mod features;
pub mod kmeans;
pub mod vectorizer;

pub use edition_clusterer::{EditionClusterer, EditionGroup};
pub use features::{EditionAttributes, EditionFeatures, EditionSource};
pub use kmeans::{KMeans, KMeansError, KMeansFit};

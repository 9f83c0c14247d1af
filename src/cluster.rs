//! Clustering algorithms that label every row of a feature matrix
//!
//! The splitter in [`crate::split`] only depends on [`ClusterAlgorithm`];
//! everything else in this module is a concrete variant of it.

use linfa::traits::{Fit, Predict, Transformer};
use linfa::DatasetBase;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use linfa_preprocessing::linear_scaling::LinearScaler;
use log::debug;
use ndarray::{Array1, Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Anything that can be fitted on a feature matrix and assign one label per row.
///
/// Implementations are re-fitted on every call. Whether two calls on the same
/// input agree is up to the implementation (e.g. whether it is seeded).
pub trait ClusterAlgorithm {
    /// Cluster label type. Only equality, hashing and ordering are used.
    type Label: Clone + Eq + Hash + Ord + Debug;

    /// Fit on `features` and return the label of each row, in row order.
    fn fit_predict(&self, features: ArrayView2<'_, f64>) -> crate::Result<Vec<Self::Label>>;
}

impl<C: ClusterAlgorithm + ?Sized> ClusterAlgorithm for &C {
    type Label = C::Label;

    fn fit_predict(&self, features: ArrayView2<'_, f64>) -> crate::Result<Vec<Self::Label>> {
        (**self).fit_predict(features)
    }
}

/// K-Means clustering backed by `linfa-clustering`
#[derive(Debug, Clone)]
pub struct KMeansClustering {
    n_clusters: usize,
    max_iters: u64,
    tolerance: f64,
    n_runs: usize,
    seed: Option<u64>,
}

impl KMeansClustering {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iters: 300,
            tolerance: 1e-4,
            n_runs: 10,
            seed: None,
        }
    }

    /// Maximum Lloyd iterations per run.
    pub fn max_iters(mut self, max_iters: u64) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Convergence tolerance on centroid movement.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Number of restarts; the lowest-inertia run wins.
    pub fn n_runs(mut self, n_runs: usize) -> Self {
        self.n_runs = n_runs;
        self
    }

    /// Fix the random state. Every call then starts from the same RNG state
    /// and produces the same labels for the same input.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl ClusterAlgorithm for KMeansClustering {
    type Label = usize;

    fn fit_predict(&self, features: ArrayView2<'_, f64>) -> crate::Result<Vec<usize>> {
        let n_samples = features.nrows();
        if self.n_clusters == 0 {
            anyhow::bail!("K-Means needs at least one cluster");
        }
        if n_samples < self.n_clusters {
            anyhow::bail!(
                "Number of data points ({}) must be at least equal to number of clusters ({})",
                n_samples,
                self.n_clusters
            );
        }

        let dataset = DatasetBase::from(features.to_owned());
        let model = KMeans::params_with(self.n_clusters, self.rng(), L2Dist)
            .max_n_iterations(self.max_iters)
            .tolerance(self.tolerance)
            .n_runs(self.n_runs)
            .fit(&dataset)?;

        let labels: Array1<usize> = model.predict(dataset.records());
        debug!(
            "k-means fitted {} rows into {} clusters",
            n_samples, self.n_clusters
        );

        Ok(labels.to_vec())
    }
}

/// Standardize every column to zero mean and unit variance, then cluster.
///
/// The scaler is re-fitted on each call, on exactly the matrix being clustered.
#[derive(Debug, Clone)]
pub struct Standardized<C> {
    inner: C,
}

impl<C: ClusterAlgorithm> Standardized<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: ClusterAlgorithm> ClusterAlgorithm for Standardized<C> {
    type Label = C::Label;

    fn fit_predict(&self, features: ArrayView2<'_, f64>) -> crate::Result<Vec<C::Label>> {
        let dataset = DatasetBase::from(features.to_owned());
        let scaler = LinearScaler::<f64>::standard().fit(&dataset)?;
        let scaled: Array2<f64> = scaler.transform(features.to_owned());
        self.inner.fit_predict(scaled.view())
    }
}

/// Linkage criterion for [`Agglomerative`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    /// Closest pair of points across the two clusters
    Single,
    /// Farthest pair of points across the two clusters
    Complete,
    /// Size-weighted mean pairwise distance (UPGMA)
    Average,
    /// Smallest increase in within-cluster variance
    Ward,
}

/// Bottom-up hierarchical clustering, cut at a fixed number of clusters.
///
/// Deterministic: ties are broken by lowest row index. Labels are `0..k`,
/// numbered by the first row of each cluster.
#[derive(Debug, Clone)]
pub struct Agglomerative {
    n_clusters: usize,
    linkage: Linkage,
}

impl Agglomerative {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            linkage: Linkage::Ward,
        }
    }

    pub fn linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Lance-Williams update of the distance between `i ∪ j` and `k`.
    fn merged_distance(&self, d_ik: f64, d_jk: f64, d_ij: f64, ni: f64, nj: f64, nk: f64) -> f64 {
        match self.linkage {
            Linkage::Single => d_ik.min(d_jk),
            Linkage::Complete => d_ik.max(d_jk),
            Linkage::Average => (ni * d_ik + nj * d_jk) / (ni + nj),
            // operates on squared euclidean distances
            Linkage::Ward => ((ni + nk) * d_ik + (nj + nk) * d_jk - nk * d_ij) / (ni + nj + nk),
        }
    }
}

impl ClusterAlgorithm for Agglomerative {
    type Label = usize;

    fn fit_predict(&self, features: ArrayView2<'_, f64>) -> crate::Result<Vec<usize>> {
        let n = features.nrows();
        if self.n_clusters == 0 || self.n_clusters > n {
            anyhow::bail!(
                "n_clusters must be between 1 and {} (number of rows), got {}",
                n,
                self.n_clusters
            );
        }
        if features.iter().any(|v| !v.is_finite()) {
            anyhow::bail!("agglomerative clustering requires finite feature values");
        }

        let squared = self.linkage == Linkage::Ward;
        let mut dist = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in (i + 1)..n {
                let d_sq: f64 = features
                    .row(i)
                    .iter()
                    .zip(features.row(j).iter())
                    .map(|(a, b)| (a - b).powi(2))
                    .sum();
                if !d_sq.is_finite() {
                    anyhow::bail!("distance between rows {i} and {j} overflows f64");
                }
                let d = if squared { d_sq } else { d_sq.sqrt() };
                dist[[i, j]] = d;
                dist[[j, i]] = d;
            }
        }

        // cluster id of each row; a cluster is identified by one surviving row
        let mut assignment: Vec<usize> = (0..n).collect();
        let mut sizes = vec![1_usize; n];
        let mut active = vec![true; n];

        for _ in 0..(n - self.n_clusters) {
            let alive: Vec<usize> = (0..n).filter(|&c| active[c]).collect();

            let mut best = (0, 0, f64::INFINITY);
            for (a, &ci) in alive.iter().enumerate() {
                for &cj in &alive[a + 1..] {
                    if dist[[ci, cj]] < best.2 {
                        best = (ci, cj, dist[[ci, cj]]);
                    }
                }
            }
            let (keep, absorb, d_ij) = best;
            if keep == absorb || !d_ij.is_finite() {
                anyhow::bail!(
                    "no finite linkage distance left with {} clusters remaining",
                    alive.len()
                );
            }

            let ni = sizes[keep] as f64;
            let nj = sizes[absorb] as f64;
            for &ck in &alive {
                if ck == keep || ck == absorb {
                    continue;
                }
                let d_new = self.merged_distance(
                    dist[[keep, ck]],
                    dist[[absorb, ck]],
                    d_ij,
                    ni,
                    nj,
                    sizes[ck] as f64,
                );
                dist[[keep, ck]] = d_new;
                dist[[ck, keep]] = d_new;
            }

            active[absorb] = false;
            sizes[keep] += sizes[absorb];
            for slot in assignment.iter_mut().filter(|slot| **slot == absorb) {
                *slot = keep;
            }
        }

        let mut relabel = HashMap::new();
        let labels: Vec<usize> = assignment
            .iter()
            .map(|cluster| {
                let next = relabel.len();
                *relabel.entry(*cluster).or_insert(next)
            })
            .collect();

        Ok(labels)
    }
}

/// Precomputed labels, returned as-is on every call.
///
/// Useful for leave-one-group-out over known groups, and as a stand-in
/// clustering in tests.
#[derive(Debug, Clone)]
pub struct FixedLabels<L> {
    labels: Vec<L>,
}

impl<L> FixedLabels<L> {
    pub fn new(labels: Vec<L>) -> Self {
        Self { labels }
    }
}

impl<L: Clone + Eq + Hash + Ord + Debug> ClusterAlgorithm for FixedLabels<L> {
    type Label = L;

    fn fit_predict(&self, features: ArrayView2<'_, f64>) -> crate::Result<Vec<L>> {
        if self.labels.len() != features.nrows() {
            anyhow::bail!(
                "{} fixed label(s) cannot label {} row(s)",
                self.labels.len(),
                features.nrows()
            );
        }
        Ok(self.labels.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn create_two_blobs() -> Array2<f64> {
        Array2::from_shape_vec(
            (6, 2),
            vec![
                0.0, 0.0, // blob A
                0.2, 0.1, //
                0.1, 0.3, //
                10.0, 10.0, // blob B
                10.3, 9.8, //
                9.9, 10.2, //
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_kmeans_separates_blobs() {
        let x = create_two_blobs();
        let labels = KMeansClustering::new(2).seed(7).fit_predict(x.view()).unwrap();

        assert_eq!(labels.len(), 6);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn test_seeded_kmeans_is_repeatable() {
        let x = create_two_blobs();
        let algo = KMeansClustering::new(3).seed(42);
        let first = algo.fit_predict(x.view()).unwrap();
        let second = algo.fit_predict(x.view()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_kmeans_invalid_cluster_count() {
        let x = create_two_blobs();
        assert!(KMeansClustering::new(0).fit_predict(x.view()).is_err());
        assert!(KMeansClustering::new(7).fit_predict(x.view()).is_err());
    }

    #[test]
    fn test_standardized_ignores_column_scale() {
        // the middle column dominates raw distances; once every column has
        // unit variance the two outer columns carry the grouping
        let x = array![
            [0.0, 1000.0, 0.0],
            [0.0, 2000.0, 0.0],
            [0.0, 3000.0, 0.0],
            [1.0, 1000.0, 1.0],
            [1.0, 2000.0, 1.0],
            [1.0, 3000.0, 1.0],
        ];
        let raw = Agglomerative::new(2).fit_predict(x.view()).unwrap();
        assert_eq!(raw[0], raw[3]);

        let scaled = Standardized::new(Agglomerative::new(2))
            .fit_predict(x.view())
            .unwrap();
        assert_eq!(scaled, vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_agglomerative_ward_recovers_blobs() {
        let x = create_two_blobs();
        let labels = Agglomerative::new(2).fit_predict(x.view()).unwrap();
        assert_eq!(labels, vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_agglomerative_linkages_agree_on_separated_data() {
        let x = create_two_blobs();
        for linkage in [Linkage::Single, Linkage::Complete, Linkage::Average] {
            let labels = Agglomerative::new(2)
                .linkage(linkage)
                .fit_predict(x.view())
                .unwrap();
            assert_eq!(labels, vec![0, 0, 0, 1, 1, 1], "linkage {:?}", linkage);
        }
    }

    #[test]
    fn test_agglomerative_one_cluster_per_row() {
        let x = create_two_blobs();
        let labels = Agglomerative::new(6).fit_predict(x.view()).unwrap();
        assert_eq!(labels, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_agglomerative_rejects_non_finite() {
        let x = array![[0.0, f64::NAN], [1.0, 1.0]];
        assert!(Agglomerative::new(1).fit_predict(x.view()).is_err());
    }

    #[test]
    fn test_agglomerative_rejects_overflowing_distances() {
        let x = array![[0.0], [1e200], [-1e200], [2e200]];
        for linkage in [Linkage::Ward, Linkage::Single, Linkage::Average] {
            let result = Agglomerative::new(2).linkage(linkage).fit_predict(x.view());
            assert!(result.is_err(), "linkage {:?} returned {:?}", linkage, result);
        }
    }

    #[test]
    fn test_fixed_labels_length_check() {
        let x = create_two_blobs();
        let algo = FixedLabels::new(vec!["a", "b"]);
        assert!(algo.fit_predict(x.view()).is_err());

        let algo = FixedLabels::new(vec!["a", "a", "b", "b", "c", "c"]);
        assert_eq!(algo.fit_predict(x.view()).unwrap().len(), 6);
    }
}

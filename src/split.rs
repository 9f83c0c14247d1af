//! Cross-validation splitters: leave-one-cluster-out and K-fold
//!
//! Both implement [`CrossValidator`], so any evaluation loop written against
//! the trait can swap a random K-fold split for a cluster-based one.

use crate::cluster::ClusterAlgorithm;
use crate::data::{FeatureMatrix, Fold};
use crate::error::SplitError;
use log::{debug, warn};
use ndarray::ArrayView1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeSet, HashSet};

/// Produces a sequence of train/test folds over the rows of a feature matrix.
pub trait CrossValidator {
    type Splits: Iterator<Item = Fold>;

    /// Partition the rows of `x`. `y` is accepted so every splitter can be
    /// called the same way; splitters that do not need it ignore it.
    fn split(
        &self,
        x: &FeatureMatrix,
        y: Option<ArrayView1<'_, f64>>,
    ) -> Result<Self::Splits, SplitError>;

    /// Number of folds a call to [`CrossValidator::split`] would produce.
    fn n_splits(
        &self,
        x: &FeatureMatrix,
        y: Option<ArrayView1<'_, f64>>,
    ) -> Result<usize, SplitError>;
}

/// Order in which clusters are turned into folds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelOrder {
    /// Order in which each label first appears in row order
    #[default]
    FirstSeen,
    /// Ascending label value
    Sorted,
}

/// Leave-one-cluster-out cross-validation.
///
/// Every call to [`split`](CrossValidator::split) or
/// [`n_splits`](CrossValidator::n_splits) re-fits the clustering algorithm on
/// the given matrix. Nothing is cached: with an unseeded algorithm two calls
/// can disagree, both with each other and with `n_splits`. Callers that need
/// the same folds twice must seed the algorithm.
#[derive(Debug, Clone)]
pub struct LocoSplitter<C> {
    algorithm: C,
    order: LabelOrder,
}

impl<C: ClusterAlgorithm> LocoSplitter<C> {
    pub fn new(algorithm: C) -> Self {
        Self {
            algorithm,
            order: LabelOrder::default(),
        }
    }

    pub fn label_order(mut self, order: LabelOrder) -> Self {
        self.order = order;
        self
    }

    /// Run the clustering and return the labels with their distinct values.
    fn cluster(&self, x: &FeatureMatrix) -> Result<(Vec<C::Label>, Vec<C::Label>), SplitError> {
        let labels = self.algorithm.fit_predict(x.view())?;
        if labels.len() != x.nrows() {
            return Err(SplitError::LabelCountMismatch {
                labels: labels.len(),
                rows: x.nrows(),
            });
        }

        let distinct = match self.order {
            LabelOrder::FirstSeen => {
                let mut seen = HashSet::new();
                labels
                    .iter()
                    .filter(|label| seen.insert(*label))
                    .cloned()
                    .collect()
            }
            LabelOrder::Sorted => labels
                .iter()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .cloned()
                .collect(),
        };

        Ok((labels, distinct))
    }
}

impl<C: ClusterAlgorithm> CrossValidator for LocoSplitter<C> {
    type Splits = LocoSplits<C::Label>;

    fn split(
        &self,
        x: &FeatureMatrix,
        _y: Option<ArrayView1<'_, f64>>,
    ) -> Result<LocoSplits<C::Label>, SplitError> {
        let (labels, distinct) = self.cluster(x)?;
        if distinct.len() < 2 {
            warn!(
                "clustering of {} rows produced {} distinct label(s)",
                x.nrows(),
                distinct.len()
            );
            return Err(SplitError::InsufficientClusters {
                found: distinct.len(),
            });
        }

        debug!(
            "leave-one-cluster-out: {} rows in {} clusters",
            x.nrows(),
            distinct.len()
        );

        Ok(LocoSplits {
            labels,
            remaining: distinct.into_iter(),
        })
    }

    /// Re-fits the clustering and counts distinct labels. Unlike `split`,
    /// a single-cluster result is returned as `1` rather than an error.
    fn n_splits(
        &self,
        x: &FeatureMatrix,
        _y: Option<ArrayView1<'_, f64>>,
    ) -> Result<usize, SplitError> {
        let (_, distinct) = self.cluster(x)?;
        Ok(distinct.len())
    }
}

/// Lazily yields one fold per cluster: the cluster's rows are the test set.
#[derive(Debug, Clone)]
pub struct LocoSplits<L> {
    labels: Vec<L>,
    remaining: std::vec::IntoIter<L>,
}

impl<L: PartialEq> Iterator for LocoSplits<L> {
    type Item = Fold;

    fn next(&mut self) -> Option<Fold> {
        let label = self.remaining.next()?;
        Some(Fold::from_mask(self.labels.iter().map(|l| *l == label)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.remaining.size_hint()
    }
}

impl<L: PartialEq> ExactSizeIterator for LocoSplits<L> {}

/// K-fold cross-validator.
///
/// Rows are split into `n_splits` consecutive folds whose sizes differ by at
/// most one; the first `n_samples % n_splits` folds get the extra row.
#[derive(Debug, Clone)]
pub struct KFold {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    /// Seed the shuffle. Implies shuffling.
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self.shuffle = true;
        self
    }

    fn folds(&self, n_samples: usize) -> Result<Vec<Fold>, SplitError> {
        if self.n_splits < 2 || self.n_splits > n_samples {
            return Err(SplitError::InvalidFoldCount {
                n_splits: self.n_splits,
                n_samples,
            });
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            let mut rng = match self.random_state {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            indices.shuffle(&mut rng);
        }

        let fold_size = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for i in 0..self.n_splits {
            let end = start + fold_size + usize::from(i < remainder);

            let mut mask = vec![false; n_samples];
            for &idx in &indices[start..end] {
                mask[idx] = true;
            }
            folds.push(Fold::from_mask(mask));

            start = end;
        }

        Ok(folds)
    }
}

impl CrossValidator for KFold {
    type Splits = std::vec::IntoIter<Fold>;

    fn split(
        &self,
        x: &FeatureMatrix,
        _y: Option<ArrayView1<'_, f64>>,
    ) -> Result<Self::Splits, SplitError> {
        Ok(self.folds(x.nrows())?.into_iter())
    }

    fn n_splits(
        &self,
        _x: &FeatureMatrix,
        _y: Option<ArrayView1<'_, f64>>,
    ) -> Result<usize, SplitError> {
        Ok(self.n_splits)
    }
}

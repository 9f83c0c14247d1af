//! Error types for cross-validation splitting

use thiserror::Error;

/// Errors raised while producing train/test partitions.
#[derive(Debug, Error)]
pub enum SplitError {
    /// The clustering produced fewer than two distinct labels, so there is no
    /// meaningful train/test distinction.
    #[error("clustering produced {found} distinct label(s); leave-one-cluster-out needs at least 2")]
    InsufficientClusters {
        /// Number of distinct labels actually found
        found: usize,
    },

    /// A K-fold splitter was configured with an unusable fold count.
    #[error("cannot split {n_samples} sample(s) into {n_splits} folds; need 2 <= folds <= samples")]
    InvalidFoldCount {
        /// Requested number of folds
        n_splits: usize,
        /// Number of rows available
        n_samples: usize,
    },

    /// The clustering algorithm returned the wrong number of labels.
    #[error("clustering returned {labels} label(s) for {rows} row(s)")]
    LabelCountMismatch {
        /// Number of labels returned
        labels: usize,
        /// Number of rows in the feature matrix
        rows: usize,
    },

    /// The target vector does not line up with the feature matrix.
    #[error("target vector has {targets} value(s) but feature matrix has {rows} row(s)")]
    TargetLengthMismatch {
        /// Length of the target vector
        targets: usize,
        /// Number of rows in the feature matrix
        rows: usize,
    },

    /// The feature matrix itself is malformed.
    #[error("invalid feature matrix: {0}")]
    InvalidMatrix(String),

    /// Failure inside the clustering algorithm's own fit step.
    #[error(transparent)]
    Clustering(#[from] anyhow::Error),
}

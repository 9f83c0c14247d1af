//! loco-cv: leave-one-cluster-out cross-validation
//!
//! Folds are formed by clustering the feature space: each cluster in turn is
//! held out as the test set and the model is trained on the rest. Compared to
//! random K-fold this estimates how a model does on regions of feature space
//! it has not seen.

pub mod cli;
pub mod cluster;
pub mod data;
pub mod error;
pub mod evaluate;
pub mod split;
pub mod synthetic;

// Re-export public items for easier access
pub use cli::Args;
pub use cluster::{
    Agglomerative, ClusterAlgorithm, FixedLabels, KMeansClustering, Linkage, Standardized,
};
pub use data::{FeatureMatrix, Fold};
pub use error::SplitError;
pub use evaluate::{
    cross_val_predict, cross_validate, pearson, CrossValidationReport, FoldScore, LinearRegressor,
    MeanRegressor, Regressor,
};
pub use split::{CrossValidator, KFold, LabelOrder, LocoSplits, LocoSplitter};
pub use synthetic::{make_clustered_regression, SyntheticData};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;

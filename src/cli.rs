//! Command-line interface definitions and argument parsing

use clap::{Parser, ValueEnum};

/// Clustering used to form leave-one-cluster-out folds
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Method {
    /// Standardize, then K-Means
    Kmeans,
    /// Standardize, then Ward agglomerative clustering
    Ward,
}

/// Compare K-fold and leave-one-cluster-out cross-validation on clustered data
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Number of clusters used to build LOCO folds
    #[arg(short = 'k', long, default_value = "4")]
    pub clusters: usize,

    /// Number of blobs in the generated dataset
    #[arg(long, default_value = "4")]
    pub blobs: usize,

    /// Rows generated per blob
    #[arg(long, default_value = "25")]
    pub per_blob: usize,

    /// Number of features per row
    #[arg(long, default_value = "3")]
    pub features: usize,

    /// Number of folds for the K-fold baseline
    #[arg(long, default_value = "5")]
    pub folds: usize,

    /// Seed for data generation, K-fold shuffling and clustering
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Clustering method for LOCO folds
    #[arg(long, value_enum, default_value_t = Method::Kmeans)]
    pub method: Method,

    /// Maximum K-Means iterations per run
    #[arg(long, default_value = "300")]
    pub max_iters: u64,

    /// K-Means convergence tolerance
    #[arg(long, default_value = "1e-4")]
    pub tolerance: f64,

    /// Number of K-Means initializations; the best run is kept
    #[arg(long, default_value = "10")]
    pub n_runs: usize,

    /// Log level: error, warn, info, debug or trace
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Print every fold, not just the summary
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Check cross-field constraints clap cannot express.
    pub fn validate(&self) -> crate::Result<()> {
        let n_samples = self.blobs * self.per_blob;
        if self.clusters < 2 {
            anyhow::bail!("LOCO needs at least 2 clusters, got {}", self.clusters);
        }
        if self.clusters > n_samples {
            anyhow::bail!(
                "Number of clusters ({}) exceeds number of generated rows ({})",
                self.clusters,
                n_samples
            );
        }
        if self.folds < 2 || self.folds > n_samples {
            anyhow::bail!(
                "K-fold needs between 2 and {} folds, got {}",
                n_samples,
                self.folds
            );
        }
        if self.max_iters == 0 || self.n_runs == 0 {
            anyhow::bail!("--max-iters and --n-runs must be positive");
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            anyhow::bail!("Tolerance must be a positive number, got {}", self.tolerance);
        }
        Ok(())
    }

    /// Parse `--log-level` into a filter for the logger.
    pub fn level_filter(&self) -> crate::Result<log::LevelFilter> {
        self.log_level
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid log level: {}", self.log_level))
    }
}

//! Feature matrix and fold containers shared by splitters and evaluators

use crate::error::SplitError;
use ndarray::{Array2, ArrayView2, Axis};

/// Immutable feature matrix with labeled columns
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    features: Array2<f64>,
    columns: Vec<String>,
}

impl FeatureMatrix {
    /// Wrap a `(n_rows, n_columns)` array with one name per column.
    ///
    /// Fails if the matrix has no rows or the column names do not match the
    /// number of columns.
    pub fn new(features: Array2<f64>, columns: Vec<String>) -> Result<Self, SplitError> {
        if features.nrows() == 0 {
            return Err(SplitError::InvalidMatrix(
                "feature matrix must have at least one row".to_string(),
            ));
        }
        if columns.len() != features.ncols() {
            return Err(SplitError::InvalidMatrix(format!(
                "{} column name(s) given for {} column(s)",
                columns.len(),
                features.ncols()
            )));
        }

        Ok(Self { features, columns })
    }

    /// Wrap a matrix, naming its columns `x0`, `x1`, ...
    pub fn unlabeled(features: Array2<f64>) -> Result<Self, SplitError> {
        let columns = (0..features.ncols()).map(|j| format!("x{j}")).collect();
        Self::new(features, columns)
    }

    pub fn nrows(&self) -> usize {
        self.features.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.features.ncols()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.features.view()
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.features
    }

    /// Copy out the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Array2<f64> {
        self.features.select(Axis(0), indices)
    }
}

/// One cross-validation round: rows to train on and rows to evaluate on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Training row indices, ascending
    pub train: Vec<usize>,
    /// Test row indices, ascending
    pub test: Vec<usize>,
}

impl Fold {
    /// Build a fold from a test mask; the train set is the complement.
    pub fn from_mask(mask: impl IntoIterator<Item = bool>) -> Self {
        let mut train = Vec::new();
        let mut test = Vec::new();
        for (i, in_test) in mask.into_iter().enumerate() {
            if in_test {
                test.push(i);
            } else {
                train.push(i);
            }
        }
        Self { train, test }
    }

    /// Total number of rows covered by this fold.
    pub fn n_samples(&self) -> usize {
        self.train.len() + self.test.len()
    }
}

//! Cross-validated evaluation of a regressor under any [`CrossValidator`]

use crate::data::FeatureMatrix;
use crate::error::SplitError;
use crate::split::CrossValidator;
use anyhow::Context;
use linfa::prelude::*;
use linfa_linear::LinearRegression;
use log::debug;
use ndarray::{stack, Array1, ArrayView1, ArrayView2, Axis};
use ndarray_stats::CorrelationExt;

/// A regression model that can be trained on one set of rows and queried on another.
pub trait Regressor {
    /// Fit on `(x_train, y_train)` and return one prediction per row of `x_test`.
    fn fit_predict(
        &self,
        x_train: ArrayView2<'_, f64>,
        y_train: ArrayView1<'_, f64>,
        x_test: ArrayView2<'_, f64>,
    ) -> crate::Result<Array1<f64>>;
}

/// Ordinary least squares from `linfa-linear`
#[derive(Debug, Clone)]
pub struct LinearRegressor {
    fit_intercept: bool,
}

impl LinearRegressor {
    pub fn new() -> Self {
        Self {
            fit_intercept: true,
        }
    }

    pub fn with_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }
}

impl Default for LinearRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Regressor for LinearRegressor {
    fn fit_predict(
        &self,
        x_train: ArrayView2<'_, f64>,
        y_train: ArrayView1<'_, f64>,
        x_test: ArrayView2<'_, f64>,
    ) -> crate::Result<Array1<f64>> {
        let dataset = Dataset::new(x_train.to_owned(), y_train.to_owned());
        let model = LinearRegression::new()
            .with_intercept(self.fit_intercept)
            .fit(&dataset)?;
        let predictions: Array1<f64> = model.predict(&x_test.to_owned());
        Ok(predictions)
    }
}

/// Predicts the training-set mean for every row
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanRegressor;

impl Regressor for MeanRegressor {
    fn fit_predict(
        &self,
        _x_train: ArrayView2<'_, f64>,
        y_train: ArrayView1<'_, f64>,
        x_test: ArrayView2<'_, f64>,
    ) -> crate::Result<Array1<f64>> {
        let mean = y_train
            .mean()
            .ok_or_else(|| anyhow::anyhow!("cannot fit a mean on an empty training set"))?;
        Ok(Array1::from_elem(x_test.nrows(), mean))
    }
}

/// Error metrics of one fold
#[derive(Debug, Clone, PartialEq)]
pub struct FoldScore {
    /// Position of the fold in the split sequence
    pub fold: usize,
    pub n_train: usize,
    pub n_test: usize,
    /// Root mean squared error on the test rows
    pub rmse: f64,
    /// Mean absolute error on the test rows
    pub mae: f64,
}

/// Per-fold scores plus the out-of-fold prediction for every row.
#[derive(Debug, Clone)]
pub struct CrossValidationReport {
    pub folds: Vec<FoldScore>,
    /// `predictions[i]` was made by the model that did not see row `i`
    pub predictions: Array1<f64>,
}

impl CrossValidationReport {
    /// Mean RMSE across folds.
    pub fn mean_rmse(&self) -> f64 {
        if self.folds.is_empty() {
            return 0.0;
        }
        self.folds.iter().map(|f| f.rmse).sum::<f64>() / self.folds.len() as f64
    }

    /// Population standard deviation of the per-fold RMSE.
    pub fn std_rmse(&self) -> f64 {
        if self.folds.is_empty() {
            return 0.0;
        }
        let mean = self.mean_rmse();
        let variance = self
            .folds
            .iter()
            .map(|f| (f.rmse - mean).powi(2))
            .sum::<f64>()
            / self.folds.len() as f64;
        variance.sqrt()
    }

    pub fn min_rmse(&self) -> f64 {
        self.folds.iter().map(|f| f.rmse).fold(f64::INFINITY, f64::min)
    }

    pub fn max_rmse(&self) -> f64 {
        self.folds
            .iter()
            .map(|f| f.rmse)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Out-of-fold predictions: every row is predicted by the model trained on
/// the fold where that row was held out.
pub fn cross_val_predict<R, V>(
    model: &R,
    x: &FeatureMatrix,
    y: ArrayView1<'_, f64>,
    cv: &V,
) -> crate::Result<Array1<f64>>
where
    R: Regressor,
    V: CrossValidator,
{
    Ok(cross_validate(model, x, y, cv)?.predictions)
}

/// Train and score `model` on every fold produced by `cv`.
///
/// Fails if a row lands in more than one test set or in none.
pub fn cross_validate<R, V>(
    model: &R,
    x: &FeatureMatrix,
    y: ArrayView1<'_, f64>,
    cv: &V,
) -> crate::Result<CrossValidationReport>
where
    R: Regressor,
    V: CrossValidator,
{
    let n_samples = x.nrows();
    if y.len() != n_samples {
        return Err(SplitError::TargetLengthMismatch {
            targets: y.len(),
            rows: n_samples,
        }
        .into());
    }

    let mut predictions = Array1::from_elem(n_samples, f64::NAN);
    let mut covered = vec![false; n_samples];
    let mut folds = Vec::new();

    for (fold_idx, fold) in cv.split(x, Some(y))?.enumerate() {
        let x_train = x.select_rows(&fold.train);
        let y_train = y.select(Axis(0), &fold.train);
        let x_test = x.select_rows(&fold.test);
        let y_test = y.select(Axis(0), &fold.test);

        let fold_predictions = model
            .fit_predict(x_train.view(), y_train.view(), x_test.view())
            .with_context(|| format!("model failed on fold {fold_idx}"))?;
        if fold_predictions.len() != fold.test.len() {
            anyhow::bail!(
                "model returned {} prediction(s) for {} test row(s) on fold {}",
                fold_predictions.len(),
                fold.test.len(),
                fold_idx
            );
        }

        let rmse = fold_predictions.mean_squared_error(&y_test)?.sqrt();
        let mae = fold_predictions.mean_absolute_error(&y_test)?;

        for (&row, &value) in fold.test.iter().zip(fold_predictions.iter()) {
            if covered[row] {
                anyhow::bail!("row {row} appears in more than one test fold");
            }
            covered[row] = true;
            predictions[row] = value;
        }

        debug!(
            "fold {}: train={} test={} rmse={:.4} mae={:.4}",
            fold_idx,
            fold.train.len(),
            fold.test.len(),
            rmse,
            mae
        );

        folds.push(FoldScore {
            fold: fold_idx,
            n_train: fold.train.len(),
            n_test: fold.test.len(),
            rmse,
            mae,
        });
    }

    if let Some(row) = covered.iter().position(|&c| !c) {
        anyhow::bail!("row {row} was never in a test fold");
    }

    Ok(CrossValidationReport { folds, predictions })
}

/// Pearson correlation of two equally long series.
///
/// Returns `None` for fewer than two values, mismatched lengths, or a series
/// with zero variance.
pub fn pearson(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let paired = stack![Axis(0), a, b];
    let r = paired.pearson_correlation().ok()?[[0, 1]];
    r.is_finite().then_some(r)
}

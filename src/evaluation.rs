//! Regression metrics over `(rating, prediction)` pairs.

use std::fmt;
use std::str::FromStr;

use crate::als::Prediction;
use crate::error::{RecommenderError, Result};

/// Scores a set of predictions.
pub trait Evaluator: Send + Sync {
    /// Metric value. `NaN` when there is nothing to score or a prediction is `NaN`.
    fn evaluate(&self, predictions: &[Prediction]) -> f64;

    fn is_larger_better(&self) -> bool;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegressionMetric {
    /// sqrt(mean((p - r)²)), lower is better
    #[default]
    Rmse,
    Mse,
    Mae,
    /// Coefficient of determination, higher is better
    R2,
}

impl RegressionMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegressionMetric::Rmse => "rmse",
            RegressionMetric::Mse => "mse",
            RegressionMetric::Mae => "mae",
            RegressionMetric::R2 => "r2",
        }
    }
}

impl FromStr for RegressionMetric {
    type Err = RecommenderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rmse" => Ok(RegressionMetric::Rmse),
            "mse" => Ok(RegressionMetric::Mse),
            "mae" => Ok(RegressionMetric::Mae),
            "r2" => Ok(RegressionMetric::R2),
            other => Err(RecommenderError::invalid_parameter(
                "metric",
                other,
                "expected one of rmse, mse, mae, r2",
            )),
        }
    }
}

impl fmt::Display for RegressionMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compares the `rating` column against the `prediction` column.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegressionEvaluator {
    metric: RegressionMetric,
}

impl RegressionEvaluator {
    pub fn new(metric: RegressionMetric) -> Self {
        Self { metric }
    }

    pub fn metric(&self) -> RegressionMetric {
        self.metric
    }
}

impl Evaluator for RegressionEvaluator {
    fn evaluate(&self, predictions: &[Prediction]) -> f64 {
        if predictions.is_empty() {
            return f64::NAN;
        }
        let n = predictions.len() as f64;
        let residuals = predictions
            .iter()
            .map(|p| p.prediction - p.rating as f64);

        match self.metric {
            RegressionMetric::Rmse => (residuals.map(|d| d * d).sum::<f64>() / n).sqrt(),
            RegressionMetric::Mse => residuals.map(|d| d * d).sum::<f64>() / n,
            RegressionMetric::Mae => residuals.map(f64::abs).sum::<f64>() / n,
            RegressionMetric::R2 => {
                let mean = predictions.iter().map(|p| p.rating as f64).sum::<f64>() / n;
                let ss_tot: f64 = predictions
                    .iter()
                    .map(|p| (p.rating as f64 - mean).powi(2))
                    .sum();
                let ss_res: f64 = residuals.map(|d| d * d).sum();
                if ss_tot == 0.0 {
                    if ss_res == 0.0 {
                        1.0
                    } else {
                        f64::NEG_INFINITY
                    }
                } else {
                    1.0 - ss_res / ss_tot
                }
            }
        }
    }

    fn is_larger_better(&self) -> bool {
        matches!(self.metric, RegressionMetric::R2)
    }

    fn name(&self) -> &str {
        self.metric.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn preds(pairs: &[(i32, f64)]) -> Vec<Prediction> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, &(rating, prediction))| Prediction {
                item: i as i32,
                user: 0,
                rating,
                prediction,
            })
            .collect()
    }

    #[test]
    fn test_rmse_perfect() {
        let p = preds(&[(1, 1.0), (2, 2.0), (3, 3.0)]);
        assert_abs_diff_eq!(RegressionEvaluator::default().evaluate(&p), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rmse_known_value() {
        // residuals 1 and 2 → sqrt((1 + 4) / 2)
        let p = preds(&[(0, 1.0), (0, 2.0)]);
        let evaluator = RegressionEvaluator::new(RegressionMetric::Rmse);
        assert_eq!(evaluator.metric(), RegressionMetric::Rmse);
        let rmse = evaluator.evaluate(&p);
        assert_abs_diff_eq!(rmse, 2.5f64.sqrt(), epsilon = 1e-12);
        assert!(!RegressionEvaluator::default().is_larger_better());
    }

    #[test]
    fn test_other_metrics() {
        let p = preds(&[(0, 1.0), (0, -3.0)]);
        assert_abs_diff_eq!(RegressionEvaluator::new(RegressionMetric::Mse).evaluate(&p), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(RegressionEvaluator::new(RegressionMetric::Mae).evaluate(&p), 2.0, epsilon = 1e-12);

        let p = preds(&[(1, 1.0), (3, 3.0)]);
        let r2 = RegressionEvaluator::new(RegressionMetric::R2);
        assert_abs_diff_eq!(r2.evaluate(&p), 1.0, epsilon = 1e-12);
        assert!(r2.is_larger_better());
    }

    #[test]
    fn test_empty_and_nan_inputs() {
        let evaluator = RegressionEvaluator::default();
        assert!(evaluator.evaluate(&[]).is_nan());
        assert!(evaluator.evaluate(&preds(&[(1, f64::NAN), (2, 2.0)])).is_nan());
    }

    #[test]
    fn test_parse_metric() {
        assert_eq!("RMSE".parse::<RegressionMetric>().unwrap(), RegressionMetric::Rmse);
        assert_eq!("r2".parse::<RegressionMetric>().unwrap().to_string(), "r2");
        assert!("logloss".parse::<RegressionMetric>().is_err());
    }
}

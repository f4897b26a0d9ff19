//! ALS recommender for recreation facility reservations.
//!
//! Loads `item,user,rating` reservations, holds out a test split, picks ALS
//! hyperparameters by k-fold cross-validation and scores the selected model on the
//! held-out rows.

pub mod als;
pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod session;
pub mod tuning;

use std::collections::HashSet;

use tracing::info;

pub use als::{Als, AlsModel, AlsParams, ColdStartStrategy, Prediction};
pub use config::{Cli, GridValues, PipelineConfig};
pub use data::{load_csv_file, train_test_split, Rating, RatingTable};
pub use error::{RecommenderError, Result};
pub use evaluation::{Evaluator, RegressionEvaluator, RegressionMetric};
pub use session::{ComputeSession, MemorySize, SessionConfig};
pub use tuning::{CrossValidator, CrossValidatorModel, ParamGridBuilder};

/// What a pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub best_model: AlsModel,
    pub best_params: AlsParams,
    pub avg_metrics: Vec<f64>,
    pub metric: RegressionMetric,
    /// Score of the best model on the test split
    pub test_metric: f64,
    pub total_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Test rows left after cold start handling
    pub evaluated_rows: usize,
}

/// Load, split, tune, refit and score, with all work on the session's workers.
pub fn run_pipeline(session: &ComputeSession, config: &PipelineConfig) -> Result<PipelineReport> {
    config.validate()?;

    session.install(|| -> Result<PipelineReport> {
        info!(
            app = %session.config().app_name,
            data = %config.data_path.display(),
            "running recommender pipeline"
        );
        let df = load_csv_file(&config.data_path)?;
        let (train_df, test_df) = train_test_split(&df, config.train_fraction, config.seed)?;
        info!(train = train_df.height(), test = test_df.height(), "split ratings");

        let train = session.cache(&train_df)?;
        let test = RatingTable::from_frame(&test_df)?;

        let grid = ParamGridBuilder::new(config.base_params.clone())
            .add_max_iter(config.grid.max_iter.clone())
            .add_rank(config.grid.rank.clone())
            .add_reg_param(config.grid.reg_param.clone())
            .build()?;

        reserve_factor_memory(session, &grid, &train)?;

        let evaluator = RegressionEvaluator::new(config.metric);
        let mut cv = CrossValidator::new(grid, evaluator).with_num_folds(config.num_folds);
        if let Some(seed) = config.seed {
            cv = cv.with_seed(seed);
        }
        info!(
            candidates = config.grid.len(),
            folds = config.num_folds,
            metric = cv.evaluator().name(),
            "cross-validating ALS"
        );
        let cv_model = cv.fit(&train)?;

        session.reserve_driver(cv_model.best_model.factor_bytes(), "best model factors")?;

        let predictions = cv_model.best_model.transform(&test);
        let test_metric = evaluator.evaluate(&predictions);
        if !test_metric.is_finite() {
            return Err(RecommenderError::ValidationError(format!(
                "test {} is not finite ({} of {} test rows could be scored)",
                evaluator.name(),
                predictions.len(),
                test.len()
            )));
        }
        info!(
            metric = evaluator.name(),
            value = test_metric,
            scored = predictions.len(),
            "evaluated best model on test split"
        );

        Ok(PipelineReport {
            best_model: cv_model.best_model,
            best_params: cv_model.best_params,
            avg_metrics: cv_model.avg_metrics,
            metric: evaluator.metric(),
            test_metric,
            total_rows: df.height(),
            train_rows: train.len(),
            test_rows: test.len(),
            evaluated_rows: predictions.len(),
        })
    })
}

/// The largest candidate's factors must fit in executor memory.
fn reserve_factor_memory(
    session: &ComputeSession,
    grid: &[AlsParams],
    train: &RatingTable,
) -> Result<()> {
    let users = train.iter().map(|r| r.user).collect::<HashSet<_>>().len();
    let items = train.iter().map(|r| r.item).collect::<HashSet<_>>().len();
    let largest = grid
        .iter()
        .map(|p| p.factor_bytes(users, items))
        .max()
        .unwrap_or(0);
    session.reserve_executor(train.estimated_bytes() + largest, "ratings and factor matrices")
}

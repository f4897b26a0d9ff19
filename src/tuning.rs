//! Hyperparameter grid and k-fold model selection for ALS.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::als::{Als, AlsModel, AlsParams};
use crate::data::RatingTable;
use crate::error::{RecommenderError, Result};
use crate::evaluation::Evaluator;

/// Seed for fold assignment when none is configured.
pub const DEFAULT_CV_SEED: u64 = 0x0c55_f01d;

/// Builds the Cartesian product of parameter axes over a base configuration.
#[derive(Debug, Clone)]
pub struct ParamGridBuilder {
    base: AlsParams,
    max_iter: Option<Vec<usize>>,
    rank: Option<Vec<usize>>,
    reg_param: Option<Vec<f64>>,
}

impl ParamGridBuilder {
    pub fn new(base: AlsParams) -> Self {
        Self {
            base,
            max_iter: None,
            rank: None,
            reg_param: None,
        }
    }

    pub fn add_max_iter(mut self, values: impl Into<Vec<usize>>) -> Self {
        self.max_iter = Some(values.into());
        self
    }

    pub fn add_rank(mut self, values: impl Into<Vec<usize>>) -> Self {
        self.rank = Some(values.into());
        self
    }

    pub fn add_reg_param(mut self, values: impl Into<Vec<f64>>) -> Self {
        self.reg_param = Some(values.into());
        self
    }

    /// Every combination, iterating `reg_param` fastest and `max_iter` slowest.
    pub fn build(self) -> Result<Vec<AlsParams>> {
        let max_iter = axis("max_iter", self.max_iter, self.base.max_iter)?;
        let rank = axis("rank", self.rank, self.base.rank)?;
        let reg_param = axis("reg_param", self.reg_param, self.base.reg_param)?;

        let mut grid = Vec::with_capacity(max_iter.len() * rank.len() * reg_param.len());
        for &m in &max_iter {
            for &r in &rank {
                for &reg in &reg_param {
                    grid.push(
                        self.base
                            .clone()
                            .with_max_iter(m)
                            .with_rank(r)
                            .with_reg_param(reg),
                    );
                }
            }
        }
        Ok(grid)
    }
}

fn axis<T: Copy>(name: &str, values: Option<Vec<T>>, base: T) -> Result<Vec<T>> {
    match values {
        None => Ok(vec![base]),
        Some(v) if v.is_empty() => Err(RecommenderError::invalid_parameter(
            name,
            "[]",
            "a grid axis needs at least one value",
        )),
        Some(v) => Ok(v),
    }
}

/// A single train/validation split of row indices
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Shuffled k-fold split. Fold sizes differ by at most one.
pub fn k_fold_split(n_samples: usize, n_splits: usize, seed: u64) -> Result<Vec<CVSplit>> {
    if n_splits < 2 {
        return Err(RecommenderError::ValidationError(
            "n_splits must be at least 2".to_string(),
        ));
    }
    if n_samples < n_splits {
        return Err(RecommenderError::ValidationError(format!(
            "n_samples ({}) must be >= n_splits ({})",
            n_samples, n_splits
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    indices.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));

    let base = n_samples / n_splits;
    let remainder = n_samples % n_splits;

    let mut splits = Vec::with_capacity(n_splits);
    let mut current = 0;
    for fold_idx in 0..n_splits {
        let fold_size = if fold_idx < remainder { base + 1 } else { base };
        let test_indices = indices[current..current + fold_size].to_vec();
        let train_indices = indices[..current]
            .iter()
            .chain(indices[current + fold_size..].iter())
            .copied()
            .collect();

        splits.push(CVSplit {
            train_indices,
            test_indices,
            fold_idx,
        });
        current += fold_size;
    }

    Ok(splits)
}

/// Selects ALS parameters by k-fold cross-validation.
pub struct CrossValidator<E: Evaluator> {
    grid: Vec<AlsParams>,
    evaluator: E,
    num_folds: usize,
    seed: u64,
}

impl<E: Evaluator> CrossValidator<E> {
    pub fn new(grid: Vec<AlsParams>, evaluator: E) -> Self {
        Self {
            grid,
            evaluator,
            num_folds: 3,
            seed: DEFAULT_CV_SEED,
        }
    }

    pub fn with_num_folds(mut self, num_folds: usize) -> Self {
        self.num_folds = num_folds;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn fit(&self, table: &RatingTable) -> Result<CrossValidatorModel> {
        if self.grid.is_empty() {
            return Err(RecommenderError::ValidationError(
                "parameter grid is empty".to_string(),
            ));
        }
        for params in &self.grid {
            params.validate()?;
        }

        let splits = k_fold_split(table.len(), self.num_folds, self.seed)?;
        let mut avg_metrics = vec![0.0; self.grid.len()];

        for split in &splits {
            let train = table.select(&split.train_indices);
            let validation = table.select(&split.test_indices);

            for (idx, params) in self.grid.iter().enumerate() {
                let model = Als::new(params.clone()).fit(&train)?;
                let metric = self.evaluator.evaluate(&model.transform(&validation));
                debug!(
                    fold = split.fold_idx,
                    %params,
                    metric,
                    "validated candidate"
                );
                avg_metrics[idx] += metric / self.num_folds as f64;
            }
        }

        for (params, metric) in self.grid.iter().zip(&avg_metrics) {
            info!(%params, "average {} = {}", self.evaluator.name(), metric);
        }

        let chosen = best_index(&avg_metrics, self.evaluator.is_larger_better()).ok_or_else(|| {
            RecommenderError::ValidationError(format!(
                "no candidate produced a finite {}",
                self.evaluator.name()
            ))
        })?;
        let best_params = self.grid[chosen].clone();
        info!(
            %best_params,
            metric = avg_metrics[chosen],
            "selected best parameters, refitting on all {} rows",
            table.len()
        );

        let best_model = Als::new(best_params.clone()).fit(table)?;

        Ok(CrossValidatorModel {
            best_model,
            best_params,
            grid: self.grid.clone(),
            avg_metrics,
        })
    }
}

/// Index of the best finite metric. The earliest candidate wins ties.
fn best_index(metrics: &[f64], larger_is_better: bool) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &m) in metrics.iter().enumerate() {
        if !m.is_finite() {
            continue;
        }
        let better = match best {
            None => true,
            Some((_, current)) if larger_is_better => m > current,
            Some((_, current)) => m < current,
        };
        if better {
            best = Some((idx, m));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Outcome of cross-validation
#[derive(Debug, Clone)]
pub struct CrossValidatorModel {
    pub best_model: AlsModel,
    pub best_params: AlsParams,
    pub grid: Vec<AlsParams>,
    /// Mean validation metric per grid entry, in grid order
    pub avg_metrics: Vec<f64>,
}

impl CrossValidatorModel {
    pub fn best_model(&self) -> &AlsModel {
        &self.best_model
    }
}

//! Command line and environment configuration.

use std::path::PathBuf;

use clap::Parser;

use crate::als::{AlsParams, ColdStartStrategy};
use crate::error::{RecommenderError, Result};
use crate::evaluation::RegressionMetric;
use crate::session::{MemorySize, SessionConfig, DEFAULT_APP_NAME, DEFAULT_MEMORY};

pub const DEFAULT_DATA_PATH: &str = "REC_Collaborative_Facility.csv";

#[derive(Parser, Debug, Clone)]
#[command(name = "facility-recommender")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train an ALS recommender on facility reservations and report held-out error")]
pub struct Cli {
    /// Ratings CSV with a header row and item,user,rating columns
    #[arg(short, long, env = "REC_DATA_PATH", default_value = DEFAULT_DATA_PATH)]
    pub data: PathBuf,

    #[arg(long, env = "REC_APP_NAME", default_value = DEFAULT_APP_NAME)]
    pub app_name: String,

    /// Executor memory budget (e.g. 8g, 512m)
    #[arg(long, env = "REC_EXECUTOR_MEMORY", default_value = DEFAULT_MEMORY)]
    pub executor_memory: String,

    /// Driver memory budget (e.g. 8g, 512m)
    #[arg(long, env = "REC_DRIVER_MEMORY", default_value = DEFAULT_MEMORY)]
    pub driver_memory: String,

    /// Worker threads (defaults to all cores)
    #[arg(long, env = "REC_THREADS")]
    pub threads: Option<usize>,

    /// Seed for the train/test split; unseeded runs are not reproducible
    #[arg(long, env = "REC_SEED")]
    pub seed: Option<u64>,

    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,

    /// Cross-validation folds
    #[arg(long, default_value_t = 3)]
    pub folds: usize,

    #[arg(long, value_delimiter = ',', default_values_t = vec![5, 10, 25])]
    pub max_iter: Vec<usize>,

    #[arg(long, value_delimiter = ',', default_values_t = vec![10, 50, 100])]
    pub rank: Vec<usize>,

    #[arg(long, value_delimiter = ',', default_values_t = vec![0.001, 0.01, 0.1])]
    pub reg_param: Vec<f64>,

    /// Confidence scale for implicit feedback
    #[arg(long, default_value_t = 1.0)]
    pub alpha: f64,

    /// Treat ratings as explicit scores instead of implicit feedback
    #[arg(long)]
    pub explicit: bool,

    /// Cold start handling: drop or nan
    #[arg(long, default_value = "drop")]
    pub cold_start: String,

    /// Evaluation metric: rmse, mse, mae or r2
    #[arg(long, default_value = "rmse")]
    pub metric: String,
}

impl Cli {
    pub fn into_config(self) -> Result<PipelineConfig> {
        let mut base = AlsParams::default()
            .with_implicit_prefs(!self.explicit)
            .with_alpha(self.alpha)
            .with_cold_start(self.cold_start.parse()?);
        if let Some(seed) = self.seed {
            base = base.with_seed(seed);
        }

        let config = PipelineConfig {
            data_path: self.data,
            session: SessionConfig {
                app_name: self.app_name,
                executor_memory: self.executor_memory.parse::<MemorySize>()?,
                driver_memory: self.driver_memory.parse::<MemorySize>()?,
                parallelism: self.threads,
            },
            train_fraction: self.train_fraction,
            num_folds: self.folds,
            seed: self.seed,
            grid: GridValues {
                max_iter: self.max_iter,
                rank: self.rank,
                reg_param: self.reg_param,
            },
            base_params: base,
            metric: self.metric.parse()?,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Values swept by cross-validation
#[derive(Debug, Clone, PartialEq)]
pub struct GridValues {
    pub max_iter: Vec<usize>,
    pub rank: Vec<usize>,
    pub reg_param: Vec<f64>,
}

impl Default for GridValues {
    fn default() -> Self {
        Self {
            max_iter: vec![5, 10, 25],
            rank: vec![10, 50, 100],
            reg_param: vec![0.001, 0.01, 0.1],
        }
    }
}

impl GridValues {
    pub fn len(&self) -> usize {
        self.max_iter.len() * self.rank.len() * self.reg_param.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything a pipeline run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub data_path: PathBuf,
    pub session: SessionConfig,
    pub train_fraction: f64,
    pub num_folds: usize,
    /// Seeds the train/test split and the fold assignment
    pub seed: Option<u64>,
    pub grid: GridValues,
    pub base_params: AlsParams,
    pub metric: RegressionMetric,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            session: SessionConfig::default(),
            train_fraction: 0.8,
            num_folds: 3,
            seed: None,
            grid: GridValues::default(),
            base_params: AlsParams::default()
                .with_implicit_prefs(true)
                .with_cold_start(ColdStartStrategy::Drop),
            metric: RegressionMetric::Rmse,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(RecommenderError::invalid_parameter(
                "train_fraction",
                self.train_fraction,
                "must lie strictly between 0 and 1",
            ));
        }
        if self.num_folds < 2 {
            return Err(RecommenderError::invalid_parameter(
                "folds",
                self.num_folds,
                "must be at least 2",
            ));
        }
        if self.grid.is_empty() {
            return Err(RecommenderError::ConfigError(
                "every grid axis needs at least one value".to_string(),
            ));
        }
        self.base_params.validate()
    }
}

//! Compute session: a scoped worker pool with executor and driver memory budgets.
//!
//! The session owns the rayon pool every fit runs on. Dropping it tears the pool down,
//! so an early `?` return in the pipeline still stops the session.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use polars::prelude::DataFrame;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info};

use crate::data::RatingTable;
use crate::error::{RecommenderError, Result};

pub const DEFAULT_APP_NAME: &str = "recreation.gov reservations";
pub const DEFAULT_MEMORY: &str = "8g";

const UNITS: [(char, u32); 4] = [('t', 40), ('g', 30), ('m', 20), ('k', 10)];

/// A byte count written the JVM way: `512`, `64k`, `512m`, `8g`, `1t` (optional `b`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MemorySize(u64);

impl MemorySize {
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> u64 {
        self.0
    }
}

impl FromStr for MemorySize {
    type Err = RecommenderError;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim().to_ascii_lowercase();
        let bad = |reason: &str| RecommenderError::ConfigError(format!("invalid memory size '{}': {}", s, reason));

        let body = raw.strip_suffix('b').unwrap_or(&raw);
        if body.is_empty() {
            return Err(bad("empty"));
        }

        let (digits, shift) = match body.chars().last() {
            Some(c) if c.is_ascii_digit() => (body, 0),
            Some(c) => match UNITS.iter().find(|(unit, _)| *unit == c) {
                Some((_, shift)) => (&body[..body.len() - 1], *shift),
                None => return Err(bad("unknown unit")),
            },
            None => return Err(bad("empty")),
        };

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(bad("expected a non-negative integer"));
        }

        let value: u64 = digits.parse().map_err(|_| bad("too large"))?;
        value
            .checked_mul(1u64 << shift)
            .map(MemorySize)
            .ok_or_else(|| bad("too large"))
    }
}

impl fmt::Display for MemorySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (unit, shift) in UNITS {
            let scale = 1u64 << shift;
            if self.0 >= scale && self.0 % scale == 0 {
                return write!(f, "{}{}", self.0 / scale, unit);
            }
        }
        write!(f, "{}", self.0)
    }
}

/// Startup settings for a [`ComputeSession`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub app_name: String,
    /// Bounds the cached training data and the solver's working set.
    pub executor_memory: MemorySize,
    /// Bounds what is collected back into the caller, i.e. the selected model.
    pub driver_memory: MemorySize,
    /// Worker threads; `None` uses every available core.
    pub parallelism: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let eight_gib = MemorySize::from_bytes(8 << 30);
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            executor_memory: eight_gib,
            driver_memory: eight_gib,
            parallelism: None,
        }
    }
}

/// A running compute session.
pub struct ComputeSession {
    config: SessionConfig,
    pool: ThreadPool,
    started: Instant,
}

impl ComputeSession {
    pub fn start(config: SessionConfig) -> Result<Self> {
        if config.parallelism == Some(0) {
            return Err(RecommenderError::invalid_parameter(
                "parallelism",
                0,
                "must be at least 1",
            ));
        }

        let prefix: String = config
            .app_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        let mut builder = ThreadPoolBuilder::new().thread_name(move |i| format!("{}-worker-{}", prefix, i));
        if let Some(n) = config.parallelism {
            builder = builder.num_threads(n);
        }
        let pool = builder
            .build()
            .map_err(|e| RecommenderError::SessionError(e.to_string()))?;

        info!(
            app = %config.app_name,
            executor_memory = %config.executor_memory,
            driver_memory = %config.driver_memory,
            threads = pool.current_num_threads(),
            "compute session started"
        );

        Ok(Self {
            config,
            pool,
            started: Instant::now(),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn parallelism(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `op` on the session's workers. Parallel iterators inside `op` use this pool.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Materialize a frame as an in-memory table for repeated fitting.
    pub fn cache(&self, frame: &DataFrame) -> Result<RatingTable> {
        let table = RatingTable::from_frame(frame)?;
        self.reserve_executor(table.estimated_bytes(), "cached ratings")?;
        debug!(rows = table.len(), bytes = table.estimated_bytes(), "cached ratings table");
        Ok(table)
    }

    pub fn reserve_executor(&self, bytes: u64, what: &str) -> Result<()> {
        check_budget(bytes, self.config.executor_memory, "executor memory", what)
    }

    pub fn reserve_driver(&self, bytes: u64, what: &str) -> Result<()> {
        check_budget(bytes, self.config.driver_memory, "driver memory", what)
    }

    /// Stop the session. Equivalent to dropping it.
    pub fn stop(self) {}
}

impl Drop for ComputeSession {
    fn drop(&mut self) {
        info!(
            app = %self.config.app_name,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "compute session stopped"
        );
    }
}

fn check_budget(bytes: u64, limit: MemorySize, budget: &'static str, what: &str) -> Result<()> {
    if bytes > limit.bytes() {
        return Err(RecommenderError::MemoryBudget {
            what: what.to_string(),
            budget,
            required: bytes,
            limit: limit.bytes(),
        });
    }
    Ok(())
}

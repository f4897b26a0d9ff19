//! Loading, splitting and caching the reservations ratings.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use crate::error::{RecommenderError, Result};

pub const ITEM_COL: &str = "item";
pub const USER_COL: &str = "user";
pub const RATING_COL: &str = "rating";

/// Column order of a ratings frame.
pub const RATING_COLUMNS: [&str; 3] = [ITEM_COL, USER_COL, RATING_COL];

/// One (item, user, rating) observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rating {
    pub item: i32,
    pub user: i32,
    pub rating: i32,
}

/// Raw read schema. Every column is read as text so padding can be trimmed before parsing.
pub fn rating_schema() -> Schema {
    RATING_COLUMNS
        .iter()
        .map(|name| Field::new(name, DataType::String))
        .collect()
}

/// Read a ratings CSV into a frame of three `Int32` columns: item, user, rating.
///
/// The header row is skipped and the fixed schema names the columns. A field that does not
/// parse as an integer is read as null, and rows holding a null are dropped.
pub fn load_csv_file<P: AsRef<Path>>(file_path: P) -> Result<DataFrame> {
    let path = file_path.as_ref();
    let file = File::open(path).map_err(|e| {
        RecommenderError::DataError(format!("cannot open {}: {}", path.display(), e))
    })?;

    let raw = CsvReadOptions::default()
        .with_has_header(true)
        .with_schema(Some(Arc::new(rating_schema())))
        .with_parse_options(CsvParseOptions::default().with_truncate_ragged_lines(true))
        .into_reader_with_file_handle(file)
        .finish()?;

    let columns = RATING_COLUMNS
        .iter()
        .map(|name| parse_int_column(&raw, name))
        .collect::<Result<Vec<_>>>()?;
    let parsed = DataFrame::new(columns)?;

    let df = parsed.drop_nulls::<String>(None)?;
    let dropped = raw.height() - df.height();
    if dropped > 0 {
        warn!(dropped, path = %path.display(), "dropped malformed rating rows");
    }

    info!("Loaded {} rows and {} columns", df.height(), df.width());

    Ok(df)
}

fn parse_int_column(raw: &DataFrame, name: &str) -> Result<Series> {
    let values = raw.column(name)?.str()?;
    let parsed = Int32Chunked::from_iter_options(
        name,
        values
            .into_iter()
            .map(|v| v.and_then(|s| s.trim().parse::<i32>().ok())),
    );
    Ok(parsed.into_series())
}

/// Shuffle row indices and cut them so `train_fraction` of the rows land in the first frame.
///
/// Without a seed the shuffle draws from OS entropy and the split differs run to run.
pub fn train_test_split(
    df: &DataFrame,
    train_fraction: f64,
    seed: Option<u64>,
) -> Result<(DataFrame, DataFrame)> {
    if !(train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(RecommenderError::invalid_parameter(
            "train_fraction",
            train_fraction,
            "must lie strictly between 0 and 1",
        ));
    }

    let mut indices: Vec<IdxSize> = (0..df.height() as IdxSize).collect();

    let mut rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    indices.shuffle(&mut rng);

    let split_idx = (df.height() as f64 * train_fraction) as usize;

    let train_indices = IdxCa::from_vec("", indices[..split_idx].to_vec());
    let test_indices = IdxCa::from_vec("", indices[split_idx..].to_vec());

    let train_df = df.take(&train_indices)?;
    let test_df = df.take(&test_indices)?;

    Ok((train_df, test_df))
}

/// Row-oriented, in-memory copy of a ratings frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingTable {
    rows: Vec<Rating>,
}

impl RatingTable {
    pub fn new(rows: Vec<Rating>) -> Self {
        Self { rows }
    }

    /// Build from a frame, checking it has the three `Int32` rating columns in order.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let names = df.get_column_names();
        if names != RATING_COLUMNS {
            return Err(RecommenderError::DataError(format!(
                "expected columns {:?}, found {:?}",
                RATING_COLUMNS, names
            )));
        }

        let items = df.column(ITEM_COL)?.i32()?;
        let users = df.column(USER_COL)?.i32()?;
        let ratings = df.column(RATING_COL)?.i32()?;

        let rows = items
            .into_iter()
            .zip(users.into_iter())
            .zip(ratings.into_iter())
            .enumerate()
            .map(|(i, ((item, user), rating))| match (item, user, rating) {
                (Some(item), Some(user), Some(rating)) => Ok(Rating { item, user, rating }),
                _ => Err(RecommenderError::DataError(format!("null value in row {}", i))),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Rating] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rating> {
        self.rows.iter()
    }

    /// Copy out the rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            rows: indices.iter().map(|&i| self.rows[i]).collect(),
        }
    }

    pub fn estimated_bytes(&self) -> u64 {
        (self.rows.len() * std::mem::size_of::<Rating>()) as u64
    }
}

impl FromIterator<Rating> for RatingTable {
    fn from_iter<I: IntoIterator<Item = Rating>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

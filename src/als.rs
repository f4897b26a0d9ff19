//! Alternating Least Squares matrix factorization
//!
//! Factorizes the sparse user × item ratings matrix into rank-`k` user and item factor
//! matrices. Supports explicit ratings and implicit feedback, where a rating is a confidence
//! weight on a binary preference (Hu, Koren & Volinsky, 2008).

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayView1};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use tracing::debug;

use crate::data::RatingTable;
use crate::error::{RecommenderError, Result};

/// Seed used for factor initialization when none is configured.
pub const DEFAULT_SEED: u64 = 1_994_790_107;

/// What `transform` does with rows whose user or item was not seen during fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColdStartStrategy {
    /// Keep the row with a `NaN` prediction
    #[default]
    Nan,
    /// Remove the row from the output
    Drop,
}

impl FromStr for ColdStartStrategy {
    type Err = RecommenderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nan" => Ok(ColdStartStrategy::Nan),
            "drop" => Ok(ColdStartStrategy::Drop),
            other => Err(RecommenderError::invalid_parameter(
                "cold_start",
                other,
                "expected 'nan' or 'drop'",
            )),
        }
    }
}

impl fmt::Display for ColdStartStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColdStartStrategy::Nan => write!(f, "nan"),
            ColdStartStrategy::Drop => write!(f, "drop"),
        }
    }
}

/// ALS hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct AlsParams {
    pub max_iter: usize,
    /// Number of latent factors
    pub rank: usize,
    pub reg_param: f64,
    /// Confidence scale for implicit feedback
    pub alpha: f64,
    pub implicit_prefs: bool,
    pub cold_start: ColdStartStrategy,
    pub seed: u64,
}

impl Default for AlsParams {
    fn default() -> Self {
        Self {
            max_iter: 10,
            rank: 10,
            reg_param: 0.1,
            alpha: 1.0,
            implicit_prefs: false,
            cold_start: ColdStartStrategy::Nan,
            seed: DEFAULT_SEED,
        }
    }
}

impl AlsParams {
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_reg_param(mut self, reg_param: f64) -> Self {
        self.reg_param = reg_param;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_implicit_prefs(mut self, implicit_prefs: bool) -> Self {
        self.implicit_prefs = implicit_prefs;
        self
    }

    pub fn with_cold_start(mut self, cold_start: ColdStartStrategy) -> Self {
        self.cold_start = cold_start;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.rank == 0 {
            return Err(RecommenderError::invalid_parameter("rank", self.rank, "must be at least 1"));
        }
        if self.max_iter == 0 {
            return Err(RecommenderError::invalid_parameter("max_iter", self.max_iter, "must be at least 1"));
        }
        if !(self.reg_param.is_finite() && self.reg_param >= 0.0) {
            return Err(RecommenderError::invalid_parameter(
                "reg_param",
                self.reg_param,
                "must be finite and non-negative",
            ));
        }
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(RecommenderError::invalid_parameter(
                "alpha",
                self.alpha,
                "must be finite and non-negative",
            ));
        }
        Ok(())
    }

    /// Bytes held by the user and item factor matrices at this rank.
    pub fn factor_bytes(&self, num_users: usize, num_items: usize) -> u64 {
        ((num_users + num_items) * self.rank * std::mem::size_of::<f64>()) as u64
    }
}

impl fmt::Display for AlsParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "maxIter={}, rank={}, regParam={}",
            self.max_iter, self.rank, self.reg_param
        )
    }
}

/// A rating row with the model's prediction attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub item: i32,
    pub user: i32,
    pub rating: i32,
    pub prediction: f64,
}

/// ALS estimator
#[derive(Debug, Clone, Default)]
pub struct Als {
    params: AlsParams,
}

impl Als {
    pub fn new(params: AlsParams) -> Self {
        Self { params }
    }

    /// Fit user and item factors. Parallel row solves run on the current rayon pool.
    pub fn fit(&self, table: &RatingTable) -> Result<AlsModel> {
        self.params.validate()?;
        if table.is_empty() {
            return Err(RecommenderError::DataError(
                "cannot fit ALS on an empty ratings table".to_string(),
            ));
        }

        let user_index = index_ids(table.iter().map(|r| r.user));
        let item_index = index_ids(table.iter().map(|r| r.item));

        let mut by_user: Vec<Vec<(usize, f64)>> = vec![Vec::new(); user_index.len()];
        let mut by_item: Vec<Vec<(usize, f64)>> = vec![Vec::new(); item_index.len()];
        for r in table.iter() {
            let u = user_index[&r.user];
            let i = item_index[&r.item];
            by_user[u].push((i, r.rating as f64));
            by_item[i].push((u, r.rating as f64));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed);
        let mut user_factors = init_factors(user_index.len(), self.params.rank, &mut rng);
        let mut item_factors = self.solve_side(&user_factors, &by_item);
        user_factors = self.solve_side(&item_factors, &by_user);

        for iteration in 1..self.params.max_iter {
            item_factors = self.solve_side(&user_factors, &by_item);
            user_factors = self.solve_side(&item_factors, &by_user);
            debug!(iteration = iteration + 1, max_iter = self.params.max_iter, "ALS sweep done");
        }

        Ok(AlsModel {
            uid: format!("als_{:012x}", rand::thread_rng().gen::<u64>() >> 16),
            params: self.params.clone(),
            user_index,
            item_index,
            user_factors,
            item_factors,
        })
    }

    /// Solve every destination row against the fixed `src` factors.
    fn solve_side(&self, src: &Array2<f64>, adjacency: &[Vec<(usize, f64)>]) -> Array2<f64> {
        let k = src.ncols();
        let gram = if self.params.implicit_prefs {
            Some(src.t().dot(src))
        } else {
            None
        };

        let rows: Vec<Array1<f64>> = adjacency
            .par_iter()
            .map(|observed| self.solve_row(src, observed, gram.as_ref()))
            .collect();

        let mut out = Array2::zeros((rows.len(), k));
        for (mut dst, row) in out.rows_mut().into_iter().zip(rows.iter()) {
            dst.assign(row);
        }
        out
    }

    /// Factor for one row. A system that cannot be solved yields a zero factor.
    fn solve_row(
        &self,
        src: &Array2<f64>,
        observed: &[(usize, f64)],
        gram: Option<&Array2<f64>>,
    ) -> Array1<f64> {
        let (a, b) = self.normal_equations(src, observed, gram);
        cholesky_solve(&a, &b).unwrap_or_else(|| Array1::zeros(src.ncols()))
    }

    /// Regularized normal equations `(A, b)` for one row.
    fn normal_equations(
        &self,
        src: &Array2<f64>,
        observed: &[(usize, f64)],
        gram: Option<&Array2<f64>>,
    ) -> (Array2<f64>, Array1<f64>) {
        let k = src.ncols();
        let mut a = match gram {
            Some(g) => g.clone(),
            None => Array2::zeros((k, k)),
        };
        let mut b = Array1::zeros(k);
        let mut num_explicit = 0usize;

        for &(j, rating) in observed {
            let y = src.row(j);
            let (weight, target) = if self.params.implicit_prefs {
                // YᵀY already carries the unit confidence of every pair
                let c1 = self.params.alpha * rating.abs();
                if rating > 0.0 {
                    num_explicit += 1;
                    (c1, 1.0 + c1)
                } else {
                    (c1, 0.0)
                }
            } else {
                num_explicit += 1;
                (1.0, rating)
            };
            add_outer(&mut a, y, weight);
            if target != 0.0 {
                b.scaled_add(target, &y);
            }
        }

        let lambda = self.params.reg_param * num_explicit as f64;
        for p in 0..k {
            a[[p, p]] += lambda;
        }
        (a, b)
    }
}

/// Fitted latent factors
#[derive(Debug, Clone)]
pub struct AlsModel {
    uid: String,
    params: AlsParams,
    user_index: HashMap<i32, usize>,
    item_index: HashMap<i32, usize>,
    user_factors: Array2<f64>,
    item_factors: Array2<f64>,
}

impl AlsModel {
    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn params(&self) -> &AlsParams {
        &self.params
    }

    pub fn rank(&self) -> usize {
        self.params.rank
    }

    pub fn num_users(&self) -> usize {
        self.user_index.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_index.len()
    }

    pub fn user_factors(&self) -> &Array2<f64> {
        &self.user_factors
    }

    pub fn item_factors(&self) -> &Array2<f64> {
        &self.item_factors
    }

    pub fn factor_bytes(&self) -> u64 {
        self.params.factor_bytes(self.num_users(), self.num_items())
    }

    /// Dot product of the user's and item's factors; `None` if either was not in training.
    pub fn predict(&self, user: i32, item: i32) -> Option<f64> {
        let u = *self.user_index.get(&user)?;
        let i = *self.item_index.get(&item)?;
        Some(self.user_factors.row(u).dot(&self.item_factors.row(i)))
    }

    /// Attach predictions to every row, applying the cold start strategy.
    pub fn transform(&self, table: &RatingTable) -> Vec<Prediction> {
        table
            .iter()
            .filter_map(|r| {
                let prediction = match (self.predict(r.user, r.item), self.params.cold_start) {
                    (Some(p), _) => p,
                    (None, ColdStartStrategy::Nan) => f64::NAN,
                    (None, ColdStartStrategy::Drop) => return None,
                };
                Some(Prediction {
                    item: r.item,
                    user: r.user,
                    rating: r.rating,
                    prediction,
                })
            })
            .collect()
    }
}

impl fmt::Display for AlsModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AlsModel: uid={}, rank={}, maxIter={}, regParam={}, alpha={}, implicitPrefs={}",
            self.uid,
            self.params.rank,
            self.params.max_iter,
            self.params.reg_param,
            self.params.alpha,
            self.params.implicit_prefs
        )
    }
}

/// Map distinct ids to dense rows in ascending id order.
fn index_ids(ids: impl Iterator<Item = i32>) -> HashMap<i32, usize> {
    ids.collect::<BTreeSet<_>>()
        .into_iter()
        .enumerate()
        .map(|(idx, id)| (id, idx))
        .collect()
}

/// Standard normal rows scaled to unit length.
fn init_factors(n: usize, k: usize, rng: &mut ChaCha8Rng) -> Array2<f64> {
    let mut factors = Array2::from_shape_simple_fn((n, k), || rng.sample::<f64, _>(StandardNormal));
    for mut row in factors.rows_mut() {
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row.mapv_inplace(|v| v / norm);
        }
    }
    factors
}

fn add_outer(a: &mut Array2<f64>, y: ArrayView1<f64>, weight: f64) {
    if weight == 0.0 {
        return;
    }
    let k = y.len();
    for p in 0..k {
        let wp = weight * y[p];
        if wp == 0.0 {
            continue;
        }
        for q in 0..k {
            a[[p, q]] += wp * y[q];
        }
    }
}

/// Solve A x = b for symmetric positive definite A. A near-singular system is retried once
/// with a small ridge on the diagonal.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let l = match cholesky_factor(a) {
        Some(l) => l,
        None => {
            let mut a_reg = a.clone();
            let mean_diag = a.diag().iter().map(|v| v.abs()).sum::<f64>() / n as f64;
            let ridge = (1e-8 * mean_diag).max(1e-10);
            for k in 0..n {
                a_reg[[k, k]] += ridge;
            }
            cholesky_factor(&a_reg)?
        }
    };

    // Forward substitution: L y = b
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Back substitution: Lᵀ x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    if x.iter().all(|v: &f64| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// Lower-triangular L with A = L Lᵀ, or `None` if A is not positive definite.
fn cholesky_factor(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                if !(diag > 0.0) || !diag.is_finite() {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    Some(l)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Rating;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn rank_one_table() -> RatingTable {
        let mut rows = Vec::new();
        for user in 0..6 {
            for item in 0..5 {
                rows.push(Rating {
                    item,
                    user,
                    rating: (user % 3 + 1) * (item % 4 + 1),
                });
            }
        }
        RatingTable::new(rows)
    }

    fn block_table() -> RatingTable {
        let mut rows = Vec::new();
        for user in 0..10 {
            let block = user / 5;
            for item in (block * 5)..(block * 5 + 5) {
                rows.push(Rating { item, user, rating: 3 });
            }
        }
        RatingTable::new(rows)
    }

    #[test]
    fn test_cholesky_solve_known_system() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let b = array![2.0, 1.0];
        let x = cholesky_solve(&a, &b).unwrap();
        // 4x + 2y = 2, 2x + 3y = 1 → x = 0.5, y = 0
        assert_abs_diff_eq!(x[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let a = array![[1.0, 2.0], [2.0, 1.0]];
        assert!(cholesky_factor(&a).is_none());
    }

    #[test]
    fn test_cholesky_solve_ridges_singular_psd() {
        let a = array![[1.0, 1.0], [1.0, 1.0]];
        let b = array![1.0, 1.0];
        assert!(cholesky_factor(&a).is_none());

        let x = cholesky_solve(&a, &b).expect("ridge retry should factor a singular PSD matrix");
        assert_abs_diff_eq!(x[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(x[1], 0.5, epsilon = 1e-6);

        assert!(cholesky_solve(&array![[1.0, 2.0], [2.0, 1.0]], &b).is_none());
    }

    #[test]
    fn test_implicit_row_solve_by_hand() {
        let src = array![[1.0], [2.0], [3.0]];
        let gram = src.t().dot(&src);
        let als = Als::new(
            AlsParams::default()
                .with_rank(1)
                .with_implicit_prefs(true)
                .with_alpha(0.5)
                .with_reg_param(0.1),
        );

        // gram 14, c = 0.5·|r|; the zero rating adds nothing, two positives → λ = 0.2
        // A = 14 + 1·1 + 2·9 + 0.2, b = 2·1 + 3·3
        let observed = [(0, 2.0), (1, 0.0), (2, 4.0)];
        let (a, b) = als.normal_equations(&src, &observed, Some(&gram));
        assert_abs_diff_eq!(a[[0, 0]], 33.2, epsilon = 1e-12);
        assert_abs_diff_eq!(b[0], 11.0, epsilon = 1e-12);
        let x = als.solve_row(&src, &observed, Some(&gram));
        assert_abs_diff_eq!(x[0], 11.0 / 33.2, epsilon = 1e-12);

        // a negative rating carries confidence but no preference and no λ
        let observed = [(0, 2.0), (1, -2.0)];
        let x = als.solve_row(&src, &observed, Some(&gram));
        assert_abs_diff_eq!(x[0], 2.0 / 19.1, epsilon = 1e-12);
    }

    #[test]
    fn test_implicit_row_without_positive_ratings() {
        let src = array![[1.0, 0.0], [0.0, 2.0], [1.0, 1.0]];
        let gram = src.t().dot(&src);
        let als = Als::new(
            AlsParams::default()
                .with_rank(2)
                .with_implicit_prefs(true)
                .with_alpha(0.5)
                .with_reg_param(0.1),
        );

        let observed = [(0, 0.0), (1, -2.0)];
        let (a, b) = als.normal_equations(&src, &observed, Some(&gram));
        // YᵀY = [[2, 1], [1, 5]] plus 1·y₁y₁ᵀ, no regularization
        let expected = array![[2.0, 1.0], [1.0, 9.0]];
        for (got, want) in a.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-12);
        }
        assert!(b.iter().all(|v| *v == 0.0));

        let x = als.solve_row(&src, &observed, Some(&gram));
        assert_eq!(x, Array1::<f64>::zeros(2));
    }

    #[test]
    fn test_explicit_row_solve_by_hand() {
        let src = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        let als = Als::new(
            AlsParams::default()
                .with_rank(2)
                .with_implicit_prefs(false)
                .with_reg_param(0.5),
        );

        // A = [[2, 1], [1, 1]] + 0.5·2·I, b = 3·y₀ + 5·y₂ = [8, 5]
        let x = als.solve_row(&src, &[(0, 3.0), (2, 5.0)], None);
        assert_abs_diff_eq!(x[0], 2.2, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 1.4, epsilon = 1e-12);
    }

    #[test]
    fn test_unsolvable_row_gets_zero_factor() {
        let src = array![[1.0, 0.0], [0.0, 1.0]];
        let indefinite = array![[1.0, 2.0], [2.0, 1.0]];
        let als = Als::new(
            AlsParams::default()
                .with_rank(2)
                .with_implicit_prefs(true)
                .with_alpha(0.0)
                .with_reg_param(0.0),
        );

        let (a, b) = als.normal_equations(&src, &[(0, 1.0)], Some(&indefinite));
        assert_eq!(a, indefinite);
        assert_eq!(b, array![1.0, 0.0]);

        let x = als.solve_row(&src, &[(0, 1.0)], Some(&indefinite));
        assert_eq!(x, Array1::<f64>::zeros(2));
    }

    #[test]
    fn test_explicit_fit_recovers_low_rank_matrix() {
        let table = rank_one_table();
        let params = AlsParams::default()
            .with_rank(2)
            .with_max_iter(20)
            .with_reg_param(0.001);
        let model = Als::new(params).fit(&table).unwrap();

        assert_eq!(model.num_users(), 6);
        assert_eq!(model.num_items(), 5);
        assert_eq!(model.user_factors().dim(), (6, 2));
        assert_eq!(model.item_factors().dim(), (5, 2));

        let sq: f64 = model
            .transform(&table)
            .iter()
            .map(|p| (p.prediction - p.rating as f64).powi(2))
            .sum();
        let rmse = (sq / table.len() as f64).sqrt();
        assert!(rmse < 0.25, "rmse too high: {}", rmse);
    }

    #[test]
    fn test_implicit_fit_separates_blocks() {
        let table = block_table();
        let params = AlsParams::default()
            .with_rank(2)
            .with_max_iter(15)
            .with_reg_param(0.01)
            .with_implicit_prefs(true);
        let model = Als::new(params).fit(&table).unwrap();

        let mut inside = 0.0;
        let mut across = 0.0;
        for user in 0..10 {
            for item in 0..10 {
                let p = model.predict(user, item).unwrap();
                if user / 5 == item / 5 {
                    inside += p;
                } else {
                    across += p;
                }
            }
        }
        assert!(inside / 50.0 > across / 50.0 + 0.5);
    }

    #[test]
    fn test_fit_is_deterministic_for_a_seed() {
        let table = rank_one_table();
        let params = AlsParams::default().with_rank(3).with_max_iter(5).with_seed(9);
        let a = Als::new(params.clone()).fit(&table).unwrap();
        let b = Als::new(params).fit(&table).unwrap();
        assert_eq!(a.user_factors(), b.user_factors());
        assert_eq!(a.item_factors(), b.item_factors());
    }

    #[test]
    fn test_duplicate_ratings_are_accepted() {
        let mut rows = rank_one_table().rows().to_vec();
        let repeats = rows[..4].to_vec();
        rows.extend(repeats);
        let model = Als::new(AlsParams::default().with_rank(2)).fit(&RatingTable::new(rows)).unwrap();
        assert!(model.predict(0, 0).unwrap().is_finite());
    }

    #[test]
    fn test_cold_start_strategies() {
        let table = rank_one_table();
        let unseen = RatingTable::new(vec![
            Rating { item: 0, user: 0, rating: 1 },
            Rating { item: 99, user: 0, rating: 1 },
            Rating { item: 0, user: 99, rating: 1 },
        ]);

        let dropping = Als::new(AlsParams::default().with_cold_start(ColdStartStrategy::Drop))
            .fit(&table)
            .unwrap();
        let kept = dropping.transform(&unseen);
        assert_eq!(kept.len(), 1);
        assert!(kept[0].prediction.is_finite());

        let nan = Als::new(AlsParams::default()).fit(&table).unwrap();
        let all = nan.transform(&unseen);
        assert_eq!(all.len(), 3);
        assert!(all[1].prediction.is_nan());
        assert!(all[2].prediction.is_nan());
        assert!(nan.predict(99, 0).is_none());
    }

    #[test]
    fn test_invalid_params_and_empty_table() {
        let table = rank_one_table();
        assert!(Als::new(AlsParams::default().with_rank(0)).fit(&table).is_err());
        assert!(Als::new(AlsParams::default().with_max_iter(0)).fit(&table).is_err());
        assert!(Als::new(AlsParams::default().with_reg_param(-1.0)).fit(&table).is_err());
        assert!(Als::new(AlsParams::default().with_alpha(f64::INFINITY)).fit(&table).is_err());
        assert!(Als::new(AlsParams::default()).fit(&RatingTable::default()).is_err());
    }

    #[test]
    fn test_cold_start_parse_and_display() {
        assert_eq!("drop".parse::<ColdStartStrategy>().unwrap(), ColdStartStrategy::Drop);
        assert_eq!(" NaN ".parse::<ColdStartStrategy>().unwrap(), ColdStartStrategy::Nan);
        assert!("skip".parse::<ColdStartStrategy>().is_err());
        assert_eq!(ColdStartStrategy::Drop.to_string(), "drop");
    }

    #[test]
    fn test_model_description() {
        let model = Als::new(AlsParams::default().with_rank(4).with_implicit_prefs(true))
            .fit(&rank_one_table())
            .unwrap();
        let text = model.to_string();
        assert!(text.starts_with("AlsModel: uid=als_"));
        assert!(text.contains("rank=4"));
        assert!(text.contains("implicitPrefs=true"));
        assert_eq!(model.uid().len(), "als_".len() + 12);
        assert_eq!(model.factor_bytes(), (11 * 4 * 8) as u64);
    }
}

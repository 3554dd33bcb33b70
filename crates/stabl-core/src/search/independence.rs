//! Conditional independence tests and the configuration token that rebuilds
//! them for every resampled dataset.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::stats;
use crate::data::{Dataset, Variable, VariableKind};
use crate::error::{Result, StablError};

/// Statistical test families a run can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestKind {
    /// Fisher Z on partial correlations (continuous data).
    FisherZ,
    /// Stratified Pearson chi-square (discrete data).
    ChiSquare,
    /// Linear-Gaussian BIC score used as a test (continuous data).
    SemBic,
    /// BIC score over mixed data, discrete columns treated as continuous.
    ConditionalGaussian,
}

impl TestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FisherZ => "fisher-z",
            Self::ChiSquare => "chi-square",
            Self::SemBic => "sem-bic",
            Self::ConditionalGaussian => "conditional-gaussian",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestKind {
    type Err = StablError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "fisher-z" | "fisherz" => Ok(Self::FisherZ),
            "chi-square" | "chisquare" => Ok(Self::ChiSquare),
            "sem-bic" | "sembic" => Ok(Self::SemBic),
            "conditional-gaussian" | "cg" => Ok(Self::ConditionalGaussian),
            _ => Err(StablError::UnsupportedTest {
                kind: s.to_string(),
            }),
        }
    }
}

/// Validated description of a test, bindable to any dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    pub kind: TestKind,
    /// Significance level for the p-value tests.
    pub alpha: f64,
    /// BIC penalty multiplier for the score-based tests.
    pub penalty_discount: f64,
}

impl TestConfig {
    pub fn fisher_z(alpha: f64) -> Self {
        Self {
            kind: TestKind::FisherZ,
            alpha,
            penalty_discount: 1.0,
        }
    }

    pub fn chi_square(alpha: f64) -> Self {
        Self {
            kind: TestKind::ChiSquare,
            alpha,
            penalty_discount: 1.0,
        }
    }

    pub fn sem_bic(penalty_discount: f64) -> Self {
        Self {
            kind: TestKind::SemBic,
            alpha: 0.01,
            penalty_discount,
        }
    }

    pub fn conditional_gaussian(penalty_discount: f64) -> Self {
        Self {
            kind: TestKind::ConditionalGaussian,
            alpha: 0.01,
            penalty_discount,
        }
    }

    /// Parse a kind name; unknown names are `UnsupportedTest`.
    pub fn parse(kind: &str, alpha: f64, penalty_discount: f64) -> Result<Self> {
        let config = Self {
            kind: kind.parse()?,
            alpha,
            penalty_discount,
        };
        config.validate()?;
        Ok(config)
    }

    /// Same test with a different significance level.
    pub fn with_alpha(&self, alpha: f64) -> Self {
        Self {
            alpha,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(StablError::invalid("alpha", format!("{} is not in (0, 1)", self.alpha)));
        }
        if !(self.penalty_discount > 0.0 && self.penalty_discount.is_finite()) {
            return Err(StablError::invalid(
                "penalty_discount",
                format!("{} is not positive", self.penalty_discount),
            ));
        }
        Ok(())
    }

    /// Check parameters and that every variable has a type the test accepts.
    pub fn validate_for(&self, data: &Dataset) -> Result<()> {
        self.validate()?;
        let mismatch = |var: &Variable, message: &str| StablError::IncompatibleTest {
            kind: self.kind.to_string(),
            variable: var.name().to_string(),
            message: message.to_string(),
        };
        for var in data.variables() {
            match (self.kind, var.kind()) {
                (TestKind::ChiSquare, VariableKind::Continuous) => {
                    return Err(mismatch(var, "chi-square needs discrete variables"));
                }
                (TestKind::FisherZ | TestKind::SemBic, VariableKind::Discrete { .. }) => {
                    return Err(mismatch(var, "test needs continuous variables"));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Build a test instance over `data`, carrying alpha / penalty forward.
    pub fn bind(&self, data: &Dataset) -> Result<Box<dyn IndependenceTest>> {
        self.validate_for(data)?;
        Ok(match self.kind {
            TestKind::FisherZ => Box::new(FisherZ::new(data, self.alpha)),
            TestKind::ChiSquare => Box::new(ChiSquare::new(data, self.alpha)),
            TestKind::SemBic | TestKind::ConditionalGaussian => {
                Box::new(SemBicTest::new(data, self.penalty_discount))
            }
        })
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self::fisher_z(0.01)
    }
}

/// A conditional independence oracle over the columns of one dataset.
pub trait IndependenceTest: Send + Sync {
    /// Whether column `x` is independent of column `y` given columns `z`.
    fn is_independent(&self, x: usize, y: usize, z: &[usize]) -> Result<bool>;

    fn variables(&self) -> &[Variable];

    fn name(&self) -> &'static str;
}

/// Fisher Z test on partial correlations.
pub struct FisherZ {
    variables: Vec<Variable>,
    corr: DMatrix<f64>,
    n: usize,
    alpha: f64,
}

impl FisherZ {
    pub fn new(data: &Dataset, alpha: f64) -> Self {
        Self {
            variables: data.variables().to_vec(),
            corr: stats::correlation(&stats::covariance(data.matrix())),
            n: data.num_rows(),
            alpha,
        }
    }

    /// Two-sided p-value of the partial correlation of `x` and `y` given `z`.
    pub fn p_value(&self, x: usize, y: usize, z: &[usize]) -> Result<f64> {
        let dof = self.n as f64 - z.len() as f64 - 3.0;
        if dof <= 0.0 {
            return Err(StablError::numeric(
                "fisher z",
                format!("{} rows are too few for {} conditioning variables", self.n, z.len()),
            ));
        }
        let r = stats::partial_correlation(&self.corr, x, y, z)?.clamp(-0.999_999_999, 0.999_999_999);
        let fisher = 0.5 * ((1.0 + r) / (1.0 - r)).ln();
        let stat = dof.sqrt() * fisher.abs();
        Ok(2.0 * (1.0 - stats::normal_cdf(stat)))
    }
}

impl IndependenceTest for FisherZ {
    fn is_independent(&self, x: usize, y: usize, z: &[usize]) -> Result<bool> {
        Ok(self.p_value(x, y, z)? > self.alpha)
    }

    fn variables(&self) -> &[Variable] {
        &self.variables
    }

    fn name(&self) -> &'static str {
        "fisher-z"
    }
}

/// Pearson chi-square test stratified over the conditioning configurations.
pub struct ChiSquare {
    variables: Vec<Variable>,
    /// Category index per row and column.
    codes: Vec<Vec<usize>>,
    categories: Vec<usize>,
    alpha: f64,
}

impl ChiSquare {
    pub fn new(data: &Dataset, alpha: f64) -> Self {
        let m = data.matrix();
        let codes = (0..data.num_rows())
            .map(|i| (0..data.num_columns()).map(|j| m[(i, j)] as usize).collect())
            .collect();
        let categories = data
            .variables()
            .iter()
            .map(|v| match v.kind() {
                VariableKind::Discrete { categories } => categories,
                VariableKind::Continuous => 1,
            })
            .collect();
        Self {
            variables: data.variables().to_vec(),
            codes,
            categories,
            alpha,
        }
    }

    pub fn p_value(&self, x: usize, y: usize, z: &[usize]) -> Result<f64> {
        let (cx, cy) = (self.categories[x], self.categories[y]);
        let mut strata: HashMap<Vec<usize>, Vec<f64>> = HashMap::new();
        for row in &self.codes {
            let key: Vec<usize> = z.iter().map(|&k| row[k]).collect();
            let table = strata.entry(key).or_insert_with(|| vec![0.0; cx * cy]);
            table[row[x] * cy + row[y]] += 1.0;
        }

        let mut stat = 0.0;
        let mut dof = 0usize;
        for table in strata.values() {
            let total: f64 = table.iter().sum();
            let row_sums: Vec<f64> = (0..cx).map(|a| (0..cy).map(|b| table[a * cy + b]).sum()).collect();
            let col_sums: Vec<f64> = (0..cy).map(|b| (0..cx).map(|a| table[a * cy + b]).sum()).collect();
            let live_rows = row_sums.iter().filter(|s| **s > 0.0).count();
            let live_cols = col_sums.iter().filter(|s| **s > 0.0).count();
            if live_rows < 2 || live_cols < 2 {
                continue;
            }
            for a in 0..cx {
                for b in 0..cy {
                    let expected = row_sums[a] * col_sums[b] / total;
                    if expected > 0.0 {
                        let diff = table[a * cy + b] - expected;
                        stat += diff * diff / expected;
                    }
                }
            }
            dof += (live_rows - 1) * (live_cols - 1);
        }
        Ok(stats::chi_square_sf(stat, dof))
    }
}

impl IndependenceTest for ChiSquare {
    fn is_independent(&self, x: usize, y: usize, z: &[usize]) -> Result<bool> {
        Ok(self.p_value(x, y, z)? > self.alpha)
    }

    fn variables(&self) -> &[Variable] {
        &self.variables
    }

    fn name(&self) -> &'static str {
        "chi-square"
    }
}

/// Linear-Gaussian BIC comparison: `x` is independent of `y` given `z` when
/// adding `x` to the regression of `y` on `z` does not improve the score.
pub struct SemBicTest {
    variables: Vec<Variable>,
    cov: DMatrix<f64>,
    n: usize,
    penalty_discount: f64,
}

impl SemBicTest {
    pub fn new(data: &Dataset, penalty_discount: f64) -> Self {
        Self {
            variables: data.variables().to_vec(),
            cov: stats::covariance(data.matrix()),
            n: data.num_rows(),
            penalty_discount,
        }
    }

    /// Score gain of adding `x` as a regressor of `y` given `z`.
    pub fn score_gain(&self, x: usize, y: usize, z: &[usize]) -> Result<f64> {
        let n = self.n as f64;
        let without = stats::residual_variance(&self.cov, y, z)?;
        let mut with_x = z.to_vec();
        with_x.push(x);
        let with = stats::residual_variance(&self.cov, y, &with_x)?;
        Ok(n * (without / with).ln() - self.penalty_discount * n.ln())
    }
}

impl IndependenceTest for SemBicTest {
    fn is_independent(&self, x: usize, y: usize, z: &[usize]) -> Result<bool> {
        Ok(self.score_gain(x, y, z)? <= 0.0)
    }

    fn variables(&self) -> &[Variable] {
        &self.variables
    }

    fn name(&self) -> &'static str {
        "sem-bic"
    }
}

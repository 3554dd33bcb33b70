//! Two-pass marginal dependence screen.
//!
//! Pass 1 keeps every variable marginally dependent on at least one target at
//! `alpha`; pass 2 re-tests the survivors at `strict_alpha`. Both passes split
//! the work into fixed-size chunks run on a [`TaskRunner`].

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::{Dataset, Variable};
use crate::error::{Result, StablError};
use crate::runner::TaskRunner;
use crate::search::{IndependenceTest, TestConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableScreener {
    /// Test family; its alpha is replaced by each pass's level.
    pub test: TestConfig,
    pub alpha: f64,
    pub strict_alpha: f64,
    pub chunk_size: usize,
    pub parallelism: usize,
}

impl Default for VariableScreener {
    fn default() -> Self {
        Self {
            test: TestConfig::default(),
            alpha: 0.01,
            strict_alpha: 1e-5,
            chunk_size: 50,
            parallelism: TaskRunner::default_parallelism(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningOutcome {
    /// Survivors in dataset order, then the targets.
    pub variables: Vec<Variable>,
    /// Non-target variables that survived pass 1.
    pub first_pass: usize,
    /// Chunks that failed in either pass; their variables are dropped.
    pub failed_chunks: usize,
}

impl ScreeningOutcome {
    pub fn names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name()).collect()
    }
}

impl VariableScreener {
    pub fn new(alpha: f64, parallelism: usize) -> Self {
        Self {
            alpha,
            parallelism,
            ..Self::default()
        }
    }

    pub fn with_test(mut self, test: TestConfig) -> Self {
        self.test = test;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(StablError::invalid("chunk_size", "must be at least 1"));
        }
        if self.strict_alpha > self.alpha {
            return Err(StablError::invalid(
                "strict_alpha",
                format!("{} exceeds alpha {}", self.strict_alpha, self.alpha),
            ));
        }
        self.test.with_alpha(self.alpha).validate()?;
        self.test.with_alpha(self.strict_alpha).validate()
    }

    pub fn screen(&self, data: &Dataset, targets: &[Variable]) -> Result<ScreeningOutcome> {
        self.validate()?;
        if targets.is_empty() {
            return Err(StablError::EmptyPool { role: "target" });
        }
        let target_cols = targets
            .iter()
            .map(|t| data.require(t.name()))
            .collect::<Result<Vec<_>>>()?;

        let runner = TaskRunner::new(self.parallelism)?;
        let candidates: Vec<usize> = (0..data.num_columns())
            .filter(|c| !target_cols.contains(c))
            .collect();

        let loose = self.test.with_alpha(self.alpha).bind(data)?;
        let (first, failed_first) = self.pass(&runner, loose.as_ref(), &candidates, &target_cols)?;

        let strict = self.test.with_alpha(self.strict_alpha).bind(data)?;
        let (second, failed_second) = self.pass(&runner, strict.as_ref(), &first, &target_cols)?;

        let mut variables: Vec<Variable> = second
            .iter()
            .map(|&c| data.variables()[c].clone())
            .collect();
        for &t in &target_cols {
            let var = &data.variables()[t];
            if !variables.contains(var) {
                variables.push(var.clone());
            }
        }

        info!(
            candidates = candidates.len(),
            first_pass = first.len(),
            kept = second.len(),
            "screening finished"
        );

        Ok(ScreeningOutcome {
            variables,
            first_pass: first.len(),
            failed_chunks: failed_first + failed_second,
        })
    }

    /// Columns among `columns` dependent on at least one target, in input order.
    fn pass(
        &self,
        runner: &TaskRunner,
        test: &dyn IndependenceTest,
        columns: &[usize],
        targets: &[usize],
    ) -> Result<(Vec<usize>, usize)> {
        if columns.is_empty() {
            return Ok((Vec::new(), 0));
        }
        let tasks: Vec<_> = columns
            .chunks(self.chunk_size)
            .map(|chunk| {
                move || -> Result<Vec<usize>> {
                    let mut kept = Vec::new();
                    for &c in chunk {
                        for &t in targets {
                            if !test.is_independent(c, t, &[])? {
                                kept.push(c);
                                break;
                            }
                        }
                    }
                    Ok(kept)
                }
            })
            .collect();

        let report = runner.run(tasks);
        if report.all_failed() {
            let (_, failures) = report.into_parts();
            return Err(StablError::AllTasksFailed { failures });
        }
        let (kept, failures) = report.into_parts();
        Ok((kept.into_iter().flatten().collect(), failures.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    /// y depends on x0 and x3; x1, x2, x4 are noise.
    fn data() -> Dataset {
        let mut rng = StdRng::seed_from_u64(99);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let rows: Vec<Vec<f64>> = (0..800)
            .map(|_| {
                let xs: Vec<f64> = (0..5).map(|_| noise.sample(&mut rng)).collect();
                let y = xs[0] + 0.8 * xs[3] + 0.5 * noise.sample(&mut rng);
                let mut row = xs;
                row.insert(2, y);
                row
            })
            .collect();
        let names = ["x0", "x1", "y", "x2", "x3", "x4"];
        Dataset::from_rows(names.iter().map(|n| Variable::continuous(*n)).collect(), &rows).unwrap()
    }

    #[test]
    fn test_keeps_dependent_and_targets() {
        let data = data();
        let screener = VariableScreener {
            chunk_size: 2,
            ..VariableScreener::new(0.01, 3)
        };
        let out = screener.screen(&data, &[Variable::continuous("y")]).unwrap();
        assert_eq!(out.names(), vec!["x0", "x3", "y"]);
        assert_eq!(out.failed_chunks, 0);
        assert!(out.first_pass >= 2);
    }

    #[test]
    fn test_strict_pass_drops_weak_dependence() {
        let mut rng = StdRng::seed_from_u64(5);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let n = 400;
        let s: Vec<f64> = (0..n).map(|_| noise.sample(&mut rng)).collect();
        let y: Vec<f64> = s.iter().map(|v| v + 0.5 * noise.sample(&mut rng)).collect();

        // w has sample correlation exactly 0.16 with y: Fisher z about 3.2,
        // significant at 0.05 but not at 1e-5.
        let centre = |v: &[f64]| {
            let mean = v.iter().sum::<f64>() / v.len() as f64;
            v.iter().map(|x| x - mean).collect::<Vec<f64>>()
        };
        let unit = |v: Vec<f64>| {
            let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
            v.into_iter().map(|x| x / norm).collect::<Vec<f64>>()
        };
        let y_dir = unit(centre(&y));
        let raw = centre(&(0..n).map(|_| noise.sample(&mut rng)).collect::<Vec<f64>>());
        let along: f64 = raw.iter().zip(&y_dir).map(|(a, b)| a * b).sum();
        let orth = unit(raw.iter().zip(&y_dir).map(|(a, b)| a - along * b).collect());
        let r: f64 = 0.16;
        let w: Vec<f64> = y_dir
            .iter()
            .zip(&orth)
            .map(|(a, b)| r * a + (1.0 - r * r).sqrt() * b)
            .collect();

        let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![s[i], w[i], y[i]]).collect();
        let vars = ["s", "w", "y"].iter().map(|name| Variable::continuous(*name)).collect();
        let data = Dataset::from_rows(vars, &rows).unwrap();

        let out = VariableScreener::new(0.05, 2)
            .screen(&data, &[Variable::continuous("y")])
            .unwrap();
        assert_eq!(out.first_pass, 2);
        assert_eq!(out.names(), vec!["s", "y"]);
    }

    #[test]
    fn test_rejects_bad_input() {
        let data = data();
        let screener = VariableScreener::new(0.01, 2);
        assert!(screener.screen(&data, &[]).is_err());
        let err = screener
            .screen(&data, &[Variable::continuous("zz")])
            .unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_VARIABLE");

        let bad = VariableScreener {
            chunk_size: 0,
            ..VariableScreener::default()
        };
        assert!(bad.validate().is_err());

        let looser_second_pass = VariableScreener {
            strict_alpha: 0.05,
            ..VariableScreener::new(0.01, 2)
        };
        let err = looser_second_pass.validate().unwrap_err();
        assert!(err.is_configuration());
    }
}

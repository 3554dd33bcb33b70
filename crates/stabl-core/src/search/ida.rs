//! IDA minimum-effect estimation on a pattern.
//!
//! For a predictor `x` with parents `pa(x)` and undirected neighbours `sib(x)`,
//! every subset `S` of `sib(x)` is a candidate parent set `pa(x) ∪ S`. The
//! effect of `x` on the target under that choice is the OLS coefficient of `x`
//! when regressing the target on `x` and the candidate parents, or zero if the
//! target is itself among them. The minimum absolute value over all choices is
//! a lower bound on the true effect.

use tracing::trace;

use super::{power_set, stats};
use crate::data::{Dataset, Variable};
use crate::error::{Result, StablError};
use crate::graph::Graph;
use crate::learner::{EffectEstimator, EffectRanking};

#[derive(Debug, Clone, Copy, Default)]
pub struct IdaEstimator;

impl IdaEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Minimum absolute effect of column `x` on column `target`.
    pub fn min_effect(
        &self,
        cov: &nalgebra::DMatrix<f64>,
        graph: &Graph,
        data: &Dataset,
        x: usize,
        target: usize,
    ) -> Result<f64> {
        let node = |col: usize| -> Result<usize> {
            let name = data.variables()[col].name();
            graph.node_index(name).ok_or_else(|| StablError::UnknownNode {
                name: name.to_string(),
            })
        };
        let column = |g: usize| data.require(graph.nodes()[g].name());

        let gx = node(x)?;
        let parents = graph
            .parents(gx)
            .into_iter()
            .map(column)
            .collect::<Result<Vec<_>>>()?;
        let siblings = graph
            .undirected_neighbors(gx)
            .into_iter()
            .map(column)
            .collect::<Result<Vec<_>>>()?;

        let mut min = f64::INFINITY;
        for subset in power_set(&siblings) {
            let mut regressors = Vec::with_capacity(1 + parents.len() + subset.len());
            regressors.push(x);
            regressors.extend_from_slice(&parents);
            regressors.extend_from_slice(&subset);

            let effect = if regressors[1..].contains(&target) {
                0.0
            } else {
                stats::regression_coefficients(cov, target, &regressors)?[0].abs()
            };
            min = min.min(effect);
            if min == 0.0 {
                break;
            }
        }
        Ok(min)
    }
}

impl EffectEstimator for IdaEstimator {
    fn rank_effects(&self, data: &Dataset, graph: &Graph, target: &Variable) -> Result<EffectRanking> {
        let t = data.require(target.name())?;
        let cov = stats::covariance(data.matrix());

        let mut effects = Vec::with_capacity(data.num_columns().saturating_sub(1));
        for (x, var) in data.variables().iter().enumerate() {
            if x == t {
                continue;
            }
            let effect = self.min_effect(&cov, graph, data, x, t)?;
            trace!(predictor = var.name(), target = target.name(), effect, "ida");
            effects.push((var.name().to_string(), effect));
        }
        Ok(EffectRanking::from_effects(effects))
    }
}

//! Contracts for the pluggable pieces of a bootstrap run.
//!
//! A [`BaseLearner`] maps a dataset to a causal graph; an [`EffectEstimator`]
//! ranks predictors of a target by a conservative effect size on a learned
//! graph. The engine only ever sees these traits, so any search procedure can
//! be bootstrapped or stability-ranked without a wrapper type of its own.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::data::{Dataset, Variable};
use crate::error::Result;
use crate::graph::Graph;

/// Structure learning black box.
///
/// Implementations must not depend on hidden global state: the same dataset
/// must always give the same graph.
pub trait BaseLearner: Send + Sync {
    /// Learn a graph over the variables of `data`.
    fn search(&self, data: &Dataset) -> Result<Graph>;

    /// Reject data the learner cannot handle, before any task is scheduled.
    fn validate(&self, _data: &Dataset) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// Ranks predictors of `target` by a lower bound on their causal effect.
pub trait EffectEstimator: Send + Sync {
    fn rank_effects(&self, data: &Dataset, graph: &Graph, target: &Variable)
        -> Result<EffectRanking>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEffect {
    pub predictor: String,
    pub effect: f64,
}

/// Predictors sorted by decreasing effect magnitude; equal magnitudes keep
/// their enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectRanking {
    entries: Vec<RankedEffect>,
}

impl EffectRanking {
    pub fn from_effects<I, S>(effects: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut entries: Vec<RankedEffect> = effects
            .into_iter()
            .map(|(predictor, effect)| RankedEffect {
                predictor: predictor.into(),
                effect: if effect.is_nan() { 0.0 } else { effect },
            })
            .collect();
        // stable: ties keep enumeration order
        entries.sort_by(|a, b| b.effect.abs().total_cmp(&a.effect.abs()));
        Self { entries }
    }

    pub fn entries(&self) -> &[RankedEffect] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Zero-based rank of `predictor`.
    pub fn position(&self, predictor: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.predictor == predictor)
    }

    /// Same ranking with only the given predictors, order preserved.
    pub fn restricted_to(&self, pool: &HashSet<&str>) -> EffectRanking {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|e| pool.contains(e.predictor.as_str()))
                .cloned()
                .collect(),
        }
    }
}

//! CStaS stability ranking of predictor → target causal relationships.
//!
//! B bootstrap subsamples are each searched for a pattern, effects of every
//! pool predictor on every target are ranked on that pattern, and the
//! frequencies with which pairs land in the top `q` drive a
//! Meinshausen–Bühlmann style selection with error bounds.

pub mod selection;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::{Dataset, Variable};
use crate::error::{Result, StablError};
use crate::graph::Graph;
use crate::learner::{BaseLearner, EffectEstimator};
use crate::resample::{BootstrapSampler, RandomContext, Resampler};
use crate::runner::{TaskFailure, TaskRunner};
use crate::search::{IdaEstimator, PcSearch, TestConfig};

use self::selection::SubsampleRanks;

/// Tuning knobs of a ranking run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankerSettings {
    /// Number of bootstrap subsamples (B).
    pub num_subsamples: usize,
    /// Multiplier on `q²/p` that the top-`q` frequency mass must reach.
    pub lift: f64,
    pub parallelism: usize,
    /// Longest trek checked against a ground-truth graph.
    pub max_trek_length: usize,
    pub seed: u64,
}

impl Default for RankerSettings {
    fn default() -> Self {
        Self {
            num_subsamples: 30,
            lift: 2.0,
            parallelism: TaskRunner::default_parallelism(),
            max_trek_length: 15,
            seed: RandomContext::default().seed(),
        }
    }
}

impl RankerSettings {
    pub fn validate(&self) -> Result<()> {
        if self.num_subsamples == 0 {
            return Err(StablError::invalid("num_subsamples", "must be at least 1"));
        }
        if self.parallelism == 0 {
            return Err(StablError::invalid("parallelism", "must be at least 1"));
        }
        if !(self.lift > 0.0 && self.lift.is_finite()) {
            return Err(StablError::invalid("lift", format!("{} is not positive", self.lift)));
        }
        Ok(())
    }
}

/// One selected predictor → target relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityRecord {
    pub predictor: String,
    pub target: String,
    /// Selection frequency at the accepted `q`.
    pub pi: f64,
    /// Mean effect lower bound over completed subsamples.
    pub effect: f64,
    /// Per-comparison error rate bound.
    pub pcer: f64,
    /// Expected erroneous selections `q − S` of the whole selection.
    pub er: f64,
    /// Meinshausen–Bühlmann expected false positives bound for this π.
    pub ev_bound: f64,
    /// Predictor is an ancestor of the target in the ground-truth graph.
    pub ancestor: Option<bool>,
    /// A short trek joins predictor and target in the ground-truth graph.
    pub trek_to_target: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankingStatus {
    /// No `q` cleared the lift threshold.
    NoSignal,
    Selected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingOutcome {
    pub records: Vec<StabilityRecord>,
    pub status: RankingStatus,
    /// Accepted cutoff, 0 when nothing was selected.
    pub selected_q: usize,
    /// Number of (predictor, target) pairs, `p`.
    pub num_pairs: usize,
    /// Top-`q` frequency mass at the accepted cutoff.
    pub sum: f64,
    pub completed: usize,
    pub failures: Vec<TaskFailure>,
}

pub struct StabilityRanker<L, E> {
    learner: L,
    estimator: E,
    settings: RankerSettings,
    resampler: Box<dyn Resampler>,
    true_graph: Option<Graph>,
}

impl<L: BaseLearner, E: EffectEstimator> StabilityRanker<L, E> {
    pub fn new(learner: L, estimator: E, settings: RankerSettings) -> Self {
        Self {
            learner,
            estimator,
            settings,
            resampler: Box::new(BootstrapSampler),
            true_graph: None,
        }
    }

    /// Evaluate selections against a known graph (simulation studies).
    pub fn with_true_graph(mut self, graph: Graph) -> Self {
        self.true_graph = Some(graph);
        self
    }

    pub fn with_resampler<R: Resampler + 'static>(mut self, resampler: R) -> Self {
        self.resampler = Box::new(resampler);
        self
    }

    pub fn settings(&self) -> &RankerSettings {
        &self.settings
    }

    pub fn rank(&self, data: &Dataset, predictors: &[Variable], targets: &[Variable]) -> Result<RankingOutcome> {
        self.settings.validate()?;
        let (pool, targets) = resolve_pools(data, predictors, targets)?;

        let mut learning_vars = pool.clone();
        learning_vars.extend(targets.iter().cloned());
        let learning = data.subset_columns(&learning_vars)?;
        self.learner.validate(&learning)?;

        if let Some(truth) = &self.true_graph {
            for var in pool.iter().chain(&targets) {
                if truth.node_index(var.name()).is_none() {
                    return Err(StablError::UnknownNode {
                        name: var.name().to_string(),
                    });
                }
            }
        }

        let b = self.settings.num_subsamples;
        info!(
            learner = self.learner.name(),
            subsamples = b,
            pool = pool.len(),
            targets = targets.len(),
            "starting stability ranking"
        );

        let runner = TaskRunner::new(self.settings.parallelism)?;
        let ctx = RandomContext::new(self.settings.seed);
        let tasks: Vec<_> = (0..b)
            .map(|index| {
                let (learning, pool, targets) = (&learning, &pool, &targets);
                move || self.subsample(learning, pool, targets, ctx, index)
            })
            .collect();
        let (samples, failures) = runner.run(tasks).into_parts();
        if samples.is_empty() {
            return Err(StablError::AllTasksFailed { failures });
        }

        let num_pairs = pool.len() * targets.len();
        let Some(chosen) = selection::select(&samples, targets.len(), pool.len(), self.settings.lift) else {
            info!(completed = samples.len(), failed = failures.len(), "no stable selection");
            return Ok(RankingOutcome {
                records: Vec::new(),
                status: RankingStatus::NoSignal,
                selected_q: 0,
                num_pairs,
                sum: 0.0,
                completed: samples.len(),
                failures,
            });
        };

        let q = chosen.q;
        let er = selection::expected_errors(q, chosen.sum);
        let mut records = chosen
            .pairs
            .iter()
            .map(|&(pair, pi)| {
                let predictor = &pool[pair.predictor];
                let target = &targets[pair.target];
                let (ancestor, trek_to_target) = self.truth_flags(predictor, target);
                StabilityRecord {
                    predictor: predictor.name().to_string(),
                    target: target.name().to_string(),
                    pi,
                    effect: selection::average_effect(&samples, pair, q),
                    pcer: selection::pcer(pi, q, num_pairs),
                    er,
                    ev_bound: selection::expected_false_positives(pi, q, num_pairs),
                    ancestor,
                    trek_to_target,
                }
            })
            .collect::<Vec<_>>();
        records.sort_by(|a, b| b.pi.total_cmp(&a.pi).then_with(|| b.effect.total_cmp(&a.effect)));

        info!(
            q,
            sum = chosen.sum,
            er,
            selected = records.len(),
            completed = samples.len(),
            failed = failures.len(),
            "stability ranking finished"
        );

        Ok(RankingOutcome {
            records,
            status: RankingStatus::Selected,
            selected_q: q,
            num_pairs,
            sum: chosen.sum,
            completed: samples.len(),
            failures,
        })
    }

    /// Resample, search and rank effects for every target.
    fn subsample(
        &self,
        learning: &Dataset,
        pool: &[Variable],
        targets: &[Variable],
        ctx: RandomContext,
        index: usize,
    ) -> Result<SubsampleRanks> {
        let mut rng = ctx.for_task(index);
        let sample = self.resampler.resample(learning, &mut rng);
        let graph = self.learner.search(&sample)?;
        debug!(task = index, edges = graph.num_edges(), "subsample searched");

        let names: HashSet<&str> = pool.iter().map(|v| v.name()).collect();
        let mut position = Vec::with_capacity(targets.len());
        let mut effect = Vec::with_capacity(targets.len());
        for target in targets {
            let ranking = self
                .estimator
                .rank_effects(&sample, &graph, target)?
                .restricted_to(&names);

            let mut pos = vec![usize::MAX; pool.len()];
            let mut eff = vec![0.0; pool.len()];
            for (k, var) in pool.iter().enumerate() {
                if let Some(rank) = ranking.position(var.name()) {
                    pos[k] = rank;
                    eff[k] = ranking.entries()[rank].effect;
                }
            }
            position.push(pos);
            effect.push(eff);
        }
        Ok(SubsampleRanks { position, effect })
    }

    fn truth_flags(&self, predictor: &Variable, target: &Variable) -> (Option<bool>, Option<bool>) {
        let Some(truth) = &self.true_graph else {
            return (None, None);
        };
        match (truth.node_index(predictor.name()), truth.node_index(target.name())) {
            (Some(p), Some(t)) => (
                Some(truth.is_ancestor_of(p, t)),
                Some(truth.exists_trek(p, t, self.settings.max_trek_length)),
            ),
            _ => (None, None),
        }
    }
}

/// Check both lists and form the predictor pool (predictors minus targets),
/// each deduplicated in the order given.
fn resolve_pools(
    data: &Dataset,
    predictors: &[Variable],
    targets: &[Variable],
) -> Result<(Vec<Variable>, Vec<Variable>)> {
    if predictors.is_empty() {
        return Err(StablError::EmptyPool { role: "predictor" });
    }
    if targets.is_empty() {
        return Err(StablError::EmptyPool { role: "target" });
    }

    let lookup = |v: &Variable| -> Result<Variable> {
        data.variable(v.name())
            .cloned()
            .ok_or_else(|| StablError::unknown_variable(v.name()))
    };

    let mut seen = HashSet::new();
    let mut target_vars = Vec::with_capacity(targets.len());
    for t in targets {
        let var = lookup(t)?;
        if seen.insert(var.name().to_string()) {
            target_vars.push(var);
        }
    }

    let mut pool = Vec::with_capacity(predictors.len());
    for p in predictors {
        let var = lookup(p)?;
        if seen.insert(var.name().to_string()) {
            pool.push(var);
        }
    }
    if pool.is_empty() {
        return Err(StablError::EmptyPool {
            role: "remaining predictor",
        });
    }
    Ok((pool, target_vars))
}

/// Directed graph from each selected predictor to its target.
pub fn predictor_graph(records: &[StabilityRecord], data: &Dataset) -> Result<Graph> {
    let mut graph = Graph::new(Vec::new());
    for record in records {
        for name in [&record.predictor, &record.target] {
            let var = data
                .variable(name)
                .cloned()
                .ok_or_else(|| StablError::unknown_variable(name.as_str()))?;
            graph.add_node(var);
        }
        graph.add_directed(&record.predictor, &record.target)?;
    }
    Ok(graph)
}

/// Rank with the reference learner (PC over `test`) and IDA effects.
pub fn rank(
    data: &Dataset,
    predictors: &[Variable],
    targets: &[Variable],
    test: &TestConfig,
    settings: &RankerSettings,
) -> Result<RankingOutcome> {
    test.validate()?;
    StabilityRanker::new(PcSearch::new(test.clone()), IdaEstimator::new(), settings.clone())
        .rank(data, predictors, targets)
}

//! Bootstrap ensembles of any [`BaseLearner`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::Dataset;
use crate::ensemble::{self, EnsembleRule};
use crate::error::{Result, StablError};
use crate::graph::Graph;
use crate::learner::BaseLearner;
use crate::resample::{BootstrapSampler, RandomContext, Resampler};
use crate::runner::{TaskFailure, TaskRunner};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapSettings {
    pub num_samples: usize,
    pub rule: EnsembleRule,
    pub parallelism: usize,
    pub seed: u64,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            num_samples: 10,
            rule: EnsembleRule::default(),
            parallelism: TaskRunner::default_parallelism(),
            seed: RandomContext::default().seed(),
        }
    }
}

impl BootstrapSettings {
    pub fn validate(&self) -> Result<()> {
        if self.num_samples == 0 {
            return Err(StablError::invalid("num_samples", "must be at least 1"));
        }
        if self.parallelism == 0 {
            return Err(StablError::invalid("parallelism", "must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EnsembleOutcome {
    pub graph: Graph,
    pub rule: EnsembleRule,
    /// Share of completed samples containing each adjacency.
    pub edge_frequencies: BTreeMap<(String, String), f64>,
    pub completed: usize,
    pub failures: Vec<TaskFailure>,
}

/// Runs a learner on B resamples and merges the graphs under one rule.
pub struct BootstrapSearch<L> {
    learner: L,
    settings: BootstrapSettings,
    resampler: Box<dyn Resampler>,
}

impl<L: BaseLearner> BootstrapSearch<L> {
    pub fn new(learner: L, settings: BootstrapSettings) -> Self {
        Self {
            learner,
            settings,
            resampler: Box::new(BootstrapSampler),
        }
    }

    pub fn with_resampler<R: Resampler + 'static>(mut self, resampler: R) -> Self {
        self.resampler = Box::new(resampler);
        self
    }

    pub fn learner(&self) -> &L {
        &self.learner
    }

    pub fn search(&self, data: &Dataset) -> Result<EnsembleOutcome> {
        self.settings.validate()?;
        self.learner.validate(data)?;

        let b = self.settings.num_samples;
        info!(learner = self.learner.name(), samples = b, rule = %self.settings.rule, "starting bootstrap search");

        let runner = TaskRunner::new(self.settings.parallelism)?;
        let ctx = RandomContext::new(self.settings.seed);
        let tasks: Vec<_> = (0..b)
            .map(|index| {
                move || {
                    let mut rng = ctx.for_task(index);
                    let sample = self.resampler.resample(data, &mut rng);
                    self.learner.search(&sample)
                }
            })
            .collect();

        let (graphs, failures) = runner.run(tasks).into_parts();
        if graphs.is_empty() {
            return Err(StablError::AllTasksFailed { failures });
        }

        let graph = ensemble::aggregate(&graphs, self.settings.rule)?;
        info!(
            edges = graph.num_edges(),
            completed = graphs.len(),
            failed = failures.len(),
            "bootstrap search finished"
        );

        Ok(EnsembleOutcome {
            graph,
            rule: self.settings.rule,
            edge_frequencies: ensemble::edge_frequencies(&graphs),
            completed: graphs.len(),
            failures,
        })
    }
}

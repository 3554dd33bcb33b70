//! stabl: bootstrap ensembles and stability ranking for causal search.
//!
//! Two engines sit on top of a bounded parallel [`runner::TaskRunner`]:
//!
//! - [`bootstrap::BootstrapSearch`] runs any [`learner::BaseLearner`] on B
//!   resamples and merges the graphs with an [`ensemble::EnsembleRule`].
//! - [`ranking::StabilityRanker`] ranks predictor → target effects over B
//!   subsamples and selects the stable ones with error bounds.
//!
//! [`screen::VariableScreener`] pre-filters wide datasets before ranking, and
//! [`search`] carries reference learners and tests for both engines.

#![allow(clippy::needless_range_loop)]

pub mod bootstrap;
pub mod config;
pub mod data;
pub mod ensemble;
pub mod error;
pub mod graph;
pub mod learner;
pub mod ranking;
pub mod resample;
pub mod runner;
pub mod screen;
pub mod search;

pub use bootstrap::{BootstrapSearch, BootstrapSettings, EnsembleOutcome};
pub use config::{ConfigError, StablConfig};
pub use data::{Dataset, Variable, VariableKind};
pub use ensemble::{aggregate, EnsembleRule};
pub use error::{Result, StablError};
pub use graph::{Edge, Endpoint, Graph};
pub use learner::{BaseLearner, EffectEstimator, EffectRanking, RankedEffect};
pub use ranking::{
    predictor_graph, rank, RankerSettings, RankingOutcome, RankingStatus, StabilityRanker,
    StabilityRecord,
};
pub use resample::{BootstrapSampler, RandomContext, Resampler};
pub use runner::{BatchReport, TaskFailure, TaskRunner};
pub use screen::{ScreeningOutcome, VariableScreener};
pub use search::{IdaEstimator, PcSearch, TestConfig, TestKind};

#[cfg(test)]
pub mod tests_config;
#[cfg(test)]
pub mod tests_proptest;

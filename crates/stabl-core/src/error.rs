use thiserror::Error;

use crate::config::ConfigError;
use crate::runner::TaskFailure;

#[derive(Error, Debug)]
pub enum StablError {
    // === Configuration Errors ===
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error("Unsupported test kind '{kind}' (expected one of: fisher-z, chi-square, sem-bic, conditional-gaussian)")]
    UnsupportedTest { kind: String },

    #[error("Test '{kind}' cannot be used with variable '{variable}': {message}")]
    IncompatibleTest {
        kind: String,
        variable: String,
        message: String,
    },

    #[error("The {role} pool is empty")]
    EmptyPool { role: &'static str },

    #[error("Variable '{name}' is not in the dataset")]
    UnknownVariable { name: String },

    #[error("Invalid value for '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },

    #[error("Unknown ensemble index {index} (expected 0 = preserved, 1 = highest, 2 = majority)")]
    UnknownEnsemble { index: usize },

    // === Data & Graph Errors ===
    #[error("Malformed dataset: {message}")]
    Dataset { message: String },

    #[error("Graphs are not over the same nodes: {message}")]
    GraphMismatch { message: String },

    #[error("Node '{name}' is not in the graph")]
    UnknownNode { name: String },

    // === Computation Errors ===
    #[error("Search '{learner}' failed: {message}")]
    Search { learner: String, message: String },

    #[error("Numeric failure in {operation}: {message}")]
    Numeric {
        operation: &'static str,
        message: String,
    },

    #[error("All {} tasks failed; first failure: {}", .failures.len(), first_reason(.failures))]
    AllTasksFailed { failures: Vec<TaskFailure> },
}

fn first_reason(failures: &[TaskFailure]) -> &str {
    failures
        .first()
        .map(|f| f.reason.as_str())
        .unwrap_or("<none>")
}

pub type Result<T, E = StablError> = std::result::Result<T, E>;

impl StablError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn invalid<S: Into<String>>(name: &'static str, message: S) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    pub fn dataset<S: Into<String>>(message: S) -> Self {
        Self::Dataset {
            message: message.into(),
        }
    }

    pub fn search<S1, S2>(learner: S1, message: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::Search {
            learner: learner.into(),
            message: message.into(),
        }
    }

    pub fn numeric<S: Into<String>>(operation: &'static str, message: S) -> Self {
        Self::Numeric {
            operation,
            message: message.into(),
        }
    }

    pub fn unknown_variable<S: Into<String>>(name: S) -> Self {
        Self::UnknownVariable { name: name.into() }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "CONFIG_ERROR",
            Self::ConfigFile(_) => "CONFIG_FILE_ERROR",
            Self::UnsupportedTest { .. } => "UNSUPPORTED_TEST",
            Self::IncompatibleTest { .. } => "INCOMPATIBLE_TEST",
            Self::EmptyPool { .. } => "EMPTY_POOL",
            Self::UnknownVariable { .. } => "UNKNOWN_VARIABLE",
            Self::InvalidParameter { .. } => "INVALID_PARAMETER",
            Self::UnknownEnsemble { .. } => "UNKNOWN_ENSEMBLE",
            Self::Dataset { .. } => "DATASET_ERROR",
            Self::GraphMismatch { .. } => "GRAPH_MISMATCH",
            Self::UnknownNode { .. } => "UNKNOWN_NODE",
            Self::Search { .. } => "SEARCH_ERROR",
            Self::Numeric { .. } => "NUMERIC_ERROR",
            Self::AllTasksFailed { .. } => "ALL_TASKS_FAILED",
        }
    }

    /// Configuration errors stop a run before any task is scheduled.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::ConfigFile(_)
                | Self::UnsupportedTest { .. }
                | Self::IncompatibleTest { .. }
                | Self::EmptyPool { .. }
                | Self::UnknownVariable { .. }
                | Self::InvalidParameter { .. }
                | Self::UnknownEnsemble { .. }
        )
    }
}

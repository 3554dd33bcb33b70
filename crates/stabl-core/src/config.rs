use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::bootstrap::BootstrapSettings;
use crate::ensemble::EnsembleRule;
use crate::ranking::RankerSettings;
use crate::resample::RandomContext;
use crate::runner::TaskRunner;
use crate::screen::VariableScreener;
use crate::search::TestConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StablConfig {
    pub bootstrap: BootstrapConfig,
    pub ranking: RankingConfig,
    pub screening: ScreeningConfig,
    pub test: TestConfig,
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Number of resamples (B)
    pub num_samples: usize,
    /// Consensus rule: preserved, highest or majority
    pub rule: EnsembleRule,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Number of subsamples (B)
    pub num_subsamples: usize,
    /// Selection threshold multiplier on q²/p
    pub lift: f64,
    /// Longest trek checked against a ground-truth graph
    pub max_trek_length: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningConfig {
    /// First pass significance level
    pub alpha: f64,
    /// Second pass significance level
    pub strict_alpha: f64,
    /// Variables per screening task
    pub chunk_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Worker threads per batch
    pub parallelism: usize,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            num_samples: 10,
            rule: EnsembleRule::Highest,
            seed: RandomContext::default().seed(),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            num_subsamples: 30,
            lift: 2.0,
            max_trek_length: 15,
            seed: RandomContext::default().seed(),
        }
    }
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            alpha: 0.01,
            strict_alpha: 1e-5,
            chunk_size: 50,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            parallelism: TaskRunner::default_parallelism(),
        }
    }
}

fn env_value<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Validation(format!("Invalid {}", name))),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Overlay `overlay` onto `base`, descending into tables.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        let value = match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
                continue;
            }
            (_, value) => value,
        };
        base.insert(key, value);
    }
}

impl StablConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: StablConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    /// Variables are prefixed with STABL_, e.g. STABL_RANKING_LIFT=1.5
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. User config file (if exists), merged key by key
    /// 3. Default config file
    /// 4. Built-in defaults (lowest priority)
    pub fn load_layered(default_path: Option<&Path>, user_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut table = toml::Table::new();
        for path in [default_path, user_path].into_iter().flatten() {
            if path.exists() {
                let layer: toml::Table = toml::from_str(&fs::read_to_string(path)?)?;
                merge_tables(&mut table, layer);
            }
        }

        let mut config: StablConfig = toml::Value::Table(table).try_into()?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply STABL_* environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = env_value("STABL_BOOTSTRAP_NUM_SAMPLES")? {
            self.bootstrap.num_samples = v;
        }
        if let Some(v) = env_value::<String>("STABL_BOOTSTRAP_RULE")? {
            self.bootstrap.rule = v
                .parse()
                .map_err(|_| ConfigError::Validation("Invalid STABL_BOOTSTRAP_RULE".to_string()))?;
        }
        if let Some(v) = env_value("STABL_BOOTSTRAP_SEED")? {
            self.bootstrap.seed = v;
        }
        if let Some(v) = env_value("STABL_RANKING_NUM_SUBSAMPLES")? {
            self.ranking.num_subsamples = v;
        }
        if let Some(v) = env_value("STABL_RANKING_LIFT")? {
            self.ranking.lift = v;
        }
        if let Some(v) = env_value("STABL_RANKING_SEED")? {
            self.ranking.seed = v;
        }
        if let Some(v) = env_value("STABL_SCREENING_ALPHA")? {
            self.screening.alpha = v;
        }
        if let Some(v) = env_value("STABL_SCREENING_STRICT_ALPHA")? {
            self.screening.strict_alpha = v;
        }
        if let Some(v) = env_value::<String>("STABL_TEST_KIND")? {
            self.test.kind = v
                .parse()
                .map_err(|_| ConfigError::Validation("Invalid STABL_TEST_KIND".to_string()))?;
        }
        if let Some(v) = env_value("STABL_TEST_ALPHA")? {
            self.test.alpha = v;
        }
        if let Some(v) = env_value("STABL_TEST_PENALTY_DISCOUNT")? {
            self.test.penalty_discount = v;
        }
        if let Some(v) = env_value("STABL_PERFORMANCE_PARALLELISM")? {
            self.performance.parallelism = v;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bootstrap.num_samples == 0 {
            return Err(ConfigError::Validation(
                "bootstrap.num_samples must be > 0".to_string(),
            ));
        }

        // TOML integers are signed 64-bit
        for (name, seed) in [
            ("bootstrap.seed", self.bootstrap.seed),
            ("ranking.seed", self.ranking.seed),
        ] {
            if seed > i64::MAX as u64 {
                return Err(ConfigError::Validation(format!(
                    "{} must be <= {}",
                    name,
                    i64::MAX
                )));
            }
        }

        if self.ranking.num_subsamples == 0 {
            return Err(ConfigError::Validation(
                "ranking.num_subsamples must be > 0".to_string(),
            ));
        }
        if !(self.ranking.lift > 0.0 && self.ranking.lift.is_finite()) {
            return Err(ConfigError::Validation(
                "ranking.lift must be positive".to_string(),
            ));
        }

        for (name, alpha) in [
            ("screening.alpha", self.screening.alpha),
            ("screening.strict_alpha", self.screening.strict_alpha),
        ] {
            if !(alpha > 0.0 && alpha < 1.0) {
                return Err(ConfigError::Validation(format!("{} must be in (0, 1)", name)));
            }
        }
        if self.screening.strict_alpha > self.screening.alpha {
            return Err(ConfigError::Validation(
                "screening.strict_alpha must be <= alpha".to_string(),
            ));
        }
        if self.screening.chunk_size == 0 {
            return Err(ConfigError::Validation(
                "screening.chunk_size must be > 0".to_string(),
            ));
        }

        self.test
            .validate()
            .map_err(|e| ConfigError::Validation(format!("test: {}", e)))?;

        if self.performance.parallelism == 0 {
            return Err(ConfigError::Validation(
                "performance.parallelism must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn bootstrap_settings(&self) -> BootstrapSettings {
        BootstrapSettings {
            num_samples: self.bootstrap.num_samples,
            rule: self.bootstrap.rule,
            parallelism: self.performance.parallelism,
            seed: self.bootstrap.seed,
        }
    }

    pub fn ranker_settings(&self) -> RankerSettings {
        RankerSettings {
            num_subsamples: self.ranking.num_subsamples,
            lift: self.ranking.lift,
            parallelism: self.performance.parallelism,
            max_trek_length: self.ranking.max_trek_length,
            seed: self.ranking.seed,
        }
    }

    pub fn screener(&self) -> VariableScreener {
        VariableScreener {
            test: self.test.clone(),
            alpha: self.screening.alpha,
            strict_alpha: self.screening.strict_alpha,
            chunk_size: self.screening.chunk_size,
            parallelism: self.performance.parallelism,
        }
    }

    /// Export configuration to TOML string
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = self
            .to_toml_string()
            .map_err(|e| ConfigError::Validation(format!("TOML serialization error: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }
}

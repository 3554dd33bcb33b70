#[cfg(test)]
mod tests {
    use crate::config::*;
    use crate::ensemble::EnsembleRule;
    use crate::search::TestKind;
    use std::env;
    use std::fs;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_default_config_valid() {
        let config = StablConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bootstrap.rule, EnsembleRule::Highest);
        assert_eq!(config.screening.chunk_size, 50);
    }

    #[test]
    fn test_config_validation_ranking() {
        let mut config = StablConfig::default();
        config.ranking.lift = 0.0;
        assert!(config.validate().is_err());

        config.ranking.lift = 2.0;
        config.ranking.num_subsamples = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_screening_and_test() {
        let mut config = StablConfig::default();
        // strict pass must not be looser than the first pass
        config.screening.strict_alpha = 0.5;
        assert!(config.validate().is_err());

        let mut config = StablConfig::default();
        config.test.alpha = 1.0;
        assert!(config.validate().is_err());

        let mut config = StablConfig::default();
        config.performance.parallelism = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_toml_round_trip() {
        let mut config = StablConfig::default();
        config.bootstrap.rule = EnsembleRule::Majority;
        config.test.kind = TestKind::SemBic;

        let file = NamedTempFile::new().unwrap();
        config.save_to_file(file.path()).unwrap();
        let text = fs::read_to_string(file.path()).unwrap();
        assert!(text.contains("rule = \"majority\""));
        assert!(text.contains("kind = \"sem-bic\""));

        let loaded = StablConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "[ranking]\nlift = 1.5\n").unwrap();
        let config = StablConfig::from_file(file.path()).unwrap();
        assert_eq!(config.ranking.lift, 1.5);
        assert_eq!(config.ranking.num_subsamples, 30);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "[test]\nkind = \"g-square\"\n").unwrap();
        assert!(matches!(
            StablConfig::from_file(file.path()),
            Err(ConfigError::TomlParse(_))
        ));

        fs::write(file.path(), "[bootstrap]\nnum_samples = 0\n").unwrap();
        assert!(matches!(
            StablConfig::from_file(file.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    // Env vars are process-wide, so every override case lives in this one test.
    #[test]
    fn test_env_overrides_and_layering() {
        let dir = tempdir().unwrap();
        let defaults = dir.path().join("default.toml");
        let user = dir.path().join("user.toml");
        fs::write(&defaults, "[ranking]\nlift = 3.0\nnum_subsamples = 50\n").unwrap();
        fs::write(&user, "[ranking]\nlift = 1.5\n").unwrap();

        let config = StablConfig::load_layered(Some(&defaults), Some(&user)).unwrap();
        assert_eq!(config.ranking.lift, 1.5);
        assert_eq!(config.ranking.num_subsamples, 50);

        env::set_var("STABL_RANKING_LIFT", "4.0");
        env::set_var("STABL_BOOTSTRAP_RULE", "preserved");
        let config = StablConfig::load_layered(Some(&defaults), Some(&user)).unwrap();
        assert_eq!(config.ranking.lift, 4.0);
        assert_eq!(config.bootstrap.rule, EnsembleRule::Preserved);

        env::set_var("STABL_TEST_KIND", "not-a-test");
        let mut config = StablConfig::default();
        assert!(config.apply_env_overrides().is_err());

        env::remove_var("STABL_RANKING_LIFT");
        env::remove_var("STABL_BOOTSTRAP_RULE");
        env::remove_var("STABL_TEST_KIND");
    }

    #[test]
    fn test_seed_must_fit_toml_integer() {
        let mut config = StablConfig::default();
        config.ranking.seed = i64::MAX as u64;
        assert!(config.validate().is_ok());
        assert!(config.to_toml_string().is_ok());

        config.ranking.seed = u64::MAX;
        assert!(config.validate().is_err());

        let mut config = StablConfig::default();
        config.bootstrap.seed = 1 << 63;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_settings_follow_config() {
        let mut config = StablConfig::default();
        config.performance.parallelism = 3;
        config.ranking.seed = 42;
        assert_eq!(config.ranker_settings().parallelism, 3);
        assert_eq!(config.ranker_settings().seed, 42);
        assert_eq!(config.bootstrap_settings().parallelism, 3);
        assert_eq!(config.screener().strict_alpha, 1e-5);
    }
}

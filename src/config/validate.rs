// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, RawRetrySection};
use crate::errors::{ConduktError, Result};
use crate::exec::RetryPolicy;
use crate::types::RetryCondition;

/// Upper bound on `[retry].retries`.
pub const MAX_CONFIG_RETRIES: u32 = 100;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ConduktError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_pipeline_name(&raw)?;
        let retry = validate_retry(&raw.retry)?;
        Ok(ConfigFile::new_unchecked(raw.pipeline, retry))
    }
}

fn validate_pipeline_name(cfg: &RawConfigFile) -> Result<()> {
    if let Some(name) = &cfg.pipeline.name {
        if name.trim().is_empty() {
            return Err(ConduktError::ConfigError(
                "[pipeline].name must not be blank".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_retry(raw: &RawRetrySection) -> Result<RetryPolicy> {
    if raw.retries > MAX_CONFIG_RETRIES {
        return Err(ConduktError::ConfigError(format!(
            "[retry].retries must be <= {MAX_CONFIG_RETRIES} (got {})",
            raw.retries
        )));
    }

    let retry_if = match raw.retry_if.as_deref() {
        Some(s) => s
            .parse::<RetryCondition>()
            .map_err(|e| ConduktError::ConfigError(format!("[retry] {e}")))?,
        None => RetryCondition::default(),
    };

    Ok(RetryPolicy {
        retries: raw.retries,
        backoff_ms: raw.backoff_ms,
        jitter_ms: raw.jitter_ms,
        retry_if,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(toml_src)?;
        ConfigFile::try_from(raw)
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg, ConfigFile::default());
        assert_eq!(cfg.retry.max_attempts(), 1);
    }

    #[test]
    fn retry_section_is_resolved() {
        let cfg = parse(
            r#"
            [retry]
            retries = 3
            jitter_ms = 10
            retry_if = "contract_violation"
            "#,
        )
        .unwrap();
        assert_eq!(
            cfg.retry,
            RetryPolicy::new(3)
                .with_jitter_ms(10)
                .with_retry_if(RetryCondition::ContractViolation)
        );
    }

    #[test]
    fn bad_retry_if_is_rejected() {
        let err = parse("[retry]\nretry_if = \"sometimes\"").unwrap_err();
        assert!(err.to_string().contains("invalid retry_if: sometimes"));
    }

    #[test]
    fn too_many_retries_are_rejected() {
        let err = parse("[retry]\nretries = 101").unwrap_err();
        assert!(matches!(err, ConduktError::ConfigError(_)));
    }

    #[test]
    fn blank_name_is_rejected() {
        assert!(parse("[pipeline]\nname = \"  \"").is_err());
    }

    #[test]
    fn unknown_keys_fail_to_parse() {
        let err = parse("[retry]\nretrys = 1").unwrap_err();
        assert!(matches!(err, ConduktError::TomlError(_)));
    }
}

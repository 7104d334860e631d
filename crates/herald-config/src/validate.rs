//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Upper bound on the dispatcher queue (1M requests).
const MAX_QUEUE_CAPACITY: usize = 1_048_576;

/// Validate a fully merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_directory(config)?;
    validate_registration(config)?;
    validate_dispatch(config)?;
    validate_topics(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_directory(config: &Config) -> ConfigResult<()> {
    if config.directory.broker_type_id.trim().is_empty() {
        return Err(invalid(
            "directory.broker_type_id",
            "broker type id must not be empty",
        ));
    }
    Ok(())
}

fn validate_registration(config: &Config) -> ConfigResult<()> {
    let r = &config.registration;

    if !r.backoff_base.is_finite() || r.backoff_base < 1.0 {
        return Err(invalid(
            "registration.backoff_base",
            format!("backoff_base {} must be a finite number >= 1.0", r.backoff_base),
        ));
    }

    if !(0.0..=1.0).contains(&r.jitter) {
        return Err(invalid(
            "registration.jitter",
            format!("jitter {} is out of range; must be between 0.0 and 1.0", r.jitter),
        ));
    }

    if r.initial_delay_ms > r.max_delay_ms {
        return Err(invalid(
            "registration.initial_delay_ms",
            "initial_delay_ms must not exceed max_delay_ms",
        ));
    }

    if r.timeout_ms == 0 {
        return Err(invalid(
            "registration.timeout_ms",
            "timeout_ms must be greater than zero",
        ));
    }

    Ok(())
}

fn validate_dispatch(config: &Config) -> ConfigResult<()> {
    let d = &config.dispatch;

    if d.queue_capacity == 0 || d.queue_capacity > MAX_QUEUE_CAPACITY {
        return Err(invalid(
            "dispatch.queue_capacity",
            format!("queue_capacity must be between 1 and {MAX_QUEUE_CAPACITY}"),
        ));
    }

    if d.concurrency == 0 {
        return Err(invalid(
            "dispatch.concurrency",
            "concurrency must be at least 1",
        ));
    }

    Ok(())
}

fn validate_topics(config: &Config) -> ConfigResult<()> {
    for (topic, type_id) in &config.topics {
        if topic.trim().is_empty() {
            return Err(invalid("topics", "topic names must not be empty"));
        }
        if type_id.trim().is_empty() {
            return Err(invalid(
                &format!("topics.{topic}"),
                "interface type id must not be empty",
            ));
        }
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !matches!(
        l.level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported level '{}'; expected one of: trace, debug, info, warn, error",
                l.level
            ),
        ));
    }

    if !matches!(l.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: pretty, compact, json, full",
                l.format
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.dispatch.concurrency = 0;

        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { field, .. } if field == "dispatch.concurrency"));
    }

    #[test]
    fn test_rejects_jitter_out_of_range() {
        let mut config = Config::default();
        config.registration.jitter = 1.5;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_inverted_delays() {
        let mut config = Config::default();
        config.registration.initial_delay_ms = 10_000;
        config.registration.max_delay_ms = 100;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_empty_topic_interface() {
        let mut config = Config::default();
        config.topics.insert("job.progress".into(), "  ".into());

        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("topics.job.progress"));
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".into();
        assert!(validate(&config).is_err());
    }
}

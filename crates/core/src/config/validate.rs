use super::{types::Config, ConfigError, StorageBackend};

/// Validate what the fetch-and-stage job needs:
/// - Bucket is set when the S3 backend is selected
/// - Retry cap, when present, is non-zero
/// - Staging prefix is not only slashes
///
/// Season format is enforced while deserializing.
pub fn validate_stage_config(config: &Config) -> Result<(), ConfigError> {
    if config.storage.backend == StorageBackend::S3 && config.storage.bucket.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "storage.bucket is required for the s3 backend (or set AWS_BUCKET_NAME)".to_string(),
        ));
    }

    if config.stats.max_attempts == Some(0) {
        return Err(ConfigError::ValidationError(
            "stats.max_attempts cannot be 0".to_string(),
        ));
    }

    if !config.staging.prefix.is_empty() && config.staging.prefix.trim_matches('/').is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "staging.prefix {:?} has no path segments",
            config.staging.prefix
        )));
    }

    Ok(())
}

/// Validate configuration for a full graph run
/// Currently validates:
/// - Everything `validate_stage_config` checks
/// - Sensor poke interval is non-zero and no longer than the sensor timeout
/// - Warehouse account URL and stage are set
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    validate_stage_config(config)?;

    if config.sensors.poke_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "sensors.poke_interval_secs cannot be 0".to_string(),
        ));
    }

    if config.sensors.poke_interval_secs > config.sensors.timeout_secs {
        return Err(ConfigError::ValidationError(format!(
            "sensors.poke_interval_secs ({}) exceeds sensors.timeout_secs ({})",
            config.sensors.poke_interval_secs, config.sensors.timeout_secs
        )));
    }

    if config.warehouse.account_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "warehouse.account_url is required".to_string(),
        ));
    }

    if config.warehouse.stage.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "warehouse.stage is required (or set SNOWFLAKE_STAGE)".to_string(),
        ));
    }

    Ok(())
}

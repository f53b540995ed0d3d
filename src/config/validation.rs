use crate::config::types::{BlockConfig, CrawlerConfig, MirrorConfig, OutputConfig, SessionConfig};
use crate::ConfigError;
use scraper::Selector;

/// Validates the entire configuration
pub fn validate(config: &MirrorConfig) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_session_config(&config.session)?;
    validate_block_config(&config.block)?;
    Ok(())
}

/// Validates traversal and pacing configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_seconds("wait", config.wait)?;
    validate_seconds("retry_delay", config.retry_delay)?;
    validate_seconds("navigation_timeout", config.navigation_timeout)?;

    if config.navigation_timeout == 0.0 {
        return Err(ConfigError::Validation(
            "navigation_timeout must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

/// Rejects negative, NaN, infinite, or absurdly large second counts
fn validate_seconds(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::Validation(format!(
            "{} must be a non-negative number of seconds, got {}",
            name, value
        )));
    }

    // Duration::from_secs_f64 panics above u64::MAX seconds
    if value > u32::MAX as f64 {
        return Err(ConfigError::Validation(format!(
            "{} is too large: {}",
            name, value
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates session configuration
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if let Some(user_agent) = &config.user_agent {
        if user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user_agent cannot be empty".to_string(),
            ));
        }

        if user_agent.chars().any(|c| c.is_control()) {
            return Err(ConfigError::Validation(format!(
                "user_agent contains control characters: {:?}",
                user_agent
            )));
        }
    }

    if let Some(cookies) = &config.cookies {
        if cookies.trim().is_empty() {
            return Err(ConfigError::Validation(
                "cookies path cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates that every block signature is a usable CSS selector
fn validate_block_config(config: &BlockConfig) -> Result<(), ConfigError> {
    for signature in &config.signatures {
        if signature.trim().is_empty() {
            return Err(ConfigError::InvalidSignature(
                "block signature cannot be empty".to_string(),
            ));
        }

        Selector::parse(signature).map_err(|e| {
            ConfigError::InvalidSignature(format!("'{}': {:?}", signature, e))
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&MirrorConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_seconds() {
        assert!(validate_seconds("wait", 0.0).is_ok());
        assert!(validate_seconds("wait", 1.5).is_ok());

        assert!(validate_seconds("wait", -0.1).is_err());
        assert!(validate_seconds("wait", f64::NAN).is_err());
        assert!(validate_seconds("wait", f64::INFINITY).is_err());
        assert!(validate_seconds("wait", 1e20).is_err());
    }

    #[test]
    fn test_zero_navigation_timeout_rejected() {
        let mut config = MirrorConfig::default();
        config.crawler.navigation_timeout = 0.0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_output_directory_rejected() {
        let mut config = MirrorConfig::default();
        config.output.directory = "  ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_user_agent_validation() {
        let mut config = MirrorConfig::default();
        config.session.user_agent = Some("Mozilla/5.0 (X11; Linux x86_64)".to_string());
        assert!(validate(&config).is_ok());

        config.session.user_agent = Some(String::new());
        assert!(validate(&config).is_err());

        config.session.user_agent = Some("bad\nagent".to_string());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_block_signature_rejected() {
        let mut config = MirrorConfig::default();
        config.block.signatures = vec!["div[".to_string()];
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidSignature(_))
        ));
    }
}

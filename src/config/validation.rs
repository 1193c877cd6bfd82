use crate::config::Settings;
use crate::ConfigError;

/// Validates settings before any scraper runs.
pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if !settings.max_rate.is_finite() || settings.max_rate <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "max-rate must be a positive number, got {}",
            settings.max_rate
        )));
    }
    Ok(())
}

/// Validates an inclusive comic ID range.
pub fn validate_id_range(start_id: u32, end_id: u32) -> Result<(), ConfigError> {
    if start_id == 0 {
        return Err(ConfigError::Validation(
            "start-id must be at least 1".to_string(),
        ));
    }
    if end_id < start_id {
        return Err(ConfigError::Validation(format!(
            "end-id ({}) must not be less than start-id ({})",
            end_id, start_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(validate(&Settings::default()).is_ok());
    }

    #[test]
    fn test_zero_rate_rejected() {
        let settings = Settings {
            max_rate: 0.0,
            ..Settings::default()
        };
        assert!(matches!(
            validate(&settings),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_negative_rate_rejected() {
        let settings = Settings {
            max_rate: -1.0,
            ..Settings::default()
        };
        assert!(validate(&settings).is_err());
    }

    #[test]
    fn test_nan_rate_rejected() {
        let settings = Settings {
            max_rate: f64::NAN,
            ..Settings::default()
        };
        assert!(validate(&settings).is_err());
    }

    #[test]
    fn test_valid_id_range() {
        assert!(validate_id_range(1, 7500).is_ok());
        assert!(validate_id_range(5, 5).is_ok());
    }

    #[test]
    fn test_inverted_id_range_rejected() {
        assert!(validate_id_range(10, 5).is_err());
    }

    #[test]
    fn test_zero_start_id_rejected() {
        assert!(validate_id_range(0, 5).is_err());
    }
}

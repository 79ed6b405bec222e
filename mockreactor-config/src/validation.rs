// mockreactor-config/src/validation.rs
//! Custom validation functions for configuration.

use validator::ValidationError;

/// Validate that a log prefix is a short, non-empty token without whitespace.
pub fn validate_log_prefix(prefix: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new(r"^[A-Za-z0-9_.:\-]{1,32}$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(prefix) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_prefix"))
    }
}

/// Validate a default log filter level.
pub fn validate_log_filter(filter: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error", "off"]
        .contains(&filter.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_filter"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_prefixes() {
        assert!(validate_log_prefix("Reactor").is_ok());
        assert!(validate_log_prefix("MockEM").is_ok());
        assert!(validate_log_prefix("test-loop.1").is_ok());
    }

    #[test]
    fn rejects_empty_or_spaced_prefixes() {
        assert!(validate_log_prefix("").is_err());
        assert!(validate_log_prefix("two words").is_err());
    }

    #[test]
    fn log_filter_is_case_insensitive() {
        assert!(validate_log_filter("DEBUG").is_ok());
        assert!(validate_log_filter("verbose").is_err());
    }
}

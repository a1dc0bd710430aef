//! Custom validation functions shared by the configuration sections.

use validator::ValidationError;

/// Interface names follow Linux rules: 1-15 chars, no `/` or whitespace.
pub fn validate_interface(name: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new(r"^[A-Za-z0-9_.\-]{1,15}$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_interface"))
    }
}

/// Accepts a bare level or an `EnvFilter` directive list.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new(
        r"^(?i)([a-z0-9_:]+=)?(trace|debug|info|warn|error|off)(,([a-z0-9_:]+=)?(trace|debug|info|warn|error|off))*$",
    )
    .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(level) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}

/// Kernel symbol names: C identifiers, optionally with a `.suffix`.
pub fn validate_symbol(name: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z0-9_]+)*$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_symbol"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interfaces() {
        assert!(validate_interface("eth0").is_ok());
        assert!(validate_interface("enp3s0.100").is_ok());
        assert!(validate_interface("").is_err());
        assert!(validate_interface("this-name-is-too-long").is_err());
        assert!(validate_interface("eth 0").is_err());
    }

    #[test]
    fn log_levels() {
        assert!(validate_log_level("info").is_ok());
        assert!(validate_log_level("statmap_core=debug,warn").is_ok());
        assert!(validate_log_level("loud").is_err());
    }

    #[test]
    fn symbols() {
        assert!(validate_symbol("try_to_wake_up").is_ok());
        assert!(validate_symbol("do_sys_open.isra.0").is_ok());
        assert!(validate_symbol("1bad").is_err());
    }
}

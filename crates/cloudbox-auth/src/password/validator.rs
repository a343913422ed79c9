//! Password policy enforcement for new passwords.

use cloudbox_core::config::AuthConfig;
use cloudbox_core::error::AppError;

/// Longest password accepted, in characters.
const MAX_LENGTH: usize = 256;

/// Validates new passwords against the configured policy.
#[derive(Debug, Clone)]
pub struct PasswordValidator {
    /// Minimum password length.
    min_length: usize,
}

impl PasswordValidator {
    /// Creates a new validator from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            min_length: config.password_min_length,
        }
    }

    /// Check `password` for `username`, reporting the first violation.
    pub fn validate(&self, username: &str, password: &str) -> Result<(), AppError> {
        let length = password.chars().count();
        if length < self.min_length {
            return Err(AppError::invalid_field(
                "password",
                format!(
                    "Password must be at least {} characters long",
                    self.min_length
                ),
            ));
        }

        if length > MAX_LENGTH {
            return Err(AppError::invalid_field(
                "password",
                format!("Password must be at most {MAX_LENGTH} characters long"),
            ));
        }

        if password.trim().is_empty() {
            return Err(AppError::invalid_field(
                "password",
                "Password must not be blank",
            ));
        }

        if password.eq_ignore_ascii_case(username) {
            return Err(AppError::invalid_field(
                "password",
                "Password must differ from the username",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use cloudbox_core::error::ErrorKind;

    use super::*;

    fn validator() -> PasswordValidator {
        PasswordValidator::new(&AuthConfig {
            password_min_length: 8,
        })
    }

    #[test]
    fn test_accepts_reasonable_password() {
        assert!(validator().validate("alice", "tr0ub4dor&3").is_ok());
    }

    #[test]
    fn test_rejects_short_blank_and_username() {
        let v = validator();
        let err = v.validate("alice", "short").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.field, Some("password"));

        assert!(v.validate("alice", "          ").is_err());
        assert!(v.validate("alicealice", "AliceAlice").is_err());
        assert!(v.validate("alice", &"x".repeat(MAX_LENGTH + 1)).is_err());
    }
}

//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Credential policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Minimum password length.
    #[serde(default = "default_password_min")]
    pub password_min_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password_min_length: default_password_min(),
        }
    }
}

fn default_password_min() -> usize {
    8
}

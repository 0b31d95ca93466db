//! Identity directory (Clerk-style user management API) settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the user management API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Secret key sent as a bearer token. Prefer `secret_key_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    /// Environment variable holding the secret key.
    #[serde(default = "default_secret_key_env")]
    pub secret_key_env: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            secret_key: None,
            secret_key_env: default_secret_key_env(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl IdentityConfig {
    /// The secret key, from the environment first and the file second.
    pub fn resolve_secret_key(&self) -> Option<String> {
        std::env::var(&self.secret_key_env)
            .ok()
            .filter(|key| !key.is_empty())
            .or_else(|| self.secret_key.clone())
    }
}

fn default_base_url() -> String {
    "https://api.clerk.com".to_string()
}

fn default_secret_key_env() -> String {
    "CLERK_SECRET_KEY".to_string()
}

fn default_timeout() -> u64 {
    15
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_key_used_when_env_unset() {
        let config = IdentityConfig {
            secret_key: Some("sk_test_inline".to_string()),
            secret_key_env: "CAMPUS_TEST_UNSET_SECRET_VAR".to_string(),
            ..Default::default()
        };
        assert_eq!(config.resolve_secret_key().as_deref(), Some("sk_test_inline"));
    }

    #[test]
    fn test_no_key_configured() {
        let config = IdentityConfig {
            secret_key_env: "CAMPUS_TEST_UNSET_SECRET_VAR".to_string(),
            ..Default::default()
        };
        assert_eq!(config.resolve_secret_key(), None);
    }
}

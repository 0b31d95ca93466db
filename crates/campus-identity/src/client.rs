//! Typed reqwest wrapper for the user management API.

use crate::models::{
    CreateUserRequest, ErrorResponse, PublicMetadata, UpdateUserRequest, UserResponse,
};
use async_trait::async_trait;
use campus_core::IdentityConfig;
use campus_runtime::{Account, AccountPatch, IdentityError, IdentityProvider, NewAccount};
use reqwest::{Response, StatusCode, Url};
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.clerk.com";

/// HTTP client for account create/update/delete.
pub struct DirectoryClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl DirectoryClient {
    /// Create a new client against the hosted API.
    pub fn new(secret_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_API_BASE.to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    /// Build a client from configuration. Fails when no secret key is set.
    pub fn from_config(config: &IdentityConfig) -> anyhow::Result<Self> {
        let secret_key = config.resolve_secret_key().ok_or_else(|| {
            anyhow::anyhow!(
                "identity secret key not configured; set {} or identity.secret_key",
                config.secret_key_env
            )
        })?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    /// Override the base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn users_url(&self) -> Result<Url, IdentityError> {
        self.url_with(&["v1", "users"])
    }

    /// The id is pushed as one escaped path segment. Ids that could name
    /// another endpoint are refused before any request is sent.
    fn user_url(&self, id: &str) -> Result<Url, IdentityError> {
        if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
            tracing::warn!(account_id = id, "Refusing malformed account id");
            return Err(IdentityError::NotFound(id.to_string()));
        }
        self.url_with(&["v1", "users", id])
    }

    fn url_with(&self, segments: &[&str]) -> Result<Url, IdentityError> {
        let invalid = || IdentityError::Transport(format!("invalid base URL '{}'", self.base_url));
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Map a non-success response to an [`IdentityError`].
async fn error_from_response(resp: Response, id: Option<&str>) -> IdentityError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    if status == StatusCode::NOT_FOUND
        && let Some(id) = id
    {
        return IdentityError::NotFound(id.to_string());
    }
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(parsed) if !parsed.errors.is_empty() => IdentityError::Rejected(parsed.errors),
        _ => IdentityError::Unexpected {
            status: status.as_u16(),
            body,
        },
    }
}

fn transport(err: reqwest::Error) -> IdentityError {
    IdentityError::Transport(err.to_string())
}

#[async_trait]
impl IdentityProvider for DirectoryClient {
    async fn create_account(&self, account: &NewAccount) -> Result<Account, IdentityError> {
        let request = CreateUserRequest {
            username: &account.username,
            email_address: &account.email_addresses,
            password: &account.password,
            first_name: &account.first_name,
            last_name: &account.last_name,
            public_metadata: PublicMetadata {
                role: account.role.as_str(),
            },
        };

        let resp = self
            .http
            .post(self.users_url()?)
            .bearer_auth(&self.secret_key)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp, None).await);
        }

        let user = resp.json::<UserResponse>().await.map_err(transport)?;
        tracing::debug!(account_id = %user.id, role = %account.role, "Created directory account");
        Ok(Account {
            id: user.id,
            username: user.username,
        })
    }

    async fn update_account(&self, id: &str, patch: &AccountPatch) -> Result<(), IdentityError> {
        let request = UpdateUserRequest {
            username: patch.username.as_deref(),
            password: patch.password.as_deref(),
            first_name: patch.first_name.as_deref(),
            last_name: patch.last_name.as_deref(),
        };

        let resp = self
            .http
            .patch(self.user_url(id)?)
            .bearer_auth(&self.secret_key)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp, Some(id)).await);
        }
        Ok(())
    }

    async fn delete_account(&self, id: &str) -> Result<(), IdentityError> {
        let resp = self
            .http
            .delete(self.user_url(id)?)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(transport)?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp, Some(id)).await);
        }
        tracing::debug!(account_id = id, "Deleted directory account");
        Ok(())
    }
}

//! Identity provider boundary.
//!
//! Every teacher, student and parent owns an account in a hosted user
//! directory. The account id it hands back is used as the local row's primary
//! key.

use async_trait::async_trait;
use campus_core::{PersonForm, PersonKind};
use serde::{Deserialize, Serialize};

/// Payload for creating an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub username: String,
    /// Zero or one address; a blank email yields none.
    pub email_addresses: Vec<String>,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    /// Stored as public metadata `{ "role": "<kind>" }`.
    pub role: PersonKind,
}

impl NewAccount {
    pub fn from_form(form: &PersonForm) -> Self {
        Self {
            username: form.username().to_string(),
            email_addresses: form.email().map(str::to_string).into_iter().collect(),
            password: form.password().to_string(),
            first_name: form.name().to_string(),
            last_name: form.surname().to_string(),
            role: form.kind(),
        }
    }
}

/// Partial account update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPatch {
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl AccountPatch {
    /// Username and names always; the password only when non-empty.
    pub fn from_form(form: &PersonForm) -> Self {
        let password = Some(form.password())
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        Self {
            username: Some(form.username().to_string()),
            password,
            first_name: Some(form.name().to_string()),
            last_name: Some(form.surname().to_string()),
        }
    }
}

/// A provisioned account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// One entry of a provider validation-error list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ProviderMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            long_message: None,
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum IdentityError {
    /// The provider refused the payload with a list of validation messages.
    #[error("identity provider rejected the request: {}", join_messages(.0))]
    Rejected(Vec<ProviderMessage>),

    #[error("account '{0}' not found")]
    NotFound(String),

    #[error("identity provider unreachable: {0}")]
    Transport(String),

    #[error("identity provider returned {status}: {body}")]
    Unexpected { status: u16, body: String },
}

impl IdentityError {
    /// Provider messages when this is a rejection.
    pub fn messages(&self) -> Vec<&str> {
        match self {
            IdentityError::Rejected(messages) => {
                messages.iter().map(|m| m.message.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn join_messages(messages: &[ProviderMessage]) -> String {
    messages
        .iter()
        .map(|m| m.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_account(&self, account: &NewAccount) -> Result<Account, IdentityError>;

    async fn update_account(&self, id: &str, patch: &AccountPatch) -> Result<(), IdentityError>;

    async fn delete_account(&self, id: &str) -> Result<(), IdentityError>;
}

//! Wire types for the user management API.

use campus_runtime::ProviderMessage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct CreateUserRequest<'a> {
    pub username: &'a str,
    pub email_address: &'a [String],
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub public_metadata: PublicMetadata<'a>,
}

#[derive(Debug, Serialize)]
pub struct PublicMetadata<'a> {
    pub role: &'a str,
}

/// Only present fields are sent.
#[derive(Debug, Serialize)]
pub struct UpdateUserRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserResponse {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Error envelope returned with 4xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub errors: Vec<ProviderMessage>,
}

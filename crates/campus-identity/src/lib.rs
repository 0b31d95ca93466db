//! Client for a Clerk-style user management API.
//!
//! [`DirectoryClient`] implements [`campus_runtime::IdentityProvider`] over
//! `POST /v1/users`, `PATCH /v1/users/{id}` and `DELETE /v1/users/{id}`,
//! authenticated with the secret key as a bearer token.

pub mod client;
pub mod models;

pub use client::DirectoryClient;

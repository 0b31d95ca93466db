//! Translation of boundary errors into caller-facing action errors.

use crate::identity::IdentityError;
use crate::store::StoreError;
use campus_core::ActionError;

impl From<StoreError> for ActionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { target } => ActionError::duplicate_field(&target),
            StoreError::CapacityExceeded { .. } => ActionError::capacity_exceeded(),
            other => ActionError::unknown(other.to_string()),
        }
    }
}

impl From<IdentityError> for ActionError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected(messages) => {
                let messages: Vec<&str> = messages.iter().map(|m| m.message.as_str()).collect();
                ActionError::provider_rejected(&messages)
            }
            other => ActionError::unknown(other.to_string()),
        }
    }
}

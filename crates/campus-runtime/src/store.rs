//! Local persistence boundary.

use async_trait::async_trait;
use campus_core::{PersonForm, PersonKind, RecordForm, RecordKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write. `target` names the fields.
    #[error("unique constraint violated on {}", .target.join(", "))]
    UniqueViolation { target: Vec<String> },

    /// The class is full, or does not exist.
    #[error("class {class_id} has no free seat")]
    CapacityExceeded { class_id: i64 },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: String, id: String },

    /// A foreign key points nowhere, or a row is still referenced.
    #[error("{0}")]
    MissingReference(String),

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn not_found(entity: impl ToString, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn unique(fields: &[&str]) -> Self {
        StoreError::UniqueViolation {
            target: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Seats in a class at the time of reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassOccupancy {
    pub capacity: i32,
    pub occupants: i64,
}

impl ClassOccupancy {
    pub fn has_room(&self) -> bool {
        self.occupants < i64::from(self.capacity)
    }
}

/// Rows for teachers, students and parents, keyed by account id.
#[async_trait]
pub trait PersonStore: Send + Sync {
    /// `None` when the class does not exist.
    async fn class_occupancy(&self, class_id: i64) -> Result<Option<ClassOccupancy>, StoreError>;

    /// Insert the row for `form` under `account_id`. The form's password is
    /// never stored.
    async fn insert_person(&self, account_id: &str, form: &PersonForm) -> Result<(), StoreError>;

    /// Overwrite the row's fields. `password` is `Some` only when the
    /// password changed. A teacher's subject set is replaced wholesale.
    async fn update_person(
        &self,
        account_id: &str,
        form: &PersonForm,
        password: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn delete_person(&self, kind: PersonKind, account_id: &str) -> Result<(), StoreError>;
}

/// Single-table rows for the remaining entities.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert and return the assigned id.
    async fn create_record(&self, form: &RecordForm) -> Result<i64, StoreError>;

    async fn update_record(&self, id: i64, form: &RecordForm) -> Result<(), StoreError>;

    async fn delete_record(&self, kind: RecordKind, id: i64) -> Result<(), StoreError>;

    /// Lesson of a stored record, or `None` if the record is missing or its
    /// kind has no lesson.
    async fn record_lesson(&self, kind: RecordKind, id: i64) -> Result<Option<i64>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_class_has_no_room() {
        let full = ClassOccupancy { capacity: 30, occupants: 30 };
        let open = ClassOccupancy { capacity: 30, occupants: 29 };
        assert!(!full.has_room());
        assert!(open.has_room());
    }

    #[test]
    fn test_unique_violation_display() {
        let err = StoreError::unique(&["username", "email"]);
        assert_eq!(err.to_string(), "unique constraint violated on username, email");
    }
}

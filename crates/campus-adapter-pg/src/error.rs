use campus_runtime::StoreError;

/// Unique constraints of the schema and the form fields they guard.
pub const UNIQUE_CONSTRAINTS: &[(&str, &[&str])] = &[
    ("teacher_pkey", &["id"]),
    ("teacher_username_key", &["username"]),
    ("teacher_email_key", &["email"]),
    ("teacher_phone_key", &["phone"]),
    ("student_pkey", &["id"]),
    ("student_username_key", &["username"]),
    ("student_email_key", &["email"]),
    ("student_phone_key", &["phone"]),
    ("parent_pkey", &["id"]),
    ("parent_username_key", &["username"]),
    ("parent_email_key", &["email"]),
    ("parent_phone_key", &["phone"]),
    ("subject_name_key", &["name"]),
    ("class_name_key", &["name"]),
    ("grade_level_key", &["level"]),
    ("teacher_subject_pkey", &["teacherId", "subjectId"]),
];

/// Fields behind a violated unique constraint. Unknown constraints are
/// reported by name.
pub fn unique_target(constraint: Option<&str>) -> Vec<String> {
    let Some(constraint) = constraint else {
        return vec!["unknown".to_string()];
    };
    UNIQUE_CONSTRAINTS
        .iter()
        .find(|(name, _)| *name == constraint)
        .map(|(_, fields)| fields.iter().map(|f| f.to_string()).collect())
        .unwrap_or_else(|| vec![constraint.to_string()])
}

pub fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some("23505") => {
                return StoreError::UniqueViolation {
                    target: unique_target(db.constraint()),
                };
            }
            Some("23503") => {
                return StoreError::MissingReference(match db.constraint() {
                    Some(constraint) => format!("foreign key {} violated", constraint),
                    None => db.message().to_string(),
                });
            }
            _ => {}
        }
    }
    tracing::debug!(error = %err, "Unclassified database error");
    StoreError::Database(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_constraint_maps_to_fields() {
        assert_eq!(unique_target(Some("student_email_key")), vec!["email"]);
        assert_eq!(
            unique_target(Some("teacher_subject_pkey")),
            vec!["teacherId", "subjectId"]
        );
    }

    #[test]
    fn test_unknown_constraint_is_reported_by_name() {
        assert_eq!(unique_target(Some("lesson_slot_key")), vec!["lesson_slot_key"]);
        assert_eq!(unique_target(None), vec!["unknown"]);
    }

    #[test]
    fn test_non_database_errors_are_database_variant() {
        let err = map_sqlx_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn test_every_schema_unique_key_is_listed() {
        let schema = include_str!("../migrations/0001_init.sql");
        for line in schema.lines() {
            if let Some(rest) = line.trim().strip_prefix("CONSTRAINT ")
                && rest.contains("UNIQUE")
                && let Some(name) = rest.split_whitespace().next()
            {
                assert!(
                    UNIQUE_CONSTRAINTS.iter().any(|(n, _)| *n == name),
                    "constraint {} missing from UNIQUE_CONSTRAINTS",
                    name
                );
            }
        }
    }
}

//! Campus scope policies
//!
//! A [`ScopePolicy`] decides whether a principal may perform a mutation on a
//! plain record. The decision is made before the store is touched; a denial is
//! surfaced to the caller as a `not_permitted` action error.
//!
//! Two policies ship with the crate:
//! - [`AllowAllPolicy`]: every principal may do everything (the admin-only
//!   deployment this backend was built for)
//! - [`LessonScopedPolicy`]: teacher principals may only touch the configured
//!   record kinds when the record's lesson is one they teach

use async_trait::async_trait;
use campus_core::{PolicyConfig, PolicyMode, RecordKind, Role};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The acting user, as resolved by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Option<String>,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: Some(user_id.into()),
            role,
        }
    }

    /// Anonymous administrator.
    pub fn admin() -> Self {
        Self {
            user_id: None,
            role: Role::Admin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        })
    }
}

/// What the principal wants to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRequest {
    pub operation: Operation,
    pub kind: RecordKind,
    /// Lesson the record belongs to, when the kind has one.
    pub lesson_id: Option<i64>,
}

/// Result of a policy check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub allow: bool,
    pub rule_id: Option<String>,
    pub reason: Option<String>,
}

impl PolicyDecision {
    pub fn allow(rule_id: &str) -> Self {
        Self {
            allow: true,
            rule_id: Some(rule_id.to_string()),
            reason: None,
        }
    }

    pub fn deny(rule_id: &str, reason: impl Into<String>) -> Self {
        Self {
            allow: false,
            rule_id: Some(rule_id.to_string()),
            reason: Some(reason.into()),
        }
    }
}

#[async_trait]
pub trait ScopePolicy: Send + Sync {
    async fn check(
        &self,
        principal: &Principal,
        request: &ScopeRequest,
    ) -> anyhow::Result<PolicyDecision>;
}

pub struct AllowAllPolicy;

#[async_trait]
impl ScopePolicy for AllowAllPolicy {
    async fn check(
        &self,
        _principal: &Principal,
        _request: &ScopeRequest,
    ) -> anyhow::Result<PolicyDecision> {
        Ok(PolicyDecision::allow("allow_all"))
    }
}

/// Lookup of the teacher assigned to a lesson.
#[async_trait]
pub trait LessonOwnership: Send + Sync {
    /// Teacher id of the lesson, or `None` when the lesson does not exist.
    async fn lesson_teacher(&self, lesson_id: i64) -> anyhow::Result<Option<String>>;
}

/// Restricts teacher principals to records of their own lessons.
///
/// Only kinds listed in `scoped` are checked; everything else, and every
/// non-teacher principal, is allowed.
pub struct LessonScopedPolicy {
    lessons: Arc<dyn LessonOwnership>,
    scoped: Vec<RecordKind>,
}

impl LessonScopedPolicy {
    pub fn new(lessons: Arc<dyn LessonOwnership>, scoped: Vec<RecordKind>) -> Self {
        Self { lessons, scoped }
    }
}

#[async_trait]
impl ScopePolicy for LessonScopedPolicy {
    async fn check(
        &self,
        principal: &Principal,
        request: &ScopeRequest,
    ) -> anyhow::Result<PolicyDecision> {
        if principal.role != Role::Teacher || !self.scoped.contains(&request.kind) {
            return Ok(PolicyDecision::allow("unscoped"));
        }

        let Some(user_id) = principal.user_id.as_deref() else {
            return Ok(PolicyDecision::deny(
                "lesson_owner",
                "Teacher identity is required",
            ));
        };
        let Some(lesson_id) = request.lesson_id else {
            return Ok(PolicyDecision::deny(
                "lesson_owner",
                format!("No lesson found for this {}", request.kind),
            ));
        };

        let decision = match self.lessons.lesson_teacher(lesson_id).await? {
            Some(teacher) if teacher == user_id => PolicyDecision::allow("lesson_owner"),
            Some(_) => PolicyDecision::deny(
                "lesson_owner",
                format!("Lesson {} is not taught by you", lesson_id),
            ),
            None => PolicyDecision::deny(
                "lesson_owner",
                format!("Lesson {} does not exist", lesson_id),
            ),
        };

        if !decision.allow {
            tracing::debug!(
                user_id = %user_id,
                lesson_id,
                kind = %request.kind,
                operation = %request.operation,
                "Lesson-scoped policy denied mutation"
            );
        }
        Ok(decision)
    }
}

/// Build the configured policy.
pub fn from_config(
    config: &PolicyConfig,
    lessons: Arc<dyn LessonOwnership>,
) -> Arc<dyn ScopePolicy> {
    match config.mode {
        PolicyMode::AllowAll => Arc::new(AllowAllPolicy),
        PolicyMode::LessonOwner => Arc::new(LessonScopedPolicy::new(
            lessons,
            config.scoped_resources.clone(),
        )),
    }
}

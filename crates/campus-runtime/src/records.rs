//! Single-table mutations for subjects, classes, lessons and the rest.

use crate::store::RecordStore;
use campus_core::{ActionError, ActionResult, RecordForm, RecordKind};
use campus_policy::{Operation, Principal, ScopePolicy, ScopeRequest};
use std::sync::Arc;

pub struct RecordService {
    store: Arc<dyn RecordStore>,
    policy: Arc<dyn ScopePolicy>,
}

impl RecordService {
    /// Create a new record service.
    pub fn new(store: Arc<dyn RecordStore>, policy: Arc<dyn ScopePolicy>) -> Self {
        Self { store, policy }
    }

    pub async fn create(&self, principal: &Principal, form: &RecordForm) -> ActionResult {
        self.try_create(principal, form).await.into()
    }

    pub async fn update(&self, principal: &Principal, form: &RecordForm) -> ActionResult {
        self.try_update(principal, form).await.into()
    }

    pub async fn delete(&self, principal: &Principal, kind: RecordKind, id: i64) -> ActionResult {
        self.try_delete(principal, kind, id).await.into()
    }

    async fn try_create(&self, principal: &Principal, form: &RecordForm) -> Result<(), ActionError> {
        let kind = form.kind();
        self.authorize(principal, Operation::Create, kind, form.lesson_id())
            .await?;

        let id = self.store.create_record(form).await.map_err(|err| {
            tracing::warn!(kind = %kind, error = %err, "Record create failed");
            ActionError::from(err)
        })?;
        tracing::info!(kind = %kind, id, "Created record");
        Ok(())
    }

    async fn try_update(&self, principal: &Principal, form: &RecordForm) -> Result<(), ActionError> {
        let kind = form.kind();
        let Some(id) = form.id() else {
            return Err(ActionError::missing_identifier(kind.as_str()));
        };

        // Both the lesson the record moves to and the one it currently has.
        self.authorize(principal, Operation::Update, kind, form.lesson_id())
            .await?;
        if kind.belongs_to_lesson() {
            let current = self.store.record_lesson(kind, id).await?;
            if current.is_some() && current != form.lesson_id() {
                self.authorize(principal, Operation::Update, kind, current)
                    .await?;
            }
        }

        self.store.update_record(id, form).await.map_err(|err| {
            tracing::warn!(kind = %kind, id, error = %err, "Record update failed");
            ActionError::from(err)
        })?;
        tracing::info!(kind = %kind, id, "Updated record");
        Ok(())
    }

    async fn try_delete(
        &self,
        principal: &Principal,
        kind: RecordKind,
        id: i64,
    ) -> Result<(), ActionError> {
        let lesson_id = if kind.belongs_to_lesson() {
            self.store.record_lesson(kind, id).await?
        } else {
            None
        };
        self.authorize(principal, Operation::Delete, kind, lesson_id)
            .await?;

        self.store.delete_record(kind, id).await.map_err(|err| {
            tracing::warn!(kind = %kind, id, error = %err, "Record delete failed");
            ActionError::from(err)
        })?;
        tracing::info!(kind = %kind, id, "Deleted record");
        Ok(())
    }

    async fn authorize(
        &self,
        principal: &Principal,
        operation: Operation,
        kind: RecordKind,
        lesson_id: Option<i64>,
    ) -> Result<(), ActionError> {
        let request = ScopeRequest {
            operation,
            kind,
            lesson_id,
        };
        let decision = self
            .policy
            .check(principal, &request)
            .await
            .map_err(|err| ActionError::unknown(err.to_string()))?;

        if decision.allow {
            return Ok(());
        }
        tracing::info!(
            role = %principal.role,
            user_id = principal.user_id.as_deref().unwrap_or("-"),
            kind = %kind,
            operation = %operation,
            rule_id = decision.rule_id.as_deref().unwrap_or("-"),
            "Mutation denied by scope policy"
        );
        Err(ActionError::not_permitted(
            decision
                .reason
                .unwrap_or_else(|| "You are not allowed to do this".to_string()),
        ))
    }
}

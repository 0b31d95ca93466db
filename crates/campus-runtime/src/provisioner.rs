//! Identity-backed person provisioning.
//!
//! A teacher, student or parent exists twice: as an account in the identity
//! provider and as a local row keyed by that account's id. The provisioner
//! sequences both writes and keeps them consistent:
//!
//! - **create**: account first, then row. If the row insert fails, the account
//!   is deleted again before the error is returned.
//! - **update**: account first, then row. No compensation.
//! - **delete**: account first, then row. A failed account delete leaves the
//!   row untouched; every delete failure is reported generically.

use crate::audit::{AuditSink, ProvisionEvent, ProvisionStage, TracingAuditSink};
use crate::identity::{AccountPatch, IdentityProvider, NewAccount};
use crate::store::PersonStore;
use campus_core::{ActionError, ActionResult, PersonForm, PersonKind};
use std::sync::Arc;

pub struct PersonProvisioner {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn PersonStore>,
    audit: Arc<dyn AuditSink>,
}

impl PersonProvisioner {
    /// Create a new provisioner that audits through `tracing`.
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn PersonStore>) -> Self {
        Self {
            identity,
            store,
            audit: Arc::new(TracingAuditSink),
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Provision the account, then insert the row.
    pub async fn create(&self, form: &PersonForm) -> ActionResult {
        let kind = form.kind();
        let result = self.try_create(form).await;
        if let Err(err) = &result {
            self.record(ProvisionEvent::new(kind, None, ProvisionStage::Failed).with_detail(&err.message));
        }
        result.into()
    }

    /// Update the account, then the row.
    pub async fn update(&self, form: &PersonForm) -> ActionResult {
        let kind = form.kind();
        let result = self.try_update(form).await;
        if let Err(err) = &result {
            self.record(
                ProvisionEvent::new(kind, form.id(), ProvisionStage::Failed).with_detail(&err.message),
            );
        }
        result.into()
    }

    /// Delete the account, then the row.
    pub async fn delete(&self, kind: PersonKind, id: &str) -> ActionResult {
        match self.try_delete(kind, id).await {
            Ok(()) => ActionResult::Ok,
            Err(detail) => {
                self.record(
                    ProvisionEvent::new(kind, Some(id), ProvisionStage::Failed).with_detail(detail),
                );
                ActionResult::Error(ActionError::generic())
            }
        }
    }

    async fn try_create(&self, form: &PersonForm) -> Result<(), ActionError> {
        let kind = form.kind();

        // Racy on its own; the store re-checks inside its insert.
        if let Some(class_id) = form.class_id() {
            let occupancy = self.store.class_occupancy(class_id).await?;
            if !occupancy.is_some_and(|o| o.has_room()) {
                tracing::warn!(class_id, ?occupancy, "Refusing student create: class is full or missing");
                return Err(ActionError::capacity_exceeded());
            }
        }

        let account = self
            .identity
            .create_account(&NewAccount::from_form(form))
            .await
            .map_err(|err| {
                tracing::warn!(kind = %kind, username = %form.username(), error = %err, "Identity provider refused account");
                ActionError::from(err)
            })?;
        self.record(ProvisionEvent::new(kind, Some(&account.id), ProvisionStage::AccountCreated));

        if let Err(err) = self.store.insert_person(&account.id, form).await {
            tracing::error!(
                kind = %kind,
                account_id = %account.id,
                error = %err,
                "Local insert failed after account creation; compensating"
            );
            self.compensate(kind, &account.id).await;
            return Err(err.into());
        }
        self.record(ProvisionEvent::new(kind, Some(&account.id), ProvisionStage::RowInserted));

        tracing::info!(kind = %kind, account_id = %account.id, "Provisioned person");
        Ok(())
    }

    /// Delete the account created for a row that never landed. Failure is
    /// logged and audited only.
    async fn compensate(&self, kind: PersonKind, account_id: &str) {
        match self.identity.delete_account(account_id).await {
            Ok(()) => {
                tracing::info!(kind = %kind, account_id, "Rolled back identity account");
                self.record(ProvisionEvent::new(kind, Some(account_id), ProvisionStage::Compensated));
            }
            Err(err) => {
                tracing::error!(
                    kind = %kind,
                    account_id,
                    error = %err,
                    "Failed to roll back identity account"
                );
                self.record(
                    ProvisionEvent::new(kind, Some(account_id), ProvisionStage::CompensationFailed)
                        .with_detail(err.to_string()),
                );
            }
        }
    }

    async fn try_update(&self, form: &PersonForm) -> Result<(), ActionError> {
        let kind = form.kind();
        let Some(id) = form.id() else {
            return Err(ActionError::missing_identifier(kind.as_str()));
        };

        let patch = AccountPatch::from_form(form);
        self.identity.update_account(id, &patch).await.map_err(|err| {
            tracing::warn!(kind = %kind, account_id = id, error = %err, "Account update failed");
            ActionError::from(err)
        })?;
        self.record(ProvisionEvent::new(kind, Some(id), ProvisionStage::AccountUpdated));

        self.store
            .update_person(id, form, patch.password.as_deref())
            .await
            .map_err(|err| {
                tracing::error!(kind = %kind, account_id = id, error = %err, "Row update failed after account update");
                ActionError::from(err)
            })?;
        self.record(ProvisionEvent::new(kind, Some(id), ProvisionStage::RowUpdated));

        tracing::info!(kind = %kind, account_id = id, "Updated person");
        Ok(())
    }

    async fn try_delete(&self, kind: PersonKind, id: &str) -> Result<(), String> {
        if id.trim().is_empty() {
            tracing::warn!(kind = %kind, "Delete requested without an id");
            return Err(format!("missing {} id", kind));
        }

        if let Err(err) = self.identity.delete_account(id).await {
            tracing::error!(kind = %kind, account_id = id, error = %err, "Account delete failed; row left in place");
            return Err(err.to_string());
        }
        self.record(ProvisionEvent::new(kind, Some(id), ProvisionStage::AccountDeleted));

        if let Err(err) = self.store.delete_person(kind, id).await {
            tracing::error!(kind = %kind, account_id = id, error = %err, "Row delete failed after account delete");
            return Err(err.to_string());
        }
        self.record(ProvisionEvent::new(kind, Some(id), ProvisionStage::RowDeleted));

        tracing::info!(kind = %kind, account_id = id, "Deleted person");
        Ok(())
    }

    fn record(&self, event: ProvisionEvent) {
        self.audit.record(event);
    }
}

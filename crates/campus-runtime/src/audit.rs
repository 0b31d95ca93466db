//! Provisioning audit trail.
//!
//! The provisioner emits one [`ProvisionEvent`] per completed step, including
//! compensation. Sinks must not fail the action; they swallow their own errors.

use campus_core::PersonKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionStage {
    AccountCreated,
    RowInserted,
    Compensated,
    CompensationFailed,
    AccountUpdated,
    RowUpdated,
    AccountDeleted,
    RowDeleted,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionEvent {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub kind: PersonKind,
    /// Account id, when one is known at this stage.
    pub account_id: Option<String>,
    pub stage: ProvisionStage,
    pub detail: Option<String>,
}

impl ProvisionEvent {
    pub fn new(kind: PersonKind, account_id: Option<&str>, stage: ProvisionStage) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            kind,
            account_id: account_id.map(str::to_string),
            stage,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: ProvisionEvent);
}

/// Writes events as structured `tracing` records under the `campus::audit` target.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: ProvisionEvent) {
        tracing::info!(
            target: "campus::audit",
            event_id = %event.event_id,
            kind = %event.kind,
            account_id = event.account_id.as_deref().unwrap_or("-"),
            stage = ?event.stage,
            detail = event.detail.as_deref().unwrap_or(""),
            "provision event"
        );
    }
}

/// Discards everything.
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: ProvisionEvent) {}
}

/// Keeps events in memory.
#[derive(Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<ProvisionEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages recorded so far, in order.
    pub fn stages(&self) -> Vec<ProvisionStage> {
        match self.events.lock() {
            Ok(events) => events.iter().map(|e| e.stage).collect(),
            Err(poisoned) => poisoned.into_inner().iter().map(|e| e.stage).collect(),
        }
    }

    pub fn events(&self) -> Vec<ProvisionEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: ProvisionEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

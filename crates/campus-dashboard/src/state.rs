//! Dashboard application state.

use campus_runtime::{PersonProvisioner, RecordService};
use std::sync::Arc;

/// Shared application state for the action endpoints.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    provisioner: PersonProvisioner,
    records: RecordService,
}

impl AppState {
    pub fn new(provisioner: PersonProvisioner, records: RecordService) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                provisioner,
                records,
            }),
        }
    }

    /// Teacher, student and parent actions.
    pub fn provisioner(&self) -> &PersonProvisioner {
        &self.inner.provisioner
    }

    /// Actions on every other record kind.
    pub fn records(&self) -> &RecordService {
        &self.inner.records
    }
}

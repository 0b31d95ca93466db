//! Scope policy settings for plain-record mutations.

use crate::kind::RecordKind;
use serde::{Deserialize, Serialize};

/// Which scope policy guards record mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    /// Every principal may mutate every record.
    #[default]
    AllowAll,
    /// Teacher principals may only mutate scoped records of lessons they teach.
    LessonOwner,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub mode: PolicyMode,

    /// Record kinds the lesson-owner rule applies to.
    #[serde(default = "default_scoped_resources")]
    pub scoped_resources: Vec<RecordKind>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            mode: PolicyMode::default(),
            scoped_resources: default_scoped_resources(),
        }
    }
}

fn default_scoped_resources() -> Vec<RecordKind> {
    vec![RecordKind::Exam]
}

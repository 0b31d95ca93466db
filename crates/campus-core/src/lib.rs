//! # campus-core
//!
//! Types shared by every Campus crate:
//!
//! - [`PersonKind`], [`RecordKind`] and [`Role`]: what is being mutated and by whom
//! - [`forms`]: typed form payloads submitted by the admin UI, with validation
//! - [`ActionResult`]: the normalized result returned by every action
//! - [`config`]: the `campus.yaml` configuration tree

pub mod config;
pub mod forms;
pub mod kind;
pub mod outcome;

pub use config::{
    CampusConfig, ConfigError, DashboardConfig, IdentityConfig, ObservabilityConfig,
    PolicyConfig, PolicyMode, UpstreamConfig,
};
pub use forms::{
    AnnouncementForm, AssignmentForm, AttendanceForm, ClassForm, Day, EventForm, ExamForm,
    FieldError, LessonForm, ParentForm, PersonForm, RecordForm, ResultForm, Sex, StudentForm,
    SubjectForm, TeacherForm,
};
pub use kind::{PersonKind, RecordKind, Role};
pub use outcome::{ActionError, ActionErrorKind, ActionResult};

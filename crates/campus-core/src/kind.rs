//! Entity kinds and principal roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A person record that owns a login identity in the external directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonKind {
    Teacher,
    Student,
    Parent,
}

impl PersonKind {
    /// Role tag stored in the account's public metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonKind::Teacher => "teacher",
            PersonKind::Student => "student",
            PersonKind::Parent => "parent",
        }
    }

    /// URL segment under `/api`.
    pub fn resource(&self) -> &'static str {
        match self {
            PersonKind::Teacher => "teachers",
            PersonKind::Student => "students",
            PersonKind::Parent => "parents",
        }
    }
}

impl fmt::Display for PersonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A plain record with an integer key assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Subject,
    Class,
    Lesson,
    Exam,
    Assignment,
    Result,
    Attendance,
    Event,
    Announcement,
}

impl RecordKind {
    pub const ALL: [RecordKind; 9] = [
        RecordKind::Subject,
        RecordKind::Class,
        RecordKind::Lesson,
        RecordKind::Exam,
        RecordKind::Assignment,
        RecordKind::Result,
        RecordKind::Attendance,
        RecordKind::Event,
        RecordKind::Announcement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Subject => "subject",
            RecordKind::Class => "class",
            RecordKind::Lesson => "lesson",
            RecordKind::Exam => "exam",
            RecordKind::Assignment => "assignment",
            RecordKind::Result => "result",
            RecordKind::Attendance => "attendance",
            RecordKind::Event => "event",
            RecordKind::Announcement => "announcement",
        }
    }

    /// Whether records of this kind reference a lesson.
    pub fn belongs_to_lesson(&self) -> bool {
        matches!(
            self,
            RecordKind::Exam | RecordKind::Assignment | RecordKind::Attendance
        )
    }

    /// URL segment under `/api`.
    pub fn resource(&self) -> &'static str {
        match self {
            RecordKind::Subject => "subjects",
            RecordKind::Class => "classes",
            RecordKind::Lesson => "lessons",
            RecordKind::Exam => "exams",
            RecordKind::Assignment => "assignments",
            RecordKind::Result => "results",
            RecordKind::Attendance => "attendances",
            RecordKind::Event => "events",
            RecordKind::Announcement => "announcements",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown record kind '{}'", s))
    }
}

/// Role of the acting principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Admin,
    Teacher,
    Student,
    Parent,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Parent => "parent",
        };
        f.write_str(s)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            "parent" => Ok(Role::Parent),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

//! Form payloads submitted by the admin UI.
//!
//! Field names follow the UI's camelCase JSON. Each form validates itself
//! before it reaches a service; a form with an `id` is an update, one without
//! is a create.

use crate::kind::{PersonKind, RecordKind};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "MALE",
            Sex::Female => "FEMALE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Day {
    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Monday => "MONDAY",
            Day::Tuesday => "TUESDAY",
            Day::Wednesday => "WEDNESDAY",
            Day::Thursday => "THURSDAY",
            Day::Friday => "FRIDAY",
        }
    }
}

// =============================================================================
// Person forms
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub name: String,
    pub surname: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub address: String,
    #[serde(default)]
    pub img: Option<String>,
    pub blood_type: String,
    pub sex: Sex,
    #[serde(with = "flexible_date")]
    pub birthday: NaiveDate,
    /// Subject ids taught by this teacher.
    #[serde(default)]
    pub subjects: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub name: String,
    pub surname: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub address: String,
    #[serde(default)]
    pub img: Option<String>,
    pub blood_type: String,
    pub sex: Sex,
    #[serde(with = "flexible_date")]
    pub birthday: NaiveDate,
    pub grade_id: i64,
    pub class_id: i64,
    pub parent_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub name: String,
    pub surname: String,
    #[serde(default)]
    pub email: Option<String>,
    pub phone: String,
    pub address: String,
}

/// Any form whose record owns an external identity.
#[derive(Debug, Clone, PartialEq)]
pub enum PersonForm {
    Teacher(TeacherForm),
    Student(StudentForm),
    Parent(ParentForm),
}

impl PersonForm {
    /// Deserialize the form for `kind` from a JSON body.
    pub fn from_json(kind: PersonKind, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match kind {
            PersonKind::Teacher => PersonForm::Teacher(serde_json::from_value(value)?),
            PersonKind::Student => PersonForm::Student(serde_json::from_value(value)?),
            PersonKind::Parent => PersonForm::Parent(serde_json::from_value(value)?),
        })
    }

    pub fn kind(&self) -> PersonKind {
        match self {
            PersonForm::Teacher(_) => PersonKind::Teacher,
            PersonForm::Student(_) => PersonKind::Student,
            PersonForm::Parent(_) => PersonKind::Parent,
        }
    }

    /// The account id, if one was submitted and is non-empty.
    pub fn id(&self) -> Option<&str> {
        let id = match self {
            PersonForm::Teacher(f) => f.id.as_deref(),
            PersonForm::Student(f) => f.id.as_deref(),
            PersonForm::Parent(f) => f.id.as_deref(),
        };
        id.filter(|s| !s.trim().is_empty())
    }

    pub fn username(&self) -> &str {
        match self {
            PersonForm::Teacher(f) => &f.username,
            PersonForm::Student(f) => &f.username,
            PersonForm::Parent(f) => &f.username,
        }
    }

    /// Raw password field; empty on an update that keeps the password.
    pub fn password(&self) -> &str {
        match self {
            PersonForm::Teacher(f) => &f.password,
            PersonForm::Student(f) => &f.password,
            PersonForm::Parent(f) => &f.password,
        }
    }

    /// First name.
    pub fn name(&self) -> &str {
        match self {
            PersonForm::Teacher(f) => &f.name,
            PersonForm::Student(f) => &f.name,
            PersonForm::Parent(f) => &f.name,
        }
    }

    /// Last name.
    pub fn surname(&self) -> &str {
        match self {
            PersonForm::Teacher(f) => &f.surname,
            PersonForm::Student(f) => &f.surname,
            PersonForm::Parent(f) => &f.surname,
        }
    }

    /// Email, with blank values treated as absent.
    pub fn email(&self) -> Option<&str> {
        let email = match self {
            PersonForm::Teacher(f) => f.email.as_deref(),
            PersonForm::Student(f) => f.email.as_deref(),
            PersonForm::Parent(f) => f.email.as_deref(),
        };
        non_blank(email)
    }

    /// Phone, with blank values treated as absent.
    pub fn phone(&self) -> Option<&str> {
        let phone = match self {
            PersonForm::Teacher(f) => f.phone.as_deref(),
            PersonForm::Student(f) => f.phone.as_deref(),
            PersonForm::Parent(f) => Some(f.phone.as_str()),
        };
        non_blank(phone)
    }

    /// Target class of a student form.
    pub fn class_id(&self) -> Option<i64> {
        match self {
            PersonForm::Student(f) => Some(f.class_id),
            _ => None,
        }
    }

    /// Validate the form. An update may leave the password empty to keep it.
    pub fn validate(&self, updating: bool) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        let username_len = self.username().chars().count();
        if username_len < 3 {
            errors.push(FieldError::new(
                "username",
                "Username must be at least 3 characters long!",
            ));
        } else if username_len > 20 {
            errors.push(FieldError::new(
                "username",
                "Username must be at most 20 characters long!",
            ));
        }

        let password = self.password();
        if !(updating && password.is_empty()) && password.chars().count() < 8 {
            errors.push(FieldError::new(
                "password",
                "Password must be at least 8 characters long!",
            ));
        }

        if self.name().trim().is_empty() {
            errors.push(FieldError::new("name", "First name is required!"));
        }
        if self.surname().trim().is_empty() {
            errors.push(FieldError::new("surname", "Last name is required!"));
        }
        if let Some(email) = self.email()
            && !looks_like_email(email)
        {
            errors.push(FieldError::new("email", "Invalid email address!"));
        }

        match self {
            PersonForm::Teacher(f) => {
                require(&mut errors, "address", &f.address, "Address is required!");
                require(&mut errors, "bloodType", &f.blood_type, "Blood Type is required!");
            }
            PersonForm::Student(f) => {
                require(&mut errors, "address", &f.address, "Address is required!");
                require(&mut errors, "bloodType", &f.blood_type, "Blood Type is required!");
                if f.grade_id <= 0 {
                    errors.push(FieldError::new("gradeId", "Grade is required!"));
                }
                if f.class_id <= 0 {
                    errors.push(FieldError::new("classId", "Class is required!"));
                }
                require(&mut errors, "parentId", &f.parent_id, "Parent Id is required!");
            }
            PersonForm::Parent(f) => {
                require(&mut errors, "phone", &f.phone, "Phone is required!");
                require(&mut errors, "address", &f.address, "Address is required!");
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

// =============================================================================
// Record forms
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    /// Teacher ids; on update the set replaces the previous one.
    #[serde(default)]
    pub teachers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub capacity: i32,
    pub grade_id: i64,
    #[serde(default)]
    pub supervisor_id: Option<String>,
}

impl ClassForm {
    /// Supervising teacher; blank is treated as absent.
    pub fn supervisor_ref(&self) -> Option<&str> {
        non_blank(self.supervisor_id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub day: Day,
    #[serde(with = "flexible_datetime")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "flexible_datetime")]
    pub end_time: DateTime<Utc>,
    pub subject_id: i64,
    pub class_id: i64,
    pub teacher_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    #[serde(with = "flexible_datetime")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "flexible_datetime")]
    pub end_time: DateTime<Utc>,
    pub lesson_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    #[serde(with = "flexible_datetime")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "flexible_datetime")]
    pub due_date: DateTime<Utc>,
    pub lesson_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub score: i32,
    #[serde(default)]
    pub exam_id: Option<i64>,
    #[serde(default)]
    pub assignment_id: Option<i64>,
    pub student_id: String,
}

impl ResultForm {
    /// Exam reference; zero is treated as absent.
    pub fn exam_ref(&self) -> Option<i64> {
        positive(self.exam_id)
    }

    /// Assignment reference; zero is treated as absent.
    pub fn assignment_ref(&self) -> Option<i64> {
        positive(self.assignment_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(with = "flexible_date")]
    pub date: NaiveDate,
    pub present: bool,
    pub student_id: String,
    pub lesson_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    #[serde(with = "flexible_datetime")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "flexible_datetime")]
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub class_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    #[serde(with = "flexible_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub class_id: Option<i64>,
}

impl EventForm {
    pub fn class_ref(&self) -> Option<i64> {
        positive(self.class_id)
    }
}

impl AnnouncementForm {
    pub fn class_ref(&self) -> Option<i64> {
        positive(self.class_id)
    }
}

/// Any plain-record form.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordForm {
    Subject(SubjectForm),
    Class(ClassForm),
    Lesson(LessonForm),
    Exam(ExamForm),
    Assignment(AssignmentForm),
    Result(ResultForm),
    Attendance(AttendanceForm),
    Event(EventForm),
    Announcement(AnnouncementForm),
}

impl RecordForm {
    /// Deserialize the form for `kind` from a JSON body.
    pub fn from_json(kind: RecordKind, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match kind {
            RecordKind::Subject => RecordForm::Subject(serde_json::from_value(value)?),
            RecordKind::Class => RecordForm::Class(serde_json::from_value(value)?),
            RecordKind::Lesson => RecordForm::Lesson(serde_json::from_value(value)?),
            RecordKind::Exam => RecordForm::Exam(serde_json::from_value(value)?),
            RecordKind::Assignment => RecordForm::Assignment(serde_json::from_value(value)?),
            RecordKind::Result => RecordForm::Result(serde_json::from_value(value)?),
            RecordKind::Attendance => RecordForm::Attendance(serde_json::from_value(value)?),
            RecordKind::Event => RecordForm::Event(serde_json::from_value(value)?),
            RecordKind::Announcement => RecordForm::Announcement(serde_json::from_value(value)?),
        })
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            RecordForm::Subject(_) => RecordKind::Subject,
            RecordForm::Class(_) => RecordKind::Class,
            RecordForm::Lesson(_) => RecordKind::Lesson,
            RecordForm::Exam(_) => RecordKind::Exam,
            RecordForm::Assignment(_) => RecordKind::Assignment,
            RecordForm::Result(_) => RecordKind::Result,
            RecordForm::Attendance(_) => RecordKind::Attendance,
            RecordForm::Event(_) => RecordKind::Event,
            RecordForm::Announcement(_) => RecordKind::Announcement,
        }
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            RecordForm::Subject(f) => f.id,
            RecordForm::Class(f) => f.id,
            RecordForm::Lesson(f) => f.id,
            RecordForm::Exam(f) => f.id,
            RecordForm::Assignment(f) => f.id,
            RecordForm::Result(f) => f.id,
            RecordForm::Attendance(f) => f.id,
            RecordForm::Event(f) => f.id,
            RecordForm::Announcement(f) => f.id,
        }
    }

    /// Set the record id, e.g. after the store assigned one.
    pub fn set_id(&mut self, id: i64) {
        let slot = match self {
            RecordForm::Subject(f) => &mut f.id,
            RecordForm::Class(f) => &mut f.id,
            RecordForm::Lesson(f) => &mut f.id,
            RecordForm::Exam(f) => &mut f.id,
            RecordForm::Assignment(f) => &mut f.id,
            RecordForm::Result(f) => &mut f.id,
            RecordForm::Attendance(f) => &mut f.id,
            RecordForm::Event(f) => &mut f.id,
            RecordForm::Announcement(f) => &mut f.id,
        };
        *slot = Some(id);
    }

    /// The lesson this record hangs off, for lesson-scoped policies.
    pub fn lesson_id(&self) -> Option<i64> {
        match self {
            RecordForm::Exam(f) => Some(f.lesson_id),
            RecordForm::Assignment(f) => Some(f.lesson_id),
            RecordForm::Attendance(f) => Some(f.lesson_id),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        match self {
            RecordForm::Subject(f) => {
                require(&mut errors, "name", &f.name, "Subject name is required!");
            }
            RecordForm::Class(f) => {
                require(&mut errors, "name", &f.name, "Class name is required!");
                if f.capacity < 1 {
                    errors.push(FieldError::new("capacity", "Capacity is required!"));
                }
                if f.grade_id <= 0 {
                    errors.push(FieldError::new("gradeId", "Grade is required!"));
                }
            }
            RecordForm::Lesson(f) => {
                require(&mut errors, "name", &f.name, "Lesson name is required!");
                require(&mut errors, "teacherId", &f.teacher_id, "Teacher is required!");
                ordered(&mut errors, "endTime", f.start_time, f.end_time);
            }
            RecordForm::Exam(f) => {
                require(&mut errors, "title", &f.title, "Title is required!");
                ordered(&mut errors, "endTime", f.start_time, f.end_time);
            }
            RecordForm::Assignment(f) => {
                require(&mut errors, "title", &f.title, "Title is required!");
                ordered(&mut errors, "dueDate", f.start_date, f.due_date);
            }
            RecordForm::Result(f) => {
                if f.score < 0 {
                    errors.push(FieldError::new("score", "Score must be a positive number!"));
                }
                if f.exam_ref().is_none() && f.assignment_ref().is_none() {
                    errors.push(FieldError::new(
                        "examId",
                        "Select an exam or an assignment!",
                    ));
                }
                require(&mut errors, "studentId", &f.student_id, "Student is required!");
            }
            RecordForm::Attendance(f) => {
                require(&mut errors, "studentId", &f.student_id, "Student is required!");
            }
            RecordForm::Event(f) => {
                require(&mut errors, "title", &f.title, "Title is required!");
                ordered(&mut errors, "endTime", f.start_time, f.end_time);
            }
            RecordForm::Announcement(f) => {
                require(&mut errors, "title", &f.title, "Title is required!");
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn require(errors: &mut Vec<FieldError>, field: &str, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, message));
    }
}

fn ordered(errors: &mut Vec<FieldError>, field: &str, start: DateTime<Utc>, end: DateTime<Utc>) {
    if end < start {
        errors.push(FieldError::new(field, "End must not be before start!"));
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn positive(value: Option<i64>) -> Option<i64> {
    value.filter(|v| *v > 0)
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && domain.contains('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (date part kept).
mod flexible_date {
    use chrono::{DateTime, NaiveDate};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        if let Ok(date) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            return Ok(date);
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.date_naive())
            .map_err(|_| serde::de::Error::custom(format!("invalid date '{}'", raw)))
    }
}

/// Accepts RFC 3339, or a zone-less `YYYY-MM-DDTHH:MM[:SS]` read as UTC.
mod flexible_datetime {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&raw, fmt).ok())
            .map(|naive| naive.and_utc())
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date-time '{}'", raw)))
    }
}

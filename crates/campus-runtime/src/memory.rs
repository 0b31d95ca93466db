//! In-process identity directory and store.
//!
//! They enforce the same constraints as the hosted directory and the Postgres
//! schema: unique usernames and emails, class capacity, and existence of every
//! referenced row. Used by `campus serve --in-memory` and by tests.

use crate::identity::{Account, AccountPatch, IdentityError, IdentityProvider, NewAccount, ProviderMessage};
use crate::store::{ClassOccupancy, PersonStore, RecordStore, StoreError};
use async_trait::async_trait;
use campus_core::{
    ParentForm, PersonForm, PersonKind, RecordForm, RecordKind, StudentForm, TeacherForm,
};
use campus_policy::LessonOwnership;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::Mutex;

// =============================================================================
// Directory
// =============================================================================

/// An account held by [`InMemoryDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryAccount {
    pub id: String,
    pub username: String,
    pub email_addresses: Vec<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: PersonKind,
}

#[derive(Default)]
struct DirectoryState {
    next_id: u64,
    accounts: BTreeMap<String, DirectoryAccount>,
}

/// Identity provider that keeps accounts in memory. Ids are `acc_1`, `acc_2`, ...
#[derive(Default)]
pub struct InMemoryDirectory {
    state: Mutex<DirectoryState>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn account(&self, id: &str) -> Option<DirectoryAccount> {
        self.state.lock().await.accounts.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.accounts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn username_taken() -> IdentityError {
    IdentityError::Rejected(vec![
        ProviderMessage::new("That username is taken. Please try another.")
            .with_code("form_identifier_exists"),
    ])
}

fn password_too_short() -> IdentityError {
    IdentityError::Rejected(vec![
        ProviderMessage::new("Passwords must be 8 characters or more.")
            .with_code("form_password_length_too_short"),
    ])
}

#[async_trait]
impl IdentityProvider for InMemoryDirectory {
    async fn create_account(&self, account: &NewAccount) -> Result<Account, IdentityError> {
        if account.password.chars().count() < 8 {
            return Err(password_too_short());
        }

        let mut state = self.state.lock().await;
        if state.accounts.values().any(|a| a.username == account.username) {
            return Err(username_taken());
        }
        let email_taken = state.accounts.values().any(|a| {
            a.email_addresses
                .iter()
                .any(|e| account.email_addresses.contains(e))
        });
        if email_taken {
            return Err(IdentityError::Rejected(vec![
                ProviderMessage::new("That email address is taken. Please try another.")
                    .with_code("form_identifier_exists"),
            ]));
        }

        state.next_id += 1;
        let id = format!("acc_{}", state.next_id);
        state.accounts.insert(
            id.clone(),
            DirectoryAccount {
                id: id.clone(),
                username: account.username.clone(),
                email_addresses: account.email_addresses.clone(),
                first_name: account.first_name.clone(),
                last_name: account.last_name.clone(),
                role: account.role,
            },
        );
        Ok(Account {
            id,
            username: Some(account.username.clone()),
        })
    }

    async fn update_account(&self, id: &str, patch: &AccountPatch) -> Result<(), IdentityError> {
        if patch
            .password
            .as_deref()
            .is_some_and(|p| p.chars().count() < 8)
        {
            return Err(password_too_short());
        }

        let mut state = self.state.lock().await;
        if let Some(username) = &patch.username
            && state
                .accounts
                .values()
                .any(|a| a.id != id && &a.username == username)
        {
            return Err(username_taken());
        }

        let account = state
            .accounts
            .get_mut(id)
            .ok_or_else(|| IdentityError::NotFound(id.to_string()))?;
        if let Some(username) = &patch.username {
            account.username = username.clone();
        }
        if let Some(first_name) = &patch.first_name {
            account.first_name = first_name.clone();
        }
        if let Some(last_name) = &patch.last_name {
            account.last_name = last_name.clone();
        }
        Ok(())
    }

    async fn delete_account(&self, id: &str) -> Result<(), IdentityError> {
        let mut state = self.state.lock().await;
        state
            .accounts
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| IdentityError::NotFound(id.to_string()))
    }
}

// =============================================================================
// Store
// =============================================================================

#[derive(Default)]
struct Tables {
    grades: BTreeSet<i64>,
    teachers: BTreeMap<String, TeacherForm>,
    students: BTreeMap<String, StudentForm>,
    parents: BTreeMap<String, ParentForm>,
    /// (teacher id, subject id)
    teaches: BTreeSet<(String, i64)>,
    records: BTreeMap<(RecordKind, i64), RecordForm>,
    next_record_id: i64,
}

/// Person and record store held in memory.
///
/// Starts with grades 1 to 6, matching the Postgres seed migration.
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        let tables = Tables {
            grades: (1..=6).collect(),
            ..Default::default()
        };
        Self {
            tables: Mutex::new(tables),
        }
    }

    /// Stored teacher row with its current subject links. The password is
    /// always blank.
    pub async fn teacher(&self, id: &str) -> Option<TeacherForm> {
        let tables = self.tables.lock().await;
        let mut row = tables.teachers.get(id).cloned()?;
        row.subjects = tables
            .teaches
            .iter()
            .filter(|(t, _)| t == id)
            .map(|(_, s)| *s)
            .collect();
        Some(row)
    }

    pub async fn student(&self, id: &str) -> Option<StudentForm> {
        self.tables.lock().await.students.get(id).cloned()
    }

    pub async fn parent(&self, id: &str) -> Option<ParentForm> {
        self.tables.lock().await.parents.get(id).cloned()
    }

    pub async fn record(&self, kind: RecordKind, id: i64) -> Option<RecordForm> {
        self.tables.lock().await.records.get(&(kind, id)).cloned()
    }

    /// Subject ids currently linked to a teacher.
    pub async fn teacher_subjects(&self, teacher_id: &str) -> BTreeSet<i64> {
        let tables = self.tables.lock().await;
        tables
            .teaches
            .iter()
            .filter(|(t, _)| t == teacher_id)
            .map(|(_, s)| *s)
            .collect()
    }

    pub async fn person_count(&self, kind: PersonKind) -> usize {
        let tables = self.tables.lock().await;
        match kind {
            PersonKind::Teacher => tables.teachers.len(),
            PersonKind::Student => tables.students.len(),
            PersonKind::Parent => tables.parents.len(),
        }
    }
}

impl Tables {
    fn has_record(&self, kind: RecordKind, id: i64) -> bool {
        self.records.contains_key(&(kind, id))
    }

    fn has_person(&self, kind: PersonKind, id: &str) -> bool {
        match kind {
            PersonKind::Teacher => self.teachers.contains_key(id),
            PersonKind::Student => self.students.contains_key(id),
            PersonKind::Parent => self.parents.contains_key(id),
        }
    }

    fn occupancy(&self, class_id: i64) -> Option<ClassOccupancy> {
        let Some(RecordForm::Class(class)) = self.records.get(&(RecordKind::Class, class_id)) else {
            return None;
        };
        let occupants = self
            .students
            .values()
            .filter(|s| s.class_id == class_id)
            .count() as i64;
        Some(ClassOccupancy {
            capacity: class.capacity,
            occupants,
        })
    }

    /// First unique field of `form` already used by another row of its table.
    fn unique_conflict(&self, form: &PersonForm, self_id: &str) -> Option<StoreError> {
        let others: Vec<PersonForm> = match form.kind() {
            PersonKind::Teacher => self
                .teachers
                .iter()
                .filter(|(id, _)| id.as_str() != self_id)
                .map(|(_, f)| PersonForm::Teacher(f.clone()))
                .collect(),
            PersonKind::Student => self
                .students
                .iter()
                .filter(|(id, _)| id.as_str() != self_id)
                .map(|(_, f)| PersonForm::Student(f.clone()))
                .collect(),
            PersonKind::Parent => self
                .parents
                .iter()
                .filter(|(id, _)| id.as_str() != self_id)
                .map(|(_, f)| PersonForm::Parent(f.clone()))
                .collect(),
        };

        if others.iter().any(|o| o.username() == form.username()) {
            return Some(StoreError::unique(&["username"]));
        }
        if form.email().is_some() && others.iter().any(|o| o.email() == form.email()) {
            return Some(StoreError::unique(&["email"]));
        }
        if form.phone().is_some() && others.iter().any(|o| o.phone() == form.phone()) {
            return Some(StoreError::unique(&["phone"]));
        }
        None
    }

    fn check_person_refs(&self, form: &PersonForm) -> Result<(), StoreError> {
        match form {
            PersonForm::Teacher(t) => {
                if let Some(missing) = t
                    .subjects
                    .iter()
                    .find(|s| !self.has_record(RecordKind::Subject, **s))
                {
                    return Err(StoreError::MissingReference(format!(
                        "subject {} does not exist",
                        missing
                    )));
                }
            }
            PersonForm::Student(s) => {
                if !self.grades.contains(&s.grade_id) {
                    return Err(StoreError::MissingReference(format!(
                        "grade {} does not exist",
                        s.grade_id
                    )));
                }
                if !self.has_person(PersonKind::Parent, &s.parent_id) {
                    return Err(StoreError::MissingReference(format!(
                        "parent {} does not exist",
                        s.parent_id
                    )));
                }
            }
            PersonForm::Parent(_) => {}
        }
        Ok(())
    }

    fn check_record_refs(&self, form: &RecordForm) -> Result<(), StoreError> {
        for (kind, id) in record_refs(form) {
            if !self.has_record(kind, id) {
                return Err(StoreError::MissingReference(format!(
                    "{} {} does not exist",
                    kind, id
                )));
            }
        }
        for (kind, id) in person_refs(form) {
            if !self.has_person(kind, &id) {
                return Err(StoreError::MissingReference(format!(
                    "{} {} does not exist",
                    kind, id
                )));
            }
        }
        if let RecordForm::Class(class) = form
            && !self.grades.contains(&class.grade_id)
        {
            return Err(StoreError::MissingReference(format!(
                "grade {} does not exist",
                class.grade_id
            )));
        }
        Ok(())
    }

    /// Subject and class names are unique.
    fn name_conflict(&self, form: &RecordForm, self_id: Option<i64>) -> Option<StoreError> {
        let name = match form {
            RecordForm::Subject(f) => &f.name,
            RecordForm::Class(f) => &f.name,
            _ => return None,
        };
        let taken = self.records.iter().any(|((kind, id), row)| {
            *kind == form.kind()
                && Some(*id) != self_id
                && match row {
                    RecordForm::Subject(f) => &f.name == name,
                    RecordForm::Class(f) => &f.name == name,
                    _ => false,
                }
        });
        taken.then(|| StoreError::unique(&["name"]))
    }

    /// Fails when any stored row still points at the record.
    fn check_record_unreferenced(&self, kind: RecordKind, id: i64) -> Result<(), StoreError> {
        let referenced = self
            .records
            .values()
            .any(|r| record_refs(r).contains(&(kind, id)))
            || (kind == RecordKind::Class && self.students.values().any(|s| s.class_id == id));
        if referenced {
            return Err(StoreError::MissingReference(format!(
                "{} {} is still referenced",
                kind, id
            )));
        }
        Ok(())
    }

    fn check_person_unreferenced(&self, kind: PersonKind, id: &str) -> Result<(), StoreError> {
        // Subject links are dropped and supervisors cleared instead.
        let referenced = match kind {
            PersonKind::Parent => self.students.values().any(|s| s.parent_id == id),
            _ => self.records.values().any(|r| {
                !matches!(r, RecordForm::Subject(_) | RecordForm::Class(_))
                    && person_refs(r).contains(&(kind, id.to_string()))
            }),
        };
        if referenced {
            return Err(StoreError::MissingReference(format!(
                "{} {} is still referenced",
                kind, id
            )));
        }
        Ok(())
    }

    /// Replaces the teacher's links and mirrors them into each stored
    /// subject's teacher list.
    fn set_teacher_subjects(&mut self, teacher_id: &str, subjects: &[i64]) {
        self.teaches.retain(|(t, _)| t != teacher_id);
        for subject in subjects {
            self.teaches.insert((teacher_id.to_string(), *subject));
        }
        for ((_, id), record) in self.records.iter_mut() {
            let RecordForm::Subject(subject) = record else {
                continue;
            };
            let linked = subject.teachers.iter().any(|t| t == teacher_id);
            if subjects.contains(id) {
                if !linked {
                    subject.teachers.push(teacher_id.to_string());
                }
            } else if linked {
                subject.teachers.retain(|t| t != teacher_id);
            }
        }
    }

    fn set_subject_teachers(&mut self, subject_id: i64, teachers: &[String]) {
        self.teaches.retain(|(_, s)| *s != subject_id);
        for teacher in teachers {
            self.teaches.insert((teacher.clone(), subject_id));
        }
    }

    fn write_person(&mut self, id: &str, form: &PersonForm) {
        match form {
            PersonForm::Teacher(t) => {
                let mut row = t.clone();
                row.id = Some(id.to_string());
                row.password.clear();
                self.set_teacher_subjects(id, &t.subjects);
                self.teachers.insert(id.to_string(), row);
            }
            PersonForm::Student(s) => {
                let mut row = s.clone();
                row.id = Some(id.to_string());
                row.password.clear();
                self.students.insert(id.to_string(), row);
            }
            PersonForm::Parent(p) => {
                let mut row = p.clone();
                row.id = Some(id.to_string());
                row.password.clear();
                self.parents.insert(id.to_string(), row);
            }
        }
    }

    fn write_record(&mut self, id: i64, form: &RecordForm) {
        let mut row = form.clone();
        row.set_id(id);
        if let RecordForm::Subject(subject) = form {
            self.set_subject_teachers(id, &subject.teachers);
        }
        self.records.insert((form.kind(), id), row);
    }
}

/// Record-to-record references of a form.
fn record_refs(form: &RecordForm) -> Vec<(RecordKind, i64)> {
    match form {
        RecordForm::Subject(_) | RecordForm::Class(_) => Vec::new(),
        RecordForm::Lesson(f) => vec![
            (RecordKind::Subject, f.subject_id),
            (RecordKind::Class, f.class_id),
        ],
        RecordForm::Exam(f) => vec![(RecordKind::Lesson, f.lesson_id)],
        RecordForm::Assignment(f) => vec![(RecordKind::Lesson, f.lesson_id)],
        RecordForm::Result(f) => f
            .exam_ref()
            .map(|id| (RecordKind::Exam, id))
            .into_iter()
            .chain(f.assignment_ref().map(|id| (RecordKind::Assignment, id)))
            .collect(),
        RecordForm::Attendance(f) => vec![(RecordKind::Lesson, f.lesson_id)],
        RecordForm::Event(f) => f.class_ref().map(|id| (RecordKind::Class, id)).into_iter().collect(),
        RecordForm::Announcement(f) => f.class_ref().map(|id| (RecordKind::Class, id)).into_iter().collect(),
    }
}

/// Record-to-person references of a form.
fn person_refs(form: &RecordForm) -> Vec<(PersonKind, String)> {
    match form {
        RecordForm::Subject(f) => f
            .teachers
            .iter()
            .map(|t| (PersonKind::Teacher, t.clone()))
            .collect(),
        RecordForm::Class(f) => f
            .supervisor_ref()
            .map(|t| (PersonKind::Teacher, t.to_string()))
            .into_iter()
            .collect(),
        RecordForm::Lesson(f) => vec![(PersonKind::Teacher, f.teacher_id.clone())],
        RecordForm::Result(f) => vec![(PersonKind::Student, f.student_id.clone())],
        RecordForm::Attendance(f) => vec![(PersonKind::Student, f.student_id.clone())],
        _ => Vec::new(),
    }
}

#[async_trait]
impl PersonStore for InMemoryStore {
    async fn class_occupancy(&self, class_id: i64) -> Result<Option<ClassOccupancy>, StoreError> {
        Ok(self.tables.lock().await.occupancy(class_id))
    }

    async fn insert_person(&self, account_id: &str, form: &PersonForm) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.has_person(form.kind(), account_id) {
            return Err(StoreError::unique(&["id"]));
        }
        if let Some(err) = tables.unique_conflict(form, account_id) {
            return Err(err);
        }
        if let Some(class_id) = form.class_id()
            && !tables.occupancy(class_id).is_some_and(|o| o.has_room())
        {
            return Err(StoreError::CapacityExceeded { class_id });
        }
        tables.check_person_refs(form)?;
        tables.write_person(account_id, form);
        Ok(())
    }

    async fn update_person(
        &self,
        account_id: &str,
        form: &PersonForm,
        _password: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let kind = form.kind();
        if !tables.has_person(kind, account_id) {
            return Err(StoreError::not_found(kind, account_id));
        }
        if let Some(err) = tables.unique_conflict(form, account_id) {
            return Err(err);
        }
        tables.check_person_refs(form)?;
        if let PersonForm::Student(student) = form {
            let moving = tables
                .students
                .get(account_id)
                .is_some_and(|current| current.class_id != student.class_id);
            if moving
                && !tables
                    .occupancy(student.class_id)
                    .is_some_and(|o| o.has_room())
            {
                return Err(StoreError::CapacityExceeded {
                    class_id: student.class_id,
                });
            }
        }
        tables.write_person(account_id, form);
        Ok(())
    }

    async fn delete_person(&self, kind: PersonKind, account_id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if !tables.has_person(kind, account_id) {
            return Err(StoreError::not_found(kind, account_id));
        }
        tables.check_person_unreferenced(kind, account_id)?;
        match kind {
            PersonKind::Teacher => {
                tables.teachers.remove(account_id);
                tables.teaches.retain(|(t, _)| t != account_id);
                for record in tables.records.values_mut() {
                    match record {
                        RecordForm::Class(class)
                            if class.supervisor_id.as_deref() == Some(account_id) =>
                        {
                            class.supervisor_id = None;
                        }
                        RecordForm::Subject(subject) => {
                            subject.teachers.retain(|t| t != account_id);
                        }
                        _ => {}
                    }
                }
            }
            PersonKind::Student => {
                tables.students.remove(account_id);
            }
            PersonKind::Parent => {
                tables.parents.remove(account_id);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn create_record(&self, form: &RecordForm) -> Result<i64, StoreError> {
        let mut tables = self.tables.lock().await;
        if let Some(err) = tables.name_conflict(form, None) {
            return Err(err);
        }
        tables.check_record_refs(form)?;
        tables.next_record_id += 1;
        let id = tables.next_record_id;
        tables.write_record(id, form);
        Ok(id)
    }

    async fn update_record(&self, id: i64, form: &RecordForm) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let kind = form.kind();
        if !tables.has_record(kind, id) {
            return Err(StoreError::not_found(kind, id));
        }
        if let Some(err) = tables.name_conflict(form, Some(id)) {
            return Err(err);
        }
        tables.check_record_refs(form)?;
        if let RecordForm::Class(class) = form
            && let Some(occupancy) = tables.occupancy(id)
            && occupancy.occupants > i64::from(class.capacity)
        {
            return Err(StoreError::CapacityExceeded { class_id: id });
        }
        tables.write_record(id, form);
        Ok(())
    }

    async fn delete_record(&self, kind: RecordKind, id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if !tables.has_record(kind, id) {
            return Err(StoreError::not_found(kind, id));
        }
        tables.check_record_unreferenced(kind, id)?;
        tables.records.remove(&(kind, id));
        if kind == RecordKind::Subject {
            tables.teaches.retain(|(_, s)| *s != id);
        }
        Ok(())
    }

    async fn record_lesson(&self, kind: RecordKind, id: i64) -> Result<Option<i64>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.records.get(&(kind, id)).and_then(RecordForm::lesson_id))
    }
}

#[async_trait]
impl LessonOwnership for InMemoryStore {
    async fn lesson_teacher(&self, lesson_id: i64) -> anyhow::Result<Option<String>> {
        let tables = self.tables.lock().await;
        Ok(match tables.records.get(&(RecordKind::Lesson, lesson_id)) {
            Some(RecordForm::Lesson(lesson)) => Some(lesson.teacher_id.clone()),
            _ => None,
        })
    }
}

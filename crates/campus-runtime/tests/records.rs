use campus_core::{
    ActionErrorKind, ClassForm, Day, EventForm, ExamForm, LessonForm, PersonForm, RecordForm,
    RecordKind, ResultForm, Role, Sex, SubjectForm, TeacherForm,
};
use campus_policy::{AllowAllPolicy, LessonScopedPolicy, Principal};
use campus_runtime::{InMemoryStore, PersonStore, RecordService};
use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;

fn teacher_form(username: &str) -> PersonForm {
    PersonForm::Teacher(TeacherForm {
        id: None,
        username: username.to_string(),
        password: String::new(),
        name: "T".to_string(),
        surname: username.to_string(),
        email: None,
        phone: None,
        address: "School".to_string(),
        img: None,
        blood_type: "B+".to_string(),
        sex: Sex::Male,
        birthday: NaiveDate::from_ymd_opt(1979, 1, 1).unwrap(),
        subjects: vec![],
    })
}

fn exam(id: Option<i64>, lesson_id: i64) -> RecordForm {
    RecordForm::Exam(ExamForm {
        id,
        title: "Quiz".to_string(),
        start_time: Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap(),
        end_time: Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap(),
        lesson_id,
    })
}

/// Store with two teachers, one class, one subject and a lesson for each teacher.
/// Lesson ids are returned as (lesson of t1, lesson of t2).
async fn seeded_store() -> (Arc<InMemoryStore>, i64, i64) {
    let store = Arc::new(InMemoryStore::new());
    store.insert_person("t1", &teacher_form("teach1")).await.unwrap();
    store.insert_person("t2", &teacher_form("teach2")).await.unwrap();

    let service = RecordService::new(store.clone(), Arc::new(AllowAllPolicy));
    let admin = Principal::admin();
    assert!(service
        .create(
            &admin,
            &RecordForm::Subject(SubjectForm {
                id: None,
                name: "Math".to_string(),
                teachers: vec!["t1".to_string(), "t2".to_string()],
            }),
        )
        .await
        .is_ok());
    assert!(service
        .create(
            &admin,
            &RecordForm::Class(ClassForm {
                id: None,
                name: "2A".to_string(),
                capacity: 20,
                grade_id: 2,
                supervisor_id: Some("t1".to_string()),
            }),
        )
        .await
        .is_ok());

    for teacher in ["t1", "t2"] {
        let lesson = RecordForm::Lesson(LessonForm {
            id: None,
            name: format!("Math with {}", teacher),
            day: Day::Tuesday,
            start_time: Utc.with_ymd_and_hms(2025, 5, 6, 8, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2025, 5, 6, 9, 0, 0).unwrap(),
            subject_id: 1,
            class_id: 2,
            teacher_id: teacher.to_string(),
        });
        assert!(service.create(&admin, &lesson).await.is_ok());
    }
    (store, 3, 4)
}

fn scoped_service(store: Arc<InMemoryStore>) -> RecordService {
    let policy = LessonScopedPolicy::new(store.clone(), vec![RecordKind::Exam]);
    RecordService::new(store, Arc::new(policy))
}

#[tokio::test]
async fn test_teacher_cannot_create_exam_for_foreign_lesson() {
    let (store, own, foreign) = seeded_store().await;
    let service = scoped_service(store.clone());
    let teacher = Principal::new("t1", Role::Teacher);

    let denied = service.create(&teacher, &exam(None, foreign)).await;
    let err = denied.error().unwrap();
    assert_eq!(err.kind, ActionErrorKind::NotPermitted);
    assert_eq!(err.message, format!("Lesson {} is not taught by you", foreign));
    assert!(store.record(RecordKind::Exam, 5).await.is_none());

    assert!(service.create(&teacher, &exam(None, own)).await.is_ok());
    assert!(store.record(RecordKind::Exam, 5).await.is_some());
}

#[tokio::test]
async fn test_teacher_cannot_move_or_delete_foreign_exam() {
    let (store, own, foreign) = seeded_store().await;
    let service = scoped_service(store.clone());
    let admin = Principal::admin();
    let teacher = Principal::new("t1", Role::Teacher);

    assert!(service.create(&admin, &exam(None, foreign)).await.is_ok());
    let exam_id = 5;

    // Re-pointing someone else's exam at an own lesson is still denied.
    let moved = service.update(&teacher, &exam(Some(exam_id), own)).await;
    assert_eq!(moved.error().unwrap().kind, ActionErrorKind::NotPermitted);

    let deleted = service.delete(&teacher, RecordKind::Exam, exam_id).await;
    assert_eq!(deleted.error().unwrap().kind, ActionErrorKind::NotPermitted);

    assert!(service.delete(&admin, RecordKind::Exam, exam_id).await.is_ok());
}

#[tokio::test]
async fn test_update_without_id_is_missing_identifier() {
    let (store, _, _) = seeded_store().await;
    let service = RecordService::new(store, Arc::new(AllowAllPolicy));

    let result = service.update(&Principal::admin(), &exam(None, 3)).await;

    let err = result.error().unwrap();
    assert_eq!(err.kind, ActionErrorKind::MissingIdentifier);
    assert_eq!(err.message, "Missing exam ID");
}

#[tokio::test]
async fn test_subject_update_replaces_teacher_set() {
    let (store, _, _) = seeded_store().await;
    let service = RecordService::new(store.clone(), Arc::new(AllowAllPolicy));

    let update = RecordForm::Subject(SubjectForm {
        id: Some(1),
        name: "Mathematics".to_string(),
        teachers: vec!["t2".to_string()],
    });
    assert!(service.update(&Principal::admin(), &update).await.is_ok());

    assert!(store.teacher_subjects("t1").await.is_empty());
    assert_eq!(store.teacher_subjects("t2").await.len(), 1);
}

#[tokio::test]
async fn test_zero_class_id_is_stored_as_absent() {
    let (store, _, _) = seeded_store().await;
    let service = RecordService::new(store.clone(), Arc::new(AllowAllPolicy));

    let event = RecordForm::Event(EventForm {
        id: None,
        title: "Sports day".to_string(),
        description: "Everyone outside".to_string(),
        start_time: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        end_time: Utc.with_ymd_and_hms(2025, 6, 1, 15, 0, 0).unwrap(),
        class_id: Some(0),
    });
    assert!(service.create(&Principal::admin(), &event).await.is_ok());
}

#[tokio::test]
async fn test_dangling_reference_is_unknown_with_message() {
    let (store, _, _) = seeded_store().await;
    let service = RecordService::new(store, Arc::new(AllowAllPolicy));

    let result = service
        .create(
            &Principal::admin(),
            &RecordForm::Result(ResultForm {
                id: None,
                score: 88,
                exam_id: Some(42),
                assignment_id: None,
                student_id: "s1".to_string(),
            }),
        )
        .await;

    let err = result.error().unwrap();
    assert_eq!(err.kind, ActionErrorKind::Unknown);
    assert_eq!(err.message, "exam 42 does not exist");
}

#[tokio::test]
async fn test_referenced_lesson_cannot_be_deleted() {
    let (store, own, _) = seeded_store().await;
    let service = RecordService::new(store, Arc::new(AllowAllPolicy));
    let admin = Principal::admin();

    assert!(service.create(&admin, &exam(None, own)).await.is_ok());
    let result = service.delete(&admin, RecordKind::Lesson, own).await;
    assert_eq!(
        result.message(),
        Some(format!("lesson {} is still referenced", own).as_str())
    );
}

//! Runs against a scratch database named by `CAMPUS_TEST_DATABASE_URL`.
//! Each test recreates the schema, so run them on one thread.
//!
//! ```sh
//! CAMPUS_TEST_DATABASE_URL=postgresql://postgres@localhost/campus_test \
//!     cargo test -p campus-adapter-pg -- --ignored --test-threads=1
//! ```

use campus_adapter_pg::PgStore;
use campus_core::{
    ClassForm, ParentForm, PersonForm, PersonKind, RecordForm, RecordKind, Sex, StudentForm,
    SubjectForm, TeacherForm,
};
use campus_policy::LessonOwnership;
use campus_runtime::{PersonStore, RecordStore, StoreError};
use chrono::NaiveDate;

async fn store() -> PgStore {
    let url = std::env::var("CAMPUS_TEST_DATABASE_URL")
        .expect("CAMPUS_TEST_DATABASE_URL must be set for ignored tests");
    let store = PgStore::connect_url(&url).await.unwrap();
    for statement in ["DROP SCHEMA public CASCADE", "CREATE SCHEMA public"] {
        sqlx::query(statement).execute(store.pool()).await.unwrap();
    }
    store.migrate().await.unwrap();
    store
}

fn parent(username: &str, phone: &str) -> PersonForm {
    PersonForm::Parent(ParentForm {
        id: None,
        username: username.to_string(),
        password: "parentpass".to_string(),
        name: "Pat".to_string(),
        surname: "Guardian".to_string(),
        email: Some(format!("{}@home.org", username)),
        phone: phone.to_string(),
        address: "3 Home St".to_string(),
    })
}

fn student(username: &str, class_id: i64) -> PersonForm {
    PersonForm::Student(StudentForm {
        id: None,
        username: username.to_string(),
        password: "studentpass".to_string(),
        name: "Sam".to_string(),
        surname: "Pupil".to_string(),
        email: None,
        phone: None,
        address: "2 School Rd".to_string(),
        img: None,
        blood_type: "A-".to_string(),
        sex: Sex::Male,
        birthday: NaiveDate::from_ymd_opt(2014, 3, 1).unwrap(),
        grade_id: 1,
        class_id,
        parent_id: "p1".to_string(),
    })
}

fn teacher(subjects: Vec<i64>) -> PersonForm {
    PersonForm::Teacher(TeacherForm {
        id: None,
        username: "ada".to_string(),
        password: "password1".to_string(),
        name: "Ada".to_string(),
        surname: "Lovelace".to_string(),
        email: Some(String::new()),
        phone: None,
        address: "1 Analytical Way".to_string(),
        img: None,
        blood_type: "O+".to_string(),
        sex: Sex::Female,
        birthday: NaiveDate::from_ymd_opt(1985, 12, 10).unwrap(),
        subjects,
    })
}

#[tokio::test]
#[ignore]
async fn test_student_insert_respects_capacity() {
    let store = store().await;
    let class_id = store
        .create_record(&RecordForm::Class(ClassForm {
            id: None,
            name: "1A".to_string(),
            capacity: 1,
            grade_id: 1,
            supervisor_id: None,
        }))
        .await
        .unwrap();
    store.insert_person("p1", &parent("pat", "555-0001")).await.unwrap();

    store.insert_person("s1", &student("sam", class_id)).await.unwrap();
    let occupancy = store.class_occupancy(class_id).await.unwrap().unwrap();
    assert_eq!(occupancy.occupants, 1);

    let err = store
        .insert_person("s2", &student("kim", class_id))
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::CapacityExceeded { class_id });
}

#[tokio::test]
#[ignore]
async fn test_duplicate_phone_names_field() {
    let store = store().await;
    store.insert_person("p1", &parent("pat", "555-0001")).await.unwrap();

    let err = store
        .insert_person("p2", &parent("pam", "555-0001"))
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::unique(&["phone"]));
}

#[tokio::test]
#[ignore]
async fn test_teacher_subjects_replaced_on_update() {
    let store = store().await;
    for name in ["s1", "s2", "s3", "s4", "s5"] {
        store
            .create_record(&RecordForm::Subject(SubjectForm {
                id: None,
                name: name.to_string(),
                teachers: vec![],
            }))
            .await
            .unwrap();
    }
    store.insert_person("t1", &teacher(vec![1, 2, 3])).await.unwrap();
    store
        .update_person("t1", &teacher(vec![2, 5]), None)
        .await
        .unwrap();

    let subjects: Vec<i64> = sqlx::query_scalar(
        "SELECT subject_id FROM teacher_subject WHERE teacher_id = 't1' ORDER BY subject_id",
    )
    .fetch_all(store.pool())
    .await
    .unwrap();
    assert_eq!(subjects, vec![2, 5]);
}

#[tokio::test]
#[ignore]
async fn test_missing_rows_are_not_found() {
    let store = store().await;
    let err = store
        .delete_person(PersonKind::Teacher, "nobody")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));

    let err = store.delete_record(RecordKind::Exam, 404).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
    assert_eq!(store.lesson_teacher(404).await.unwrap(), None);
}

#[tokio::test]
#[ignore]
async fn test_dangling_parent_is_missing_reference() {
    let store = store().await;
    let class_id = store
        .create_record(&RecordForm::Class(ClassForm {
            id: None,
            name: "1B".to_string(),
            capacity: 10,
            grade_id: 1,
            supervisor_id: None,
        }))
        .await
        .unwrap();

    let err = store
        .insert_person("s1", &student("sam", class_id))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingReference(_)));
}

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use campus_core::{PersonKind, RecordKind};
use campus_dashboard::{AppState, create_router};
use campus_policy::{AllowAllPolicy, LessonScopedPolicy, ScopePolicy};
use campus_runtime::{
    InMemoryDirectory, InMemoryStore, NullAuditSink, PersonProvisioner, RecordService,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

struct Harness {
    app: Router,
    directory: Arc<InMemoryDirectory>,
    store: Arc<InMemoryStore>,
}

fn harness_with(policy: impl FnOnce(Arc<InMemoryStore>) -> Arc<dyn ScopePolicy>) -> Harness {
    let directory = Arc::new(InMemoryDirectory::new());
    let store = Arc::new(InMemoryStore::new());
    let provisioner = PersonProvisioner::new(directory.clone(), store.clone())
        .with_audit(Arc::new(NullAuditSink));
    let records = RecordService::new(store.clone(), policy(store.clone()));
    Harness {
        app: create_router(AppState::new(provisioner, records)),
        directory,
        store,
    }
}

fn harness() -> Harness {
    harness_with(|_| -> Arc<dyn ScopePolicy> { Arc::new(AllowAllPolicy) })
}

impl Harness {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn json(&self, method: &str, resource: &str, body: Value) -> (StatusCode, Value) {
        self.json_as(method, resource, body, &[]).await
    }

    async fn json_as(
        &self,
        method: &str,
        resource: &str,
        body: Value,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("/api/{}", resource))
            .header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn delete(&self, resource: &str, id: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/api/{}", resource))
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(format!("id={}", id)))
            .unwrap();
        self.send(request).await
    }
}

fn parent(username: &str, phone: &str) -> Value {
    json!({
        "username": username,
        "password": "parentpass",
        "name": "Pat",
        "surname": "Guardian",
        "email": format!("{}@home.org", username),
        "phone": phone,
        "address": "3 Home St"
    })
}

fn student(username: &str, parent_id: &str) -> Value {
    json!({
        "username": username,
        "password": "studentpass",
        "name": "Sam",
        "surname": "Pupil",
        "address": "2 School Rd",
        "bloodType": "A-",
        "sex": "MALE",
        "birthday": "2014-03-01",
        "gradeId": 1,
        "classId": 1,
        "parentId": parent_id
    })
}

fn teacher(username: &str) -> Value {
    json!({
        "username": username,
        "password": "teacherpass",
        "name": "Ada",
        "surname": "Lovelace",
        "address": "1 Analytical Way",
        "bloodType": "O+",
        "sex": "FEMALE",
        "birthday": "1985-12-10T00:00:00.000Z"
    })
}

#[tokio::test]
async fn test_healthz() {
    let h = harness();
    let request = Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let (status, body) = h.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "service": "campus" }));
}

#[tokio::test]
async fn test_unknown_resource_is_404() {
    let h = harness();
    let (status, _) = h.json("POST", "janitors", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_parent_provisions_account_and_row() {
    let h = harness();
    let (status, body) = h.json("POST", "parents", parent("pat", "555-0001")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    let account = h.directory.account("acc_1").await.unwrap();
    assert_eq!(account.role, PersonKind::Parent);
    assert_eq!(account.email_addresses, vec!["pat@home.org".to_string()]);
    assert_eq!(h.store.parent("acc_1").await.unwrap().username, "pat");
}

#[tokio::test]
async fn test_invalid_form_is_422_and_calls_nothing() {
    let h = harness();
    let (status, body) = h.json("POST", "parents", parent("pa", "555-0001")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation_failure");
    assert!(h.directory.is_empty().await);

    let (status, body) = h.json("POST", "parents", json!({ "username": 7 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation_failure");
}

#[tokio::test]
async fn test_duplicate_email_is_provider_rejection() {
    let h = harness();
    h.json("POST", "parents", parent("pat", "555-0001")).await;

    let mut twin = parent("pam", "555-0002");
    twin["email"] = json!("pat@home.org");
    let (status, body) = h.json("POST", "parents", twin).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "external_provider_rejected");
    assert_eq!(
        body["message"],
        "That email address is taken. Please try another."
    );
    assert_eq!(h.store.person_count(PersonKind::Parent).await, 1);
}

#[tokio::test]
async fn test_full_class_is_409() {
    let h = harness();
    let class = json!({ "name": "1A", "capacity": 1, "gradeId": 1 });
    assert_eq!(h.json("POST", "classes", class).await.0, StatusCode::OK);
    h.json("POST", "parents", parent("pat", "555-0001")).await;

    let (status, _) = h.json("POST", "students", student("sam", "acc_1")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = h.json("POST", "students", student("kim", "acc_1")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body,
        json!({
            "status": "error",
            "kind": "capacity_exceeded",
            "message": "Class is already full"
        })
    );
    assert_eq!(h.directory.len().await, 2);
}

#[tokio::test]
async fn test_update_without_id_is_400() {
    let h = harness();
    let (status, body) = h.json("PUT", "parents", parent("pat", "555-0001")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing parent ID");
}

#[tokio::test]
async fn test_update_without_id_is_400_even_when_password_is_blank() {
    let h = harness();
    let mut form = parent("pat", "555-0001");
    form["password"] = json!("");
    let (status, body) = h.json("PUT", "parents", form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "missing_identifier");
    assert_eq!(body["message"], "Missing parent ID");

    let (status, body) = h.json("PUT", "subjects", json!({ "name": "Art" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing subject ID");
}

#[tokio::test]
async fn test_create_with_submitted_id_still_requires_password() {
    let h = harness();
    let mut form = parent("pat", "555-0001");
    form["id"] = json!("acc_9");
    form["password"] = json!("");
    let (status, body) = h.json("POST", "parents", form).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation_failure");
    assert_eq!(body["message"], "Password must be at least 8 characters long!");
    assert!(h.directory.is_empty().await);
    assert_eq!(h.store.person_count(PersonKind::Parent).await, 0);
}

#[tokio::test]
async fn test_unreadable_bodies_are_validation_failures() {
    let h = harness();

    let malformed = Request::builder()
        .method("POST")
        .uri("/api/parents")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = h.send(malformed).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], "error");
    assert_eq!(body["kind"], "validation_failure");

    let untyped = Request::builder()
        .method("PUT")
        .uri("/api/subjects")
        .body(Body::from(r#"{"id":1,"name":"Art"}"#))
        .unwrap();
    let (status, body) = h.send(untyped).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation_failure");

    let json_delete = Request::builder()
        .method("DELETE")
        .uri("/api/exams")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"id":1}"#))
        .unwrap();
    let (status, body) = h.send(json_delete).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation_failure");

    assert!(h.directory.is_empty().await);
}

#[tokio::test]
async fn test_unknown_resource_wins_over_bad_body() {
    let h = harness();
    let request = Request::builder()
        .method("POST")
        .uri("/api/janitors")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = h.send(request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_parent_removes_account_and_row() {
    let h = harness();
    h.json("POST", "parents", parent("pat", "555-0001")).await;

    let (status, body) = h.delete("parents", "acc_1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(h.directory.is_empty().await);
    assert_eq!(h.store.person_count(PersonKind::Parent).await, 0);
}

#[tokio::test]
async fn test_delete_unknown_person_is_generic() {
    let h = harness();
    let (status, body) = h.delete("teachers", "acc_404").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Something went wrong!");
}

#[tokio::test]
async fn test_record_delete_without_id_is_400() {
    let h = harness();
    let (status, body) = h.delete("exams", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "missing_identifier");
}

#[tokio::test]
async fn test_teacher_cannot_schedule_exam_on_foreign_lesson() {
    let h = harness_with(|store| -> Arc<dyn ScopePolicy> {
        Arc::new(LessonScopedPolicy::new(store, vec![RecordKind::Exam]))
    });
    h.json("POST", "teachers", teacher("ada")).await;
    h.json("POST", "teachers", teacher("grace")).await;
    h.json("POST", "subjects", json!({ "name": "Math", "teachers": ["acc_1", "acc_2"] }))
        .await;
    h.json("POST", "classes", json!({ "name": "2A", "capacity": 20, "gradeId": 2 }))
        .await;
    let (status, _) = h
        .json(
            "POST",
            "lessons",
            json!({
                "name": "Algebra",
                "day": "MONDAY",
                "startTime": "2025-05-05T08:00:00Z",
                "endTime": "2025-05-05T09:00:00Z",
                "subjectId": 1,
                "classId": 2,
                "teacherId": "acc_2"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let exam = json!({
        "title": "Quiz",
        "startTime": "2025-05-12T08:00",
        "endTime": "2025-05-12T09:00",
        "lessonId": 3
    });
    let ada = [("x-campus-user", "acc_1"), ("x-campus-role", "teacher")];
    let (status, body) = h.json_as("POST", "exams", exam.clone(), &ada).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "not_permitted");

    let grace = [("x-campus-user", "acc_2"), ("x-campus-role", "teacher")];
    let (status, _) = h.json_as("POST", "exams", exam, &grace).await;
    assert_eq!(status, StatusCode::OK);
    assert!(h.store.record(RecordKind::Exam, 4).await.is_some());
}

#[tokio::test]
async fn test_bad_role_header_is_400() {
    let h = harness();
    let (status, _) = h
        .json_as(
            "POST",
            "subjects",
            json!({ "name": "Art" }),
            &[("x-campus-role", "janitor")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

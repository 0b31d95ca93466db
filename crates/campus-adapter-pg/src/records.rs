use crate::PgStore;
use crate::error::map_sqlx_error;
use crate::person::blank_to_null;
use async_trait::async_trait;
use campus_core::{RecordForm, RecordKind};
use campus_policy::LessonOwnership;
use campus_runtime::{RecordStore, StoreError};
use sqlx::PgConnection;

fn table(kind: RecordKind) -> &'static str {
    match kind {
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

async fn replace_subject_teachers(
    conn: &mut PgConnection,
    subject_id: i64,
    teachers: &[String],
) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM teacher_subject WHERE subject_id = $1")
        .bind(subject_id)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    sqlx::query(
        "INSERT INTO teacher_subject (teacher_id, subject_id) \
         SELECT teacher_id, $1 FROM UNNEST($2::text[]) AS t(teacher_id) \
         ON CONFLICT DO NOTHING",
    )
    .bind(subject_id)
    .bind(teachers)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;
    Ok(())
}

/// Insert the row and return its id. Subject teacher links are written too.
async fn insert(conn: &mut PgConnection, form: &RecordForm) -> Result<i64, sqlx::Error> {
    match form {
        RecordForm::Subject(f) => {
            sqlx::query_scalar("INSERT INTO subject (name) VALUES ($1) RETURNING id")
                .bind(&f.name)
                .fetch_one(&mut *conn)
                .await
        }
        RecordForm::Class(f) => {
            sqlx::query_scalar(
                "INSERT INTO class (name, capacity, grade_id, supervisor_id) \
                 VALUES ($1, $2, $3, $4) RETURNING id",
            )
            .bind(&f.name)
            .bind(f.capacity)
            .bind(f.grade_id)
            .bind(f.supervisor_ref())
            .fetch_one(&mut *conn)
            .await
        }
        RecordForm::Lesson(f) => {
            sqlx::query_scalar(
                "INSERT INTO lesson (name, day, start_time, end_time, subject_id, class_id, teacher_id) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
            )
            .bind(&f.name)
            .bind(f.day.as_str())
            .bind(f.start_time)
            .bind(f.end_time)
            .bind(f.subject_id)
            .bind(f.class_id)
            .bind(&f.teacher_id)
            .fetch_one(&mut *conn)
            .await
        }
        RecordForm::Exam(f) => {
            sqlx::query_scalar(
                "INSERT INTO exam (title, start_time, end_time, lesson_id) \
                 VALUES ($1, $2, $3, $4) RETURNING id",
            )
            .bind(&f.title)
            .bind(f.start_time)
            .bind(f.end_time)
            .bind(f.lesson_id)
            .fetch_one(&mut *conn)
            .await
        }
        RecordForm::Assignment(f) => {
            sqlx::query_scalar(
                "INSERT INTO assignment (title, start_date, due_date, lesson_id) \
                 VALUES ($1, $2, $3, $4) RETURNING id",
            )
            .bind(&f.title)
            .bind(f.start_date)
            .bind(f.due_date)
            .bind(f.lesson_id)
            .fetch_one(&mut *conn)
            .await
        }
        RecordForm::Result(f) => {
            sqlx::query_scalar(
                "INSERT INTO result (score, exam_id, assignment_id, student_id) \
                 VALUES ($1, $2, $3, $4) RETURNING id",
            )
            .bind(f.score)
            .bind(f.exam_ref())
            .bind(f.assignment_ref())
            .bind(&f.student_id)
            .fetch_one(&mut *conn)
            .await
        }
        RecordForm::Attendance(f) => {
            sqlx::query_scalar(
                "INSERT INTO attendance (date, present, student_id, lesson_id) \
                 VALUES ($1, $2, $3, $4) RETURNING id",
            )
            .bind(f.date)
            .bind(f.present)
            .bind(&f.student_id)
            .bind(f.lesson_id)
            .fetch_one(&mut *conn)
            .await
        }
        RecordForm::Event(f) => {
            sqlx::query_scalar(
                "INSERT INTO event (title, description, start_time, end_time, class_id) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING id",
            )
            .bind(&f.title)
            .bind(&f.description)
            .bind(f.start_time)
            .bind(f.end_time)
            .bind(f.class_ref())
            .fetch_one(&mut *conn)
            .await
        }
        RecordForm::Announcement(f) => {
            sqlx::query_scalar(
                "INSERT INTO announcement (title, description, date, class_id) \
                 VALUES ($1, $2, $3, $4) RETURNING id",
            )
            .bind(&f.title)
            .bind(&f.description)
            .bind(f.date)
            .bind(f.class_ref())
            .fetch_one(&mut *conn)
            .await
        }
    }
}

/// Overwrite the row's fields and return the number of rows touched.
async fn update(conn: &mut PgConnection, id: i64, form: &RecordForm) -> Result<u64, sqlx::Error> {
    let result = match form {
        RecordForm::Subject(f) => {
            sqlx::query("UPDATE subject SET name = $2 WHERE id = $1")
                .bind(id)
                .bind(&f.name)
                .execute(&mut *conn)
                .await?
        }
        RecordForm::Class(f) => {
            sqlx::query(
                "UPDATE class SET name = $2, capacity = $3, grade_id = $4, supervisor_id = $5 \
                 WHERE id = $1",
            )
            .bind(id)
            .bind(&f.name)
            .bind(f.capacity)
            .bind(f.grade_id)
            .bind(f.supervisor_ref())
            .execute(&mut *conn)
            .await?
        }
        RecordForm::Lesson(f) => {
            sqlx::query(
                "UPDATE lesson SET name = $2, day = $3, start_time = $4, end_time = $5, \
                 subject_id = $6, class_id = $7, teacher_id = $8 WHERE id = $1",
            )
            .bind(id)
            .bind(&f.name)
            .bind(f.day.as_str())
            .bind(f.start_time)
            .bind(f.end_time)
            .bind(f.subject_id)
            .bind(f.class_id)
            .bind(&f.teacher_id)
            .execute(&mut *conn)
            .await?
        }
        RecordForm::Exam(f) => {
            sqlx::query(
                "UPDATE exam SET title = $2, start_time = $3, end_time = $4, lesson_id = $5 \
                 WHERE id = $1",
            )
            .bind(id)
            .bind(&f.title)
            .bind(f.start_time)
            .bind(f.end_time)
            .bind(f.lesson_id)
            .execute(&mut *conn)
            .await?
        }
        RecordForm::Assignment(f) => {
            sqlx::query(
                "UPDATE assignment SET title = $2, start_date = $3, due_date = $4, lesson_id = $5 \
                 WHERE id = $1",
            )
            .bind(id)
            .bind(&f.title)
            .bind(f.start_date)
            .bind(f.due_date)
            .bind(f.lesson_id)
            .execute(&mut *conn)
            .await?
        }
        RecordForm::Result(f) => {
            sqlx::query(
                "UPDATE result SET score = $2, exam_id = $3, assignment_id = $4, student_id = $5 \
                 WHERE id = $1",
            )
            .bind(id)
            .bind(f.score)
            .bind(f.exam_ref())
            .bind(f.assignment_ref())
            .bind(&f.student_id)
            .execute(&mut *conn)
            .await?
        }
        RecordForm::Attendance(f) => {
            sqlx::query(
                "UPDATE attendance SET date = $2, present = $3, student_id = $4, lesson_id = $5 \
                 WHERE id = $1",
            )
            .bind(id)
            .bind(f.date)
            .bind(f.present)
            .bind(&f.student_id)
            .bind(f.lesson_id)
            .execute(&mut *conn)
            .await?
        }
        RecordForm::Event(f) => {
            sqlx::query(
                "UPDATE event SET title = $2, description = $3, start_time = $4, end_time = $5, \
                 class_id = $6 WHERE id = $1",
            )
            .bind(id)
            .bind(&f.title)
            .bind(&f.description)
            .bind(f.start_time)
            .bind(f.end_time)
            .bind(f.class_ref())
            .execute(&mut *conn)
            .await?
        }
        RecordForm::Announcement(f) => {
            sqlx::query(
                "UPDATE announcement SET title = $2, description = $3, date = $4, class_id = $5 \
                 WHERE id = $1",
            )
            .bind(id)
            .bind(&f.title)
            .bind(&f.description)
            .bind(f.date)
            .bind(f.class_ref())
            .execute(&mut *conn)
            .await?
        }
    };
    Ok(result.rows_affected())
}

#[async_trait]
impl RecordStore for PgStore {
    async fn create_record(&self, form: &RecordForm) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let id = insert(&mut tx, form).await.map_err(map_sqlx_error)?;
        if let RecordForm::Subject(subject) = form {
            replace_subject_teachers(&mut tx, id, &subject.teachers).await?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(id)
    }

    async fn update_record(&self, id: i64, form: &RecordForm) -> Result<(), StoreError> {
        let kind = form.kind();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let affected = update(&mut tx, id, form).await.map_err(map_sqlx_error)?;
        if affected == 0 {
            return Err(StoreError::not_found(kind, id));
        }
        if let RecordForm::Subject(subject) = form {
            replace_subject_teachers(&mut tx, id, &subject.teachers).await?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete_record(&self, kind: RecordKind, id: i64) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", table(kind));
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(kind, id));
        }
        Ok(())
    }

    async fn record_lesson(&self, kind: RecordKind, id: i64) -> Result<Option<i64>, StoreError> {
        if !kind.belongs_to_lesson() {
            return Ok(None);
        }
        let sql = format!("SELECT lesson_id FROM {} WHERE id = $1", table(kind));
        sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl LessonOwnership for PgStore {
    async fn lesson_teacher(&self, lesson_id: i64) -> anyhow::Result<Option<String>> {
        let teacher = sqlx::query_scalar("SELECT teacher_id FROM lesson WHERE id = $1")
            .bind(lesson_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(teacher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lesson_kinds_have_lesson_column() {
        let schema = include_str!("../migrations/0001_init.sql");
        for kind in RecordKind::ALL.into_iter().filter(|k| k.belongs_to_lesson()) {
            let header = format!("CREATE TABLE {} (", table(kind));
            let start = schema.find(&header).unwrap();
            let body = &schema[start..];
            let end = body.find(");").unwrap();
            assert!(body[..end].contains("lesson_id"), "{} lacks lesson_id", kind);
        }
    }

    #[test]
    fn test_blank_supervisor_binds_null() {
        assert_eq!(blank_to_null(Some("  ")), None);
        assert_eq!(blank_to_null(Some("t1")), Some("t1"));
    }
}

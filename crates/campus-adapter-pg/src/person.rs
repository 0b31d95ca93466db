use crate::PgStore;
use crate::error::map_sqlx_error;
use async_trait::async_trait;
use campus_core::{ParentForm, PersonForm, PersonKind, StudentForm, TeacherForm};
use campus_runtime::{ClassOccupancy, PersonStore, StoreError};
use sqlx::{PgConnection, Row};

fn table(kind: PersonKind) -> &'static str {
    match kind {
        PersonKind::Teacher => "teacher",
        PersonKind::Student => "student",
        PersonKind::Parent => "parent",
    }
}

/// Lock the class row and fail unless a seat is free. `except` excludes a
/// student already counted (on update).
async fn reserve_seat(
    conn: &mut PgConnection,
    class_id: i64,
    except: Option<&str>,
) -> Result<(), StoreError> {
    let capacity: Option<i32> =
        sqlx::query_scalar("SELECT capacity FROM class WHERE id = $1 FOR UPDATE")
            .bind(class_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
    let Some(capacity) = capacity else {
        return Err(StoreError::CapacityExceeded { class_id });
    };

    let occupants: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM student WHERE class_id = $1 AND ($2::text IS NULL OR id <> $2)",
    )
    .bind(class_id)
    .bind(except)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    let occupancy = ClassOccupancy {
        capacity,
        occupants,
    };
    if !occupancy.has_room() {
        tracing::debug!(class_id, capacity, occupants, "Class full at insert time");
        return Err(StoreError::CapacityExceeded { class_id });
    }
    Ok(())
}

async fn replace_teacher_subjects(
    conn: &mut PgConnection,
    teacher_id: &str,
    subjects: &[i64],
) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM teacher_subject WHERE teacher_id = $1")
        .bind(teacher_id)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    sqlx::query(
        "INSERT INTO teacher_subject (teacher_id, subject_id) \
         SELECT $1, subject_id FROM UNNEST($2::bigint[]) AS s(subject_id) \
         ON CONFLICT DO NOTHING",
    )
    .bind(teacher_id)
    .bind(subjects)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;
    Ok(())
}

async fn insert_teacher(
    conn: &mut PgConnection,
    id: &str,
    f: &TeacherForm,
    email: Option<&str>,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO teacher (id, username, name, surname, email, phone, address, img, \
         blood_type, sex, birthday, password_changed_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now())",
    )
    .bind(id)
    .bind(&f.username)
    .bind(&f.name)
    .bind(&f.surname)
    .bind(email)
    .bind(blank_to_null(f.phone.as_deref()))
    .bind(&f.address)
    .bind(blank_to_null(f.img.as_deref()))
    .bind(&f.blood_type)
    .bind(f.sex.as_str())
    .bind(f.birthday)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;
    replace_teacher_subjects(conn, id, &f.subjects).await
}

async fn insert_student(
    conn: &mut PgConnection,
    id: &str,
    f: &StudentForm,
    email: Option<&str>,
) -> Result<(), StoreError> {
    reserve_seat(conn, f.class_id, None).await?;
    sqlx::query(
        "INSERT INTO student (id, username, name, surname, email, phone, address, img, \
         blood_type, sex, birthday, grade_id, class_id, parent_id, password_changed_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, now())",
    )
    .bind(id)
    .bind(&f.username)
    .bind(&f.name)
    .bind(&f.surname)
    .bind(email)
    .bind(blank_to_null(f.phone.as_deref()))
    .bind(&f.address)
    .bind(blank_to_null(f.img.as_deref()))
    .bind(&f.blood_type)
    .bind(f.sex.as_str())
    .bind(f.birthday)
    .bind(f.grade_id)
    .bind(f.class_id)
    .bind(&f.parent_id)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;
    Ok(())
}

async fn insert_parent(
    conn: &mut PgConnection,
    id: &str,
    f: &ParentForm,
    email: Option<&str>,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO parent (id, username, name, surname, email, phone, address, password_changed_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, now())",
    )
    .bind(id)
    .bind(&f.username)
    .bind(&f.name)
    .bind(&f.surname)
    .bind(email)
    .bind(&f.phone)
    .bind(&f.address)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;
    Ok(())
}

async fn update_teacher(
    conn: &mut PgConnection,
    id: &str,
    f: &TeacherForm,
    email: Option<&str>,
    password_changed: bool,
) -> Result<u64, StoreError> {
    let result = sqlx::query(
        "UPDATE teacher SET username = $2, name = $3, surname = $4, email = $5, phone = $6, \
         address = $7, img = $8, blood_type = $9, sex = $10, birthday = $11, \
         password_changed_at = CASE WHEN $12 THEN now() ELSE password_changed_at END \
         WHERE id = $1",
    )
    .bind(id)
    .bind(&f.username)
    .bind(&f.name)
    .bind(&f.surname)
    .bind(email)
    .bind(blank_to_null(f.phone.as_deref()))
    .bind(&f.address)
    .bind(blank_to_null(f.img.as_deref()))
    .bind(&f.blood_type)
    .bind(f.sex.as_str())
    .bind(f.birthday)
    .bind(password_changed)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;
    if result.rows_affected() > 0 {
        replace_teacher_subjects(conn, id, &f.subjects).await?;
    }
    Ok(result.rows_affected())
}

async fn update_student(
    conn: &mut PgConnection,
    id: &str,
    f: &StudentForm,
    email: Option<&str>,
    password_changed: bool,
) -> Result<u64, StoreError> {
    let current_class: Option<i64> =
        sqlx::query_scalar("SELECT class_id FROM student WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
    if current_class.is_some_and(|c| c != f.class_id) {
        reserve_seat(conn, f.class_id, Some(id)).await?;
    }

    let result = sqlx::query(
        "UPDATE student SET username = $2, name = $3, surname = $4, email = $5, phone = $6, \
         address = $7, img = $8, blood_type = $9, sex = $10, birthday = $11, grade_id = $12, \
         class_id = $13, parent_id = $14, \
         password_changed_at = CASE WHEN $15 THEN now() ELSE password_changed_at END \
         WHERE id = $1",
    )
    .bind(id)
    .bind(&f.username)
    .bind(&f.name)
    .bind(&f.surname)
    .bind(email)
    .bind(blank_to_null(f.phone.as_deref()))
    .bind(&f.address)
    .bind(blank_to_null(f.img.as_deref()))
    .bind(&f.blood_type)
    .bind(f.sex.as_str())
    .bind(f.birthday)
    .bind(f.grade_id)
    .bind(f.class_id)
    .bind(&f.parent_id)
    .bind(password_changed)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;
    Ok(result.rows_affected())
}

async fn update_parent(
    conn: &mut PgConnection,
    id: &str,
    f: &ParentForm,
    email: Option<&str>,
    password_changed: bool,
) -> Result<u64, StoreError> {
    let result = sqlx::query(
        "UPDATE parent SET username = $2, name = $3, surname = $4, email = $5, phone = $6, \
         address = $7, \
         password_changed_at = CASE WHEN $8 THEN now() ELSE password_changed_at END \
         WHERE id = $1",
    )
    .bind(id)
    .bind(&f.username)
    .bind(&f.name)
    .bind(&f.surname)
    .bind(email)
    .bind(&f.phone)
    .bind(&f.address)
    .bind(password_changed)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;
    Ok(result.rows_affected())
}

pub(crate) fn blank_to_null(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[async_trait]
impl PersonStore for PgStore {
    async fn class_occupancy(&self, class_id: i64) -> Result<Option<ClassOccupancy>, StoreError> {
        let row = sqlx::query(
            "SELECT c.capacity, \
             (SELECT COUNT(*) FROM student s WHERE s.class_id = c.id) AS occupants \
             FROM class c WHERE c.id = $1",
        )
        .bind(class_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|row| {
            Ok(ClassOccupancy {
                capacity: row.try_get("capacity").map_err(map_sqlx_error)?,
                occupants: row.try_get("occupants").map_err(map_sqlx_error)?,
            })
        })
        .transpose()
    }

    async fn insert_person(&self, account_id: &str, form: &PersonForm) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let email = form.email();
        match form {
            PersonForm::Teacher(f) => insert_teacher(&mut tx, account_id, f, email).await?,
            PersonForm::Student(f) => insert_student(&mut tx, account_id, f, email).await?,
            PersonForm::Parent(f) => insert_parent(&mut tx, account_id, f, email).await?,
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update_person(
        &self,
        account_id: &str,
        form: &PersonForm,
        password: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let email = form.email();
        let password_changed = password.is_some();
        let affected = match form {
            PersonForm::Teacher(f) => {
                update_teacher(&mut tx, account_id, f, email, password_changed).await?
            }
            PersonForm::Student(f) => {
                update_student(&mut tx, account_id, f, email, password_changed).await?
            }
            PersonForm::Parent(f) => {
                update_parent(&mut tx, account_id, f, email, password_changed).await?
            }
        };
        if affected == 0 {
            return Err(StoreError::not_found(form.kind(), account_id));
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete_person(&self, kind: PersonKind, account_id: &str) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", table(kind));
        let result = sqlx::query(&sql)
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(kind, account_id));
        }
        Ok(())
    }
}

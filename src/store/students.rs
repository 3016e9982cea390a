use std::collections::HashMap;

use sqlx::SqlitePool;

use super::{class_from_row, collect, new_id, student_from_row, year_from_row, NOW};
use crate::error::AppResult;
use crate::types::{ClassWithYear, Student, StudentInput, StudentWithClass};

pub async fn create(pool: &SqlitePool, input: &StudentInput) -> AppResult<Student> {
    let row = sqlx::query(
        r#"INSERT INTO students (
               id, class_id, first_name, last_name, date_of_birth, gender, enrollment_no,
               email, phone, guardian_name, guardian_phone, address)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
           RETURNING *"#,
    )
    .bind(new_id())
    .bind(&input.class_id)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.date_of_birth)
    .bind(input.gender.as_deref())
    .bind(&input.enrollment_no)
    .bind(input.email.as_deref())
    .bind(input.phone.as_deref())
    .bind(&input.guardian_name)
    .bind(&input.guardian_phone)
    .bind(&input.address)
    .fetch_one(pool)
    .await?;
    student_from_row(&row)
}

pub async fn get(pool: &SqlitePool, id: &str) -> AppResult<Option<Student>> {
    let row = sqlx::query("SELECT * FROM students WHERE id = ?1").bind(id).fetch_optional(pool).await?;
    row.as_ref().map(student_from_row).transpose()
}

async fn attach_class(pool: &SqlitePool, student: Student) -> AppResult<Option<StudentWithClass>> {
    let class_row = sqlx::query("SELECT * FROM classes WHERE id = ?1")
        .bind(&student.class_id)
        .fetch_optional(pool)
        .await?;
    let Some(class) = class_row.as_ref().map(class_from_row).transpose()? else {
        return Ok(None);
    };
    let year_row = sqlx::query("SELECT * FROM years WHERE id = ?1")
        .bind(&class.year_id)
        .fetch_optional(pool)
        .await?;
    let Some(year) = year_row.as_ref().map(year_from_row).transpose()? else {
        return Ok(None);
    };
    Ok(Some(StudentWithClass { student, class: ClassWithYear { class, year } }))
}

/// A student with their class and the class's year.
pub async fn get_with_class(pool: &SqlitePool, id: &str) -> AppResult<Option<StudentWithClass>> {
    match get(pool, id).await? {
        Some(student) => attach_class(pool, student).await,
        None => Ok(None),
    }
}

/// All students, newest first, each with class and year.
pub async fn list_with_class(pool: &SqlitePool) -> AppResult<Vec<StudentWithClass>> {
    let rows = sqlx::query("SELECT * FROM students ORDER BY created_at DESC, rowid DESC").fetch_all(pool).await?;
    let classes: HashMap<String, ClassWithYear> = super::classes::list_with_year(pool)
        .await?
        .into_iter()
        .map(|c| (c.class.id.clone(), c))
        .collect();
    let mut out = Vec::with_capacity(rows.len());
    for student in collect(&rows, student_from_row)? {
        if let Some(class) = classes.get(&student.class_id).cloned() {
            out.push(StudentWithClass { student, class });
        }
    }
    Ok(out)
}

pub async fn list_for_class(pool: &SqlitePool, class_id: &str) -> AppResult<Vec<Student>> {
    let rows = sqlx::query("SELECT * FROM students WHERE class_id = ?1 ORDER BY last_name, first_name")
        .bind(class_id)
        .fetch_all(pool)
        .await?;
    collect(&rows, student_from_row)
}

pub async fn update(pool: &SqlitePool, id: &str, input: &StudentInput) -> AppResult<Option<Student>> {
    let sql = format!(
        r#"UPDATE students SET
               class_id = ?1, first_name = ?2, last_name = ?3, date_of_birth = ?4, gender = ?5,
               enrollment_no = ?6, email = ?7, phone = ?8, guardian_name = ?9,
               guardian_phone = ?10, address = ?11, updated_at = {}
           WHERE id = ?12
           RETURNING *"#,
        NOW
    );
    let row = sqlx::query(&sql)
        .bind(&input.class_id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.date_of_birth)
        .bind(input.gender.as_deref())
        .bind(&input.enrollment_no)
        .bind(input.email.as_deref())
        .bind(input.phone.as_deref())
        .bind(&input.guardian_name)
        .bind(&input.guardian_phone)
        .bind(&input.address)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(student_from_row).transpose()
}

pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<bool> {
    let res = sqlx::query("DELETE FROM students WHERE id = ?1").bind(id).execute(pool).await?;
    Ok(res.rows_affected() > 0)
}

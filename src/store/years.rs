use std::collections::HashMap;

use sqlx::SqlitePool;

use super::{class_from_row, collect, in_list, new_id, student_from_row, year_from_row, LEVEL_ORDER, NOW};
use crate::error::AppResult;
use crate::types::{ClassWithStudents, SchoolLevel, Year, YearInput, YearOverview, YearPatch, YearWithClasses};

pub async fn create(pool: &SqlitePool, input: &YearInput) -> AppResult<Year> {
    let row = sqlx::query(
        r#"INSERT INTO years (id, level, year_number, name)
           VALUES (?1, ?2, ?3, ?4)
           RETURNING *"#,
    )
    .bind(new_id())
    .bind(input.level.as_str())
    .bind(input.year_number)
    .bind(&input.name)
    .fetch_one(pool)
    .await?;
    year_from_row(&row)
}

pub async fn get(pool: &SqlitePool, id: &str) -> AppResult<Option<Year>> {
    let row = sqlx::query("SELECT * FROM years WHERE id = ?1").bind(id).fetch_optional(pool).await?;
    row.as_ref().map(year_from_row).transpose()
}

pub async fn find_by_level_number(pool: &SqlitePool, level: SchoolLevel, year_number: i64) -> AppResult<Option<Year>> {
    let row = sqlx::query("SELECT * FROM years WHERE level = ?1 AND year_number = ?2")
        .bind(level.as_str())
        .bind(year_number)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(year_from_row).transpose()
}

/// All years, ordered by level then year number.
pub async fn list(pool: &SqlitePool) -> AppResult<Vec<Year>> {
    let sql = format!("SELECT * FROM years ORDER BY {}, year_number", LEVEL_ORDER);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    collect(&rows, year_from_row)
}

/// Applies the fields present in `patch`; `None` when the year does not exist.
pub async fn update(pool: &SqlitePool, id: &str, patch: &YearPatch) -> AppResult<Option<Year>> {
    let sql = format!(
        r#"UPDATE years SET
               level = COALESCE(?1, level),
               year_number = COALESCE(?2, year_number),
               name = COALESCE(?3, name),
               updated_at = {}
           WHERE id = ?4
           RETURNING *"#,
        NOW
    );
    let row = sqlx::query(&sql)
        .bind(patch.level.map(SchoolLevel::as_str))
        .bind(patch.year_number)
        .bind(patch.name.as_deref())
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(year_from_row).transpose()
}

/// Deletes the year; classes, students, books and distributions go with it.
pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<bool> {
    let res = sqlx::query("DELETE FROM years WHERE id = ?1").bind(id).execute(pool).await?;
    Ok(res.rows_affected() > 0)
}

async fn classes_with_students(pool: &SqlitePool, year_ids: &[String]) -> AppResult<HashMap<String, Vec<ClassWithStudents>>> {
    let mut by_year: HashMap<String, Vec<ClassWithStudents>> = HashMap::new();
    if year_ids.is_empty() {
        return Ok(by_year);
    }

    let class_rows = in_list("SELECT * FROM classes WHERE year_id IN ", year_ids, " ORDER BY name")
        .build()
        .fetch_all(pool)
        .await?;
    let classes = collect(&class_rows, class_from_row)?;

    let student_rows = in_list(
        "SELECT s.* FROM students s JOIN classes c ON c.id = s.class_id WHERE c.year_id IN ",
        year_ids,
        " ORDER BY s.last_name, s.first_name",
    )
    .build()
    .fetch_all(pool)
    .await?;

    let mut students_by_class: HashMap<String, Vec<_>> = HashMap::new();
    for s in collect(&student_rows, student_from_row)? {
        students_by_class.entry(s.class_id.clone()).or_default().push(s);
    }

    for class in classes {
        let students = students_by_class.remove(&class.id).unwrap_or_default();
        by_year.entry(class.year_id.clone()).or_default().push(ClassWithStudents { class, students });
    }
    Ok(by_year)
}

/// Every year with its classes and their students.
pub async fn list_with_classes_and_students(pool: &SqlitePool) -> AppResult<Vec<YearWithClasses>> {
    let years = list(pool).await?;
    let ids: Vec<String> = years.iter().map(|y| y.id.clone()).collect();
    let mut classes = classes_with_students(pool, &ids).await?;
    Ok(years
        .into_iter()
        .map(|year| {
            let classes = classes.remove(&year.id).unwrap_or_default();
            YearWithClasses { year, classes }
        })
        .collect())
}

/// One year addressed by `(level, year_number)`, with classes and students.
pub async fn find_with_classes(
    pool: &SqlitePool,
    level: SchoolLevel,
    year_number: i64,
) -> AppResult<Option<YearWithClasses>> {
    let Some(year) = find_by_level_number(pool, level, year_number).await? else {
        return Ok(None);
    };
    let mut classes = classes_with_students(pool, std::slice::from_ref(&year.id)).await?;
    let classes = classes.remove(&year.id).unwrap_or_default();
    Ok(Some(YearWithClasses { year, classes }))
}

/// Years with their summed student counts, for the levels overview.
pub async fn overview(pool: &SqlitePool) -> AppResult<Vec<YearOverview>> {
    Ok(list_with_classes_and_students(pool)
        .await?
        .into_iter()
        .map(|y| {
            let students_count = y.classes.iter().map(|c| c.students.len() as i64).sum();
            YearOverview { year: y.year, students_count }
        })
        .collect())
}

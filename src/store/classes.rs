use std::collections::HashMap;

use sqlx::{Row, SqlitePool};

use super::{book_from_row, class_from_row, collect, new_id, student_from_row, year_from_row, NOW};
use crate::error::{AppError, AppResult};
use crate::types::{
    Class, ClassInput, ClassRoster, ClassWithYear, DistributionStatus, DistributionSummary, SchoolLevel,
    StudentWithDistributions, YearWithBooks,
};

pub async fn create(pool: &SqlitePool, input: &ClassInput) -> AppResult<Class> {
    let row = sqlx::query(
        r#"INSERT INTO classes (id, year_id, name, section, capacity, room_number)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           RETURNING *"#,
    )
    .bind(new_id())
    .bind(&input.year_id)
    .bind(&input.name)
    .bind(&input.section)
    .bind(input.capacity)
    .bind(input.room_number.as_deref())
    .fetch_one(pool)
    .await?;
    class_from_row(&row)
}

pub async fn get(pool: &SqlitePool, id: &str) -> AppResult<Option<Class>> {
    let row = sqlx::query("SELECT * FROM classes WHERE id = ?1").bind(id).fetch_optional(pool).await?;
    row.as_ref().map(class_from_row).transpose()
}

/// All classes with their year, ordered by name.
pub async fn list_with_year(pool: &SqlitePool) -> AppResult<Vec<ClassWithYear>> {
    let class_rows = sqlx::query("SELECT * FROM classes ORDER BY name").fetch_all(pool).await?;
    let year_rows = sqlx::query("SELECT * FROM years").fetch_all(pool).await?;
    let years: HashMap<String, _> =
        collect(&year_rows, year_from_row)?.into_iter().map(|y| (y.id.clone(), y)).collect();

    let mut out = Vec::with_capacity(class_rows.len());
    for class in collect(&class_rows, class_from_row)? {
        // Every class references an existing year (FK), so a miss means a concurrent delete.
        if let Some(year) = years.get(&class.year_id).cloned() {
            out.push(ClassWithYear { class, year });
        }
    }
    Ok(out)
}

pub async fn update(pool: &SqlitePool, id: &str, input: &ClassInput) -> AppResult<Option<Class>> {
    let sql = format!(
        r#"UPDATE classes SET
               year_id = ?1, name = ?2, section = ?3, capacity = ?4, room_number = ?5,
               updated_at = {}
           WHERE id = ?6
           RETURNING *"#,
        NOW
    );
    let row = sqlx::query(&sql)
        .bind(&input.year_id)
        .bind(&input.name)
        .bind(&input.section)
        .bind(input.capacity)
        .bind(input.room_number.as_deref())
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(class_from_row).transpose()
}

/// Deletes the class and, by cascade, its students and their distributions.
pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<bool> {
    let res = sqlx::query("DELETE FROM classes WHERE id = ?1").bind(id).execute(pool).await?;
    Ok(res.rows_affected() > 0)
}

/// Restricts a roster load either to one level or to one class.
#[derive(Debug, Clone, Copy)]
enum RosterScope<'a> {
    Level(SchoolLevel),
    Class(&'a str),
}

impl RosterScope<'_> {
    fn predicate(&self) -> &'static str {
        match self {
            RosterScope::Level(_) => "y.level = ?1",
            RosterScope::Class(_) => "c.id = ?1",
        }
    }

    fn value(&self) -> &str {
        match self {
            RosterScope::Level(level) => level.as_str(),
            RosterScope::Class(id) => id,
        }
    }
}

async fn load_rosters(pool: &SqlitePool, scope: RosterScope<'_>) -> AppResult<Vec<ClassRoster>> {
    let pred = scope.predicate();

    let sql = format!(
        "SELECT c.* FROM classes c JOIN years y ON y.id = c.year_id WHERE {} ORDER BY c.name",
        pred
    );
    let class_rows = sqlx::query(&sql).bind(scope.value()).fetch_all(pool).await?;
    let classes = collect(&class_rows, class_from_row)?;
    if classes.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT DISTINCT y.* FROM years y JOIN classes c ON c.year_id = y.id WHERE {}",
        pred
    );
    let year_rows = sqlx::query(&sql).bind(scope.value()).fetch_all(pool).await?;
    let years = collect(&year_rows, year_from_row)?;

    let sql = format!(
        r#"SELECT DISTINCT b.* FROM books b
           JOIN years y ON y.id = b.year_id
           JOIN classes c ON c.year_id = y.id
           WHERE {}
           ORDER BY b.title"#,
        pred
    );
    let book_rows = sqlx::query(&sql).bind(scope.value()).fetch_all(pool).await?;
    let mut books_by_year: HashMap<String, Vec<_>> = HashMap::new();
    for b in collect(&book_rows, book_from_row)? {
        books_by_year.entry(b.year_id.clone()).or_default().push(b);
    }

    let sql = format!(
        r#"SELECT s.* FROM students s
           JOIN classes c ON c.id = s.class_id
           JOIN years y ON y.id = c.year_id
           WHERE {}
           ORDER BY s.last_name, s.first_name"#,
        pred
    );
    let student_rows = sqlx::query(&sql).bind(scope.value()).fetch_all(pool).await?;

    let sql = format!(
        r#"SELECT d.student_id, d.book_id, d.status FROM book_distributions d
           JOIN students s ON s.id = d.student_id
           JOIN classes c ON c.id = s.class_id
           JOIN years y ON y.id = c.year_id
           WHERE {}"#,
        pred
    );
    let dist_rows = sqlx::query(&sql).bind(scope.value()).fetch_all(pool).await?;
    let mut dists_by_student: HashMap<String, Vec<DistributionSummary>> = HashMap::new();
    for r in &dist_rows {
        let student_id: String = r.try_get("student_id")?;
        let status: String = r.try_get("status")?;
        let status = status.parse::<DistributionStatus>().map_err(AppError::Database)?;
        dists_by_student
            .entry(student_id)
            .or_default()
            .push(DistributionSummary { book_id: r.try_get("book_id")?, status });
    }

    let mut students_by_class: HashMap<String, Vec<StudentWithDistributions>> = HashMap::new();
    for student in collect(&student_rows, student_from_row)? {
        let book_distributions = dists_by_student.remove(&student.id).unwrap_or_default();
        students_by_class
            .entry(student.class_id.clone())
            .or_default()
            .push(StudentWithDistributions { student, book_distributions });
    }

    let years: HashMap<String, _> = years.into_iter().map(|y| (y.id.clone(), y)).collect();
    let mut rosters = Vec::with_capacity(classes.len());
    for class in classes {
        let Some(year) = years.get(&class.year_id).cloned() else {
            continue;
        };
        let books = books_by_year.get(&class.year_id).cloned().unwrap_or_default();
        let students = students_by_class.remove(&class.id).unwrap_or_default();
        rosters.push(ClassRoster { class, year: YearWithBooks { year, books }, students });
    }
    Ok(rosters)
}

/// Classes of every year in `level`, each with the year's books and the
/// students' persisted distributions.
pub async fn list_by_level_with_roster(pool: &SqlitePool, level: SchoolLevel) -> AppResult<Vec<ClassRoster>> {
    load_rosters(pool, RosterScope::Level(level)).await
}

/// The roster of a single class.
pub async fn roster(pool: &SqlitePool, class_id: &str) -> AppResult<Option<ClassRoster>> {
    Ok(load_rosters(pool, RosterScope::Class(class_id)).await?.into_iter().next())
}

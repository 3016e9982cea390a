//! Read-side loaders used by the distribution workflow and the `GET` routes.
//!
//! Every loader logs a failed query and returns an empty collection or `None`
//! instead of an error, so "nothing there" and "could not read" look the same
//! to callers.

use std::collections::BTreeMap;

use sqlx::SqlitePool;

use crate::error::AppResult;
use crate::store;
use crate::types::{
    Book, BookWithYear, ClassRoster, ClassWithYear, SchoolLevel, StudentWithClass, Year, YearOverview,
    YearWithClasses,
};

fn or_empty<T: Default>(what: &str, res: AppResult<T>) -> T {
    match res {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load {}", what);
            T::default()
        }
    }
}

fn or_none<T>(what: &str, res: AppResult<Option<T>>) -> Option<T> {
    or_empty(what, res)
}

/// Classes of a level with their year, the year's books and every student's distributions.
pub async fn classes_by_level(pool: &SqlitePool, level: SchoolLevel) -> Vec<ClassRoster> {
    or_empty("classes by level", store::classes::list_by_level_with_roster(pool, level).await)
}

/// Years grouped by level, each with the number of enrolled students.
///
/// Every level is present in the map, possibly with an empty list.
pub async fn levels_overview(pool: &SqlitePool) -> BTreeMap<SchoolLevel, Vec<YearOverview>> {
    let mut grouped: BTreeMap<SchoolLevel, Vec<YearOverview>> =
        SchoolLevel::ALL.iter().map(|l| (*l, Vec::new())).collect();
    for y in or_empty("levels overview", store::years::overview(pool).await) {
        grouped.entry(y.year.level).or_default().push(y);
    }
    grouped
}

pub async fn year_classes(pool: &SqlitePool, level: SchoolLevel, year_number: i64) -> Option<YearWithClasses> {
    or_none("year classes", store::years::find_with_classes(pool, level, year_number).await)
}

pub async fn years(pool: &SqlitePool) -> Vec<Year> {
    or_empty("years", store::years::list(pool).await)
}

pub async fn books(pool: &SqlitePool) -> Vec<BookWithYear> {
    or_empty("books", store::books::list_with_year(pool).await)
}

pub async fn book_by_id(pool: &SqlitePool, id: &str) -> Option<Book> {
    or_none("book", store::books::get(pool, id).await)
}

pub async fn students(pool: &SqlitePool) -> Vec<StudentWithClass> {
    or_empty("students", store::students::list_with_class(pool).await)
}

pub async fn student_by_id(pool: &SqlitePool, id: &str) -> Option<StudentWithClass> {
    or_none("student", store::students::get_with_class(pool, id).await)
}

/// Classes with their year, for the student form's class picker.
pub async fn classes(pool: &SqlitePool) -> Vec<ClassWithYear> {
    or_empty("classes", store::classes::list_with_year(pool).await)
}

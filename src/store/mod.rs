//! Typed data access over the SQLite schema created by [`crate::db::init_db`].
//!
//! Each submodule owns one table. Reads and writes both return `AppResult`;
//! the "swallow read failures" policy lives one layer up in [`crate::loaders`].
//! Relational includes (year → classes → students → distributions) are
//! assembled in Rust from a handful of flat queries rather than wide joins.

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use crate::error::{AppError, AppResult};
use crate::types::{Book, BookDistribution, Class, DistributionStatus, SchoolLevel, Student, Year};

pub mod books;
pub mod classes;
pub mod distributions;
pub mod students;
pub mod years;

/// SQL expression for the current UTC time, matching the column defaults.
pub(crate) const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ','now')";

/// Sort key that orders levels ELEMENTARY < MIDDLE < HIGH instead of alphabetically.
pub(crate) const LEVEL_ORDER: &str =
    "CASE level WHEN 'ELEMENTARY' THEN 0 WHEN 'MIDDLE' THEN 1 WHEN 'HIGH' THEN 2 ELSE 3 END";

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn parse_column<T: std::str::FromStr<Err = String>>(raw: String) -> AppResult<T> {
    raw.parse::<T>().map_err(AppError::Database)
}

pub(crate) fn year_from_row(r: &SqliteRow) -> AppResult<Year> {
    Ok(Year {
        id: r.try_get("id")?,
        level: parse_column::<SchoolLevel>(r.try_get("level")?)?,
        year_number: r.try_get("year_number")?,
        name: r.try_get("name")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

pub(crate) fn class_from_row(r: &SqliteRow) -> AppResult<Class> {
    Ok(Class {
        id: r.try_get("id")?,
        year_id: r.try_get("year_id")?,
        name: r.try_get("name")?,
        section: r.try_get("section")?,
        capacity: r.try_get("capacity")?,
        room_number: r.try_get("room_number")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

pub(crate) fn student_from_row(r: &SqliteRow) -> AppResult<Student> {
    Ok(Student {
        id: r.try_get("id")?,
        class_id: r.try_get("class_id")?,
        first_name: r.try_get("first_name")?,
        last_name: r.try_get("last_name")?,
        date_of_birth: r.try_get("date_of_birth")?,
        gender: r.try_get("gender")?,
        enrollment_no: r.try_get("enrollment_no")?,
        email: r.try_get("email")?,
        phone: r.try_get("phone")?,
        guardian_name: r.try_get("guardian_name")?,
        guardian_phone: r.try_get("guardian_phone")?,
        address: r.try_get("address")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

pub(crate) fn book_from_row(r: &SqliteRow) -> AppResult<Book> {
    Ok(Book {
        id: r.try_get("id")?,
        year_id: r.try_get("year_id")?,
        title: r.try_get("title")?,
        author: r.try_get("author")?,
        isbn: r.try_get("isbn")?,
        subject: r.try_get("subject")?,
        publisher: r.try_get("publisher")?,
        published_year: r.try_get("published_year")?,
        edition: r.try_get("edition")?,
        total_quantity: r.try_get("total_quantity")?,
        available_qty: r.try_get("available_qty")?,
        issued_qty: r.try_get("issued_qty")?,
        description: r.try_get("description")?,
        cover_image: r.try_get("cover_image")?,
        cover_image_public_id: r.try_get("cover_image_public_id")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

pub(crate) fn distribution_from_row(r: &SqliteRow) -> AppResult<BookDistribution> {
    Ok(BookDistribution {
        id: r.try_get("id")?,
        student_id: r.try_get("student_id")?,
        book_id: r.try_get("book_id")?,
        status: parse_column::<DistributionStatus>(r.try_get("status")?)?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

pub(crate) fn collect<T>(rows: &[SqliteRow], map: fn(&SqliteRow) -> AppResult<T>) -> AppResult<Vec<T>> {
    rows.iter().map(map).collect()
}

/// Builds `{head}(?, ?, ...){tail}` with one bound parameter per id.
pub(crate) fn in_list<'a>(head: &str, ids: &'a [String], tail: &str) -> QueryBuilder<'a, Sqlite> {
    let mut qb = QueryBuilder::<Sqlite>::new(head);
    qb.push("(");
    {
        let mut sep = qb.separated(", ");
        for id in ids {
            sep.push_bind(id.as_str());
        }
    }
    qb.push(")");
    qb.push(tail);
    qb
}

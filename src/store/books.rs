use std::collections::HashMap;

use sqlx::SqlitePool;

use super::{book_from_row, collect, new_id, year_from_row, NOW};
use crate::error::AppResult;
use crate::types::{Book, BookInput, BookWithYear, Year};

pub async fn create(pool: &SqlitePool, input: &BookInput) -> AppResult<Book> {
    let row = sqlx::query(
        r#"INSERT INTO books (
               id, year_id, title, author, isbn, subject, publisher, published_year, edition,
               total_quantity, available_qty, issued_qty, description, cover_image, cover_image_public_id)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
           RETURNING *"#,
    )
    .bind(new_id())
    .bind(&input.year_id)
    .bind(&input.title)
    .bind(input.author.as_deref())
    .bind(input.isbn.as_deref())
    .bind(input.subject.as_deref())
    .bind(input.publisher.as_deref())
    .bind(input.published_year)
    .bind(input.edition.as_deref())
    .bind(input.total_quantity)
    .bind(input.available_qty)
    .bind(input.issued_qty)
    .bind(input.description.as_deref())
    .bind(input.cover_image.as_deref())
    .bind(input.cover_image_public_id.as_deref())
    .fetch_one(pool)
    .await?;
    book_from_row(&row)
}

pub async fn get(pool: &SqlitePool, id: &str) -> AppResult<Option<Book>> {
    let row = sqlx::query("SELECT * FROM books WHERE id = ?1").bind(id).fetch_optional(pool).await?;
    row.as_ref().map(book_from_row).transpose()
}

/// All books, newest first, each with its year.
pub async fn list_with_year(pool: &SqlitePool) -> AppResult<Vec<BookWithYear>> {
    let rows = sqlx::query("SELECT * FROM books ORDER BY created_at DESC, rowid DESC").fetch_all(pool).await?;
    let year_rows = sqlx::query("SELECT * FROM years").fetch_all(pool).await?;
    let years: HashMap<String, Year> =
        collect(&year_rows, year_from_row)?.into_iter().map(|y| (y.id.clone(), y)).collect();
    let mut out = Vec::with_capacity(rows.len());
    for book in collect(&rows, book_from_row)? {
        if let Some(year) = years.get(&book.year_id).cloned() {
            out.push(BookWithYear { book, year });
        }
    }
    Ok(out)
}

pub async fn list_for_year(pool: &SqlitePool, year_id: &str) -> AppResult<Vec<Book>> {
    let rows = sqlx::query("SELECT * FROM books WHERE year_id = ?1 ORDER BY title")
        .bind(year_id)
        .fetch_all(pool)
        .await?;
    collect(&rows, book_from_row)
}

pub async fn update(pool: &SqlitePool, id: &str, input: &BookInput) -> AppResult<Option<Book>> {
    let sql = format!(
        r#"UPDATE books SET
               year_id = ?1, title = ?2, author = ?3, isbn = ?4, subject = ?5, publisher = ?6,
               published_year = ?7, edition = ?8, total_quantity = ?9, available_qty = ?10,
               issued_qty = ?11, description = ?12, cover_image = ?13, cover_image_public_id = ?14,
               updated_at = {}
           WHERE id = ?15
           RETURNING *"#,
        NOW
    );
    let row = sqlx::query(&sql)
        .bind(&input.year_id)
        .bind(&input.title)
        .bind(input.author.as_deref())
        .bind(input.isbn.as_deref())
        .bind(input.subject.as_deref())
        .bind(input.publisher.as_deref())
        .bind(input.published_year)
        .bind(input.edition.as_deref())
        .bind(input.total_quantity)
        .bind(input.available_qty)
        .bind(input.issued_qty)
        .bind(input.description.as_deref())
        .bind(input.cover_image.as_deref())
        .bind(input.cover_image_public_id.as_deref())
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(book_from_row).transpose()
}

/// Deletes the book and, by cascade, every distribution row for it.
pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<bool> {
    let res = sqlx::query("DELETE FROM books WHERE id = ?1").bind(id).execute(pool).await?;
    Ok(res.rows_affected() > 0)
}

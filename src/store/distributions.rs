use sqlx::SqlitePool;

use super::{collect, distribution_from_row, new_id, NOW};
use crate::error::AppResult;
use crate::types::{BookDistribution, DistributionInput};

/// Upserts every triple inside a single transaction.
///
/// A row for an existing `(student_id, book_id)` pair keeps its id and
/// `created_at` and only has `status`/`updated_at` replaced. Rows come back in
/// input order. If any statement fails the transaction is dropped without
/// commit, so nothing from the batch is persisted.
pub async fn upsert_batch(pool: &SqlitePool, batch: &[DistributionInput]) -> AppResult<Vec<BookDistribution>> {
    if batch.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        r#"INSERT INTO book_distributions (id, student_id, book_id, status)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(student_id, book_id) DO UPDATE SET
               status = excluded.status,
               updated_at = {}
           RETURNING *"#,
        NOW
    );

    let mut tx = pool.begin().await?;
    let mut out = Vec::with_capacity(batch.len());
    for item in batch {
        let row = sqlx::query(&sql)
            .bind(new_id())
            .bind(&item.student_id)
            .bind(&item.book_id)
            .bind(item.status.as_str())
            .fetch_one(&mut *tx)
            .await?;
        out.push(distribution_from_row(&row)?);
    }
    tx.commit().await?;

    tracing::debug!(rows = out.len(), "distribution batch committed");
    Ok(out)
}

pub async fn get(pool: &SqlitePool, student_id: &str, book_id: &str) -> AppResult<Option<BookDistribution>> {
    let row = sqlx::query("SELECT * FROM book_distributions WHERE student_id = ?1 AND book_id = ?2")
        .bind(student_id)
        .bind(book_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(distribution_from_row).transpose()
}

pub async fn for_student(pool: &SqlitePool, student_id: &str) -> AppResult<Vec<BookDistribution>> {
    let rows = sqlx::query("SELECT * FROM book_distributions WHERE student_id = ?1 ORDER BY created_at, rowid")
        .bind(student_id)
        .fetch_all(pool)
        .await?;
    collect(&rows, distribution_from_row)
}

/// Every distribution row for students of `class_id`.
pub async fn for_class(pool: &SqlitePool, class_id: &str) -> AppResult<Vec<BookDistribution>> {
    let rows = sqlx::query(
        r#"SELECT d.* FROM book_distributions d
           JOIN students s ON s.id = d.student_id
           WHERE s.class_id = ?1
           ORDER BY d.created_at, d.rowid"#,
    )
    .bind(class_id)
    .fetch_all(pool)
    .await?;
    collect(&rows, distribution_from_row)
}

pub async fn count(pool: &SqlitePool) -> AppResult<i64> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_distributions").fetch_one(pool).await?;
    Ok(n)
}

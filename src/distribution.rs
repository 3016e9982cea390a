//! Book distribution reconciliation.
//!
//! The operator's toggles live in an [`OverrideMap`]; what the database already
//! holds for the class lives in a [`PersistedSnapshot`]. The *effective* status
//! of a pair is the override if present, else the persisted value, else
//! `PENDING`. Submitting a class turns every (student × selected book) pair
//! into a [`DistributionInput`] and upserts the whole batch in one transaction.

use std::collections::HashMap;
use std::fmt;

use sqlx::SqlitePool;

use crate::error::AppResult;
use crate::store;
use crate::types::{BookDistribution, DistributionInput, DistributionStatus, StudentWithDistributions};

impl DistributionStatus {
    /// PENDING → RECEIVED → NOT_RECEIVED → PENDING.
    pub fn next(self) -> Self {
        match self {
            DistributionStatus::Pending => DistributionStatus::Received,
            DistributionStatus::Received => DistributionStatus::NotReceived,
            DistributionStatus::NotReceived => DistributionStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub student_id: String,
    pub book_id: String,
}

impl PairKey {
    pub fn new(student_id: impl Into<String>, book_id: impl Into<String>) -> Self {
        Self { student_id: student_id.into(), book_id: book_id.into() }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.student_id, self.book_id)
    }
}

/// Statuses set locally by the operator, not yet submitted.
pub type OverrideMap = HashMap<PairKey, DistributionStatus>;

/// Statuses already stored for a class roster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedSnapshot {
    statuses: HashMap<PairKey, DistributionStatus>,
}

impl PersistedSnapshot {
    pub fn from_students(students: &[StudentWithDistributions]) -> Self {
        let statuses = students
            .iter()
            .flat_map(|s| {
                s.book_distributions
                    .iter()
                    .map(move |d| (PairKey::new(s.student.id.as_str(), d.book_id.as_str()), d.status))
            })
            .collect();
        Self { statuses }
    }

    pub fn get(&self, key: &PairKey) -> Option<DistributionStatus> {
        self.statuses.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

impl FromIterator<(PairKey, DistributionStatus)> for PersistedSnapshot {
    fn from_iter<I: IntoIterator<Item = (PairKey, DistributionStatus)>>(iter: I) -> Self {
        Self { statuses: iter.into_iter().collect() }
    }
}

pub fn effective_status(
    overrides: &OverrideMap,
    persisted: &PersistedSnapshot,
    student_id: &str,
    book_id: &str,
) -> DistributionStatus {
    let key = PairKey::new(student_id, book_id);
    overrides.get(&key).copied().or_else(|| persisted.get(&key)).unwrap_or_default()
}

/// Advances the pair one step from its effective status and returns the new value.
pub fn toggle(
    overrides: &mut OverrideMap,
    persisted: &PersistedSnapshot,
    student_id: &str,
    book_id: &str,
) -> DistributionStatus {
    let next = effective_status(overrides, persisted, student_id, book_id).next();
    overrides.insert(PairKey::new(student_id, book_id), next);
    next
}

/// Marks every (student × selected book) pair RECEIVED. Other keys are left alone.
pub fn mark_all_received(overrides: &mut OverrideMap, students: &[StudentWithDistributions], selected_books: &[String]) {
    for s in students {
        for book_id in selected_books {
            overrides.insert(PairKey::new(s.student.id.as_str(), book_id.as_str()), DistributionStatus::Received);
        }
    }
}

/// Received count over selected book count for one student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub received: usize,
    pub total: usize,
}

impl Progress {
    /// `None` when no book is selected.
    pub fn fraction(&self) -> Option<f64> {
        (self.total > 0).then(|| self.received as f64 / self.total as f64)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.received, self.total)
    }
}

pub fn student_progress(
    student_id: &str,
    selected_books: &[String],
    overrides: &OverrideMap,
    persisted: &PersistedSnapshot,
) -> Progress {
    let received = selected_books
        .iter()
        .filter(|b| effective_status(overrides, persisted, student_id, b) == DistributionStatus::Received)
        .count();
    Progress { received, total: selected_books.len() }
}

/// One triple per (student × selected book), in roster order then selection order.
pub fn build_batch(
    students: &[StudentWithDistributions],
    selected_books: &[String],
    overrides: &OverrideMap,
    persisted: &PersistedSnapshot,
) -> Vec<DistributionInput> {
    let mut batch = Vec::with_capacity(students.len() * selected_books.len());
    for s in students {
        for book_id in selected_books {
            batch.push(DistributionInput {
                student_id: s.student.id.clone(),
                book_id: book_id.clone(),
                status: effective_status(overrides, persisted, &s.student.id, book_id),
            });
        }
    }
    batch
}

/// Persists a validated batch atomically. Re-submitting the same batch is a no-op
/// apart from `updated_at`.
pub async fn reconcile(pool: &SqlitePool, batch: &[DistributionInput]) -> AppResult<Vec<BookDistribution>> {
    if batch.is_empty() {
        return Ok(Vec::new());
    }
    let rows = store::distributions::upsert_batch(pool, batch).await?;
    tracing::info!(rows = rows.len(), "Reconciled distribution batch");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures;
    use crate::types::{DistributionSummary, SchoolLevel};

    fn roster_student(id: &str, dists: &[(&str, DistributionStatus)]) -> StudentWithDistributions {
        StudentWithDistributions {
            student: fixtures::student_value(id, "c1"),
            book_distributions: dists
                .iter()
                .map(|(b, status)| DistributionSummary { book_id: b.to_string(), status: *status })
                .collect(),
        }
    }

    fn books(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn status_cycle_has_period_three() {
        for s in DistributionStatus::ALL {
            assert_ne!(s.next(), s);
            assert_eq!(s.next().next().next(), s);
        }
        assert_eq!(DistributionStatus::Pending.next(), DistributionStatus::Received);
        assert_eq!(DistributionStatus::Received.next(), DistributionStatus::NotReceived);
    }

    #[test]
    fn pair_key_display() {
        assert_eq!(PairKey::new("s1", "b1").to_string(), "s1-b1");
    }

    #[test]
    fn override_beats_persisted_beats_default() {
        let students = vec![roster_student("s1", &[("b1", DistributionStatus::NotReceived)])];
        let persisted = PersistedSnapshot::from_students(&students);
        let mut overrides = OverrideMap::new();

        assert_eq!(effective_status(&overrides, &persisted, "s1", "b1"), DistributionStatus::NotReceived);
        assert_eq!(effective_status(&overrides, &persisted, "s1", "b2"), DistributionStatus::Pending);

        overrides.insert(PairKey::new("s1", "b1"), DistributionStatus::Received);
        assert_eq!(effective_status(&overrides, &persisted, "s1", "b1"), DistributionStatus::Received);
    }

    #[test]
    fn toggle_advances_from_effective_status() {
        let students = vec![roster_student("s1", &[("b1", DistributionStatus::Received)])];
        let persisted = PersistedSnapshot::from_students(&students);
        let mut overrides = OverrideMap::new();

        assert_eq!(toggle(&mut overrides, &persisted, "s1", "b1"), DistributionStatus::NotReceived);
        assert_eq!(toggle(&mut overrides, &persisted, "s1", "b1"), DistributionStatus::Pending);
        assert_eq!(toggle(&mut overrides, &persisted, "s1", "b2"), DistributionStatus::Received);
    }

    #[test]
    fn mark_all_only_touches_selected_books() {
        let students = vec![roster_student("s1", &[]), roster_student("s2", &[])];
        let mut overrides = OverrideMap::new();
        overrides.insert(PairKey::new("s1", "b3"), DistributionStatus::NotReceived);

        mark_all_received(&mut overrides, &students, &books(&["b1", "b2"]));

        assert_eq!(overrides.len(), 5);
        assert_eq!(overrides[&PairKey::new("s1", "b3")], DistributionStatus::NotReceived);
        assert_eq!(overrides[&PairKey::new("s2", "b2")], DistributionStatus::Received);
    }

    #[test]
    fn progress_counts_effective_received() {
        let students = vec![roster_student("s1", &[("b1", DistributionStatus::Received)])];
        let persisted = PersistedSnapshot::from_students(&students);
        let mut overrides = OverrideMap::new();
        overrides.insert(PairKey::new("s1", "b2"), DistributionStatus::Received);
        overrides.insert(PairKey::new("s1", "b3"), DistributionStatus::NotReceived);

        let p = student_progress("s1", &books(&["b1", "b2", "b3", "b4"]), &overrides, &persisted);
        assert_eq!(p, Progress { received: 2, total: 4 });
        assert_eq!(p.fraction(), Some(0.5));
        assert_eq!(p.to_string(), "2/4");
    }

    #[test]
    fn progress_with_no_books_has_no_fraction() {
        let p = student_progress("s1", &[], &OverrideMap::new(), &PersistedSnapshot::default());
        assert_eq!(p.to_string(), "0/0");
        assert_eq!(p.fraction(), None);
    }

    #[test]
    fn batch_follows_roster_then_selection_order() {
        let students = vec![roster_student("s2", &[("b1", DistributionStatus::Received)]), roster_student("s1", &[])];
        let persisted = PersistedSnapshot::from_students(&students);
        let batch = build_batch(&students, &books(&["b2", "b1"]), &OverrideMap::new(), &persisted);

        let pairs: Vec<_> = batch.iter().map(|d| (d.student_id.as_str(), d.book_id.as_str(), d.status)).collect();
        assert_eq!(
            pairs,
            vec![
                ("s2", "b2", DistributionStatus::Pending),
                ("s2", "b1", DistributionStatus::Received),
                ("s1", "b2", DistributionStatus::Pending),
                ("s1", "b1", DistributionStatus::Pending),
            ]
        );
    }

    #[tokio::test]
    async fn elementary_class_marked_received_persists_six_rows() {
        let pool = crate::db::connect_in_memory().await.unwrap();
        let year = fixtures::year(&pool, SchoolLevel::Elementary, 1).await;
        let class = fixtures::class(&pool, &year.id, "1A").await;
        for n in 0..3 {
            fixtures::student(&pool, &class.id, &format!("E-{}", n)).await;
        }
        let b1 = fixtures::book(&pool, &year.id, "Reader").await;
        let b2 = fixtures::book(&pool, &year.id, "Numbers").await;

        let roster = store::classes::roster(&pool, &class.id).await.unwrap().unwrap();
        let selected = vec![b1.id.clone(), b2.id.clone()];
        let persisted = PersistedSnapshot::from_students(&roster.students);
        let mut overrides = OverrideMap::new();
        mark_all_received(&mut overrides, &roster.students, &selected);

        let batch = build_batch(&roster.students, &selected, &overrides, &persisted);
        let rows = reconcile(&pool, &batch).await.unwrap();

        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|r| r.status == DistributionStatus::Received));
        assert_eq!(store::distributions::for_class(&pool, &class.id).await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn double_submit_is_idempotent() {
        let pool = crate::db::connect_in_memory().await.unwrap();
        let year = fixtures::year(&pool, SchoolLevel::High, 10).await;
        let class = fixtures::class(&pool, &year.id, "10B").await;
        let s = fixtures::student(&pool, &class.id, "H-1").await;
        let b = fixtures::book(&pool, &year.id, "Chemistry").await;

        let batch = vec![DistributionInput {
            student_id: s.id.clone(),
            book_id: b.id.clone(),
            status: DistributionStatus::NotReceived,
        }];
        let first = reconcile(&pool, &batch).await.unwrap();
        let second = reconcile(&pool, &batch).await.unwrap();

        assert_eq!(first[0].id, second[0].id);
        assert_eq!(first[0].created_at, second[0].created_at);
        assert_eq!(store::distributions::count(&pool).await.unwrap(), 1);
        let stored = store::distributions::get(&pool, &s.id, &b.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DistributionStatus::NotReceived);
    }

    #[tokio::test]
    async fn failing_row_rolls_back_whole_batch() {
        let pool = crate::db::connect_in_memory().await.unwrap();
        let year = fixtures::year(&pool, SchoolLevel::Middle, 6).await;
        let class = fixtures::class(&pool, &year.id, "6C").await;
        let s = fixtures::student(&pool, &class.id, "M-1").await;
        let b = fixtures::book(&pool, &year.id, "Atlas").await;

        let batch = vec![
            DistributionInput { student_id: s.id.clone(), book_id: b.id.clone(), status: DistributionStatus::Received },
            DistributionInput {
                student_id: s.id.clone(),
                book_id: "no-such-book".into(),
                status: DistributionStatus::Received,
            },
        ];
        assert!(reconcile(&pool, &batch).await.is_err());
        assert_eq!(store::distributions::count(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_batch_touches_nothing() {
        let pool = crate::db::connect_in_memory().await.unwrap();
        assert!(reconcile(&pool, &[]).await.unwrap().is_empty());
    }
}

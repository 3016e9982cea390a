//! Stepwise book distribution form.
//!
//! [`DistributionForm`] holds the operator's selection: level, class, books and
//! per-cell status overrides. [`DistributionForm::apply`] is a pure transition
//! from `(state, event)` to the next state plus at most one side effect for the
//! caller to run; [`DistributionController`] runs those effects against a
//! [`ClassSource`] and a [`DistributionSink`].
//!
//! Steps gate each other in order:
//! `NoLevel → LevelChosen → ClassChosen → BooksChosen → Submitting → Succeeded | Failed`.

use serde::Serialize;

use crate::distribution::{self, OverrideMap, PersistedSnapshot, Progress};
use crate::types::{ClassRoster, DistributionInput, DistributionStatus, SchoolLevel, StudentWithDistributions};

pub mod gateway;

pub use gateway::{ClassSource, DistributionController, DistributionSink, GatewayError, HttpGateway, PoolGateway};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A message for the operator, the equivalent of a toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: &str) -> Self {
        Self { level, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    NoLevel,
    LevelChosen,
    ClassChosen,
    BooksChosen,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    LevelChosen(SchoolLevel),
    ClassesLoaded { level: SchoolLevel, classes: Vec<ClassRoster> },
    ClassesFailed { level: SchoolLevel },
    ClassChosen(String),
    BookToggled(String),
    CellToggled { student_id: String, book_id: String },
    MarkAllReceived,
    SubmitStarted,
    SubmitSucceeded,
    SubmitFailed,
}

/// Work the caller must perform after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    FetchClasses(SchoolLevel),
    Submit(Vec<DistributionInput>),
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: DistributionForm,
    pub effect: Effect,
    pub notices: Vec<Notice>,
}

pub const NO_CLASSES: &str = "No classes found for the selected level";
pub const LOAD_FAILED: &str = "An unexpected error occurred";
pub const EMPTY_CLASS: &str = "This class has no students";
pub const SELECT_CLASS: &str = "Please select a class";
pub const SELECT_BOOKS: &str = "Please select at least one book";
pub const SUBMITTED: &str = "Book distributions submitted successfully!";
pub const SUBMIT_FAILED: &str = "Failed to submit distributions";

#[derive(Debug, Clone, Default)]
pub struct DistributionForm {
    level: Option<SchoolLevel>,
    classes: Vec<ClassRoster>,
    selected_class: Option<String>,
    selected_books: Vec<String>,
    overrides: OverrideMap,
    persisted: PersistedSnapshot,
    submitting: bool,
    outcome: Option<Outcome>,
}

impl DistributionForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> Option<SchoolLevel> {
        self.level
    }

    pub fn classes(&self) -> &[ClassRoster] {
        &self.classes
    }

    pub fn selected_class(&self) -> Option<&ClassRoster> {
        let id = self.selected_class.as_deref()?;
        self.classes.iter().find(|c| c.class.id == id)
    }

    pub fn selected_books(&self) -> &[String] {
        &self.selected_books
    }

    pub fn overrides(&self) -> &OverrideMap {
        &self.overrides
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn phase(&self) -> Phase {
        if self.submitting {
            return Phase::Submitting;
        }
        match self.outcome {
            Some(Outcome::Succeeded) => return Phase::Succeeded,
            Some(Outcome::Failed) => return Phase::Failed,
            None => {}
        }
        match (self.level, self.selected_class(), self.selected_books.is_empty()) {
            (None, _, _) => Phase::NoLevel,
            (Some(_), None, _) => Phase::LevelChosen,
            (Some(_), Some(_), true) => Phase::ClassChosen,
            (Some(_), Some(_), false) => Phase::BooksChosen,
        }
    }

    /// Book selection is offered once a class with students is chosen.
    pub fn shows_books(&self) -> bool {
        self.selected_class().is_some()
    }

    /// The per-student checklist needs at least one selected book.
    pub fn shows_checklist(&self) -> bool {
        self.shows_books() && !self.selected_books.is_empty()
    }

    pub fn status_of(&self, student_id: &str, book_id: &str) -> DistributionStatus {
        distribution::effective_status(&self.overrides, &self.persisted, student_id, book_id)
    }

    pub fn progress_of(&self, student_id: &str) -> Progress {
        distribution::student_progress(student_id, &self.selected_books, &self.overrides, &self.persisted)
    }

    fn students(&self) -> &[StudentWithDistributions] {
        self.selected_class().map(|c| c.students.as_slice()).unwrap_or_default()
    }

    fn clear_class(&mut self) {
        self.selected_class = None;
        self.selected_books.clear();
        self.persisted = PersistedSnapshot::default();
    }

    /// Applies one event. Never performs I/O.
    pub fn apply(mut self, event: Event) -> Transition {
        let mut notices = Vec::new();
        let mut effect = Effect::None;

        if !matches!(event, Event::SubmitSucceeded | Event::SubmitFailed) {
            self.outcome = None;
        }

        match event {
            Event::LevelChosen(level) => {
                if self.level != Some(level) {
                    self.level = Some(level);
                    self.classes.clear();
                    self.clear_class();
                    self.overrides.clear();
                    effect = Effect::FetchClasses(level);
                }
            }
            Event::ClassesLoaded { level, classes } => {
                // Responses for a level the operator already left are stale.
                if self.level == Some(level) {
                    if classes.is_empty() {
                        notices.push(Notice::new(NoticeLevel::Warning, NO_CLASSES));
                    }
                    self.classes = classes;
                    self.clear_class();
                }
            }
            Event::ClassesFailed { level } => {
                if self.level == Some(level) {
                    self.level = None;
                    self.classes.clear();
                    self.clear_class();
                    notices.push(Notice::new(NoticeLevel::Error, LOAD_FAILED));
                }
            }
            Event::ClassChosen(class_id) => {
                let found = self.classes.iter().find(|c| c.class.id == class_id);
                match found.map(|c| (c.students.is_empty(), PersistedSnapshot::from_students(&c.students))) {
                    None => {}
                    Some((true, _)) => {
                        notices.push(Notice::new(NoticeLevel::Warning, EMPTY_CLASS));
                        self.clear_class();
                    }
                    Some((false, persisted)) => {
                        if self.selected_class.as_deref() != Some(class_id.as_str()) {
                            self.persisted = persisted;
                            self.selected_class = Some(class_id);
                            self.selected_books.clear();
                        }
                    }
                }
            }
            Event::BookToggled(book_id) => {
                let known = self.selected_class().is_some_and(|c| c.year.books.iter().any(|b| b.id == book_id));
                if known {
                    if let Some(pos) = self.selected_books.iter().position(|b| *b == book_id) {
                        self.selected_books.remove(pos);
                    } else {
                        self.selected_books.push(book_id);
                    }
                }
            }
            Event::CellToggled { student_id, book_id } => {
                let in_class = self.students().iter().any(|s| s.student.id == student_id);
                if in_class && self.selected_books.contains(&book_id) {
                    distribution::toggle(&mut self.overrides, &self.persisted, &student_id, &book_id);
                }
            }
            Event::MarkAllReceived => {
                if self.selected_class().is_some() {
                    let students = self.students().to_vec();
                    distribution::mark_all_received(&mut self.overrides, &students, &self.selected_books);
                }
            }
            Event::SubmitStarted => {
                if self.submitting {
                    // in flight
                } else if self.selected_class().is_none() {
                    notices.push(Notice::new(NoticeLevel::Error, SELECT_CLASS));
                } else if self.selected_books.is_empty() {
                    notices.push(Notice::new(NoticeLevel::Error, SELECT_BOOKS));
                } else {
                    let batch = distribution::build_batch(
                        self.students(),
                        &self.selected_books,
                        &self.overrides,
                        &self.persisted,
                    );
                    self.submitting = true;
                    effect = Effect::Submit(batch);
                }
            }
            Event::SubmitSucceeded => {
                if self.submitting {
                    self = DistributionForm { outcome: Some(Outcome::Succeeded), ..Default::default() };
                    notices.push(Notice::new(NoticeLevel::Success, SUBMITTED));
                }
            }
            Event::SubmitFailed => {
                if self.submitting {
                    self.submitting = false;
                    self.outcome = Some(Outcome::Failed);
                    notices.push(Notice::new(NoticeLevel::Error, SUBMIT_FAILED));
                }
            }
        }

        Transition { state: self, effect, notices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures;

    fn elementary_classes() -> Vec<ClassRoster> {
        vec![
            fixtures::roster("class-a", &["s1", "s2", "s3"], &["book-x", "book-y"]),
            fixtures::roster("class-b", &[], &["book-x", "book-y"]),
        ]
    }

    fn step(form: DistributionForm, event: Event) -> DistributionForm {
        form.apply(event).state
    }

    fn with_class_a() -> DistributionForm {
        let form = step(DistributionForm::new(), Event::LevelChosen(SchoolLevel::Elementary));
        let form =
            step(form, Event::ClassesLoaded { level: SchoolLevel::Elementary, classes: elementary_classes() });
        step(form, Event::ClassChosen("class-a".into()))
    }

    #[test]
    fn choosing_level_requests_classes() {
        let t = DistributionForm::new().apply(Event::LevelChosen(SchoolLevel::Middle));
        assert_eq!(t.effect, Effect::FetchClasses(SchoolLevel::Middle));
        assert_eq!(t.state.phase(), Phase::LevelChosen);
    }

    #[test]
    fn rechoosing_same_level_is_noop() {
        let form = with_class_a();
        let t = form.apply(Event::LevelChosen(SchoolLevel::Elementary));
        assert_eq!(t.effect, Effect::None);
        assert_eq!(t.state.phase(), Phase::ClassChosen);
    }

    #[test]
    fn switching_level_discards_selection() {
        let form = step(with_class_a(), Event::BookToggled("book-x".into()));
        let form = step(form, Event::MarkAllReceived);
        assert!(!form.overrides().is_empty());

        let t = form.apply(Event::LevelChosen(SchoolLevel::High));
        assert_eq!(t.effect, Effect::FetchClasses(SchoolLevel::High));
        assert!(t.state.classes().is_empty());
        assert!(t.state.selected_books().is_empty());
        assert!(t.state.overrides().is_empty());
        assert_eq!(t.state.phase(), Phase::LevelChosen);
    }

    #[test]
    fn zero_classes_warns_and_stays_on_level() {
        let form = step(DistributionForm::new(), Event::LevelChosen(SchoolLevel::High));
        let t = form.apply(Event::ClassesLoaded { level: SchoolLevel::High, classes: vec![] });
        assert_eq!(t.notices, vec![Notice::new(NoticeLevel::Warning, NO_CLASSES)]);
        assert_eq!(t.state.phase(), Phase::LevelChosen);
        assert_eq!(t.state.level(), Some(SchoolLevel::High));
    }

    #[test]
    fn failed_fetch_clears_level() {
        let form = step(DistributionForm::new(), Event::LevelChosen(SchoolLevel::High));
        let t = form.apply(Event::ClassesFailed { level: SchoolLevel::High });
        assert_eq!(t.state.level(), None);
        assert_eq!(t.state.phase(), Phase::NoLevel);
        assert_eq!(t.notices[0].level, NoticeLevel::Error);
    }

    #[test]
    fn stale_class_response_is_ignored() {
        let form = step(DistributionForm::new(), Event::LevelChosen(SchoolLevel::Elementary));
        let form = step(form, Event::LevelChosen(SchoolLevel::Middle));
        let t = form.apply(Event::ClassesLoaded { level: SchoolLevel::Elementary, classes: elementary_classes() });
        assert!(t.state.classes().is_empty());
        assert!(t.notices.is_empty());
    }

    #[test]
    fn class_without_students_never_advances() {
        let form = with_class_a();
        let t = form.apply(Event::ClassChosen("class-b".into()));
        assert_eq!(t.notices, vec![Notice::new(NoticeLevel::Warning, EMPTY_CLASS)]);
        assert_eq!(t.state.phase(), Phase::LevelChosen);
        assert!(!t.state.shows_books());
        assert!(!t.state.shows_checklist());

        let form = step(t.state, Event::BookToggled("book-x".into()));
        assert!(form.selected_books().is_empty());
        assert_eq!(form.phase(), Phase::LevelChosen);
    }

    #[test]
    fn book_toggle_adds_and_removes() {
        let form = step(with_class_a(), Event::BookToggled("book-y".into()));
        let form = step(form, Event::BookToggled("book-x".into()));
        assert_eq!(form.selected_books(), ["book-y".to_string(), "book-x".to_string()]);
        assert!(form.shows_checklist());
        assert_eq!(form.phase(), Phase::BooksChosen);

        let form = step(form, Event::BookToggled("book-y".into()));
        let form = step(form, Event::BookToggled("book-x".into()));
        assert_eq!(form.phase(), Phase::ClassChosen);
        assert!(!form.shows_checklist());
    }

    #[test]
    fn unknown_book_is_ignored() {
        let form = step(with_class_a(), Event::BookToggled("book-z".into()));
        assert!(form.selected_books().is_empty());
    }

    #[test]
    fn submit_without_books_is_blocked_locally() {
        let t = with_class_a().apply(Event::SubmitStarted);
        assert_eq!(t.effect, Effect::None);
        assert_eq!(t.notices, vec![Notice::new(NoticeLevel::Error, SELECT_BOOKS)]);
        assert!(!t.state.is_submitting());
    }

    #[test]
    fn submit_without_class_is_blocked_locally() {
        let t = DistributionForm::new().apply(Event::SubmitStarted);
        assert_eq!(t.effect, Effect::None);
        assert_eq!(t.notices, vec![Notice::new(NoticeLevel::Error, SELECT_CLASS)]);
    }

    #[test]
    fn scenario_mark_all_after_single_toggle_submits_six_received() {
        let form = step(with_class_a(), Event::BookToggled("book-x".into()));
        let form = step(form, Event::BookToggled("book-y".into()));
        let form = step(form, Event::CellToggled { student_id: "s1".into(), book_id: "book-x".into() });
        assert_eq!(form.status_of("s1", "book-x"), DistributionStatus::Received);
        let form = step(form, Event::MarkAllReceived);

        let t = form.apply(Event::SubmitStarted);
        let Effect::Submit(batch) = t.effect else { panic!("expected a submit effect") };
        assert_eq!(batch.len(), 6);
        assert!(batch.iter().all(|d| d.status == DistributionStatus::Received));
        assert_eq!(t.state.phase(), Phase::Submitting);
        assert_eq!(t.state.progress_of("s2").to_string(), "2/2");
    }

    #[test]
    fn second_submit_while_in_flight_is_ignored() {
        let form = step(with_class_a(), Event::BookToggled("book-x".into()));
        let form = step(form, Event::SubmitStarted);
        let t = form.apply(Event::SubmitStarted);
        assert_eq!(t.effect, Effect::None);
        assert!(t.notices.is_empty());
        assert!(t.state.is_submitting());
    }

    #[test]
    fn success_resets_everything() {
        let form = step(with_class_a(), Event::BookToggled("book-x".into()));
        let form = step(form, Event::SubmitStarted);
        let t = form.apply(Event::SubmitSucceeded);
        assert_eq!(t.notices[0].level, NoticeLevel::Success);
        assert_eq!(t.state.phase(), Phase::Succeeded);
        assert_eq!(t.state.level(), None);
        assert!(t.state.classes().is_empty());

        let next = step(t.state, Event::LevelChosen(SchoolLevel::Elementary));
        assert_eq!(next.phase(), Phase::LevelChosen);
    }

    #[test]
    fn failure_keeps_selection_for_retry() {
        let form = step(with_class_a(), Event::BookToggled("book-x".into()));
        let form = step(form, Event::CellToggled { student_id: "s2".into(), book_id: "book-x".into() });
        let form = step(form, Event::SubmitStarted);
        let t = form.apply(Event::SubmitFailed);
        assert_eq!(t.state.phase(), Phase::Failed);
        assert!(!t.state.is_submitting());
        assert_eq!(t.state.level(), Some(SchoolLevel::Elementary));
        assert_eq!(t.state.selected_books(), ["book-x".to_string()]);
        assert_eq!(t.state.status_of("s2", "book-x"), DistributionStatus::Received);

        let retry = t.state.apply(Event::SubmitStarted);
        assert!(matches!(retry.effect, Effect::Submit(_)));
    }

    #[test]
    fn persisted_status_seeds_cells() {
        let mut classes = elementary_classes();
        classes[0].students[0].book_distributions.push(crate::types::DistributionSummary {
            book_id: "book-x".into(),
            status: DistributionStatus::NotReceived,
        });
        let form = step(DistributionForm::new(), Event::LevelChosen(SchoolLevel::Elementary));
        let form = step(form, Event::ClassesLoaded { level: SchoolLevel::Elementary, classes });
        let form = step(form, Event::ClassChosen("class-a".into()));
        let form = step(form, Event::BookToggled("book-x".into()));

        assert_eq!(form.status_of("s1", "book-x"), DistributionStatus::NotReceived);
        let form = step(form, Event::CellToggled { student_id: "s1".into(), book_id: "book-x".into() });
        assert_eq!(form.status_of("s1", "book-x"), DistributionStatus::Pending);
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Coarse grade band a [`Year`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchoolLevel {
    Elementary,
    Middle,
    High,
}

impl SchoolLevel {
    pub const ALL: [SchoolLevel; 3] = [SchoolLevel::Elementary, SchoolLevel::Middle, SchoolLevel::High];

    pub fn as_str(self) -> &'static str {
        match self {
            SchoolLevel::Elementary => "ELEMENTARY",
            SchoolLevel::Middle => "MIDDLE",
            SchoolLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for SchoolLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchoolLevel {
    type Err = String;

    // Accepts the wire form and the lowercase URL slug (`/elementary`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ELEMENTARY" => Ok(SchoolLevel::Elementary),
            "MIDDLE" => Ok(SchoolLevel::Middle),
            "HIGH" => Ok(SchoolLevel::High),
            other => Err(format!("unknown school level: {}", other)),
        }
    }
}

/// Receipt state of one (student, book) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistributionStatus {
    #[default]
    Pending,
    Received,
    NotReceived,
}

impl DistributionStatus {
    pub const ALL: [DistributionStatus; 3] =
        [DistributionStatus::Pending, DistributionStatus::Received, DistributionStatus::NotReceived];

    pub fn as_str(self) -> &'static str {
        match self {
            DistributionStatus::Pending => "PENDING",
            DistributionStatus::Received => "RECEIVED",
            DistributionStatus::NotReceived => "NOT_RECEIVED",
        }
    }
}

impl fmt::Display for DistributionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistributionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(DistributionStatus::Pending),
            "RECEIVED" => Ok(DistributionStatus::Received),
            "NOT_RECEIVED" => Ok(DistributionStatus::NotReceived),
            other => Err(format!("unknown distribution status: {}", other)),
        }
    }
}

// ---------------- Entities ----------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Year {
    pub id: String,
    pub level: SchoolLevel,
    pub year_number: i64,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: String,
    pub year_id: String,
    pub name: String,
    pub section: String,
    pub capacity: i64,
    pub room_number: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub class_id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: Option<String>,
    pub enrollment_no: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub guardian_name: String,
    pub guardian_phone: String,
    pub address: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub year_id: String,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub subject: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<i64>,
    pub edition: Option<String>,
    pub total_quantity: i64,
    pub available_qty: i64,
    pub issued_qty: i64,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub cover_image_public_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDistribution {
    pub id: String,
    pub student_id: String,
    pub book_id: String,
    pub status: DistributionStatus,
    pub created_at: String,
    pub updated_at: String,
}

// ---------------- Relational includes ----------------

/// Persisted status of one book for a student, as carried by class rosters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionSummary {
    pub book_id: String,
    pub status: DistributionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentWithDistributions {
    #[serde(flatten)]
    pub student: Student,
    pub book_distributions: Vec<DistributionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearWithBooks {
    #[serde(flatten)]
    pub year: Year,
    pub books: Vec<Book>,
}

/// A class with everything the distribution workflow needs: its year and the
/// year's books, and every student with their persisted distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRoster {
    #[serde(flatten)]
    pub class: Class,
    pub year: YearWithBooks,
    pub students: Vec<StudentWithDistributions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassWithStudents {
    #[serde(flatten)]
    pub class: Class,
    pub students: Vec<Student>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearWithClasses {
    #[serde(flatten)]
    pub year: Year,
    pub classes: Vec<ClassWithStudents>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearOverview {
    #[serde(flatten)]
    pub year: Year,
    pub students_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassWithYear {
    #[serde(flatten)]
    pub class: Class,
    pub year: Year,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentWithClass {
    #[serde(flatten)]
    pub student: Student,
    pub class: ClassWithYear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookWithYear {
    #[serde(flatten)]
    pub book: Book,
    pub year: Year,
}

// ---------------- Validated inputs ----------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearInput {
    pub level: SchoolLevel,
    pub year_number: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearPatch {
    pub level: Option<SchoolLevel>,
    pub year_number: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInput {
    pub year_id: String,
    pub name: String,
    pub section: String,
    pub capacity: i64,
    pub room_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInput {
    pub class_id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: Option<String>,
    pub enrollment_no: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub guardian_name: String,
    pub guardian_phone: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    pub year_id: String,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub subject: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<i64>,
    pub edition: Option<String>,
    pub total_quantity: i64,
    pub available_qty: i64,
    pub issued_qty: i64,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub cover_image_public_id: Option<String>,
}

/// One resolved (student, book, status) triple of a distribution batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionInput {
    pub student_id: String,
    pub book_id: String,
    pub status: DistributionStatus,
}

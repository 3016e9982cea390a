//! Declarative shape checks for incoming JSON payloads.
//!
//! Every mutating endpoint hands its raw `serde_json::Value` to one of the
//! `validate_*` functions below before touching the database. Validation never
//! stops at the first problem: all offending fields are collected and returned
//! together as [`AppError::Validation`].

use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::{AppError, AppResult, FieldError};
use crate::types::{
    BookInput, ClassInput, DistributionInput, DistributionStatus, SchoolLevel, StudentInput, YearInput, YearPatch,
};

/// Reads typed fields out of a JSON object while accumulating field errors.
struct Fields<'a> {
    obj: &'a Map<String, Value>,
    prefix: String,
    errors: &'a mut Vec<FieldError>,
}

impl<'a> Fields<'a> {
    fn new(obj: &'a Map<String, Value>, prefix: impl Into<String>, errors: &'a mut Vec<FieldError>) -> Self {
        Self { obj, prefix: prefix.into(), errors }
    }

    fn path(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.prefix, key)
        }
    }

    fn fail(&mut self, key: &str, message: impl Into<String>) {
        let field = self.path(key);
        self.errors.push(FieldError::new(field, message));
    }

    /// Treats an absent key and an explicit `null` alike.
    fn get(&self, key: &str) -> Option<&'a Value> {
        match self.obj.get(key) {
            None | Some(Value::Null) => None,
            Some(v) => Some(v),
        }
    }

    /// A required string; `message` is reported when it is missing or empty.
    fn required_str(&mut self, key: &str, message: &str) -> String {
        match self.get(key) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::String(_)) | None => {
                self.fail(key, message);
                String::new()
            }
            Some(_) => {
                self.fail(key, "Expected a string");
                String::new()
            }
        }
    }

    /// A required string that may be empty.
    fn string(&mut self, key: &str) -> String {
        match self.get(key) {
            Some(Value::String(s)) => s.clone(),
            None => {
                self.fail(key, "Required");
                String::new()
            }
            Some(_) => {
                self.fail(key, "Expected a string");
                String::new()
            }
        }
    }

    fn optional_str(&mut self, key: &str) -> Option<String> {
        match self.get(key) {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.fail(key, "Expected a string");
                None
            }
        }
    }

    fn integer(&mut self, key: &str) -> Option<i64> {
        match self.get(key) {
            None => {
                self.fail(key, "Required");
                None
            }
            Some(v) => self.as_integer(key, v),
        }
    }

    fn optional_integer(&mut self, key: &str) -> Option<i64> {
        match self.get(key) {
            None => None,
            Some(v) => self.as_integer(key, v),
        }
    }

    fn as_integer(&mut self, key: &str, v: &Value) -> Option<i64> {
        match v.as_i64() {
            Some(n) => Some(n),
            None if v.is_number() => {
                self.fail(key, "Expected an integer");
                None
            }
            None => {
                self.fail(key, "Expected a number");
                None
            }
        }
    }

    /// An integer bounded below (and optionally above).
    fn bounded(&mut self, key: &str, value: Option<i64>, min: i64, max: Option<i64>, message: &str) -> i64 {
        match value {
            Some(n) if n < min || max.is_some_and(|m| n > m) => {
                self.fail(key, message);
                n
            }
            Some(n) => n,
            None => 0,
        }
    }

    fn enumeration<T: FromStr>(&mut self, key: &str, allowed: &[&str], required: bool) -> Option<T> {
        match self.get(key) {
            None => {
                if required {
                    self.fail(key, format!("Required; expected one of {}", allowed.join(", ")));
                }
                None
            }
            Some(Value::String(s)) if allowed.contains(&s.as_str()) => s.parse().ok(),
            Some(_) => {
                self.fail(key, format!("Invalid enum value; expected one of {}", allowed.join(", ")));
                None
            }
        }
    }
}

fn expect_object<'a>(payload: &'a Value, path: &str, errors: &mut Vec<FieldError>) -> Option<&'a Map<String, Value>> {
    match payload.as_object() {
        Some(obj) => Some(obj),
        None => {
            let field = if path.is_empty() { "$".to_string() } else { path.to_string() };
            errors.push(FieldError::new(field, "Expected an object"));
            None
        }
    }
}

fn finish<T>(value: Option<T>, errors: Vec<FieldError>) -> AppResult<T> {
    match value {
        Some(v) if errors.is_empty() => Ok(v),
        _ => Err(AppError::Validation(errors)),
    }
}

const LEVELS: [&str; 3] = ["ELEMENTARY", "MIDDLE", "HIGH"];
const STATUSES: [&str; 3] = ["PENDING", "RECEIVED", "NOT_RECEIVED"];

pub fn validate_year(payload: &Value) -> AppResult<YearInput> {
    let mut errors = Vec::new();
    let input = expect_object(payload, "", &mut errors).map(|obj| {
        let mut f = Fields::new(obj, "", &mut errors);
        let year_number = f.integer("yearNumber");
        let year_number = f.bounded("yearNumber", year_number, 1, Some(12), "Year number must be between 1 and 12");
        let name = f.required_str("name", "Year name is required");
        let level = f.enumeration::<SchoolLevel>("level", &LEVELS, true);
        level.map(|level| YearInput { level, year_number, name })
    });
    finish(input.flatten(), errors)
}

pub fn validate_year_update(payload: &Value) -> AppResult<YearPatch> {
    let mut errors = Vec::new();
    let patch = expect_object(payload, "", &mut errors).map(|obj| {
        let mut f = Fields::new(obj, "", &mut errors);
        let year_number = f
            .optional_integer("yearNumber")
            .map(|n| f.bounded("yearNumber", Some(n), 1, Some(12), "Year number must be between 1 and 12"));
        let name = match f.get("name") {
            Some(_) => Some(f.required_str("name", "Year name is required")),
            None => None,
        };
        let level = f.enumeration::<SchoolLevel>("level", &LEVELS, false);
        YearPatch { level, year_number, name }
    });
    finish(patch, errors)
}

pub fn validate_class(payload: &Value) -> AppResult<ClassInput> {
    let mut errors = Vec::new();
    let input = expect_object(payload, "", &mut errors).map(|obj| {
        let mut f = Fields::new(obj, "", &mut errors);
        let year_id = f.required_str("yearId", "Year is required");
        let section = f.string("section");
        let name = f.required_str("name", "Class name is required");
        let capacity = f.integer("capacity");
        let capacity = f.bounded("capacity", capacity, 1, None, "Capacity must be at least 1");
        let room_number = f.optional_str("roomNumber");
        ClassInput { year_id, name, section, capacity, room_number }
    });
    finish(input, errors)
}

/// Loose address check: one `@`, something before it, a dotted domain after it.
fn looks_like_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

pub fn validate_student(payload: &Value) -> AppResult<StudentInput> {
    let mut errors = Vec::new();
    let input = expect_object(payload, "", &mut errors).map(|obj| {
        let mut f = Fields::new(obj, "", &mut errors);
        let class_id = f.required_str("classId", "Class is required");
        let first_name = f.required_str("firstName", "First name is required");
        let last_name = f.required_str("lastName", "Last name is required");
        let date_of_birth = f.required_str("dateOfBirth", "Date of birth is required");
        let gender = f.optional_str("gender");
        let enrollment_no = f.required_str("enrollmentNo", "Enrollment number is required");
        let email = match f.optional_str("email") {
            Some(e) if e.is_empty() => None,
            Some(e) if !looks_like_email(&e) => {
                f.fail("email", "Invalid email");
                None
            }
            other => other,
        };
        let phone = f.optional_str("phone");
        let guardian_name = f.required_str("guardianName", "Guardian name is required");
        let guardian_phone = f.required_str("guardianPhone", "Guardian phone is required");
        let address = f.required_str("address", "Address is required");
        StudentInput {
            class_id,
            first_name,
            last_name,
            date_of_birth,
            gender,
            enrollment_no,
            email,
            phone,
            guardian_name,
            guardian_phone,
            address,
        }
    });
    finish(input, errors)
}

pub fn validate_book(payload: &Value) -> AppResult<BookInput> {
    let mut errors = Vec::new();
    let input = expect_object(payload, "", &mut errors).map(|obj| {
        let mut f = Fields::new(obj, "", &mut errors);
        let year_id = f.required_str("yearId", "Year is required");
        let title = f.required_str("title", "Title is required");
        let author = f.optional_str("author");
        let isbn = f.optional_str("isbn");
        let subject = f.optional_str("subject");
        let publisher = f.optional_str("publisher");
        let published_year = f.optional_integer("publishedYear");
        let edition = f.optional_str("edition");
        let total_quantity = f.integer("totalQuantity");
        let total_quantity =
            f.bounded("totalQuantity", total_quantity, 0, None, "Total quantity must be at least 0");
        let available_qty = f.integer("availableQty");
        let available_qty =
            f.bounded("availableQty", available_qty, 0, None, "Available quantity must be at least 0");
        let issued_qty = f.integer("issuedQty");
        let issued_qty = f.bounded("issuedQty", issued_qty, 0, None, "Issued quantity must be at least 0");
        let description = f.optional_str("description");
        let cover_image = f.optional_str("coverImage");
        let cover_image_public_id = f.optional_str("coverImagePublicId");
        BookInput {
            year_id,
            title,
            author,
            isbn,
            subject,
            publisher,
            published_year,
            edition,
            total_quantity,
            available_qty,
            issued_qty,
            description,
            cover_image,
            cover_image_public_id,
        }
    });
    finish(input, errors)
}

/// Validates a distribution batch: an array of `{studentId, bookId, status}`.
///
/// `max_batch_size` bounds the number of triples accepted in one request.
pub fn validate_distributions(payload: &Value, max_batch_size: usize) -> AppResult<Vec<DistributionInput>> {
    let items = match payload.as_array() {
        Some(items) => items,
        None => return Err(AppError::invalid_field("$", "Expected an array")),
    };
    if items.len() > max_batch_size {
        return Err(AppError::invalid_field(
            "$",
            format!("Batch of {} entries exceeds the limit of {}", items.len(), max_batch_size),
        ));
    }

    let mut errors = Vec::new();
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let prefix = format!("[{}]", i);
        let Some(obj) = expect_object(item, &prefix, &mut errors) else {
            continue;
        };
        let mut f = Fields::new(obj, prefix, &mut errors);
        let student_id = f.required_str("studentId", "Student id is required");
        let book_id = f.required_str("bookId", "Book id is required");
        let status = f.enumeration::<DistributionStatus>("status", &STATUSES, true);
        if let Some(status) = status {
            out.push(DistributionInput { student_id, book_id, status });
        }
    }
    finish(Some(out), errors)
}

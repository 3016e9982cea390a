use axum::Router;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::store;
use crate::types::{
    Book, BookInput, Class, ClassInput, ClassRoster, SchoolLevel, Student, StudentInput, StudentWithDistributions,
    Year, YearInput, YearWithBooks,
};

const STAMP: &str = "2024-01-01T00:00:00.000Z";

pub async fn test_app() -> (Router, AppState) {
    let pool = crate::db::connect_in_memory().await.unwrap();
    let state = AppState::new(pool, AppConfig::default());
    (crate::routes::router(state.clone()), state)
}

pub async fn year(pool: &SqlitePool, level: SchoolLevel, year_number: i64) -> Year {
    let input = YearInput { level, year_number, name: format!("Year {}", year_number) };
    store::years::create(pool, &input).await.unwrap()
}

pub async fn class(pool: &SqlitePool, year_id: &str, name: &str) -> Class {
    let input = ClassInput {
        year_id: year_id.to_string(),
        name: name.to_string(),
        section: "A".to_string(),
        capacity: 30,
        room_number: None,
    };
    store::classes::create(pool, &input).await.unwrap()
}

pub async fn student(pool: &SqlitePool, class_id: &str, enrollment_no: &str) -> Student {
    let input = StudentInput {
        class_id: class_id.to_string(),
        first_name: "Sam".to_string(),
        last_name: enrollment_no.to_string(),
        date_of_birth: "2015-04-02".to_string(),
        gender: None,
        enrollment_no: enrollment_no.to_string(),
        email: None,
        phone: None,
        guardian_name: "Pat".to_string(),
        guardian_phone: "555-0100".to_string(),
        address: "1 School Lane".to_string(),
    };
    store::students::create(pool, &input).await.unwrap()
}

pub async fn book(pool: &SqlitePool, year_id: &str, title: &str) -> Book {
    let input = BookInput {
        year_id: year_id.to_string(),
        title: title.to_string(),
        author: None,
        isbn: None,
        subject: None,
        publisher: None,
        published_year: None,
        edition: None,
        total_quantity: 40,
        available_qty: 40,
        issued_qty: 0,
        description: None,
        cover_image: None,
        cover_image_public_id: None,
    };
    store::books::create(pool, &input).await.unwrap()
}

pub fn student_value(id: &str, class_id: &str) -> Student {
    Student {
        id: id.to_string(),
        class_id: class_id.to_string(),
        first_name: "Sam".to_string(),
        last_name: id.to_string(),
        date_of_birth: "2015-04-02".to_string(),
        gender: None,
        enrollment_no: format!("ENR-{}", id),
        email: None,
        phone: None,
        guardian_name: "Pat".to_string(),
        guardian_phone: "555-0100".to_string(),
        address: "1 School Lane".to_string(),
        created_at: STAMP.to_string(),
        updated_at: STAMP.to_string(),
    }
}

fn book_value(id: &str, year_id: &str) -> Book {
    Book {
        id: id.to_string(),
        year_id: year_id.to_string(),
        title: id.to_string(),
        author: None,
        isbn: None,
        subject: None,
        publisher: None,
        published_year: None,
        edition: None,
        total_quantity: 10,
        available_qty: 10,
        issued_qty: 0,
        description: None,
        cover_image: None,
        cover_image_public_id: None,
        created_at: STAMP.to_string(),
        updated_at: STAMP.to_string(),
    }
}

/// An in-memory roster: one class, its year's books, students without distributions.
pub fn roster(class_id: &str, student_ids: &[&str], book_ids: &[&str]) -> ClassRoster {
    let year = Year {
        id: "year-1".to_string(),
        level: SchoolLevel::Elementary,
        year_number: 1,
        name: "Year 1".to_string(),
        created_at: STAMP.to_string(),
        updated_at: STAMP.to_string(),
    };
    ClassRoster {
        class: Class {
            id: class_id.to_string(),
            year_id: year.id.clone(),
            name: class_id.to_string(),
            section: "A".to_string(),
            capacity: 30,
            room_number: None,
            created_at: STAMP.to_string(),
            updated_at: STAMP.to_string(),
        },
        year: YearWithBooks { books: book_ids.iter().map(|b| book_value(b, &year.id)).collect(), year },
        students: student_ids
            .iter()
            .map(|s| StudentWithDistributions { student: student_value(s, class_id), book_distributions: vec![] })
            .collect(),
    }
}

pub fn student_json(class_id: &str, enrollment_no: &str) -> Value {
    json!({
        "classId": class_id,
        "firstName": "Ada",
        "lastName": "Lovelace",
        "dateOfBirth": "2014-12-10",
        "enrollmentNo": enrollment_no,
        "email": "",
        "guardianName": "Anne",
        "guardianPhone": "555-0199",
        "address": "12 St James's Square",
    })
}

pub fn book_json(year_id: &str, title: &str) -> Value {
    json!({
        "yearId": year_id,
        "title": title,
        "author": "A. Author",
        "totalQuantity": 25,
        "availableQty": 25,
        "issuedQty": 0,
    })
}

// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// An examinee. Created at registration and immutable afterwards;
/// `id` is the identity key for both the local buffer and the remote store.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct User {
    /// Opaque unique id (UUID v4).
    pub id: String,

    pub name: String,

    /// Institution enrollment number, e.g. "A00123456".
    pub enrollment_id: String,
}

impl User {
    pub fn new(name: impl Into<String>, enrollment_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            enrollment_id: enrollment_id.into(),
        }
    }
}

/// DTO for registering before an exam.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 2,
        max = 100,
        message = "Name must be between 2 and 100 characters."
    ))]
    pub name: String,
    #[validate(length(
        min = 4,
        max = 50,
        message = "Enrollment id must be between 4 and 50 characters."
    ))]
    pub enrollment_id: String,
}

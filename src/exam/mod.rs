// src/exam/mod.rs

pub mod question_bank;
pub mod session;
pub mod sessions;

pub use session::ExamSession;
pub use sessions::SessionStore;

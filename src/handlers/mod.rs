// src/handlers/mod.rs

pub mod admin;
pub mod exam;
pub mod register;
pub mod results;
pub mod sync;

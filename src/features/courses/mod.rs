//! Course association source for the category hierarchy.
//!
//! Courses are authored elsewhere; this feature only answers
//! "which courses are directly tagged with category X" and is consumed
//! by the categories feature (no routes of its own).

pub mod dtos;
pub mod models;
pub mod services;

pub use services::CourseService;

pub mod categories;
pub mod courses;

mod course;

pub use course::Course;

pub mod course;
pub mod instance;

pub use course::{Course, NewCourse, NewCourseRequest};
pub use instance::{CourseInstance, InstanceKey, InstanceWithCourse, NewInstanceRequest, Term};

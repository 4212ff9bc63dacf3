use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use crate::error::{AppError, FieldError};
use crate::models::Course;
use crate::models::course::text;

pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CourseInstance {
    pub id: String,
    pub course: String,
    pub year: i32,
    pub semester: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl CourseInstance {
    pub fn new(id: String, key: InstanceKey, now: String) -> Self {
        Self {
            id,
            course: key.course,
            year: key.year,
            semester: key.semester,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn key(&self) -> InstanceKey {
        InstanceKey {
            course: self.course.clone(),
            year: self.year,
            semester: self.semester,
        }
    }
}

/// An instance enriched with the full record of the course it offers.
/// `course_details` is `None` when the course no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceWithCourse {
    #[serde(flatten)]
    pub instance: CourseInstance,
    pub course_details: Option<Course>,
}

/// A (year, semester) pair taken from a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Term {
    pub year: i32,
    pub semester: i32,
}

impl Term {
    /// Parses raw path segments. Year is only required to be an integer;
    /// semester must be 1 or 2.
    pub fn from_path(year: &str, semester: &str) -> Result<Self, AppError> {
        let year = year.trim().parse::<i32>().map_err(|_| AppError::InvalidParameters)?;
        let semester = semester
            .trim()
            .parse::<i32>()
            .map_err(|_| AppError::InvalidParameters)?;
        if !is_semester(semester) {
            return Err(AppError::InvalidParameters);
        }
        Ok(Self { year, semester })
    }

    pub fn with_course(self, course: impl Into<String>) -> InstanceKey {
        InstanceKey {
            course: course.into(),
            year: self.year,
            semester: self.semester,
        }
    }
}

/// Composite identity of a course instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InstanceKey {
    pub course: String,
    pub year: i32,
    pub semester: i32,
}

/// Body of `POST /instances`. `year` and `semester` accept JSON numbers or
/// numeric strings, since form clients post select values as text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewInstanceRequest {
    pub course: Option<Value>,
    pub year: Option<Value>,
    pub semester: Option<Value>,
}

impl NewInstanceRequest {
    pub fn validate(self) -> Result<InstanceKey, AppError> {
        let mut errors = Vec::new();

        let course = text(self.course.as_ref(), true);
        if course.is_none() {
            errors.push(FieldError::new("course", "Course ID is required"));
        }

        let year = self
            .year
            .as_ref()
            .and_then(integer)
            .filter(|y| (MIN_YEAR as i64..=MAX_YEAR as i64).contains(y));
        if year.is_none() {
            errors.push(FieldError::new("year", "Valid year is required"));
        }

        let semester = self
            .semester
            .as_ref()
            .and_then(integer)
            .filter(|s| *s == 1 || *s == 2);
        if semester.is_none() {
            errors.push(FieldError::new("semester", "Semester must be 1 or 2"));
        }

        match (course, year, semester) {
            (Some(course), Some(year), Some(semester)) => Ok(InstanceKey {
                course,
                year: year as i32,
                semester: semester as i32,
            }),
            _ => Err(AppError::ValidationFailure(errors)),
        }
    }
}

fn is_semester(semester: i32) -> bool {
    matches!(semester, 1 | 2)
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: Value) -> NewInstanceRequest {
        serde_json::from_value(body).expect("request should deserialize")
    }

    #[test]
    fn test_term_from_path() {
        assert_eq!(Term::from_path("2024", "2").unwrap(), Term { year: 2024, semester: 2 });
        assert!(matches!(Term::from_path("abc", "1"), Err(AppError::InvalidParameters)));
        assert!(matches!(Term::from_path("2024", "x"), Err(AppError::InvalidParameters)));
        assert!(matches!(Term::from_path("2024", "3"), Err(AppError::InvalidParameters)));
        assert!(matches!(Term::from_path("2024", "0"), Err(AppError::InvalidParameters)));
    }

    #[test]
    fn test_validate_accepts_numbers_and_numeric_strings() {
        let key = request(json!({ "course": "CS101", "year": 2024, "semester": 1 }))
            .validate()
            .expect("valid request");
        assert_eq!(key, Term { year: 2024, semester: 1 }.with_course("CS101"));

        let key = request(json!({ "course": " CS101 ", "year": "2030", "semester": "2" }))
            .validate()
            .expect("valid request");
        assert_eq!(key.course, "CS101");
        assert_eq!(key.year, 2030);
        assert_eq!(key.semester, 2);
    }

    #[test]
    fn test_validate_year_bounds() {
        for year in [2000, 2100] {
            assert!(request(json!({ "course": "CS101", "year": year, "semester": 1 }))
                .validate()
                .is_ok());
        }
        for year in [json!(1999), json!(2101), json!(2024.5), json!("next")] {
            let err = request(json!({ "course": "CS101", "year": year, "semester": 1 }))
                .validate()
                .unwrap_err();
            let AppError::ValidationFailure(errors) = err else {
                panic!("expected validation failure");
            };
            assert_eq!(errors, vec![FieldError::new("year", "Valid year is required")]);
        }
    }

    #[test]
    fn test_validate_reports_all_fields() {
        let err = request(json!({ "semester": 3 })).validate().unwrap_err();
        let AppError::ValidationFailure(errors) = err else {
            panic!("expected validation failure");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["course", "year", "semester"]);
    }

    #[test]
    fn test_validate_reports_wrong_typed_course_with_other_fields() {
        let err = request(json!({ "course": 7, "year": 1999, "semester": 3 }))
            .validate()
            .unwrap_err();
        let AppError::ValidationFailure(errors) = err else {
            panic!("expected validation failure");
        };
        assert_eq!(
            errors,
            vec![
                FieldError::new("course", "Course ID is required"),
                FieldError::new("year", "Valid year is required"),
                FieldError::new("semester", "Semester must be 1 or 2"),
            ]
        );
    }

    #[test]
    fn test_enriched_instance_serializes_flat() {
        let instance = CourseInstance::new(
            "i-1".to_string(),
            Term { year: 2024, semester: 1 }.with_course("CS101"),
            "2024-01-01T00:00:00+00:00".to_string(),
        );
        let value = serde_json::to_value(InstanceWithCourse {
            instance,
            course_details: None,
        })
        .unwrap();

        assert_eq!(value["course"], "CS101");
        assert_eq!(value["year"], 2024);
        assert_eq!(value["createdAt"], "2024-01-01T00:00:00+00:00");
        assert!(value["courseDetails"].is_null());
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, FieldError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub prerequisites: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Body of `POST /courses` as received. Every field is optional here so that
/// missing or malformed fields are reported together by [`validate`].
///
/// [`validate`]: NewCourseRequest::validate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCourseRequest {
    pub id: Option<Value>,
    pub title: Option<Value>,
    pub description: Option<Value>,
    pub prerequisites: Option<Value>,
}

/// A course creation request that passed field validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCourse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub prerequisites: Vec<String>,
}

impl NewCourseRequest {
    pub fn validate(self) -> Result<NewCourse, AppError> {
        let mut errors = Vec::new();

        let id = text(self.id.as_ref(), true);
        if id.is_none() {
            errors.push(FieldError::new("id", "Course ID is required"));
        }
        let title = text(self.title.as_ref(), true);
        if title.is_none() {
            errors.push(FieldError::new("title", "Title is required"));
        }
        let description = text(self.description.as_ref(), false);
        if description.is_none() {
            errors.push(FieldError::new("description", "Description is required"));
        }
        let prerequisites = match self.prerequisites {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>(),
            _ => None,
        };
        if prerequisites.is_none() {
            errors.push(FieldError::new("prerequisites", "Prerequisites should be an array"));
        }

        match (id, title, description, prerequisites) {
            (Some(id), Some(title), Some(description), Some(prerequisites)) => Ok(NewCourse {
                id,
                title,
                description,
                prerequisites,
            }),
            _ => Err(AppError::ValidationFailure(errors)),
        }
    }
}

impl NewCourse {
    pub fn into_course(self, now: String) -> Course {
        Course {
            id: self.id,
            title: self.title,
            description: self.description,
            prerequisites: self.prerequisites,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// A non-empty string field. Any other JSON type counts as missing.
pub(crate) fn text(value: Option<&Value>, trim: bool) -> Option<String> {
    let Some(Value::String(s)) = value else {
        return None;
    };
    let s = if trim { s.trim() } else { s.as_str() };
    (!s.is_empty()).then(|| s.to_string())
}

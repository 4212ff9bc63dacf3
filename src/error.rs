use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::models::{CourseInstance, InstanceKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed")]
    ValidationFailure(Vec<FieldError>),

    #[error("Course with this ID already exists")]
    DuplicateId(String),

    #[error("One or more prerequisites do not exist")]
    UnknownPrerequisite(Vec<String>),

    #[error("Cannot delete course as it is a prerequisite for other courses")]
    HasDependents(Vec<String>),

    #[error("Cannot delete course as it has instances")]
    HasInstances(Vec<CourseInstance>),

    #[error("Course does not exist")]
    UnknownCourse(String),

    #[error("Course instance already exists for this course, year, and semester")]
    DuplicateInstance(InstanceKey),

    #[error("Invalid year or semester")]
    InvalidParameters,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Database error: {0}")]
    Store(#[from] sqlx::Error),
}

impl AppError {
    /// Stable name of the failure kind, sent as the `error` field of the body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::ValidationFailure(_) => "ValidationFailure",
            AppError::DuplicateId(_) => "DuplicateId",
            AppError::UnknownPrerequisite(_) => "UnknownPrerequisite",
            AppError::HasDependents(_) => "HasDependents",
            AppError::HasInstances(_) => "HasInstances",
            AppError::UnknownCourse(_) => "UnknownCourse",
            AppError::DuplicateInstance(_) => "DuplicateInstance",
            AppError::InvalidParameters => "InvalidParameters",
            AppError::NotFound(_) => "NotFound",
            AppError::Store(_) => "StoreError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::HasDependents(_) | AppError::HasInstances(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationFailure(vec![FieldError::new("body", rejection.body_text())])
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_prerequisites: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependent_courses: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instances: Option<Vec<CourseInstance>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            errors: None,
            missing_prerequisites: None,
            dependent_courses: None,
            instances: None,
        };

        match self {
            AppError::ValidationFailure(errors) => body.errors = Some(errors),
            AppError::UnknownPrerequisite(missing) => body.missing_prerequisites = Some(missing),
            AppError::HasDependents(dependents) => body.dependent_courses = Some(dependents),
            AppError::HasInstances(instances) => body.instances = Some(instances),
            AppError::Store(e) => {
                error!("database error: {}", e);
                body.message = "Server error".to_string();
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

pub mod repository;

use async_trait::async_trait;
use sqlx::migrate::Migrator;

use crate::error::AppError;
use crate::models::{Course, CourseInstance, InstanceKey, Term};

pub use repository::SqliteCatalogStore;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Read and single-record write access to the catalog collections.
///
/// Inserts must surface a key conflict as [`AppError::DuplicateId`] or
/// [`AppError::DuplicateInstance`], so a write that loses a race reports the
/// same kind as the pre-check in the service layer.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn ping(&self) -> Result<(), AppError>;

    async fn list_courses(&self) -> Result<Vec<Course>, AppError>;
    async fn find_course_by_id(&self, id: &str) -> Result<Option<Course>, AppError>;
    async fn find_courses_by_ids(&self, ids: &[String]) -> Result<Vec<Course>, AppError>;
    /// Courses whose prerequisite list contains `id`.
    async fn find_dependent_courses(&self, id: &str) -> Result<Vec<Course>, AppError>;
    async fn insert_course(&self, course: &Course) -> Result<(), AppError>;
    async fn delete_course(&self, id: &str) -> Result<Option<Course>, AppError>;

    async fn find_instances_by_course(
        &self,
        course: &str,
    ) -> Result<Vec<CourseInstance>, AppError>;
    async fn find_instances_by_term(&self, term: Term) -> Result<Vec<CourseInstance>, AppError>;
    async fn find_instance(&self, key: &InstanceKey) -> Result<Option<CourseInstance>, AppError>;
    async fn insert_instance(&self, instance: &CourseInstance) -> Result<(), AppError>;
    async fn delete_instance(&self, key: &InstanceKey) -> Result<Option<CourseInstance>, AppError>;
}

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::CatalogStore;
use crate::error::AppError;
use crate::models::{Course, CourseInstance, InstanceKey, InstanceWithCourse, NewCourse, Term};

/// Referential-integrity rules for course and instance mutations.
///
/// Every check is a read followed by at most one single-record write. Checks
/// and writes are not atomic; the store's key constraints settle races.
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        self.store.list_courses().await
    }

    pub async fn get_course(&self, id: &str) -> Result<Course, AppError> {
        self.store
            .find_course_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Course"))
    }

    pub async fn create_course(&self, new_course: NewCourse) -> Result<Course, AppError> {
        if self.store.find_course_by_id(&new_course.id).await?.is_some() {
            warn!("Rejecting course {}: id already exists", new_course.id);
            return Err(AppError::DuplicateId(new_course.id));
        }

        let missing = self.missing_prerequisites(&new_course.prerequisites).await?;
        if !missing.is_empty() {
            warn!("Rejecting course {}: unknown prerequisites {:?}", new_course.id, missing);
            return Err(AppError::UnknownPrerequisite(missing));
        }

        let course = new_course.into_course(Utc::now().to_rfc3339());
        self.store.insert_course(&course).await?;
        info!("Created course {}", course.id);
        Ok(course)
    }

    /// Prerequisite ids with no matching course, in first-occurrence order.
    /// Repeated ids in the request count once.
    async fn missing_prerequisites(&self, requested: &[String]) -> Result<Vec<String>, AppError> {
        let mut seen = HashSet::new();
        let distinct: Vec<String> = requested
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();

        let found: HashSet<String> = self
            .store
            .find_courses_by_ids(&distinct)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();

        if found.len() == distinct.len() {
            return Ok(Vec::new());
        }
        Ok(distinct.into_iter().filter(|id| !found.contains(id)).collect())
    }

    /// Deletes a course that no other course requires and that has no
    /// instances. Dependents are reported before instances.
    pub async fn delete_course(&self, id: &str) -> Result<Course, AppError> {
        let dependents = self.store.find_dependent_courses(id).await?;
        if !dependents.is_empty() {
            let ids: Vec<String> = dependents.into_iter().map(|c| c.id).collect();
            warn!("Refusing to delete course {}: required by {:?}", id, ids);
            return Err(AppError::HasDependents(ids));
        }

        let instances = self.store.find_instances_by_course(id).await?;
        if !instances.is_empty() {
            warn!("Refusing to delete course {}: {} instance(s) exist", id, instances.len());
            return Err(AppError::HasInstances(instances));
        }

        let deleted = self
            .store
            .delete_course(id)
            .await?
            .ok_or(AppError::NotFound("Course"))?;
        info!("Deleted course {}", id);
        Ok(deleted)
    }

    pub async fn create_instance(&self, key: InstanceKey) -> Result<CourseInstance, AppError> {
        if self.store.find_course_by_id(&key.course).await?.is_none() {
            warn!("Rejecting instance: course {} does not exist", key.course);
            return Err(AppError::UnknownCourse(key.course));
        }

        if self.store.find_instance(&key).await?.is_some() {
            warn!(
                "Rejecting instance: {} already offered in {}/{}",
                key.course, key.year, key.semester
            );
            return Err(AppError::DuplicateInstance(key));
        }

        let instance =
            CourseInstance::new(Uuid::new_v4().to_string(), key, Utc::now().to_rfc3339());
        self.store.insert_instance(&instance).await?;
        info!(
            "Created instance {} of {} for {}/{}",
            instance.id, instance.course, instance.year, instance.semester
        );
        Ok(instance)
    }

    /// All instances in a term, each joined with its course. The courses are
    /// fetched in one batched lookup.
    pub async fn list_instances(&self, term: Term) -> Result<Vec<InstanceWithCourse>, AppError> {
        let instances = self.store.find_instances_by_term(term).await?;

        let course_ids: Vec<String> = instances
            .iter()
            .map(|i| i.course.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let courses: HashMap<String, Course> = self
            .store
            .find_courses_by_ids(&course_ids)
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        Ok(instances
            .into_iter()
            .map(|instance| {
                let course_details = courses.get(&instance.course).cloned();
                InstanceWithCourse {
                    instance,
                    course_details,
                }
            })
            .collect())
    }

    pub async fn get_instance(&self, key: &InstanceKey) -> Result<InstanceWithCourse, AppError> {
        let instance = self
            .store
            .find_instance(key)
            .await?
            .ok_or(AppError::NotFound("Course instance"))?;
        let course_details = self.store.find_course_by_id(&instance.course).await?;

        Ok(InstanceWithCourse {
            instance,
            course_details,
        })
    }

    pub async fn delete_instance(&self, key: &InstanceKey) -> Result<CourseInstance, AppError> {
        let deleted = self
            .store
            .delete_instance(key)
            .await?
            .ok_or(AppError::NotFound("Course instance"))?;
        info!("Deleted instance {} of {}", deleted.id, deleted.course);
        Ok(deleted)
    }
}

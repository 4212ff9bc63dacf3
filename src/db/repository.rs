use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::db::{CatalogStore, MIGRATOR};
use crate::error::AppError;
use crate::models::{Course, CourseInstance, InstanceKey, Term};

#[derive(Debug, FromRow)]
struct CourseRow {
    id: String,
    title: String,
    description: String,
    prerequisites: Json<Vec<String>>,
    created_at: String,
    updated_at: String,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Course {
            id: row.id,
            title: row.title,
            description: row.description,
            prerequisites: row.prerequisites.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct SqliteCatalogStore {
    db: SqlitePool,
}

impl SqliteCatalogStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Opens a pool on `database_url` and brings the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let db = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        MIGRATOR
            .run(&db)
            .await
            .map_err(|e| AppError::Store(e.into()))?;

        Ok(Self::new(db))
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("select 1").execute(&self.db).await?;
        Ok(())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        let rows = sqlx::query_as::<_, CourseRow>(
            r#"
            SELECT id, title, description, prerequisites, created_at, updated_at
            FROM courses
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Course::from).collect())
    }

    async fn find_course_by_id(&self, id: &str) -> Result<Option<Course>, AppError> {
        let row = sqlx::query_as::<_, CourseRow>(
            r#"
            SELECT id, title, description, prerequisites, created_at, updated_at
            FROM courses
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Course::from))
    }

    async fn find_courses_by_ids(&self, ids: &[String]) -> Result<Vec<Course>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, CourseRow>(
            r#"
            SELECT id, title, description, prerequisites, created_at, updated_at
            FROM courses
            WHERE id IN (SELECT value FROM json_each(?1))
            ORDER BY id
            "#,
        )
        .bind(Json(ids))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Course::from).collect())
    }

    async fn find_dependent_courses(&self, id: &str) -> Result<Vec<Course>, AppError> {
        let rows = sqlx::query_as::<_, CourseRow>(
            r#"
            SELECT c.id, c.title, c.description, c.prerequisites, c.created_at, c.updated_at
            FROM courses c
            WHERE EXISTS (
                SELECT 1 FROM json_each(c.prerequisites) p WHERE p.value = ?1
            )
            ORDER BY c.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Course::from).collect())
    }

    async fn insert_course(&self, course: &Course) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO courses
                (id, title, description, prerequisites, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&course.id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(Json(&course.prerequisites))
        .bind(&course.created_at)
        .bind(&course.updated_at)
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                debug!("insert of course {} hit primary key constraint", course.id);
                Err(AppError::DuplicateId(course.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_course(&self, id: &str) -> Result<Option<Course>, AppError> {
        let row = sqlx::query_as::<_, CourseRow>(
            r#"
            DELETE FROM courses
            WHERE id = ?1
            RETURNING id, title, description, prerequisites, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Course::from))
    }

    async fn find_instances_by_course(
        &self,
        course: &str,
    ) -> Result<Vec<CourseInstance>, AppError> {
        let instances = sqlx::query_as::<_, CourseInstance>(
            r#"
            SELECT id, course, year, semester, created_at, updated_at
            FROM course_instances
            WHERE course = ?1
            ORDER BY year, semester
            "#,
        )
        .bind(course)
        .fetch_all(&self.db)
        .await?;

        Ok(instances)
    }

    async fn find_instances_by_term(&self, term: Term) -> Result<Vec<CourseInstance>, AppError> {
        let instances = sqlx::query_as::<_, CourseInstance>(
            r#"
            SELECT id, course, year, semester, created_at, updated_at
            FROM course_instances
            WHERE year = ?1 AND semester = ?2
            ORDER BY course
            "#,
        )
        .bind(term.year)
        .bind(term.semester)
        .fetch_all(&self.db)
        .await?;

        Ok(instances)
    }

    async fn find_instance(&self, key: &InstanceKey) -> Result<Option<CourseInstance>, AppError> {
        let instance = sqlx::query_as::<_, CourseInstance>(
            r#"
            SELECT id, course, year, semester, created_at, updated_at
            FROM course_instances
            WHERE course = ?1 AND year = ?2 AND semester = ?3
            "#,
        )
        .bind(&key.course)
        .bind(key.year)
        .bind(key.semester)
        .fetch_optional(&self.db)
        .await?;

        Ok(instance)
    }

    async fn insert_instance(&self, instance: &CourseInstance) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO course_instances
                (id, course, year, semester, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&instance.id)
        .bind(&instance.course)
        .bind(instance.year)
        .bind(instance.semester)
        .bind(&instance.created_at)
        .bind(&instance.updated_at)
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                debug!(
                    "insert of instance {} {}/{} hit unique constraint",
                    instance.course, instance.year, instance.semester
                );
                Err(AppError::DuplicateInstance(instance.key()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_instance(&self, key: &InstanceKey) -> Result<Option<CourseInstance>, AppError> {
        let instance = sqlx::query_as::<_, CourseInstance>(
            r#"
            DELETE FROM course_instances
            WHERE course = ?1 AND year = ?2 AND semester = ?3
            RETURNING id, course, year, semester, created_at, updated_at
            "#,
        )
        .bind(&key.course)
        .bind(key.year)
        .bind(key.semester)
        .fetch_optional(&self.db)
        .await?;

        Ok(instance)
    }
}

use axum::Json;
use axum::extract::Path;
use axum::extract::rejection::JsonRejection;
use axum::http::{Method, header};
use axum::routing::post;
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::models::*;
use crate::services::CatalogService;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct DeletedCourse {
    message: &'static str,
    course: Course,
}

#[derive(Debug, Serialize)]
struct DeletedInstance {
    message: &'static str,
    instance: CourseInstance,
}

/// Builds the full application. Resource routes are served both at the root
/// and under `/api`.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let resources = Router::new()
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/{id}", get(get_course).delete(delete_course))
        .route("/instances", post(create_instance))
        .route("/instances/{year}/{semester}", get(list_instances))
        .route(
            "/instances/{year}/{semester}/{course}",
            get(get_instance).delete(delete_instance),
        );

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(resources.clone())
        .nest("/api", resources)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn catalog(state: &AppState) -> CatalogService {
    CatalogService::new(state.store.clone())
}

async fn root() -> &'static str {
    "Course Management System API is running"
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.store.ping().await?;
    Ok(StatusCode::OK)
}

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, AppError> {
    let courses = catalog(&state).list_courses().await?;
    Ok(Json(courses))
}

async fn create_course(
    State(state): State<AppState>,
    payload: Result<Json<NewCourseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let Json(req) = payload?;
    let course = catalog(&state).create_course(req.validate()?).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Course>, AppError> {
    let course = catalog(&state).get_course(&id).await?;
    Ok(Json(course))
}

async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletedCourse>, AppError> {
    let course = catalog(&state).delete_course(&id).await?;
    Ok(Json(DeletedCourse {
        message: "Course deleted successfully",
        course,
    }))
}

async fn create_instance(
    State(state): State<AppState>,
    payload: Result<Json<NewInstanceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CourseInstance>), AppError> {
    let Json(req) = payload?;
    let instance = catalog(&state).create_instance(req.validate()?).await?;
    Ok((StatusCode::CREATED, Json(instance)))
}

async fn list_instances(
    State(state): State<AppState>,
    Path((year, semester)): Path<(String, String)>,
) -> Result<Json<Vec<InstanceWithCourse>>, AppError> {
    let term = Term::from_path(&year, &semester)?;
    let instances = catalog(&state).list_instances(term).await?;
    Ok(Json(instances))
}

async fn get_instance(
    State(state): State<AppState>,
    Path((year, semester, course)): Path<(String, String, String)>,
) -> Result<Json<InstanceWithCourse>, AppError> {
    let key = Term::from_path(&year, &semester)?.with_course(course);
    let instance = catalog(&state).get_instance(&key).await?;
    Ok(Json(instance))
}

async fn delete_instance(
    State(state): State<AppState>,
    Path((year, semester, course)): Path<(String, String, String)>,
) -> Result<Json<DeletedInstance>, AppError> {
    let key = Term::from_path(&year, &semester)?.with_course(course);
    let instance = catalog(&state).delete_instance(&key).await?;
    Ok(Json(DeletedInstance {
        message: "Course instance deleted successfully",
        instance,
    }))
}

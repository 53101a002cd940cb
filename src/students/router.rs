use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use tracing::error;

use super::domain::{CourseStatus, CourseStatusId, StudentDetail, StudentId, StudentSearchCondition};
use super::repository::StudentRepository;
use super::service::{StudentServiceError, StudentService};

pub const STUDENT_UPDATED: &str = "Student updated.";
pub const STATUS_REGISTERED: &str = "Course status registered.";
pub const STATUS_UPDATED: &str = "Course status updated.";
pub const STATUS_DELETED: &str = "Course status deleted.";

/// Router builder exposing the student registration endpoints.
pub fn student_router<R>(service: Arc<StudentService<R>>) -> Router
where
    R: StudentRepository + 'static,
{
    Router::new()
        .route("/studentList", get(list_handler::<R>))
        .route("/student/:id", get(detail_handler::<R>))
        .route("/registerStudent", post(register_handler::<R>))
        .route("/updateStudent", put(update_handler::<R>))
        .route("/courseStatusList", get(status_list_handler::<R>))
        .route("/registerCourseStatus", post(register_status_handler::<R>))
        .route("/updateCourseStatus", put(update_status_handler::<R>))
        .route("/deleteCourseStatus/:id", delete(delete_status_handler::<R>))
        .route("/searchStudentDetails", post(search_handler::<R>))
        .with_state(service)
}

pub(crate) fn error_response(error: StudentServiceError) -> Response {
    let status = match &error {
        StudentServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        StudentServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
        StudentServiceError::Repository(source) => {
            error!(error = %source, "student repository failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}

fn respond<T: IntoResponse>(result: Result<T, StudentServiceError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<R>(State(service): State<Arc<StudentService<R>>>) -> Response
where
    R: StudentRepository + 'static,
{
    respond(service.list_student_details().await.map(Json))
}

pub(crate) async fn detail_handler<R>(
    State(service): State<Arc<StudentService<R>>>,
    Path(id): Path<StudentId>,
) -> Response
where
    R: StudentRepository + 'static,
{
    respond(service.get_student_detail(id).await.map(Json))
}

pub(crate) async fn register_handler<R>(
    State(service): State<Arc<StudentService<R>>>,
    Json(detail): Json<StudentDetail>,
) -> Response
where
    R: StudentRepository + 'static,
{
    respond(service.register_student_detail(detail).await.map(Json))
}

pub(crate) async fn update_handler<R>(
    State(service): State<Arc<StudentService<R>>>,
    Json(detail): Json<StudentDetail>,
) -> Response
where
    R: StudentRepository + 'static,
{
    respond(
        service
            .update_student_detail(detail)
            .await
            .map(|()| STUDENT_UPDATED),
    )
}

pub(crate) async fn status_list_handler<R>(
    State(service): State<Arc<StudentService<R>>>,
) -> Response
where
    R: StudentRepository + 'static,
{
    respond(service.list_course_statuses().await.map(Json))
}

pub(crate) async fn register_status_handler<R>(
    State(service): State<Arc<StudentService<R>>>,
    Json(status): Json<CourseStatus>,
) -> Response
where
    R: StudentRepository + 'static,
{
    respond(
        service
            .register_course_status(status)
            .await
            .map(|_| STATUS_REGISTERED),
    )
}

pub(crate) async fn update_status_handler<R>(
    State(service): State<Arc<StudentService<R>>>,
    Json(status): Json<CourseStatus>,
) -> Response
where
    R: StudentRepository + 'static,
{
    respond(
        service
            .update_course_status(status)
            .await
            .map(|()| STATUS_UPDATED),
    )
}

pub(crate) async fn delete_status_handler<R>(
    State(service): State<Arc<StudentService<R>>>,
    Path(id): Path<CourseStatusId>,
) -> Response
where
    R: StudentRepository + 'static,
{
    respond(
        service
            .delete_course_status(id)
            .await
            .map(|()| STATUS_DELETED),
    )
}

pub(crate) async fn search_handler<R>(
    State(service): State<Arc<StudentService<R>>>,
    Json(condition): Json<StudentSearchCondition>,
) -> Response
where
    R: StudentRepository + 'static,
{
    respond(service.search_student_details(condition).await.map(Json))
}

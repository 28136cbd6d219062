//! Student profile management.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use util::state::AppState;
use validator::Validate;

use crate::auth::guards::Empty;
use crate::response::ApiResponse;
use crate::routes::common::{ListQuery, PageMeta, Paged, format_validation_errors};
use db::models::student::{Column as StudentCol, Entity as StudentEntity, Model as Student};
use db::models::user::Role;

pub fn student_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_students).post(create_student))
        .route("/{student_id}", delete(delete_student))
}

/// GET /students
pub async fn list_students(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> (StatusCode, Json<ApiResponse<Paged<Student>>>) {
    let db = state.db();
    let mut sel = StudentEntity::find().order_by_asc(StudentCol::Name);

    if let Some(term) = q.search.as_ref().filter(|s| !s.trim().is_empty()) {
        sel = sel.filter(StudentCol::Name.contains(term.as_str()));
    }

    let paginator = sel.paginate(db, q.limit());
    let total = paginator.num_items().await.unwrap_or(0);
    let items = paginator
        .fetch_page(q.page().saturating_sub(1))
        .await
        .unwrap_or_default();

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            Paged {
                items,
                meta: PageMeta::new(total, q.page(), q.limit()),
            },
            "Students retrieved",
        )),
    )
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudentRequest {
    pub user_id: i64,

    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    pub phone: Option<String>,
}

/// POST /students
pub async fn create_student(
    State(state): State<AppState>,
    Json(req): Json<CreateStudentRequest>,
) -> (StatusCode, Json<ApiResponse<Option<Student>>>) {
    if let Err(validation_errors) = req.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format_validation_errors(
                &validation_errors,
            ))),
        );
    }

    let db = state.db();

    match db::models::User::find_by_id(req.user_id).one(db).await {
        Ok(Some(user)) if user.role == Role::Student => {}
        Ok(Some(_)) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error("User does not have the student role")),
            );
        }
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("User not found")),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("Database error: {e}"))),
            );
        }
    }

    if let Ok(Some(_)) = Student::find_by_user_id(db, req.user_id).await {
        return (
            StatusCode::CONFLICT,
            Json(ApiResponse::error("Student profile already exists")),
        );
    }

    match Student::create(db, req.user_id, &req.name, req.phone.as_deref()).await {
        Ok(student) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(Some(student), "Student created")),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to create student: {e}"))),
        ),
    }
}

/// DELETE /students/{student_id}
pub async fn delete_student(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
) -> (StatusCode, Json<ApiResponse<Empty>>) {
    match StudentEntity::delete_by_id(student_id).exec(state.db()).await {
        Ok(res) if res.rows_affected > 0 => (
            StatusCode::OK,
            Json(ApiResponse::success(Empty, "Student deleted")),
        ),
        Ok(_) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Student not found")),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Database error: {e}"))),
        ),
    }
}

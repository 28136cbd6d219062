//! Teacher profile management.

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
use db::models::teacher::{Column as TeacherCol, Entity as TeacherEntity, Model as Teacher};
use db::models::user::Role;

pub fn teacher_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_teachers).post(create_teacher))
        .route("/{teacher_id}", delete(delete_teacher))
}

/// GET /teachers
pub async fn list_teachers(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> (StatusCode, Json<ApiResponse<Paged<Teacher>>>) {
    let db = state.db();
    let mut sel = TeacherEntity::find().order_by_asc(TeacherCol::Name);

    if let Some(term) = q.search.as_ref().filter(|s| !s.trim().is_empty()) {
        sel = sel.filter(TeacherCol::Name.contains(term.as_str()));
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
            "Teachers retrieved",
        )),
    )
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeacherRequest {
    pub user_id: i64,

    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    pub phone: Option<String>,
}

/// POST /teachers
///
/// Creates the teacher profile for an existing user account with the
/// `teacher` role.
pub async fn create_teacher(
    State(state): State<AppState>,
    Json(req): Json<CreateTeacherRequest>,
) -> (StatusCode, Json<ApiResponse<Option<Teacher>>>) {
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
        Ok(Some(user)) if user.role == Role::Teacher => {}
        Ok(Some(_)) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error("User does not have the teacher role")),
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

    if let Ok(Some(_)) = Teacher::find_by_user_id(db, req.user_id).await {
        return (
            StatusCode::CONFLICT,
            Json(ApiResponse::error("Teacher profile already exists")),
        );
    }

    match Teacher::create(db, req.user_id, &req.name, req.phone.as_deref()).await {
        Ok(teacher) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(Some(teacher), "Teacher created")),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to create teacher: {e}"))),
        ),
    }
}

/// DELETE /teachers/{teacher_id}
pub async fn delete_teacher(
    State(state): State<AppState>,
    Path(teacher_id): Path<i64>,
) -> (StatusCode, Json<ApiResponse<Empty>>) {
    match TeacherEntity::delete_by_id(teacher_id).exec(state.db()).await {
        Ok(res) if res.rows_affected > 0 => (
            StatusCode::OK,
            Json(ApiResponse::success(Empty, "Teacher deleted")),
        ),
        Ok(_) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Teacher not found")),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Database error: {e}"))),
        ),
    }
}

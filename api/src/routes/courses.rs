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
use db::models::course::{Column as CourseCol, Entity as CourseEntity, Model as Course};

pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route("/{course_id}", delete(delete_course))
}

/// GET /courses
pub async fn list_courses(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> (StatusCode, Json<ApiResponse<Paged<Course>>>) {
    let db = state.db();
    let mut sel = CourseEntity::find().order_by_asc(CourseCol::Name);

    if let Some(term) = q.search.as_ref().filter(|s| !s.trim().is_empty()) {
        sel = sel.filter(CourseCol::Name.contains(term.as_str()));
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
            "Courses retrieved",
        )),
    )
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    pub description: Option<String>,
}

/// POST /courses
pub async fn create_course(
    State(state): State<AppState>,
    Json(req): Json<CreateCourseRequest>,
) -> (StatusCode, Json<ApiResponse<Option<Course>>>) {
    if let Err(validation_errors) = req.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format_validation_errors(
                &validation_errors,
            ))),
        );
    }

    match Course::create(state.db(), &req.name, req.description.as_deref()).await {
        Ok(course) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(Some(course), "Course created")),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to create course: {e}"))),
        ),
    }
}

/// DELETE /courses/{course_id}
pub async fn delete_course(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
) -> (StatusCode, Json<ApiResponse<Empty>>) {
    match CourseEntity::delete_by_id(course_id).exec(state.db()).await {
        Ok(res) if res.rows_affected > 0 => (
            StatusCode::OK,
            Json(ApiResponse::success(Empty, "Course deleted")),
        ),
        Ok(_) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Course not found")),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Database error: {e}"))),
        ),
    }
}

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
use db::models::classroom::{
    Column as ClassroomCol, Entity as ClassroomEntity, Model as Classroom,
};

pub fn classroom_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_classrooms).post(create_classroom))
        .route("/{classroom_id}", delete(delete_classroom))
}

/// GET /classrooms
pub async fn list_classrooms(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> (StatusCode, Json<ApiResponse<Paged<Classroom>>>) {
    let db = state.db();
    let mut sel = ClassroomEntity::find().order_by_asc(ClassroomCol::Name);

    if let Some(term) = q.search.as_ref().filter(|s| !s.trim().is_empty()) {
        sel = sel.filter(ClassroomCol::Name.contains(term.as_str()));
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
            "Classrooms retrieved",
        )),
    )
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClassroomRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: i32,
}

/// POST /classrooms
pub async fn create_classroom(
    State(state): State<AppState>,
    Json(req): Json<CreateClassroomRequest>,
) -> (StatusCode, Json<ApiResponse<Option<Classroom>>>) {
    if let Err(validation_errors) = req.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format_validation_errors(
                &validation_errors,
            ))),
        );
    }

    match Classroom::create(state.db(), &req.name, req.capacity).await {
        Ok(classroom) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(Some(classroom), "Classroom created")),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to create classroom: {e}"))),
        ),
    }
}

/// DELETE /classrooms/{classroom_id}
pub async fn delete_classroom(
    State(state): State<AppState>,
    Path(classroom_id): Path<i64>,
) -> (StatusCode, Json<ApiResponse<Empty>>) {
    match ClassroomEntity::delete_by_id(classroom_id)
        .exec(state.db())
        .await
    {
        Ok(res) if res.rows_affected > 0 => (
            StatusCode::OK,
            Json(ApiResponse::success(Empty, "Classroom deleted")),
        ),
        Ok(_) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Classroom not found")),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Database error: {e}"))),
        ),
    }
}

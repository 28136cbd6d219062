use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
};
use chrono::NaiveDate;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use util::state::AppState;
use validator::Validate;

use crate::auth::guards::Empty;
use crate::response::ApiResponse;
use crate::routes::common::{ListQuery, PageMeta, Paged, format_validation_errors};
use db::models::batch::{Column as BatchCol, Entity as BatchEntity, Model as Batch, Status};

pub fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_batches).post(create_batch))
        .route("/{batch_id}", delete(delete_batch))
}

/// GET /batches
pub async fn list_batches(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> (StatusCode, Json<ApiResponse<Paged<Batch>>>) {
    let db = state.db();
    let mut sel = BatchEntity::find().order_by_desc(BatchCol::StartDate);

    if let Some(term) = q.search.as_ref().filter(|s| !s.trim().is_empty()) {
        sel = sel.filter(BatchCol::Name.contains(term.as_str()));
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
            "Batches retrieved",
        )),
    )
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBatchRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    pub course_id: i64,
    pub teacher_id: i64,
    pub classroom_id: i64,
    pub status: Status,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub description: Option<String>,
}

/// POST /batches
pub async fn create_batch(
    State(state): State<AppState>,
    Json(req): Json<CreateBatchRequest>,
) -> (StatusCode, Json<ApiResponse<Option<Batch>>>) {
    if let Err(validation_errors) = req.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format_validation_errors(
                &validation_errors,
            ))),
        );
    }
    if req.end_date < req.start_date {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("end_date must not precede start_date")),
        );
    }

    match Batch::create(
        state.db(),
        &req.name,
        req.course_id,
        req.teacher_id,
        req.classroom_id,
        req.status,
        req.start_date,
        req.end_date,
        req.description.as_deref(),
    )
    .await
    {
        Ok(batch) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(Some(batch), "Batch created")),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to create batch: {e}"))),
        ),
    }
}

/// DELETE /batches/{batch_id}
pub async fn delete_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<i64>,
) -> (StatusCode, Json<ApiResponse<Empty>>) {
    match BatchEntity::delete_by_id(batch_id).exec(state.db()).await {
        Ok(res) if res.rows_affected > 0 => (
            StatusCode::OK,
            Json(ApiResponse::success(Empty, "Batch deleted")),
        ),
        Ok(_) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Batch not found")),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Database error: {e}"))),
        ),
    }
}

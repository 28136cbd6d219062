use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
};
use sea_orm::{ColumnTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use util::state::AppState;

use crate::auth::guards::Empty;
use crate::response::ApiResponse;
use crate::routes::common::{PageMeta, Paged};
use db::models::timetable::{
    Column as TimetableCol, Entity as TimetableEntity, Model as Timetable,
};

pub fn timetable_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_timetables).post(create_timetable))
        .route("/{timetable_id}", delete(delete_timetable))
}

#[derive(Debug, Deserialize)]
pub struct TimetableQuery {
    pub batch_id: Option<i64>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// GET /timetables?batch_id=
pub async fn list_timetables(
    State(state): State<AppState>,
    Query(q): Query<TimetableQuery>,
) -> (StatusCode, Json<ApiResponse<Paged<Timetable>>>) {
    let db = state.db();
    let page = q.page.unwrap_or(1).max(1);
    let limit = q.limit.unwrap_or(20).clamp(1, 100);

    let mut sel = TimetableEntity::find()
        .order_by_asc(TimetableCol::DayOfWeek)
        .order_by_asc(TimetableCol::StartTime);
    if let Some(batch_id) = q.batch_id {
        sel = sel.filter(TimetableCol::BatchId.eq(batch_id));
    }

    let paginator = sel.paginate(db, limit);
    let total = paginator.num_items().await.unwrap_or(0);
    let items = paginator
        .fetch_page(page.saturating_sub(1))
        .await
        .unwrap_or_default();

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            Paged {
                items,
                meta: PageMeta::new(total, page, limit),
            },
            "Timetables retrieved",
        )),
    )
}

#[derive(Debug, Deserialize)]
pub struct CreateTimetableRequest {
    pub batch_id: i64,
    pub day_of_week: i32,
    pub start_time: String,
    pub end_time: String,
}

/// POST /timetables
///
/// `day_of_week` counts from Sunday (0); times are `"HH:MM"`. Malformed
/// values are a `400`, a second slot for the same batch/day/start a `409`.
pub async fn create_timetable(
    State(state): State<AppState>,
    Json(req): Json<CreateTimetableRequest>,
) -> (StatusCode, Json<ApiResponse<Option<Timetable>>>) {
    match Timetable::create(
        state.db(),
        req.batch_id,
        req.day_of_week,
        &req.start_time,
        &req.end_time,
    )
    .await
    {
        Ok(timetable) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(Some(timetable), "Timetable created")),
        ),
        Err(DbErr::Custom(msg)) => {
            (StatusCode::BAD_REQUEST, Json(ApiResponse::error(msg)))
        }
        Err(e) if e.to_string().contains("UNIQUE") => (
            StatusCode::CONFLICT,
            Json(ApiResponse::error(
                "A timetable slot with this day and start time already exists",
            )),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to create timetable: {e}"))),
        ),
    }
}

/// DELETE /timetables/{timetable_id}
pub async fn delete_timetable(
    State(state): State<AppState>,
    Path(timetable_id): Path<i64>,
) -> (StatusCode, Json<ApiResponse<Empty>>) {
    match TimetableEntity::delete_by_id(timetable_id)
        .exec(state.db())
        .await
    {
        Ok(res) if res.rows_affected > 0 => (
            StatusCode::OK,
            Json(ApiResponse::success(Empty, "Timetable deleted")),
        ),
        Ok(_) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Timetable not found")),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Database error: {e}"))),
        ),
    }
}

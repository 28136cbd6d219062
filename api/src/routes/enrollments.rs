use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use util::{cache::Region, state::AppState};

use crate::response::ApiResponse;
use crate::routes::common::{PageMeta, Paged};
use db::models::enrollment::{
    Column as EnrollmentCol, Entity as EnrollmentEntity, Model as Enrollment, Status,
};

pub fn enrollment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_enrollments).post(create_enrollment))
        .route("/{enrollment_id}/drop", put(drop_enrollment))
}

#[derive(Debug, Deserialize)]
pub struct EnrollmentQuery {
    pub batch_id: Option<i64>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// GET /enrollments?batch_id=
pub async fn list_enrollments(
    State(state): State<AppState>,
    Query(q): Query<EnrollmentQuery>,
) -> (StatusCode, Json<ApiResponse<Paged<Enrollment>>>) {
    let db = state.db();
    let page = q.page.unwrap_or(1).max(1);
    let limit = q.limit.unwrap_or(20).clamp(1, 100);

    let mut sel = EnrollmentEntity::find().order_by_asc(EnrollmentCol::Id);
    if let Some(batch_id) = q.batch_id {
        sel = sel.filter(EnrollmentCol::BatchId.eq(batch_id));
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
            "Enrollments retrieved",
        )),
    )
}

#[derive(Debug, Deserialize)]
pub struct CreateEnrollmentRequest {
    pub batch_id: i64,
    pub student_id: i64,
}

/// POST /enrollments
///
/// Cached attendance summaries are invalidated on success: an open session of
/// the batch gains a denominator slot the moment the student is enrolled.
///
/// ### Responses
/// - `201 Created`
/// - `409 Conflict` if the student is already enrolled in the batch
pub async fn create_enrollment(
    State(state): State<AppState>,
    Json(req): Json<CreateEnrollmentRequest>,
) -> (StatusCode, Json<ApiResponse<Option<Enrollment>>>) {
    let db = state.db();

    let existing = EnrollmentEntity::find()
        .filter(EnrollmentCol::BatchId.eq(req.batch_id))
        .filter(EnrollmentCol::StudentId.eq(req.student_id))
        .one(db)
        .await;
    if let Ok(Some(_)) = existing {
        return (
            StatusCode::CONFLICT,
            Json(ApiResponse::error(
                "Student is already enrolled in this batch",
            )),
        );
    }

    match Enrollment::create(db, req.batch_id, req.student_id).await {
        Ok(enrollment) => {
            state.cache().invalidate_region(Region::SessionSummary);
            state.cache().invalidate_region(Region::SessionRecords);
            (
                StatusCode::CREATED,
                Json(ApiResponse::success(Some(enrollment), "Enrollment created")),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!(
                "Failed to create enrollment: {e}"
            ))),
        ),
    }
}

/// PUT /enrollments/{enrollment_id}/drop
///
/// Marks the enrollment dropped and cancels its scheduled attendance
/// records. Cached attendance summaries are invalidated wholesale since the
/// denominator of any of the batch's sessions may have changed.
pub async fn drop_enrollment(
    State(state): State<AppState>,
    Path(enrollment_id): Path<i64>,
) -> (StatusCode, Json<ApiResponse<Option<Enrollment>>>) {
    let db = state.db();

    let enrollment = match EnrollmentEntity::find_by_id(enrollment_id).one(db).await {
        Ok(Some(enrollment)) => enrollment,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Enrollment not found")),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("Database error: {e}"))),
            );
        }
    };

    if enrollment.status == Status::Dropped {
        return (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(enrollment),
                "Enrollment already dropped",
            )),
        );
    }

    match enrollment.drop_out(db).await {
        Ok(enrollment) => {
            state.cache().invalidate_region(Region::SessionSummary);
            state.cache().invalidate_region(Region::SessionRecords);
            (
                StatusCode::OK,
                Json(ApiResponse::success(Some(enrollment), "Enrollment dropped")),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to drop enrollment: {e}"))),
        ),
    }
}

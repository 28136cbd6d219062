use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use sea_orm::{EntityTrait, QueryOrder};
use serde::Deserialize;
use util::state::AppState;
use validator::Validate;

use crate::auth::AuthUser;
use crate::auth::guards::Empty;
use crate::response::ApiResponse;
use crate::routes::common::format_validation_errors;
use db::models::announcement::{
    Column as AnnouncementCol, Entity as AnnouncementEntity, Model as Announcement,
};
use db::models::batch::Model as Batch;
use db::models::enrollment::Model as Enrollment;
use db::models::student::Model as Student;
use db::models::teacher::Model as Teacher;
use db::models::user::Role;

pub fn announcement_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_announcements).post(create_announcement))
        .route("/{announcement_id}", delete(delete_announcement))
}

/// GET /announcements
///
/// Role-scoped listing: admins see everything; teachers and students see
/// school-wide announcements plus those of their own batches.
pub async fn list_announcements(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<Vec<Announcement>>>) {
    let db = state.db();

    let batch_ids = match claims.role {
        Role::Admin => None,
        Role::Teacher => match Teacher::find_by_user_id(db, claims.sub).await {
            Ok(Some(teacher)) => match Batch::ids_for_teacher(db, teacher.id).await {
                Ok(ids) => Some(ids),
                Err(e) => {
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(ApiResponse::error(format!("Database error: {e}"))),
                    );
                }
            },
            _ => Some(Vec::new()),
        },
        Role::Student => match Student::find_by_user_id(db, claims.sub).await {
            Ok(Some(student)) => match Enrollment::batch_ids_for_student(db, student.id).await {
                Ok(ids) => Some(ids),
                Err(e) => {
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(ApiResponse::error(format!("Database error: {e}"))),
                    );
                }
            },
            _ => Some(Vec::new()),
        },
    };

    let result = match batch_ids {
        None => {
            AnnouncementEntity::find()
                .order_by_desc(AnnouncementCol::Pinned)
                .order_by_desc(AnnouncementCol::CreatedAt)
                .all(db)
                .await
        }
        Some(ids) => Announcement::visible_for_batches(db, &ids).await,
    };

    match result {
        Ok(items) => (
            StatusCode::OK,
            Json(ApiResponse::success(items, "Announcements retrieved")),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Database error: {e}"))),
        ),
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAnnouncementRequest {
    pub batch_id: Option<i64>,

    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,

    #[validate(length(min = 1, message = "Body is required"))]
    pub body: String,

    #[serde(default)]
    pub pinned: bool,
}

/// POST /announcements
///
/// Teachers may only post to their own batches; school-wide announcements
/// (`batch_id` null) are admin-only.
pub async fn create_announcement(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(req): Json<CreateAnnouncementRequest>,
) -> (StatusCode, Json<ApiResponse<Option<Announcement>>>) {
    if let Err(validation_errors) = req.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format_validation_errors(
                &validation_errors,
            ))),
        );
    }

    let db = state.db();

    if claims.role == Role::Teacher {
        let owns = match Teacher::find_by_user_id(db, claims.sub).await {
            Ok(Some(teacher)) => match req.batch_id {
                Some(batch_id) => Batch::ids_for_teacher(db, teacher.id)
                    .await
                    .map(|ids| ids.contains(&batch_id))
                    .unwrap_or(false),
                None => false,
            },
            _ => false,
        };
        if !owns {
            return (
                StatusCode::FORBIDDEN,
                Json(ApiResponse::error(
                    "Teachers may only post to their own batches",
                )),
            );
        }
    }

    match Announcement::create(
        db,
        req.batch_id,
        claims.sub,
        &req.title,
        &req.body,
        req.pinned,
    )
    .await
    {
        Ok(announcement) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(
                Some(announcement),
                "Announcement created",
            )),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!(
                "Failed to create announcement: {e}"
            ))),
        ),
    }
}

/// DELETE /announcements/{announcement_id}
pub async fn delete_announcement(
    State(state): State<AppState>,
    Path(announcement_id): Path<i64>,
) -> (StatusCode, Json<ApiResponse<Empty>>) {
    match AnnouncementEntity::delete_by_id(announcement_id)
        .exec(state.db())
        .await
    {
        Ok(res) if res.rows_affected > 0 => (
            StatusCode::OK,
            Json(ApiResponse::success(Empty, "Announcement deleted")),
        ),
        Ok(_) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Announcement not found")),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Database error: {e}"))),
        ),
    }
}

use axum::{Extension, Json, extract::State, http::StatusCode};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use util::state::AppState;

use crate::{auth::AuthUser, response::ApiResponse};

use super::common::{caller_owns_batch, db_error, load_session_context};
use db::models::attendance_session::Model as Session;

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub record_ids: Vec<i64>,
}

#[derive(Debug, Serialize, Default)]
pub struct OverrideResponse {
    pub updated: Vec<i64>,
}

/// PUT `/api/attendances/records`
///
/// Manual teacher override: marks each listed record present. The flag is
/// monotonic, so repeating the call with the same ids is harmless.
///
/// All records are checked before any is written: an unknown id fails the
/// whole request with `404`, a cancelled record with `409`, and a record in
/// a batch the caller does not own with `403`.
pub async fn override_records(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(req): Json<OverrideRequest>,
) -> (StatusCode, Json<ApiResponse<OverrideResponse>>) {
    let db = state.db();

    if req.record_ids.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("record_ids must not be empty")),
        );
    }

    let mut records = Vec::with_capacity(req.record_ids.len());
    let mut owned_sessions: HashMap<String, bool> = HashMap::new();

    for id in &req.record_ids {
        let record = match db::models::AttendanceRecord::find_by_id(*id).one(db).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                return (
                    StatusCode::NOT_FOUND,
                    Json(ApiResponse::error(format!(
                        "Attendance record {id} not found"
                    ))),
                );
            }
            Err(e) => return db_error(e),
        };

        if record.status == db::models::attendance_record::Status::Cancelled {
            return (
                StatusCode::CONFLICT,
                Json(ApiResponse::error(format!(
                    "Attendance record {id} is cancelled"
                ))),
            );
        }

        if !owned_sessions.contains_key(&record.session_id) {
            let session = match Session::find_by_id(db, &record.session_id).await {
                Ok(Some(session)) => session,
                Ok(None) => {
                    return (
                        StatusCode::NOT_FOUND,
                        Json(ApiResponse::error("Attendance session not found")),
                    );
                }
                Err(e) => return db_error(e),
            };
            let ctx = match load_session_context(db, &session).await {
                Ok(ctx) => ctx,
                Err(e) => return db_error(e),
            };
            let owns = match caller_owns_batch(db, &claims, &ctx.batch).await {
                Ok(owns) => owns,
                Err(e) => return db_error(e),
            };
            owned_sessions.insert(record.session_id.clone(), owns);
        }
        if !owned_sessions[&record.session_id] {
            return (
                StatusCode::FORBIDDEN,
                Json(ApiResponse::error("You do not own this session")),
            );
        }

        records.push(record);
    }

    let mut updated = Vec::with_capacity(records.len());
    let mut touched: HashSet<String> = HashSet::new();
    for record in records {
        let session_id = record.session_id.clone();
        match record.mark_present(db).await {
            Ok(record) => updated.push(record.id),
            Err(e) => return db_error(e),
        }
        touched.insert(session_id);
    }
    for session_id in touched {
        state.cache().invalidate_session(&session_id);
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            OverrideResponse { updated },
            "Attendance records updated",
        )),
    )
}

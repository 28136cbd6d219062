//! Attendance read routes: the teacher's session listing (which lazily
//! materializes today's sessions) and the per-session record listing.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{Datelike, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::collections::HashMap;
use util::{cache::Region, config, state::AppState};

use crate::{auth::AuthUser, response::ApiResponse};

use super::common::{
    SessionListResponse, SessionResponse, RecordListResponse, build_record_list, cached_summary,
    caller_owns_batch, db_error, load_session_context,
};
use crate::routes::common::{ListQuery, PageMeta};
use db::models::attendance_session::Model as Session;
use db::models::teacher::Model as Teacher;
use db::models::timetable::Model as Timetable;
use db::models::user::Role;

/// GET `/api/attendances/teachers/{teacher_id}/sessions`
///
/// List attendance sessions across the teacher's batches.
///
/// On every call, timetable slots of the teacher whose weekday matches today
/// get their session for today created if it does not exist yet; expired
/// sessions are flipped to `finished` in passing. Each row carries the
/// present/total counts and the QR scan URL for the session token.
///
/// **Auth**: the teacher themselves, or an admin.
///
/// **Query**: `search` (batch name), `page`, `limit`.
pub async fn list_teacher_sessions(
    State(state): State<AppState>,
    Path(teacher_id): Path<i64>,
    Query(q): Query<ListQuery>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<SessionListResponse>>) {
    let db = state.db();

    match claims.role {
        Role::Admin => {}
        Role::Teacher => match Teacher::find_by_user_id(db, claims.sub).await {
            Ok(Some(t)) if t.id == teacher_id => {}
            Ok(_) => {
                return (
                    StatusCode::FORBIDDEN,
                    Json(ApiResponse::error("You may only view your own sessions")),
                );
            }
            Err(e) => return db_error(e),
        },
        Role::Student => {
            return (
                StatusCode::FORBIDDEN,
                Json(ApiResponse::error("Insufficient permissions")),
            );
        }
    }

    let batches = match db::models::Batch::find()
        .filter(db::models::batch::Column::TeacherId.eq(teacher_id))
        .all(db)
        .await
    {
        Ok(batches) => batches,
        Err(e) => return db_error(e),
    };
    let batch_ids: Vec<i64> = batches.iter().map(|b| b.id).collect();
    let batch_by_id: HashMap<i64, &db::models::batch::Model> =
        batches.iter().map(|b| (b.id, b)).collect();

    let timetables = match Timetable::for_batches(db, &batch_ids).await {
        Ok(tts) => tts,
        Err(e) => return db_error(e),
    };

    // Materialize today's session for every slot that meets today.
    let today = Utc::now().date_naive();
    let weekday = today.weekday().num_days_from_sunday() as i32;
    for tt in timetables.iter().filter(|t| t.day_of_week == weekday) {
        if let Err(e) = Session::find_or_create_for(db, tt, today).await {
            return db_error(e);
        }
    }

    let timetable_ids: Vec<i64> = timetables.iter().map(|t| t.id).collect();
    let tt_by_id: HashMap<i64, &Timetable> = timetables.iter().map(|t| (t.id, t)).collect();

    let sessions = match Session::for_timetables(db, &timetable_ids).await {
        Ok(sessions) => sessions,
        Err(e) => return db_error(e),
    };

    let frontend = config::frontend_url();
    let mut rows = Vec::with_capacity(sessions.len());
    for session in sessions {
        let session = match session.refresh_status(db).await {
            Ok(session) => session,
            Err(e) => return db_error(e),
        };
        let Some(tt) = tt_by_id.get(&session.timetable_id) else {
            continue;
        };
        let Some(batch) = batch_by_id.get(&tt.batch_id) else {
            continue;
        };
        let summary = match cached_summary(&state, &session.id, batch.id).await {
            Ok(summary) => summary,
            Err(e) => return db_error(e),
        };
        rows.push(SessionResponse {
            qr_url: session.scan_url(&frontend),
            id: session.id,
            timetable_id: session.timetable_id,
            batch_id: batch.id,
            batch_name: batch.name.clone(),
            date: session.date.to_string(),
            status: session.status,
            start_time: session.start_time.to_rfc3339(),
            end_time: session.end_time.to_rfc3339(),
            present_count: summary.present,
            total_count: summary.total,
        });
    }

    if let Some(term) = q.search.as_ref().filter(|s| !s.trim().is_empty()) {
        let needle = term.to_lowercase();
        rows.retain(|r| r.batch_name.to_lowercase().contains(&needle));
    }

    let total = rows.len() as u64;
    let page = q.page();
    let limit = q.limit();
    let sessions: Vec<SessionResponse> = rows
        .into_iter()
        .skip(((page - 1) * limit) as usize)
        .take(limit as usize)
        .collect();

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            SessionListResponse {
                sessions,
                meta: PageMeta::new(total, page, limit),
            },
            "Attendance sessions retrieved",
        )),
    )
}

/// GET `/api/attendances/sessions/{session_id}/records`
///
/// List the records of one session with student names and summary counts.
/// Served from the record cache region until a write invalidates it.
///
/// **Auth**: the owning teacher, or an admin.
pub async fn list_session_records(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<RecordListResponse>>) {
    let db = state.db();

    let session = match Session::find_by_id(db, &session_id).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Attendance session not found")),
            );
        }
        Err(e) => return db_error(e),
    };
    let session = match session.refresh_status(db).await {
        Ok(session) => session,
        Err(e) => return db_error(e),
    };

    let ctx = match load_session_context(db, &session).await {
        Ok(ctx) => ctx,
        Err(e) => return db_error(e),
    };
    match caller_owns_batch(db, &claims, &ctx.batch).await {
        Ok(true) => {}
        Ok(false) => {
            return (
                StatusCode::FORBIDDEN,
                Json(ApiResponse::error("You do not own this session")),
            );
        }
        Err(e) => return db_error(e),
    }

    if let Some(value) = state.cache().get(Region::SessionRecords, &session.id) {
        if let Ok(cached) = serde_json::from_value::<RecordListResponse>(value) {
            return (
                StatusCode::OK,
                Json(ApiResponse::success(cached, "Attendance records retrieved")),
            );
        }
    }

    let resp = match build_record_list(&state, &session, ctx.batch.id).await {
        Ok(resp) => resp,
        Err(e) => return db_error(e),
    };
    if let Ok(value) = serde_json::to_value(&resp) {
        state
            .cache()
            .put(Region::SessionRecords, session.id.as_str(), value);
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(resp, "Attendance records retrieved")),
    )
}

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use util::state::AppState;

use crate::{auth::AuthUser, response::ApiResponse};

use super::common::{
    RecordListResponse, RecordResponse, build_record_list, caller_owns_batch, db_error,
    load_session_context,
};
use db::models::attendance_record::Model as Record;
use db::models::attendance_session::{Model as Session, Status as SessionStatus};
use db::models::enrollment::Model as Enrollment;
use db::models::student::Model as Student;
use db::models::user::Role;

/// POST `/api/attendances/sessions/{session_id}/generate`
///
/// Bulk-create a scheduled record for every active enrollment of the
/// session's batch. Idempotent: records that already exist are skipped and
/// the full record set is returned either way.
///
/// **Auth**: the owning teacher, or an admin.
///
/// ### Responses
/// - `200 OK` with the record listing
/// - `404 Not Found` unknown session
/// - `409 Conflict` session already finished
/// - `403 Forbidden` caller does not own the batch
pub async fn generate_records(
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
    if session.status == SessionStatus::Finished {
        return (
            StatusCode::CONFLICT,
            Json(ApiResponse::error("Attendance session already finished")),
        );
    }

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

    if let Err(e) = Record::generate_for_session(db, &session, ctx.batch.id).await {
        return db_error(e);
    }
    state.cache().invalidate_session(&session.id);

    match build_record_list(&state, &session, ctx.batch.id).await {
        Ok(resp) => (
            StatusCode::OK,
            Json(ApiResponse::success(resp, "Attendance records generated")),
        ),
        Err(e) => db_error(e),
    }
}

/// POST `/api/attendances/records/scan/{token}`
///
/// Self-service scan: a student resolves the session behind a QR token and
/// marks themselves present. Scanning an already-present record succeeds
/// again without changing anything, so clients can retry freely.
///
/// ### Responses
/// - `200 OK` with the student's record
/// - `404 Not Found` unknown token
/// - `410 Gone` expired token (nothing is mutated)
/// - `403 Forbidden` caller is not an enrolled student of the batch
pub async fn scan_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<Option<RecordResponse>>>) {
    let db = state.db();

    if claims.role != Role::Student {
        return (
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Only students may scan attendance tokens")),
        );
    }
    let student = match Student::find_by_user_id(db, claims.sub).await {
        Ok(Some(student)) => student,
        Ok(None) => {
            return (
                StatusCode::FORBIDDEN,
                Json(ApiResponse::error("Only students may scan attendance tokens")),
            );
        }
        Err(e) => return db_error(e),
    };

    let session = match Session::find_by_token(db, &token).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Unknown attendance token")),
            );
        }
        Err(e) => return db_error(e),
    };

    if session.is_expired(Utc::now()) {
        return (
            StatusCode::GONE,
            Json(ApiResponse::error("Attendance token expired")),
        );
    }

    let ctx = match load_session_context(db, &session).await {
        Ok(ctx) => ctx,
        Err(e) => return db_error(e),
    };

    let enrollment =
        match Enrollment::find_active_for_student_in_batch(db, ctx.batch.id, student.id).await {
            Ok(Some(enrollment)) => enrollment,
            Ok(None) => {
                return (
                    StatusCode::FORBIDDEN,
                    Json(ApiResponse::error("You are not enrolled in this class")),
                );
            }
            Err(e) => return db_error(e),
        };

    // The record may predate generation, or not exist yet if the teacher
    // never generated. Created on the fly in the latter case; a concurrent
    // generate or scan that wins the unique index race is resolved by
    // re-reading.
    let record = match Record::find_or_create_for_enrollment(db, &session, enrollment.id).await {
        Ok(record) => record,
        Err(e) => return db_error(e),
    };

    let record = match record.mark_present(db).await {
        Ok(record) => record,
        Err(e) => return db_error(e),
    };
    state.cache().invalidate_session(&session.id);

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            Some(RecordResponse {
                id: record.id,
                session_id: record.session_id,
                enrollment_id: record.enrollment_id,
                student_name: student.name,
                present: record.present,
                status: record.status,
            }),
            "Attendance marked",
        )),
    )
}

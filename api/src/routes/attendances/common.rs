use axum::{Json, http::StatusCode};
use db::models::{
    attendance_session::Model as Session, batch::Model as Batch, teacher::Model as Teacher,
    timetable::Model as Timetable,
};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};

use crate::auth::claims::Claims;
use crate::response::ApiResponse;
use crate::routes::common::PageMeta;
use db::models::user::Role;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionResponse {
    pub id: String,
    pub timetable_id: i64,
    pub batch_id: i64,
    pub batch_name: String,
    pub date: String,
    pub status: db::models::attendance_session::Status,
    pub start_time: String,
    pub end_time: String,
    pub present_count: u64,
    pub total_count: u64,
    pub qr_url: String,
}

#[derive(Debug, Serialize, Default)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionResponse>,
    pub meta: PageMeta,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecordResponse {
    pub id: i64,
    pub session_id: String,
    pub enrollment_id: i64,
    pub student_name: String,
    pub present: bool,
    pub status: db::models::attendance_record::Status,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct RecordListResponse {
    pub records: Vec<RecordResponse>,
    pub present_count: u64,
    pub total_count: u64,
}

/// The timetable and batch a session hangs off. Every lifecycle operation
/// needs both for ownership checks and summary denominators.
pub struct SessionContext {
    pub timetable: Timetable,
    pub batch: Batch,
}

pub async fn load_session_context(
    db: &DatabaseConnection,
    session: &Session,
) -> Result<SessionContext, sea_orm::DbErr> {
    let timetable = db::models::Timetable::find_by_id(session.timetable_id)
        .one(db)
        .await?
        .ok_or_else(|| sea_orm::DbErr::Custom("Session timetable missing".into()))?;
    let batch = db::models::Batch::find_by_id(timetable.batch_id)
        .one(db)
        .await?
        .ok_or_else(|| sea_orm::DbErr::Custom("Timetable batch missing".into()))?;
    Ok(SessionContext { timetable, batch })
}

/// Checks that the caller may operate on `batch`'s sessions: admins always,
/// teachers only for their own batches.
pub async fn caller_owns_batch(
    db: &DatabaseConnection,
    claims: &Claims,
    batch: &Batch,
) -> Result<bool, sea_orm::DbErr> {
    match claims.role {
        Role::Admin => Ok(true),
        Role::Teacher => Ok(Teacher::find_by_user_id(db, claims.sub)
            .await?
            .is_some_and(|t| t.id == batch.teacher_id)),
        Role::Student => Ok(false),
    }
}

/// Summary counts for one session, served from the cache when a previous
/// read already computed them. Write operations invalidate the region.
pub async fn cached_summary(
    state: &util::state::AppState,
    session_id: &str,
    batch_id: i64,
) -> Result<db::models::attendance_record::Summary, sea_orm::DbErr> {
    use util::cache::Region;

    if let Some(value) = state.cache().get(Region::SessionSummary, session_id) {
        if let Ok(summary) = serde_json::from_value(value) {
            return Ok(summary);
        }
    }

    let summary = db::models::attendance_record::Model::summary_for_session(
        state.db(),
        session_id,
        batch_id,
    )
    .await?;
    if let Ok(value) = serde_json::to_value(summary) {
        state.cache().put(Region::SessionSummary, session_id, value);
    }
    Ok(summary)
}

/// Builds the full record listing of a session, joined with student names.
pub async fn build_record_list(
    state: &util::state::AppState,
    session: &Session,
    batch_id: i64,
) -> Result<RecordListResponse, sea_orm::DbErr> {
    use sea_orm::{ColumnTrait, QueryFilter};
    use std::collections::HashMap;

    let db = state.db();
    let records =
        db::models::attendance_record::Model::for_session(db, &session.id).await?;

    let enrollment_ids: Vec<i64> = records.iter().map(|r| r.enrollment_id).collect();
    let enrollments = db::models::Enrollment::find()
        .filter(db::models::enrollment::Column::Id.is_in(enrollment_ids))
        .all(db)
        .await?;
    let student_ids: Vec<i64> = enrollments.iter().map(|e| e.student_id).collect();
    let students = db::models::Student::find()
        .filter(db::models::student::Column::Id.is_in(student_ids))
        .all(db)
        .await?;

    let name_by_student: HashMap<i64, String> =
        students.into_iter().map(|s| (s.id, s.name)).collect();
    let student_by_enrollment: HashMap<i64, i64> =
        enrollments.into_iter().map(|e| (e.id, e.student_id)).collect();

    let summary = cached_summary(state, &session.id, batch_id).await?;

    Ok(RecordListResponse {
        records: records
            .into_iter()
            .map(|r| {
                let student_name = student_by_enrollment
                    .get(&r.enrollment_id)
                    .and_then(|sid| name_by_student.get(sid))
                    .cloned()
                    .unwrap_or_default();
                RecordResponse {
                    id: r.id,
                    session_id: r.session_id,
                    enrollment_id: r.enrollment_id,
                    student_name,
                    present: r.present,
                    status: r.status,
                }
            })
            .collect(),
        present_count: summary.present,
        total_count: summary.total,
    })
}

pub fn db_error<T: Serialize + Default>(
    e: impl std::fmt::Display,
) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::error(format!("Database error: {e}"))),
    )
}

use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post, put},
};
use util::state::AppState;

use crate::auth::guards::permit;
use crate::auth::permissions::Subject;

mod common;
mod get;
mod post;
mod put;

pub use get::{list_session_records, list_teacher_sessions};
pub use post::{generate_records, scan_token};
pub use put::override_records;

pub fn attendance_routes() -> Router<AppState> {
    Router::new()
        .route("/teachers/{teacher_id}/sessions", get(list_teacher_sessions))
        .route("/sessions/{session_id}/generate", post(generate_records))
        .route("/sessions/{session_id}/records", get(list_session_records))
        .route("/records", put(override_records))
        .route("/records/scan/{token}", post(scan_token))
        .route_layer(from_fn(|req, next| permit(Subject::Attendance, req, next)))
}

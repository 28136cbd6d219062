//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → liveness check (public)
//! - `/auth` → login, refresh-token rotation, logout (public)
//! - `/attendances` → the attendance session/record lifecycle
//! - the remaining groups are capability-gated CRUD over the school domain
//!   (users, teachers, students, courses, classrooms, batches, enrollments,
//!   timetables, announcements, payments)

use crate::auth::guards::permit;
use crate::auth::permissions::Subject;
use axum::{Router, middleware::from_fn};
use util::state::AppState;

pub mod announcements;
pub mod attendances;
pub mod auth;
pub mod batches;
pub mod classrooms;
pub mod common;
pub mod courses;
pub mod enrollments;
pub mod health;
pub mod payments;
pub mod students;
pub mod teachers;
pub mod timetables;
pub mod users;

/// Builds the complete application router for all HTTP endpoints.
///
/// Each CRUD group is wrapped in a capability guard for its subject; the
/// action is derived from the HTTP method inside the guard. Ownership checks
/// finer than role capabilities (e.g. "this teacher owns this session") live
/// in the handlers.
pub fn routes(app_state: AppState) -> Router {
    fn gated(subject: Subject, router: Router<AppState>) -> Router<AppState> {
        router.route_layer(from_fn(move |req, next| permit(subject, req, next)))
    }

    Router::new()
        .nest("/health", health::health_routes())
        .nest("/auth", auth::auth_routes())
        .nest("/attendances", attendances::attendance_routes())
        .nest("/users", gated(Subject::Users, users::user_routes()))
        .nest("/teachers", gated(Subject::Teachers, teachers::teacher_routes()))
        .nest("/students", gated(Subject::Students, students::student_routes()))
        .nest("/courses", gated(Subject::Courses, courses::course_routes()))
        .nest(
            "/classrooms",
            gated(Subject::Classrooms, classrooms::classroom_routes()),
        )
        .nest("/batches", gated(Subject::Batches, batches::batch_routes()))
        .nest(
            "/enrollments",
            gated(Subject::Enrollments, enrollments::enrollment_routes()),
        )
        .nest(
            "/timetables",
            gated(Subject::Timetables, timetables::timetable_routes()),
        )
        .nest(
            "/announcements",
            gated(Subject::Announcements, announcements::announcement_routes()),
        )
        .nest("/payments", gated(Subject::Payments, payments::payment_routes()))
        .with_state(app_state)
}

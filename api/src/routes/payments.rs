//! Fee payment history.

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use util::state::AppState;
use validator::Validate;

use crate::auth::AuthUser;
use crate::auth::guards::Empty;
use crate::response::ApiResponse;
use crate::routes::common::{PageMeta, Paged, format_validation_errors};
use db::models::enrollment::Model as Enrollment;
use db::models::payment::{
    Column as PaymentCol, Entity as PaymentEntity, Method, Model as Payment,
};
use db::models::student::Model as Student;
use db::models::user::Role;

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_payments).post(create_payment))
        .route("/{payment_id}", delete(delete_payment))
}

#[derive(Debug, Deserialize)]
pub struct PaymentQuery {
    pub student_id: Option<i64>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// GET /payments?student_id=&search=
///
/// Admins see everything and may scope by `student_id`; students are always
/// scoped to their own enrollments, whatever the query says.
pub async fn list_payments(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Query(q): Query<PaymentQuery>,
) -> (StatusCode, Json<ApiResponse<Paged<Payment>>>) {
    let db = state.db();
    let page = q.page.unwrap_or(1).max(1);
    let limit = q.limit.unwrap_or(20).clamp(1, 100);

    let scope_student = match claims.role {
        Role::Student => match Student::find_by_user_id(db, claims.sub).await {
            Ok(Some(student)) => Some(student.id),
            Ok(None) => {
                return (
                    StatusCode::FORBIDDEN,
                    Json(ApiResponse::error("No student profile for this account")),
                );
            }
            Err(e) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error(format!("Database error: {e}"))),
                );
            }
        },
        _ => q.student_id,
    };

    let mut sel = PaymentEntity::find().order_by_desc(PaymentCol::PaidAt);

    if let Some(student_id) = scope_student {
        let enrollment_ids = match Enrollment::ids_for_student(db, student_id).await {
            Ok(ids) => ids,
            Err(e) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error(format!("Database error: {e}"))),
                );
            }
        };
        sel = sel.filter(PaymentCol::EnrollmentId.is_in(enrollment_ids));
    }

    if let Some(term) = q.search.as_ref().filter(|s| !s.trim().is_empty()) {
        sel = sel.filter(PaymentCol::Method.contains(term.as_str()));
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
            "Payments retrieved",
        )),
    )
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub enrollment_id: i64,

    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount: i64,

    pub method: Method,

    pub paid_at: Option<DateTime<Utc>>,
}

/// POST /payments
///
/// ### Responses
/// - `201 Created`
/// - `404 Not Found` unknown enrollment
pub async fn create_payment(
    State(state): State<AppState>,
    Json(req): Json<CreatePaymentRequest>,
) -> (StatusCode, Json<ApiResponse<Option<Payment>>>) {
    if let Err(validation_errors) = req.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format_validation_errors(
                &validation_errors,
            ))),
        );
    }

    let db = state.db();

    match db::models::Enrollment::find_by_id(req.enrollment_id).one(db).await {
        Ok(Some(_)) => {}
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
    }

    let paid_at = req.paid_at.unwrap_or_else(Utc::now);
    match Payment::create(db, req.enrollment_id, req.amount, req.method, paid_at).await {
        Ok(payment) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(Some(payment), "Payment recorded")),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to record payment: {e}"))),
        ),
    }
}

/// DELETE /payments/{payment_id}
pub async fn delete_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<i64>,
) -> (StatusCode, Json<ApiResponse<Empty>>) {
    match PaymentEntity::delete_by_id(payment_id).exec(state.db()).await {
        Ok(res) if res.rows_affected > 0 => (
            StatusCode::OK,
            Json(ApiResponse::success(Empty, "Payment deleted")),
        ),
        Ok(_) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Payment not found")),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Database error: {e}"))),
        ),
    }
}

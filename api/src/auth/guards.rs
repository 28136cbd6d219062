use crate::auth::claims::AuthUser;
use crate::auth::permissions::{Action, Subject, can_perform, capabilities_for_role};
use crate::response::ApiResponse;
use axum::{
    Json,
    body::Body,
    extract::FromRequestParts,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};

#[derive(serde::Serialize, Default)]
pub struct Empty;

/// Helper to extract and validate the user from the request, then insert the
/// claims back into the request extensions for handlers to read.
async fn extract_and_insert_authuser(
    mut req: Request<Body>,
) -> Result<(Request<Body>, AuthUser), (StatusCode, Json<ApiResponse<Empty>>)> {
    let (mut parts, body) = req.into_parts();
    let user = AuthUser::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error("Authentication required")),
            )
        })?;

    req = Request::from_parts(parts, body);
    req.extensions_mut().insert(user.clone());
    Ok((req, user))
}

/// Capability guard. The action is derived from the HTTP method, so one
/// guard per subject covers a whole route group:
///
/// ```ignore
/// .route_layer(from_fn(|req, next| permit(Subject::Courses, req, next)))
/// ```
pub async fn permit(
    subject: Subject,
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let (req, user) = extract_and_insert_authuser(req).await?;

    let action = match *req.method() {
        Method::POST => Action::Create,
        Method::PUT | Method::PATCH => Action::Update,
        Method::DELETE => Action::Delete,
        _ => Action::View,
    };

    let caps = capabilities_for_role(user.0.role);
    if !can_perform(&caps, subject, action) {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Insufficient permissions")),
        ));
    }

    Ok(next.run(req).await)
}

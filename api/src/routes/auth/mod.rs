use axum::{Router, routing::post};
use util::state::AppState;

mod post;

pub use post::{login, logout, refresh_token};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
        .route("/logout", post(logout))
}

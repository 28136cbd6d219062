use api::routes::routes;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Once;
use tower::ServiceExt;
use tower::util::BoxCloneService;
use util::{config::AppConfig, state::AppState};

static INIT: Once = Once::new();

fn init_test_config() {
    INIT.call_once(|| {
        // std::env::set_var is unsafe in edition 2024; this runs once before
        // any config access, while the test binary is still single threaded.
        unsafe {
            std::env::set_var("DATABASE_PATH", "sqlite::memory:");
            std::env::set_var("JWT_SECRET", "test-secret-key");
        }
    });
    AppConfig::set_jwt_duration_minutes(30);
    AppConfig::set_refresh_token_expiry_days(7);
    AppConfig::set_frontend_url("http://localhost:3001");
}

pub struct TestApp {
    pub app: BoxCloneService<Request<Body>, Response, Infallible>,
    pub state: AppState,
}

/// Builds the real router against a fresh in-memory database.
pub async fn make_test_app() -> TestApp {
    init_test_config();

    let db = db::test_utils::setup_test_db().await;
    let state = AppState::new(db);
    let router: Router = Router::new().nest("/api", routes(state.clone()));

    TestApp {
        app: router.into_service().boxed_clone(),
        state,
    }
}

impl TestApp {
    /// Fires one request and returns `(status, parsed body)`.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::auth::TokenValidator;
use crate::config::AppConfig;
use crate::database::{StudentRepository, StudentStore};
use crate::handlers::{protected::students, public};
use crate::middleware::{expose_error_stack, jwt_auth_middleware};

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub repository: StudentRepository,
    pub tokens: Arc<TokenValidator>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn StudentStore>, config: Arc<AppConfig>) -> Self {
        Self {
            repository: StudentRepository::new(store, config.clone()),
            tokens: Arc::new(TokenValidator::new(&config.security.jwt_secret)),
            config,
        }
    }
}

pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let mut router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Protected API
        .merge(student_routes(state.clone()))
        .layer(middleware::from_fn_with_state(state.clone(), expose_error_stack))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.api.max_request_size_bytes))
        .layer(TraceLayer::new_for_http());

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security.cors_origins));
    }
    router
}

fn student_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/students",
            get(students::student_list).post(students::student_create),
        )
        .route(
            "/api/students/:id",
            get(students::student_show)
                .put(students::student_update)
                .delete(students::student_delete),
        )
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

/// No configured origins means any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if parsed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(parsed))
    }
}

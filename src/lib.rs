pub mod auth;
pub mod cli;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;

use axum::{
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::state::AppState;

/// Full application router with global middleware.
pub fn app(state: AppState) -> Router {
    if state.config.security.jwt_secret.is_none() {
        if state.config.is_production() {
            tracing::error!("JWT_SECRET is not set in production; bearer token checks are disabled");
        } else {
            tracing::warn!("JWT_SECRET is not set; bearer token checks are disabled");
        }
    }

    let body_limit = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config.security);

    Router::new()
        // Public
        .route("/", get(handlers::system::root))
        .route("/health", get(handlers::system::health))
        // Protected when a JWT secret is configured
        .merge(business_routes(state.clone()))
        .with_state(state)
        // Global middleware
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn business_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(coleta_routes())
        .merge(production_routes())
        .merge(color_routes())
        .merge(employee_routes())
        .route_layer(from_fn_with_state(state, middleware::jwt_auth_middleware))
}

fn coleta_routes() -> Router<AppState> {
    use handlers::{coleta, protocol};

    Router::new()
        .route("/api/coleta", get(coleta::list).post(coleta::upsert))
        .route("/api/coleta/:id", delete(coleta::delete))
        .route("/api/coleta/:id/restore", post(coleta::restore))
        // Day closing and its legacy alias
        .route("/api/coleta/fechar-dia", post(protocol::close_day))
        .route("/api/coleta/print", post(protocol::close_day))
        // History and its legacy alias
        .route("/api/coleta/historico", get(protocol::history))
        .route("/api/coleta/protocolos", get(protocol::history))
        .route("/api/coleta/protocolo/:protocol_id", get(protocol::protocol_entries))
}

fn production_routes() -> Router<AppState> {
    use handlers::producao;

    Router::new()
        .route("/producoes", get(producao::list).post(producao::create))
        .route("/producoes/:id", put(producao::update).delete(producao::delete))
        .route("/importar-produtos", get(producao::import_products))
}

fn color_routes() -> Router<AppState> {
    use handlers::cores;

    Router::new().route("/cores", get(cores::list).post(cores::create))
}

fn employee_routes() -> Router<AppState> {
    use handlers::funcionarios;

    Router::new()
        .route("/api/funcionarios", get(funcionarios::list).post(funcionarios::create))
        .route("/api/funcionarios/:id/default", post(funcionarios::set_default))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

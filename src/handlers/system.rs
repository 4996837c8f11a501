// handlers/system.rs - GET / and GET /health

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Coleta API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Parcel collection log with daily protocol closing",
            "endpoints": {
                "coleta": "/api/coleta[/:id[/restore]]",
                "fechar_dia": "/api/coleta/fechar-dia, /api/coleta/print",
                "historico": "/api/coleta/historico, /api/coleta/protocolos",
                "protocolo": "/api/coleta/protocolo/:id",
                "producoes": "/producoes[/:id], /importar-produtos",
                "cores": "/cores",
                "funcionarios": "/api/funcionarios[/:id/default]",
            }
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let now = state.clock.format_timestamp(chrono::Utc::now());

    match state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database_error": e.to_string()
                    }
                })),
            )
        }
    }
}

use crate::dispatch::Dispatcher;
use crate::errors::{GatewayError, Result};
use crate::models::{self, ApiRequest, ApiResponse};
use actix_cors::Cors;
use actix_web::{http::header, web, HttpResponse};
use serde::Serialize;
use serde_json::json;
use splitledger_core::Metrics;
use std::sync::Arc;
use tracing::warn;

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub metrics: Metrics,
}

/// Health check endpoint
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "splitledger",
        "version": env!("CARGO_PKG_VERSION"),
        "tenants": state.dispatcher.registry().len()
    }))
}

/// Prometheus metrics endpoint
pub async fn metrics(state: web::Data<AppState>) -> HttpResponse {
    match state.metrics.encode() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

/// RPC entry point: `{"module", "method", "params"}`
pub async fn rpc(state: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse> {
    let request: ApiRequest = serde_json::from_slice(&body)
        .and_then(models::from_value)
        .map_err(|e| {
            warn!("POST req - failed unmarshall: {}", e);
            GatewayError::BadRequest(e.to_string())
        })?;

    let dispatcher = state.dispatcher.clone();
    let method = request.canonical_method();
    let response = web::block(move || dispatcher.dispatch(&method, request.params)).await??;

    let body = to_indented_json(&ApiResponse::ok(response))?;
    Ok(HttpResponse::Ok()
        .content_type(header::ContentType::json())
        .body(body))
}

/// Bare OPTIONS requests (preflights are answered by the CORS middleware)
pub async fn options() -> HttpResponse {
    HttpResponse::Ok()
        .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .insert_header((header::ACCESS_CONTROL_ALLOW_METHODS, "POST,OPTIONS"))
        .insert_header((header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"))
        .finish()
}

fn to_indented_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    Ok(buffer)
}

/// CORS policy for browser clients
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allowed_methods(vec!["POST", "OPTIONS"])
        .allowed_header(header::CONTENT_TYPE)
        .max_age(3600)
}

/// Configure routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/metrics", web::get().to(metrics))
        .service(
            web::resource("/")
                .route(web::post().to(rpc))
                .route(web::route().method(actix_web::http::Method::OPTIONS).to(options))
                .default_service(web::to(|| async { HttpResponse::MethodNotAllowed().finish() })),
        );
}

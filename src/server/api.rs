use crate::agent::{ AgentError, ArchitectAgent };
use crate::cli::Args;
use crate::models::agent::{ AgentRequest, ApiSuccess, ErrorBody, PipelineResult, RequestError };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    body::Bytes,
    routing::{ get, post },
    Router,
    Json,
    extract::{ DefaultBodyLimit, State, rejection::BytesRejection },
    response::{ IntoResponse, Response },
    http::StatusCode,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, warn, error };
use uuid::Uuid;

/// Largest `POST /agent` body accepted, in bytes.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] RequestError),

    #[error("Invalid body: {}", .0.body_text())]
    Body(#[from] BytesRejection),

    #[error("Method not allowed. Send POST /agent with a JSON body")]
    MethodNotAllowed,

    #[error("Not found. Send POST /agent with a JSON body")]
    NotFound,

    #[error("Failed to load agent: {0}")]
    Unavailable(String),

    #[error("Failed to process: {0}")]
    Pipeline(#[from] AgentError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Body(rejection) => rejection.status(),
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) | ApiError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

/// The agent built at startup, or why it could not be built.
#[derive(Clone)]
pub struct AppState {
    agent: Result<Arc<ArchitectAgent>, String>,
}

impl AppState {
    pub fn ready(agent: Arc<ArchitectAgent>) -> Self {
        Self { agent: Ok(agent) }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self { agent: Err(reason.into()) }
    }

    pub fn agent(&self) -> Result<&Arc<ArchitectAgent>, &str> {
        self.agent.as_ref().map_err(String::as_str)
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    agent_loaded: bool,
    client_ready: bool,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/agent", post(agent_handler))
        .route("/health", get(health_handler))
        .method_not_allowed_fallback(|| async { ApiError::MethodNotAllowed })
        .fallback(|| async { ApiError::NotFound })
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(state: AppState, args: &Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = args.server_addr.parse::<SocketAddr>()?;
    let app = router(state);

    if args.enable_tls {
        let (cert_path, key_path) = match (&args.tls_cert_path, &args.tls_key_path) {
            (Some(cert), Some(key)) => (cert, key),
            _ => {
                error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                return Err("TLS enabled without cert/key".into());
            }
        };
        info!("TLS enabled. Loading certificate from '{}' and key from '{}'", cert_path, key_path);
        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path).await?;

        info!("Starting HTTPS API server on: https://{}", addr);
        axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
    } else {
        let listener = tokio::net::TcpListener
            ::bind(addr).await
            .map_err(|e| format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e))?;

        info!("Starting HTTP API server on: http://{}", addr);
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal()).await?;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return std::future::pending().await;
    }
    info!("Shutdown signal received, draining connections");
}

async fn agent_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ApiSuccess<PipelineResult>>, ApiError> {
    let request_id = Uuid::new_v4();
    info!("[{}] HTTP trigger /agent received.", request_id);

    let agent = match state.agent() {
        Ok(agent) => agent,
        Err(reason) => {
            error!("[{}] Agent unavailable: {}", request_id, reason);
            return Err(ApiError::Unavailable(reason.to_string()));
        }
    };

    let body = body.map_err(|e| {
        warn!("[{}] Unreadable body: {}", request_id, e);
        e
    })?;
    let req = AgentRequest::from_slice(&body).map_err(|e| {
        warn!("[{}] Rejected request: {}", request_id, e);
        e
    })?;
    info!("[{}] Problem length={} critic={}", request_id, req.problem.chars().count(), req.critic);

    match agent.run(&req.problem, req.critic).await {
        Ok(result) => {
            info!("[{}] Proposal size={}", request_id, result.proposal.chars().count());
            Ok(Json(ApiSuccess::new(result)))
        }
        Err(e) => {
            error!("[{}] Pipeline failed: {}", request_id, error_chain(&e));
            Err(ApiError::Pipeline(e))
        }
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (agent_loaded, client_ready) = match state.agent() {
        Ok(agent) => (true, agent.client_ready()),
        Err(_) => (false, false),
    };
    Json(HealthResponse { status: "ok", agent_loaded, client_ready })
}

fn error_chain(err: &dyn Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(&format!(" | caused by: {}", cause));
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;

    #[test]
    fn validation_errors_map_to_bad_request() {
        let err = ApiError::from(RequestError::InvalidProblem);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().starts_with("Field 'problem'"));
    }

    #[test]
    fn pipeline_and_load_errors_map_to_server_error() {
        let err = ApiError::from(AgentError::Proposal(LlmError::EmptyResponse));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.to_string(),
            "Failed to process: Failed to generate proposal: Chat API returned an empty completion"
        );
        assert_eq!(ApiError::Unavailable("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn routing_errors_keep_their_status() {
        assert_eq!(ApiError::MethodNotAllowed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn error_chain_includes_sources() {
        let err = AgentError::CriticReview(LlmError::Timeout(std::time::Duration::from_secs(2)));
        let chain = error_chain(&err);
        assert!(chain.contains("critic review"));
        assert!(chain.contains("caused by: Chat request timed out after 2s"));
    }
}

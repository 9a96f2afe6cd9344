//! HTTP surface: `POST /send-sms`.

use std::any::Any;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::domain::{
    DeliveryResult, ProviderMessageId, RawRequest, RequestValidator, ValidationError,
};
use crate::gateway::DeliveryGateway;

/// Largest accepted request body. Well above the longest valid message.
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Per-process state shared by all requests. Nothing in it is mutated.
pub struct AppState {
    validator: RequestValidator,
    gateway: DeliveryGateway,
}

impl AppState {
    pub fn new(validator: RequestValidator, gateway: DeliveryGateway) -> Self {
        Self { validator, gateway }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// JSON body of every `/send-sms` response.
pub struct SendSmsResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendSmsResponse {
    fn sent(sid: &ProviderMessageId) -> Self {
        Self {
            success: true,
            sid: Some(sid.as_str().to_owned()),
            error: None,
        }
    }

    fn failure(error: String) -> Self {
        Self {
            success: false,
            sid: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, thiserror::Error)]
/// Caller-facing failures. `Display` is exactly what the caller sees.
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    ProviderRejected(String),

    #[error("temporarily unavailable")]
    TemporarilyUnavailable,

    #[error("request body exceeds {MAX_REQUEST_BYTES} bytes")]
    PayloadTooLarge,

    #[error("internal error")]
    Internal,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::ProviderRejected(_) => StatusCode::BAD_GATEWAY,
            Self::TemporarilyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(SendSmsResponse::failure(self.to_string()))).into_response()
    }
}

/// Map a delivery outcome onto the HTTP contract. Transient details stay in the logs.
pub fn delivery_response(result: DeliveryResult) -> Result<SendSmsResponse, ApiError> {
    match result {
        DeliveryResult::Sent {
            provider_message_id,
        } => Ok(SendSmsResponse::sent(&provider_message_id)),
        DeliveryResult::ProviderRejected { error_detail } => {
            Err(ApiError::ProviderRejected(error_detail))
        }
        DeliveryResult::TransientFailure { .. } => Err(ApiError::TemporarilyUnavailable),
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/send-sms", post(send_sms_handler))
        .with_state(Arc::new(state))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
}

/// Serve `router` on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(address) = listener.local_addr() {
        info!(%address, "SMS gateway listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("SMS gateway stopped");
    Ok(())
}

async fn send_sms_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<SendSmsResponse>, ApiError> {
    let body = body.map_err(|rejection| {
        info!(status = %rejection.status(), error = %rejection.body_text(), "unreadable request body");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::Validation(ValidationError::MalformedPayload)
        }
    })?;

    let command = state
        .validator
        .validate(RawRequest::from_slice(&body))
        .inspect_err(|err| info!(field = err.field(), error = %err, "rejected invalid request"))?;

    delivery_response(state.gateway.send(command).await).map(Json)
}

fn handle_panic(_panic: Box<dyn Any + Send + 'static>) -> Response {
    error!("request handler panicked");
    ApiError::Internal.into_response()
}

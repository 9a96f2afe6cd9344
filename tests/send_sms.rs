use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use smsgate::domain::{MessageBody, Recipient};
use smsgate::gateway::BoxFuture;
use smsgate::{
    AppState, DeliveryGateway, ProviderError, ProviderMessageId, ProviderResponse,
    RecipientFormat, RequestValidator, SmsProvider, server,
};
use tower::ServiceExt;

#[derive(Clone, Copy)]
enum Behavior {
    Succeed(&'static str),
    Reject(&'static str),
    Unavailable,
    FailOnceThenSucceed(&'static str),
    Panic,
}

struct DoubleProvider {
    behavior: Behavior,
    calls: AtomicUsize,
    recipients: Mutex<Vec<String>>,
}

impl DoubleProvider {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            recipients: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SmsProvider for DoubleProvider {
    fn send<'a>(
        &'a self,
        recipient: &'a Recipient,
        _body: &'a MessageBody,
    ) -> BoxFuture<'a, Result<ProviderResponse, ProviderError>> {
        Box::pin(async move {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.recipients
                .lock()
                .unwrap()
                .push(recipient.as_str().to_owned());

            let accepted = |sid: &str| -> Result<ProviderResponse, ProviderError> {
                Ok(ProviderResponse {
                    message_id: ProviderMessageId::new(sid).unwrap(),
                    status: Some("queued".to_owned()),
                })
            };
            let unavailable = || -> Result<ProviderResponse, ProviderError> {
                Err(ProviderError::HttpStatus {
                    status: 503,
                    code: None,
                    message: Some("Service Unavailable".to_owned()),
                })
            };

            match self.behavior {
                Behavior::Succeed(sid) => accepted(sid),
                Behavior::Reject(reason) => Err(ProviderError::HttpStatus {
                    status: 400,
                    code: Some(21211),
                    message: Some(reason.to_owned()),
                }),
                Behavior::Unavailable => unavailable(),
                Behavior::FailOnceThenSucceed(sid) if call > 1 => accepted(sid),
                Behavior::FailOnceThenSucceed(_) => unavailable(),
                Behavior::Panic => panic!("provider exploded"),
            }
        })
    }
}

fn app(provider: Arc<DoubleProvider>) -> axum::Router {
    app_with_validator(provider, RequestValidator::new())
}

fn app_with_validator(provider: Arc<DoubleProvider>, validator: RequestValidator) -> axum::Router {
    server::router(AppState::new(validator, DeliveryGateway::new(provider)))
}

async fn post(app: axum::Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/send-sms")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn payload(value: Value) -> String {
    value.to_string()
}

#[tokio::test]
async fn successful_send_returns_provider_sid() {
    let provider = DoubleProvider::new(Behavior::Succeed("SM123"));

    let (status, body) = post(
        app(provider.clone()),
        payload(json!({ "to": "+15551234567", "message": "hello" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "sid": "SM123" }));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn empty_recipient_is_rejected_without_calling_provider() {
    let provider = DoubleProvider::new(Behavior::Succeed("SM123"));

    let (status, body) = post(
        app(provider.clone()),
        payload(json!({ "to": "", "message": "hello" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "success": false, "error": "missing or empty field: to" })
    );
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn missing_message_is_named() {
    let provider = DoubleProvider::new(Behavior::Succeed("SM123"));

    let (status, body) = post(
        app(provider.clone()),
        payload(json!({ "to": "+15551234567", "message": "   " })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "success": false, "error": "missing or empty field: message" })
    );
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let provider = DoubleProvider::new(Behavior::Succeed("SM123"));

    let (status, body) = post(app(provider.clone()), "{\"to\": ").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "success": false, "error": "malformed payload: expected a JSON object" })
    );
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn oversized_body_is_rejected_as_json() {
    let provider = DoubleProvider::new(Behavior::Succeed("SM123"));
    let message = "x".repeat(3 * 1024 * 1024);

    let (status, body) = post(
        app(provider.clone()),
        payload(json!({ "to": "+15551234567", "message": message })),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        body,
        json!({ "success": false, "error": "request body exceeds 65536 bytes" })
    );
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn provider_rejection_maps_to_bad_gateway_with_reason() {
    let reason = "The 'To' number +15551234567 is not a valid phone number.";
    let provider = DoubleProvider::new(Behavior::Reject(reason));

    let (status, body) = post(
        app(provider.clone()),
        payload(json!({ "to": "+15551234567", "message": "hi" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, json!({ "success": false, "error": reason }));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_map_to_service_unavailable() {
    let provider = DoubleProvider::new(Behavior::Unavailable);

    let (status, body) = post(
        app(provider.clone()),
        payload(json!({ "to": "+15551234567", "message": "hi" })),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body,
        json!({ "success": false, "error": "temporarily unavailable" })
    );
    assert_eq!(provider.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn transient_failure_then_success_is_sent() {
    let provider = DoubleProvider::new(Behavior::FailOnceThenSucceed("SM777"));

    let (status, body) = post(
        app(provider.clone()),
        payload(json!({ "to": "+15551234567", "message": "hi" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "sid": "SM777" }));
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn panicking_provider_maps_to_internal_error() {
    let provider = DoubleProvider::new(Behavior::Panic);

    let (status, body) = post(
        app(provider),
        payload(json!({ "to": "+15551234567", "message": "hi" })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "success": false, "error": "internal error" }));
}

#[tokio::test]
async fn e164_validator_normalizes_before_delivery() {
    let provider = DoubleProvider::new(Behavior::Succeed("SM1"));
    let validator = RequestValidator::new().with_recipient_format(RecipientFormat::E164 {
        default_region: Some(phonenumber::country::Id::RU),
    });

    let (status, _) = post(
        app_with_validator(provider.clone(), validator),
        payload(json!({ "to": " 925 123-45-67 ", "message": "hi" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        provider.recipients.lock().unwrap().clone(),
        vec!["+79251234567".to_owned()]
    );
}

#[tokio::test]
async fn get_is_not_allowed() {
    let provider = DoubleProvider::new(Behavior::Succeed("SM1"));
    let request = Request::builder()
        .method("GET")
        .uri("/send-sms")
        .body(Body::empty())
        .unwrap();

    let response = app(provider.clone()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(provider.calls(), 0);
}

//! Validated HTTP gateway in front of the Twilio SMS API.
//!
//! The crate is layered like a client library: a domain layer of strong types
//! (validation, no I/O), a transport layer for Twilio's wire format, a client
//! layer issuing the HTTP calls, and on top of those the delivery gateway
//! (retries, outcome mapping) and the `axum` server exposing `POST /send-sms`.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use smsgate::{GatewayConfig, TwilioClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = GatewayConfig::from_env()?;
//!     let provider = Arc::new(TwilioClient::from_config(&config)?);
//!     let state = smsgate::server::AppState::new(config.validator()?, config.gateway(provider));
//!     let listener = tokio::net::TcpListener::bind(&config.listen_address).await?;
//!     smsgate::server::serve(listener, smsgate::server::router(state), std::future::pending())
//!         .await?;
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod domain;
pub mod gateway;
pub mod logging;
pub mod server;
mod transport;

pub use client::{Credentials, TwilioClient, TwilioClientBuilder, TwilioClientError};
pub use config::GatewayConfig;
pub use domain::{
    AccountSid, AuthToken, DeliveryResult, DeliveryStatus, MessageBody, PhoneNumber,
    ProviderMessageId, RawRequest, Recipient, RecipientFormat, RequestValidator, SendCommand,
    SenderAddress, ValidationError,
};
pub use gateway::{
    DeliveryGateway, FailureClass, ProviderError, ProviderResponse, RetryPolicy, SmsProvider,
};
pub use server::{ApiError, AppState, SendSmsResponse};

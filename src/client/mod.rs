//! Client layer: the Twilio `Messages` API as an [`SmsProvider`].

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::config::GatewayConfig;
use crate::domain::{AccountSid, AuthToken, MessageBody, Recipient, SenderAddress};
use crate::gateway::{BoxFuture, ProviderError, ProviderResponse, SmsProvider};

const DEFAULT_API_BASE: &str = "https://api.twilio.com";

#[derive(Debug, Clone)]
struct HttpResponse {
    status: u16,
    body: String,
}

trait HttpTransport: Send + Sync {
    fn post_form<'a>(
        &'a self,
        url: &'a Url,
        credentials: &'a Credentials,
        params: Vec<(String, String)>,
    ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn StdError + Send + Sync>>>;
}

#[derive(Debug, Clone)]
struct ReqwestTransport {
    client: reqwest::Client,
}

impl HttpTransport for ReqwestTransport {
    fn post_form<'a>(
        &'a self,
        url: &'a Url,
        credentials: &'a Credentials,
        params: Vec<(String, String)>,
    ) -> BoxFuture<'a, Result<HttpResponse, Box<dyn StdError + Send + Sync>>> {
        Box::pin(async move {
            // URLs carry the account sid; keep them out of error messages.
            let response = self
                .client
                .post(url.clone())
                .basic_auth(
                    credentials.account_sid.as_str(),
                    Some(credentials.auth_token.expose()),
                )
                .form(&params)
                .send()
                .await
                .map_err(reqwest::Error::without_url)?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(reqwest::Error::without_url)?;
            Ok(HttpResponse { status, body })
        })
    }
}

#[derive(Debug, Clone)]
/// Account credentials and sender used for every message.
///
/// `Debug` output never contains the auth token.
pub struct Credentials {
    pub account_sid: AccountSid,
    pub auth_token: AuthToken,
    pub from: SenderAddress,
}

#[derive(Debug, thiserror::Error)]
/// Errors raised while constructing a [`TwilioClient`].
pub enum TwilioClientError {
    #[error("invalid API base URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
/// Builder for [`TwilioClient`].
///
/// Use this when you need to customize the API base URL, timeout, or user-agent.
pub struct TwilioClientBuilder {
    credentials: Credentials,
    api_base: String,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl TwilioClientBuilder {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            api_base: DEFAULT_API_BASE.to_owned(),
            timeout: None,
            user_agent: None,
        }
    }

    /// Override the API base URL (scheme, host, optional path prefix).
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set an HTTP client timeout applied to each provider call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the HTTP `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn build(self) -> Result<TwilioClient, TwilioClientError> {
        let messages_url = messages_url(&self.api_base, &self.credentials.account_sid)?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let client = builder.build()?;

        Ok(TwilioClient {
            credentials: self.credentials,
            messages_url,
            http: Arc::new(ReqwestTransport { client }),
        })
    }
}

#[derive(Clone)]
/// Twilio REST client limited to creating outbound messages.
///
/// Messages are created with `POST {api_base}/2010-04-01/Accounts/{sid}/Messages.json`
/// using HTTP basic auth and a form body of `To`, `From` and `Body`.
pub struct TwilioClient {
    credentials: Credentials,
    messages_url: Url,
    http: Arc<dyn HttpTransport>,
}

impl TwilioClient {
    pub fn builder(credentials: Credentials) -> TwilioClientBuilder {
        TwilioClientBuilder::new(credentials)
    }

    /// Build a client from startup configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, TwilioClientError> {
        Self::builder(config.credentials())
            .api_base(config.twilio_api_base.clone())
            .timeout(config.provider_timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
    }

    pub fn messages_url(&self) -> &Url {
        &self.messages_url
    }

    /// Create one outbound message.
    ///
    /// Errors:
    /// - [`ProviderError::Transport`] when the request never got a response,
    /// - [`ProviderError::HttpStatus`] for non-2xx responses, carrying Twilio's
    ///   error `code` and `message` when the body has them,
    /// - [`ProviderError::Parse`] when a 2xx body has no usable `sid`.
    pub async fn send_message(
        &self,
        to: &Recipient,
        body: &MessageBody,
    ) -> Result<ProviderResponse, ProviderError> {
        let params = crate::transport::encode_message_form(&self.credentials.from, to, body);

        let response = self
            .http
            .post_form(&self.messages_url, &self.credentials, params)
            .await
            .map_err(ProviderError::Transport)?;

        if !(200..=299).contains(&response.status) {
            let decoded = crate::transport::decode_error_json_response(&response.body);
            return Err(ProviderError::HttpStatus {
                status: response.status,
                code: decoded.code,
                message: decoded.message,
            });
        }

        let decoded = crate::transport::decode_message_json_response(&response.body)
            .map_err(|err| ProviderError::Parse(Box::new(err)))?;

        Ok(ProviderResponse {
            message_id: decoded.sid,
            status: decoded.status,
        })
    }
}

impl SmsProvider for TwilioClient {
    fn send<'a>(
        &'a self,
        recipient: &'a Recipient,
        body: &'a MessageBody,
    ) -> BoxFuture<'a, Result<ProviderResponse, ProviderError>> {
        Box::pin(self.send_message(recipient, body))
    }
}

fn messages_url(api_base: &str, account: &AccountSid) -> Result<Url, url::ParseError> {
    let mut base = Url::parse(api_base.trim())?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(&crate::transport::messages_path(account))
}

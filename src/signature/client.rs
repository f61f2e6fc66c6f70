//! Signature provider client
//!
//! One blocking POST per dispatch. Nothing is retried here; the approval desk
//! records the failure and an operator retries by hand.

use crate::config::SignatureSettings;
use crate::error::PortalError;
use crate::signature::request::SignatureRequest;
use reqwest::blocking::{Client, Request};
use serde::{Deserialize, Serialize};

pub const SEND_WITH_TEMPLATE_PATH: &str = "/v3/signature_request/send_with_template";
pub const DEFAULT_FAILURE_MESSAGE: &str = "Failed to send signature request";

/// Successful dispatch. The id is absent when the provider accepted the
/// request but did not echo one back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureReceipt {
    pub signature_request_id: Option<String>,
}

/// Something that can send a templated signature request
pub trait SignatureProvider {
    fn send_with_template(&self, request: &SignatureRequest) -> Result<SignatureReceipt, PortalError>;
}

/// HTTP client for the hosted provider
pub struct HttpSignatureClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl HttpSignatureClient {
    pub fn new(settings: &SignatureSettings) -> Result<Self, PortalError> {
        let http = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}{SEND_WITH_TEMPLATE_PATH}", settings.api_base),
            api_key: settings.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the POST without sending it
    pub fn build(&self, request: &SignatureRequest) -> Result<Request, PortalError> {
        let built = self
            .http
            .post(&self.endpoint)
            .basic_auth(&self.api_key, None::<&str>)
            .json(request)
            .build()?;
        Ok(built)
    }
}

impl SignatureProvider for HttpSignatureClient {
    fn send_with_template(&self, request: &SignatureRequest) -> Result<SignatureReceipt, PortalError> {
        log::info!(
            "Sending signature request \"{}\" to {} (test_mode={})",
            request.subject,
            self.endpoint,
            request.test_mode
        );

        let response = self.http.execute(self.build(request)?)?;

        let status = response.status().as_u16();
        let body = response.text()?;
        log::debug!("Signature provider responded with HTTP {status}");

        parse_response(status, &body)
    }
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    signature_request: Option<RequestInfo>,
    error: Option<ErrorInfo>,
}

#[derive(Debug, Deserialize)]
struct RequestInfo {
    signature_request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorInfo {
    error_msg: Option<String>,
    error_name: Option<String>,
}

/// Interpret a provider response. Any 2xx is a success, with or without a
/// request id. Non-JSON error bodies fall back to the generic failure message.
pub fn parse_response(status: u16, body: &str) -> Result<SignatureReceipt, PortalError> {
    let parsed: Option<ResponseBody> = serde_json::from_str(body).ok();

    if (200..300).contains(&status) {
        let id = parsed
            .and_then(|b| b.signature_request)
            .and_then(|r| r.signature_request_id)
            .filter(|id| !id.is_empty());

        match &id {
            Some(id) => log::info!("Signature request {id} created"),
            None => log::warn!("Signature provider returned HTTP {status} without a request id"),
        }
        return Ok(SignatureReceipt {
            signature_request_id: id,
        });
    }

    let error = parsed.and_then(|b| b.error);
    let code = error.as_ref().and_then(|e| e.error_name.clone());
    let message = error
        .and_then(|e| e.error_msg)
        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());

    log::warn!("Signature provider error {status}: {message}");
    Err(PortalError::Provider {
        status,
        code,
        message,
    })
}

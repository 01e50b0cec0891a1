//! Push notification payloads and delivery.
//!
//! Delivery goes through the [`PushSender`] trait so the engine never talks
//! to a push provider directly. Failures are classified: an invalid or
//! unregistered token gets pruned by the caller, any other failure is counted
//! and the token is kept for the next send.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushKind {
    EntryDue,
    FaturaDue,
    TaskDue,
}

/// Body delivered to a device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub url: String,
    /// Collapse key: a newer notification with the same tag replaces the older one.
    pub tag: String,
    #[serde(rename = "type")]
    pub kind: PushKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushError {
    #[error("push token is invalid or unregistered")]
    InvalidToken,
    #[error("push delivery failed: {0}")]
    Transient(String),
}

pub trait PushSender: Send + Sync {
    fn send(
        &self,
        token: &str,
        payload: &PushPayload,
    ) -> impl Future<Output = Result<(), PushError>> + Send;
}

/// Only logs what would have been delivered.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogPushSender;

impl PushSender for LogPushSender {
    async fn send(&self, token: &str, payload: &PushPayload) -> Result<(), PushError> {
        tracing::info!(
            token = %masked(token),
            tag = %payload.tag,
            "push notification: {}",
            payload.title
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct GatewayRequest<'a> {
    token: &'a str,
    notification: &'a PushPayload,
}

/// Posts `{token, notification}` as JSON to a push gateway.
///
/// The gateway answers 404 or 410 for tokens the provider no longer knows.
#[derive(Clone, Debug)]
pub struct HttpPushSender {
    client: reqwest::Client,
    gateway_url: String,
}

impl HttpPushSender {
    pub fn new(gateway_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            gateway_url: gateway_url.into(),
        }
    }
}

impl PushSender for HttpPushSender {
    async fn send(&self, token: &str, payload: &PushPayload) -> Result<(), PushError> {
        let response = self
            .client
            .post(&self.gateway_url)
            .json(&GatewayRequest {
                token,
                notification: payload,
            })
            .send()
            .await
            .map_err(|err| PushError::Transient(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            return Err(PushError::InvalidToken);
        }
        Err(PushError::Transient(format!("gateway answered {status}")))
    }
}

/// Sender selected at startup from configuration.
#[derive(Clone, Debug)]
pub enum PushGateway {
    Log(LogPushSender),
    Http(HttpPushSender),
}

impl PushSender for PushGateway {
    async fn send(&self, token: &str, payload: &PushPayload) -> Result<(), PushError> {
        match self {
            Self::Log(sender) => sender.send(token, payload).await,
            Self::Http(sender) => sender.send(token, payload).await,
        }
    }
}

fn masked(token: &str) -> String {
    let tail: String = token
        .chars()
        .rev()
        .take(6)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("…{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_kind_as_type() {
        let payload = PushPayload {
            title: "Fatura due".to_string(),
            body: "Nubank 2026-01: 120.00".to_string(),
            url: "/faturas".to_string(),
            tag: "fatura-1".to_string(),
            kind: PushKind::FaturaDue,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], "fatura_due");
        assert_eq!(value["url"], "/faturas");
    }

    #[test]
    fn masked_keeps_only_the_tail() {
        assert_eq!(masked("abcdefghij"), "…efghij");
        assert_eq!(masked("abc"), "…abc");
    }
}

use crate::error::{Error, Result};
use reqwest::{Client, RequestBuilder, header};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// A response that made it back from upstream, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    /// Canonical reason phrase for `status`, when one exists.
    pub reason: Option<String>,
    pub body: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response (DNS, connect, TLS, timeout, body read).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub message: String,
}

pub type Outcome = std::result::Result<UpstreamResponse, TransportError>;

/// Thin wrapper over `reqwest`. One attempt per call, no retries.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| Error::http(e.to_string()))?;
        Ok(Self { client })
    }

    /// Authenticated JSON GET with optional query parameters.
    pub async fn get(&self, url: &str, token: Option<&str>, query: &[(&str, &str)]) -> Outcome {
        let mut req = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json");
        if !query.is_empty() {
            req = req.query(query);
        }
        self.send(authorize(req, token)).await
    }

    /// Authenticated JSON POST.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        token: Option<&str>,
        body: &B,
    ) -> Outcome {
        let req = self
            .client
            .post(url)
            .header(header::ACCEPT, "application/json")
            .json(body);
        self.send(authorize(req, token)).await
    }

    async fn send(&self, req: RequestBuilder) -> Outcome {
        let resp = req.send().await.map_err(|e| {
            warn!(error = %e, "upstream request failed before a response");
            TransportError {
                message: e.to_string(),
            }
        })?;

        let status = resp.status();
        debug!(status = status.as_u16(), url = %resp.url(), "upstream responded");

        let body = resp.text().await.map_err(|e| TransportError {
            message: e.to_string(),
        })?;

        Ok(UpstreamResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().map(String::from),
            body,
        })
    }
}

fn authorize(req: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => req.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => req,
    }
}

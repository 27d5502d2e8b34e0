//! Client for a running gateway in server mode. The proxy holds the upstream
//! token, so requests here carry none; responses go through the same
//! normalizer as upstream calls.

use crate::api::order::{PlaceOrderRequest, Segment};
use crate::constants::{USER_AGENT, commands};
use crate::envelope::{Envelope, normalize};
use crate::error::Result;
use crate::http::HttpClient;
use serde_json::Value;
use std::time::Duration;

#[derive(Clone)]
pub struct ProxyClient {
    http: HttpClient,
    base_url: String,
}

impl ProxyClient {
    /// `base_url` is the gateway address, e.g. `http://localhost:3000`.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(USER_AGENT, timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn get_profile(&self) -> Envelope {
        self.get(commands::GET_PROFILE, &[]).await
    }

    pub async fn get_funds_and_margin(&self, segment: Option<Segment>) -> Envelope {
        match segment {
            Some(s) => {
                self.get(commands::GET_FUNDS_MARGIN, &[("segment", s.code())])
                    .await
            }
            None => self.get(commands::GET_FUNDS_MARGIN, &[]).await,
        }
    }

    pub async fn get_long_term_holdings(&self) -> Envelope {
        self.get(commands::LONG_TERM_HOLDINGS, &[]).await
    }

    pub async fn get_short_term_positions(&self) -> Envelope {
        self.get(commands::SHORT_TERM_POSITIONS, &[]).await
    }

    pub async fn place_order(&self, order: &PlaceOrderRequest) -> Envelope {
        let url = format!("{}/{}", self.base_url, commands::PLACE_ORDER);
        normalize(self.http.post_json(&url, None, order).await)
    }

    /// Generic `POST /{command}` dispatch.
    pub async fn run(&self, command: &str, params: &Value) -> Envelope {
        let url = format!("{}/{command}", self.base_url);
        normalize(self.http.post_json(&url, None, params).await)
    }

    async fn get(&self, command: &str, query: &[(&str, &str)]) -> Envelope {
        let url = format!("{}/{command}", self.base_url);
        normalize(self.http.get(&url, None, query).await)
    }
}

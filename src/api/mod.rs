//! Upstream Upstox client. Each call issues exactly one HTTP request and
//! returns the normalized envelope with the payload exactly as upstream sent
//! it. Transport and upstream failures never surface as `Err`.
//!
//! The records in [`models`] are a typed view for library callers:
//! `client.get_profile(token).await.decode::<UserProfile>()`.

pub mod models;
pub mod order;
pub mod proxy;

use crate::config::Config;
use crate::constants::{USER_AGENT, endpoints};
use crate::envelope::{Envelope, normalize};
use crate::error::Result;
use crate::http::HttpClient;
use order::{PlaceOrderRequest, Segment};
use tracing::{debug, info};

#[derive(Clone)]
pub struct UpstoxClient {
    http: HttpClient,
    base_url: String,
}

impl UpstoxClient {
    pub fn new(base_url: &str, http: HttpClient) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let http = HttpClient::new(USER_AGENT, config.timeout())?;
        Ok(Self::new(&config.upstox.api_url, http))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get_profile(&self, token: &str) -> Envelope {
        self.get(endpoints::PROFILE, token, &[]).await
    }

    pub async fn get_funds_and_margin(&self, token: &str, segment: Option<Segment>) -> Envelope {
        match segment {
            Some(segment) => {
                self.get(
                    endpoints::FUNDS_AND_MARGIN,
                    token,
                    &[("segment", segment.code())],
                )
                .await
            }
            None => self.get(endpoints::FUNDS_AND_MARGIN, token, &[]).await,
        }
    }

    pub async fn get_long_term_holdings(&self, token: &str) -> Envelope {
        self.get(endpoints::LONG_TERM_HOLDINGS, token, &[]).await
    }

    pub async fn get_short_term_positions(&self, token: &str) -> Envelope {
        self.get(endpoints::SHORT_TERM_POSITIONS, token, &[]).await
    }

    pub async fn get_mtf_positions(&self, token: &str) -> Envelope {
        self.get(endpoints::MTF_POSITIONS, token, &[]).await
    }

    pub async fn get_order_book(&self, token: &str) -> Envelope {
        self.get(endpoints::ORDER_BOOK, token, &[]).await
    }

    pub async fn place_order(&self, token: &str, order: &PlaceOrderRequest) -> Envelope {
        info!(
            instrument = %order.instrument_token,
            quantity = order.quantity,
            side = %order.transaction_type,
            order_type = %order.order_type,
            "placing order"
        );
        let url = self.url(endpoints::PLACE_ORDER);
        normalize(self.http.post_json(&url, Some(token), order).await)
    }

    async fn get(&self, path: &str, token: &str, query: &[(&str, &str)]) -> Envelope {
        let url = self.url(path);
        debug!(%url, "GET");
        normalize(self.http.get(&url, Some(token), query).await)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let http = HttpClient::new("test", None).unwrap();
        let client = UpstoxClient::new("https://api.example.com/", http);
        assert_eq!(client.base_url(), "https://api.example.com");
        assert_eq!(
            client.url(endpoints::PROFILE),
            "https://api.example.com/v2/user/profile"
        );
    }
}

//! Fixed tables shared by every façade: upstream endpoints, proxy routes,
//! error codes and user-facing messages.
//!
//! Upstream paths use one consistent version set: `/v2` for account and
//! portfolio reads, `/v3` for order placement and MTF positions.

pub const APP_NAME: &str = "upstox-gateway";

/// User agent sent on every upstream request.
pub const USER_AGENT: &str = concat!("upstox-gateway/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_API_URL: &str = "https://api.upstox.com";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

/// Environment variables read once while building [`crate::config::Config`].
pub mod env {
    pub const API_URL: &str = "UPSTOX_API_URL";
    pub const ACCESS_TOKEN: &str = "UPSTOX_ACCESS_TOKEN";
    pub const PORT: &str = "PORT";
}

/// Upstream REST paths, relative to the API base URL.
pub mod endpoints {
    pub const PROFILE: &str = "/v2/user/profile";
    pub const FUNDS_AND_MARGIN: &str = "/v2/user/get-funds-and-margin";
    pub const LONG_TERM_HOLDINGS: &str = "/v2/portfolio/long-term-holdings";
    pub const SHORT_TERM_POSITIONS: &str = "/v2/portfolio/short-term-positions";
    pub const MTF_POSITIONS: &str = "/v3/portfolio/mtf-positions";
    pub const ORDER_BOOK: &str = "/v2/order/retrieve-all";
    pub const PLACE_ORDER: &str = "/v3/order/place";
}

/// Command names. Used as CLI subcommands, proxy routes (`/<name>`) and,
/// with underscores, as agent tool names.
pub mod commands {
    pub const GET_PROFILE: &str = "get-profile";
    pub const GET_FUNDS_MARGIN: &str = "get-funds-margin";
    pub const LONG_TERM_HOLDINGS: &str = "long-term-holdings";
    pub const SHORT_TERM_POSITIONS: &str = "short-term-positions";
    pub const MTF_POSITIONS: &str = "mtf-positions";
    pub const ORDER_BOOK: &str = "order-book";
    pub const PLACE_ORDER: &str = "place-order";

    /// Read-only operations, served on GET as well as POST.
    pub const READS: &[&str] = &[
        GET_PROFILE,
        GET_FUNDS_MARGIN,
        LONG_TERM_HOLDINGS,
        SHORT_TERM_POSITIONS,
        MTF_POSITIONS,
        ORDER_BOOK,
    ];

    pub fn is_known(name: &str) -> bool {
        name == PLACE_ORDER || READS.contains(&name)
    }
}

pub mod status {
    pub const SUCCESS: &str = "success";
    pub const ERROR: &str = "error";
}

pub mod error_codes {
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";
    pub const COMMAND_NOT_FOUND: &str = "COMMAND_NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const TOKEN_NOT_SET: &str = "TOKEN_NOT_SET";
}

pub mod messages {
    pub const API_REQUEST_FAILED: &str = "API request failed";
    pub const METHOD_NOT_ALLOWED: &str = "Method Not Allowed";
    pub const TOKEN_NOT_SET: &str = "Upstox access token not set in environment variables";

    pub fn command_not_found(command: &str) -> String {
        format!("Command {command} not found")
    }
}

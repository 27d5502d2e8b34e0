//! HTTP proxy façade.
//!
//! # Routes
//!
//! - `GET /get-profile`, `/get-funds-margin?segment=`, `/long-term-holdings`,
//!   `/short-term-positions`, `/mtf-positions`, `/order-book`
//! - `POST /place-order` with the order as JSON body
//! - `POST /{command}` generic dispatch; the JSON body holds the parameters
//! - `GET /health`
//!
//! Handled envelopes (success or error) answer 200, unknown commands 404,
//! internal failures 500. A known command on the wrong method answers 405.
//! Every body, including the fallbacks, is JSON with a `status` field.

use crate::api::UpstoxClient;
use crate::config::Config;
use crate::constants::{self, commands, messages};
use crate::envelope::{Envelope, ErrorEntry};
use crate::error::{Error, Result};
use crate::operation::{self, Reply};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Read-only state shared by all requests.
pub struct AppState {
    client: UpstoxClient,
    token: Option<String>,
}

impl AppState {
    pub fn new(client: UpstoxClient, token: Option<String>) -> Self {
        Self { client, token }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            UpstoxClient::from_config(config)?,
            config.access_token().map(String::from),
        ))
    }
}

/// Build the router. Read routes answer GET with query parameters and POST
/// with a JSON body; both go through the same dispatcher.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new().route("/health", get(health));
    for command in commands::READS {
        app = app.route(
            &format!("/{command}"),
            get(run_query).post(run_command),
        );
    }
    app.route(&format!("/{}", commands::PLACE_ORDER), post(run_command))
        .route("/{command}", post(run_command))
        .fallback(not_found)
        .method_not_allowed_fallback(wrong_method)
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(config)?;
    if state.token.is_none() {
        warn!("{}", messages::TOKEN_NOT_SET);
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::config(format!("Failed to bind {addr}: {e}")))?;
    info!(%addr, upstream = %state.client.base_url(), "gateway listening");

    axum::serve(listener, router(Arc::new(state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": constants::status::SUCCESS,
        "data": {
            "service": constants::APP_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        }
    }))
}

async fn run_query(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let params: Map<String, Value> = query
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    respond(&state, command_name(&uri), &Value::Object(params)).await
}

async fn run_command(State(state): State<Arc<AppState>>, uri: Uri, body: Bytes) -> Response {
    let command = command_name(&uri);
    let params = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Map::new())
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(v) => v,
            Err(e) => {
                let err = Error::validation("body", format!("Request body is not valid JSON: {e}"));
                return envelope_response(StatusCode::OK, Envelope::<Value>::rejected(&err));
            }
        }
    };
    respond(&state, command, &params).await
}

async fn respond(state: &AppState, command: &str, params: &Value) -> Response {
    let reply = operation::dispatch(&state.client, state.token.as_deref(), command, params).await;
    let status = match &reply {
        Reply::Envelope(_) => StatusCode::OK,
        Reply::NotFound(_) => StatusCode::NOT_FOUND,
        Reply::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    info!(command, status = status.as_u16(), error = reply.is_error(), "handled");
    (status, Json(reply.into_value())).into_response()
}

async fn not_found(uri: Uri) -> Response {
    let command = command_name(&uri);
    warn!(command, "unknown route");
    envelope_response(StatusCode::NOT_FOUND, Envelope::command_not_found(command))
}

async fn wrong_method(method: Method, uri: Uri) -> Response {
    let command = command_name(&uri);
    if !commands::is_known(command) {
        return not_found(uri).await;
    }
    warn!(command, %method, "method not allowed");
    envelope_response(
        StatusCode::METHOD_NOT_ALLOWED,
        Envelope::error(ErrorEntry::new(
            StatusCode::METHOD_NOT_ALLOWED.as_str(),
            messages::METHOD_NOT_ALLOWED,
        )),
    )
}

fn envelope_response(status: StatusCode, envelope: Envelope) -> Response {
    (status, Json(envelope)).into_response()
}

fn command_name(uri: &Uri) -> &str {
    uri.path().trim_start_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_name_strips_leading_slash() {
        let uri: Uri = "/get-profile?x=1".parse().unwrap();
        assert_eq!(command_name(&uri), "get-profile");
    }
}

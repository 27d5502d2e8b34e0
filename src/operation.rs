//! The dispatch shim shared by the CLI, HTTP and agent-tool façades: one
//! enum naming every upstream operation, built from a command name plus
//! JSON parameters and executed against an [`UpstoxClient`].

use crate::api::UpstoxClient;
use crate::api::order::{PlaceOrderArgs, PlaceOrderRequest, Segment, parse_segment};
use crate::constants::{commands, error_codes, messages};
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use serde_json::Value;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    GetProfile,
    GetFundsMargin { segment: Option<Segment> },
    LongTermHoldings,
    ShortTermPositions,
    MtfPositions,
    OrderBook,
    PlaceOrder(PlaceOrderRequest),
}

impl Operation {
    /// Resolve a command and its parameters. `Ok(None)` means the command is
    /// unknown; `Err` is a validation failure on the parameters.
    pub fn from_command(name: &str, params: &Value) -> Result<Option<Self>> {
        let op = match name {
            commands::GET_PROFILE => Self::GetProfile,
            commands::GET_FUNDS_MARGIN => Self::GetFundsMargin {
                segment: parse_segment(string_param(params, "segment")?)?,
            },
            commands::LONG_TERM_HOLDINGS => Self::LongTermHoldings,
            commands::SHORT_TERM_POSITIONS => Self::ShortTermPositions,
            commands::MTF_POSITIONS => Self::MtfPositions,
            commands::ORDER_BOOK => Self::OrderBook,
            commands::PLACE_ORDER => {
                Self::PlaceOrder(PlaceOrderArgs::from_json(params)?.validate()?)
            }
            _ => return Ok(None),
        };
        Ok(Some(op))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::GetProfile => commands::GET_PROFILE,
            Self::GetFundsMargin { .. } => commands::GET_FUNDS_MARGIN,
            Self::LongTermHoldings => commands::LONG_TERM_HOLDINGS,
            Self::ShortTermPositions => commands::SHORT_TERM_POSITIONS,
            Self::MtfPositions => commands::MTF_POSITIONS,
            Self::OrderBook => commands::ORDER_BOOK,
            Self::PlaceOrder(_) => commands::PLACE_ORDER,
        }
    }

    /// Issue the upstream request and return the serialized envelope.
    /// The payload is not reshaped on the way through.
    pub async fn execute(&self, client: &UpstoxClient, token: &str) -> Result<Value> {
        let envelope = match self {
            Self::GetProfile => client.get_profile(token).await,
            Self::GetFundsMargin { segment } => client.get_funds_and_margin(token, *segment).await,
            Self::LongTermHoldings => client.get_long_term_holdings(token).await,
            Self::ShortTermPositions => client.get_short_term_positions(token).await,
            Self::MtfPositions => client.get_mtf_positions(token).await,
            Self::OrderBook => client.get_order_book(token).await,
            Self::PlaceOrder(order) => client.place_order(token, order).await,
        };
        envelope.to_value()
    }
}

fn string_param<'a>(params: &'a Value, key: &str) -> Result<Option<&'a str>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(Error::invalid_value(key, "must be a string", other.clone())),
    }
}

/// What a façade should hand back to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The operation ran or was rejected in a handled way.
    Envelope(Value),
    /// No operation with that name.
    NotFound(Value),
    /// Something failed inside the gateway itself.
    Internal(Value),
}

impl Reply {
    pub fn value(&self) -> &Value {
        match self {
            Self::Envelope(v) | Self::NotFound(v) | Self::Internal(v) => v,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Envelope(v) | Self::NotFound(v) | Self::Internal(v) => v,
        }
    }

    /// True when the body is an error envelope, whatever the cause.
    pub fn is_error(&self) -> bool {
        self.value().get("status").and_then(Value::as_str) != Some("success")
    }
}

/// Resolve, validate and run one command. A missing token short-circuits
/// with a warning before anything is sent.
pub async fn dispatch(
    client: &UpstoxClient,
    token: Option<&str>,
    command: &str,
    params: &Value,
) -> Reply {
    let op = match Operation::from_command(command, params) {
        Ok(Some(op)) => op,
        Ok(None) => {
            warn!(command, "unknown command");
            return reply(Envelope::<Value>::command_not_found(command), Reply::NotFound);
        }
        Err(e) => {
            info!(command, error = %e, "request rejected before dispatch");
            return reply(Envelope::<Value>::rejected(&e), Reply::Envelope);
        }
    };
    run(client, token, &op).await
}

/// Run an already-built operation.
pub async fn run(client: &UpstoxClient, token: Option<&str>, op: &Operation) -> Reply {
    let Some(token) = token else {
        warn!(command = op.name(), "{}", messages::TOKEN_NOT_SET);
        return reply(Envelope::<Value>::token_not_set(), Reply::Envelope);
    };

    match op.execute(client, token).await {
        Ok(value) => Reply::Envelope(value),
        Err(e) => {
            error!(command = op.name(), error = %e, "operation failed");
            reply(Envelope::<Value>::internal(e.to_string()), Reply::Internal)
        }
    }
}

fn reply(envelope: Envelope, wrap: fn(Value) -> Reply) -> Reply {
    match envelope.to_value() {
        Ok(v) => wrap(v),
        Err(e) => Reply::Internal(serde_json::json!({
            "status": "error",
            "errors": [{
                "error_code": error_codes::INTERNAL_SERVER_ERROR,
                "message": e.to_string(),
                "property_path": null,
                "invalid_value": null
            }]
        })),
    }
}

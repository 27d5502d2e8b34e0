//! Agent-tool façade: one tool per upstream operation.
//!
//! Each tool takes an optional `accessToken` (falling back to the configured
//! token) plus the operation's own parameters, runs the same dispatcher as
//! the CLI and HTTP façades, and returns the envelope as a single text block.

pub mod mcp;

use crate::api::UpstoxClient;
use crate::constants::commands;
use crate::envelope::Envelope;
use crate::error::Error;
use crate::operation::{self, Operation, Reply};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolResult {
    fn from_value(value: &Value, is_error: bool) -> Self {
        let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        Self {
            content: vec![Content::Text { text }],
            is_error,
        }
    }

    fn from_envelope(envelope: Envelope) -> Self {
        let is_error = !envelope.is_success();
        match envelope.to_value() {
            Ok(v) => Self::from_value(&v, is_error),
            Err(e) => Self::message(e.to_string(), true),
        }
    }

    fn message(text: String, is_error: bool) -> Self {
        Self {
            content: vec![Content::Text { text }],
            is_error,
        }
    }

    /// Text of the first content block.
    pub fn text(&self) -> &str {
        match self.content.first() {
            Some(Content::Text { text }) => text,
            None => "",
        }
    }
}

/// Tool name → command name.
const TOOLS: &[(&str, &str)] = &[
    ("get_profile", commands::GET_PROFILE),
    ("get_funds_margin", commands::GET_FUNDS_MARGIN),
    ("get_long_term_holdings", commands::LONG_TERM_HOLDINGS),
    ("get_short_term_positions", commands::SHORT_TERM_POSITIONS),
    ("get_mtf_positions", commands::MTF_POSITIONS),
    ("get_order_book", commands::ORDER_BOOK),
    ("place_order", commands::PLACE_ORDER),
];

fn command_for(tool: &str) -> Option<&'static str> {
    TOOLS.iter().find(|(t, _)| *t == tool).map(|(_, c)| *c)
}

fn token_property() -> Value {
    json!({
        "type": "string",
        "description": "Upstox access token. Omit to use the token the server was started with."
    })
}

fn token_only_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "accessToken": token_property() },
        "required": []
    })
}

/// Build the tool definitions advertised to the agent.
pub fn tool_definitions() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "get_profile".into(),
            description: "Get the Upstox user profile: user id, name, email, broker, enabled \
                          exchanges, products and order types."
                .into(),
            input_schema: token_only_schema(),
        },
        ToolDef {
            name: "get_funds_margin".into(),
            description: "Get available funds and margin for the equity and commodity \
                          segments. Optionally filter to one segment."
                .into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "accessToken": token_property(),
                    "segment": {
                        "type": "string",
                        "enum": ["SEC", "COM"],
                        "description": "SEC for equity, COM for commodity. Omit for both."
                    }
                },
                "required": []
            }),
        },
        ToolDef {
            name: "get_long_term_holdings".into(),
            description: "List long-term (delivery) holdings with quantity, average price, \
                          last price and P&L."
                .into(),
            input_schema: token_only_schema(),
        },
        ToolDef {
            name: "get_short_term_positions".into(),
            description: "List the day's short-term positions with buy/sell quantities, \
                          realised and unrealised P&L."
                .into(),
            input_schema: token_only_schema(),
        },
        ToolDef {
            name: "get_mtf_positions".into(),
            description: "List margin-trading-facility (MTF) positions.".into(),
            input_schema: token_only_schema(),
        },
        ToolDef {
            name: "get_order_book".into(),
            description: "List all orders placed during the day with their current status."
                .into(),
            input_schema: token_only_schema(),
        },
        ToolDef {
            name: "place_order".into(),
            description: "Place an order. Requires instrument_token (e.g. \
                          'NSE_EQ|INE848E01016'), quantity and transaction_type (BUY or SELL)."
                .into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "accessToken": token_property(),
                    "instrument_token": { "type": "string", "minLength": 1 },
                    "quantity": { "type": "integer", "minimum": 1 },
                    "transaction_type": { "type": "string", "enum": ["BUY", "SELL"] },
                    "product": { "type": "string", "enum": ["D", "I", "M", "CO", "BO"], "default": "D" },
                    "order_type": { "type": "string", "enum": ["MARKET", "LIMIT", "SL", "SL-M"], "default": "MARKET" },
                    "validity": { "type": "string", "enum": ["DAY", "IOC"], "default": "DAY" },
                    "price": { "type": "number", "minimum": 0, "default": 0 },
                    "trigger_price": { "type": "number", "minimum": 0, "default": 0 },
                    "disclosed_quantity": { "type": "integer", "minimum": 0, "default": 0 },
                    "is_amo": { "type": "boolean", "default": false },
                    "slice": { "type": "boolean", "default": false },
                    "tag": { "type": "string" }
                },
                "required": ["instrument_token", "quantity", "transaction_type"]
            }),
        },
    ]
}

/// What every tool call needs: the upstream client and the fallback token.
pub struct ToolContext {
    pub client: UpstoxClient,
    pub default_token: Option<String>,
}

impl ToolContext {
    pub fn new(client: UpstoxClient, default_token: Option<String>) -> Self {
        Self {
            client,
            default_token,
        }
    }
}

/// Dispatch a tool call by name.
pub async fn dispatch(ctx: &ToolContext, tool_name: &str, input: &Value) -> ToolResult {
    let Some(command) = command_for(tool_name) else {
        return ToolResult::message(format!("Unknown tool: {tool_name}"), true);
    };
    debug!(tool = tool_name, command, "tool call");

    let args = match input {
        Value::Null => Value::Object(Default::default()),
        Value::Object(_) => input.clone(),
        _ => {
            let err = Error::validation("arguments", "Tool arguments must be a JSON object");
            return ToolResult::from_envelope(Envelope::rejected(&err));
        }
    };

    let token = match args.get("accessToken") {
        None | Some(Value::Null) => ctx.default_token.as_deref(),
        Some(Value::String(t)) if t.trim().is_empty() => ctx.default_token.as_deref(),
        Some(Value::String(t)) => Some(t.trim()),
        Some(other) => {
            let err = Error::invalid_value("accessToken", "must be a string", other.clone());
            return ToolResult::from_envelope(Envelope::rejected(&err));
        }
    };

    let op = match Operation::from_command(command, &args) {
        Ok(Some(op)) => op,
        Ok(None) => return ToolResult::from_envelope(Envelope::command_not_found(command)),
        Err(e) => return ToolResult::from_envelope(Envelope::rejected(&e)),
    };

    let reply = operation::run(&ctx.client, token, &op).await;
    let is_error = reply.is_error();
    match reply {
        Reply::Envelope(v) | Reply::NotFound(v) | Reply::Internal(v) => {
            ToolResult::from_value(&v, is_error)
        }
    }
}

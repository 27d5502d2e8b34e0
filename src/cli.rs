//! One-shot execution behind the `upstox` subcommands. Decides what the
//! binary prints; `main` only does the printing.

use crate::api::UpstoxClient;
use crate::constants::messages;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::operation::{self, Operation, Reply};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Envelope for stdout.
    Print(Value),
    /// Nothing on stdout; the reason has been logged.
    Nothing,
    /// Internal failure for stderr, with a non-zero exit.
    Failed(String),
}

/// Run one command. A parameter error is printed as a validation envelope;
/// a missing token sends nothing and prints nothing.
pub async fn run_once(client: &UpstoxClient, token: Option<&str>, op: Result<Operation>) -> Output {
    let op = match op {
        Ok(op) => op,
        Err(e) => return rejected(&e),
    };
    let Some(token) = token else {
        warn!(command = op.name(), "{}", messages::TOKEN_NOT_SET);
        return Output::Nothing;
    };
    output(&op, operation::run(client, Some(token), &op).await)
}

fn rejected(err: &Error) -> Output {
    match Envelope::<Value>::rejected(err).to_value() {
        Ok(v) => Output::Print(v),
        Err(e) => Output::Failed(e.to_string()),
    }
}

fn output(op: &Operation, reply: Reply) -> Output {
    match reply {
        Reply::Internal(v) => {
            let message = v["errors"][0]["message"].as_str().unwrap_or("internal error");
            Output::Failed(format!("{} failed: {message}", op.name()))
        }
        other => Output::Print(other.into_value()),
    }
}

//! MCP server over stdio: newline-delimited JSON-RPC 2.0.

use super::{ToolContext, dispatch, tool_definitions};
use crate::constants::APP_NAME;
use crate::error::Result;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;

/// Serve on the process's stdin/stdout until stdin closes.
pub async fn serve_stdio(ctx: &ToolContext) -> Result<()> {
    info!("MCP server ready on stdio");
    serve(ctx, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

/// Read one message per line from `reader`, answer on `writer`. Stops at EOF
/// or after `shutdown`.
pub async fn serve<R, W>(ctx: &ToolContext, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (response, stop) = match serde_json::from_str::<Value>(line) {
            Ok(msg) => {
                let stop = msg.get("method").and_then(Value::as_str) == Some("shutdown");
                (handle_message(ctx, &msg).await, stop)
            }
            Err(e) => {
                warn!(error = %e, "unparseable MCP message");
                (Some(rpc_error(Value::Null, PARSE_ERROR, "parse error")), false)
            }
        };

        if let Some(response) = response {
            let mut out = serde_json::to_vec(&response)?;
            out.push(b'\n');
            writer.write_all(&out).await?;
            writer.flush().await?;
        }
        if stop {
            break;
        }
    }
    info!("MCP server stopped");
    Ok(())
}

/// Answer one JSON-RPC message. Notifications (no `id`) get no response.
pub async fn handle_message(ctx: &ToolContext, msg: &Value) -> Option<Value> {
    let id = msg.get("id").cloned().filter(|v| !v.is_null());
    let Some(method) = msg.get("method").and_then(Value::as_str) else {
        return id.map(|id| rpc_error(id, INVALID_REQUEST, "missing method"));
    };
    let Some(id) = id else {
        debug!(method, "notification");
        return None;
    };
    let params = msg.get("params").cloned().unwrap_or_else(|| json!({}));

    let result = match method {
        "initialize" => {
            let protocol = params
                .get("protocolVersion")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_PROTOCOL_VERSION);
            json!({
                "protocolVersion": protocol,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": APP_NAME,
                    "version": env!("CARGO_PKG_VERSION")
                }
            })
        }
        "ping" | "shutdown" => json!({}),
        "tools/list" => json!({ "tools": tool_definitions() }),
        "tools/call" => {
            let name = params.get("name").and_then(Value::as_str).unwrap_or("");
            let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
            let result = dispatch(ctx, name, &arguments).await;
            debug!(tool = name, is_error = result.is_error, "tool call answered");
            serde_json::to_value(&result).unwrap_or_else(|e| {
                json!({
                    "content": [{ "type": "text", "text": e.to_string() }],
                    "isError": true
                })
            })
        }
        _ => return Some(rpc_error(id, METHOD_NOT_FOUND, "method not found")),
    };

    Some(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

fn rpc_error(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::UpstoxClient;
    use crate::http::HttpClient;

    fn ctx() -> ToolContext {
        let http = HttpClient::new("test", None).unwrap();
        ToolContext::new(UpstoxClient::new("http://127.0.0.1:1", http), None)
    }

    #[tokio::test]
    async fn initialize_echoes_protocol_version() {
        let msg = json!({
            "jsonrpc": "2.0", "id": 1, "method": "initialize",
            "params": { "protocolVersion": "2025-03-26" }
        });
        let resp = handle_message(&ctx(), &msg).await.unwrap();
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(resp["result"]["serverInfo"]["name"], APP_NAME);
    }

    #[tokio::test]
    async fn tools_list_advertises_every_tool() {
        let msg = json!({"jsonrpc": "2.0", "id": "a", "method": "tools/list"});
        let resp = handle_message(&ctx(), &msg).await.unwrap();
        let tools = resp["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), tool_definitions().len());
        assert!(tools.iter().all(|t| t.get("inputSchema").is_some()));
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let msg = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        assert!(handle_message(&ctx(), &msg).await.is_none());
    }

    #[tokio::test]
    async fn unknown_method_is_rejected() {
        let msg = json!({"jsonrpc": "2.0", "id": 7, "method": "resources/list"});
        let resp = handle_message(&ctx(), &msg).await.unwrap();
        assert_eq!(resp["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn tools_call_without_token_reports_error() {
        let msg = json!({
            "jsonrpc": "2.0", "id": 3, "method": "tools/call",
            "params": { "name": "get_profile", "arguments": {} }
        });
        let resp = handle_message(&ctx(), &msg).await.unwrap();
        assert_eq!(resp["result"]["isError"], true);
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("TOKEN_NOT_SET"));
    }

    #[tokio::test]
    async fn serve_answers_line_by_line_and_stops_on_shutdown() {
        let input = concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n",
            "not json\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"shutdown\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"ping\"}\n",
        );
        let mut out = Vec::new();
        serve(&ctx(), BufReader::new(input.as_bytes()), &mut out)
            .await
            .unwrap();

        let responses: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[1]["error"]["code"], PARSE_ERROR);
        assert_eq!(responses[2]["id"], 2);
    }
}

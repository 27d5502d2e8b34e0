//! The uniform success/error envelope and the normalizer that produces it.
//!
//! Every upstream outcome ends up as exactly one of
//!
//! ```json
//! {"status": "success", "data": ...}
//! {"status": "error", "errors": [{"error_code": "...", "message": "...", ...}]}
//! ```
//!
//! and the error list is never empty.

use crate::constants::{error_codes, messages, status};
use crate::error::{Error, Result};
use crate::http::Outcome;
use serde::de::DeserializeOwned;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEntry {
    pub error_code: String,
    pub message: String,
    pub property_path: Option<String>,
    pub invalid_value: Option<Value>,
    /// Keys upstream sent that are not part of the canonical entry
    /// (Upstox duplicates each field in camelCase, for instance).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ErrorEntry {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            property_path: None,
            invalid_value: None,
            extra: Map::new(),
        }
    }

    pub fn with_property(mut self, path: impl Into<String>, value: Option<Value>) -> Self {
        self.property_path = Some(path.into());
        self.invalid_value = value;
        self
    }

    /// Typed reading of one entry of an upstream `errors` array, accepting
    /// either snake_case or camelCase keys. Returns `None` for non-objects.
    ///
    /// This view is lossy: a numeric code is rendered as a string, a missing
    /// code falls back to the HTTP status, and a missing or non-scalar
    /// `message` reads as "API request failed". The relayed body keeps the
    /// original values.
    fn from_upstream(value: &Value, fallback_code: &str) -> Option<Self> {
        let obj = value.as_object()?;
        let mut extra = obj.clone();

        let error_code = extra
            .remove("error_code")
            .or_else(|| obj.get("errorCode").cloned())
            .and_then(|v| scalar_to_string(&v))
            .unwrap_or_else(|| fallback_code.to_string());
        let message = extra
            .remove("message")
            .and_then(|v| scalar_to_string(&v))
            .unwrap_or_else(|| messages::API_REQUEST_FAILED.to_string());
        let property_path = extra
            .remove("property_path")
            .or_else(|| obj.get("propertyPath").cloned())
            .and_then(|v| v.as_str().map(String::from));
        let invalid_value = extra
            .remove("invalid_value")
            .or_else(|| obj.get("invalidValue").cloned())
            .filter(|v| !v.is_null());

        Some(Self {
            error_code,
            message,
            property_path,
            invalid_value,
            extra,
        })
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T = Value> {
    Success {
        data: T,
    },
    Error {
        errors: Vec<ErrorEntry>,
    },
    /// An upstream error envelope relayed as received. `body` is what gets
    /// serialized; `errors` is the typed reading of it.
    Relayed {
        errors: Vec<ErrorEntry>,
        body: Value,
    },
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Relayed { body, .. } => body.serialize(serializer),
            Self::Success { data } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("status", status::SUCCESS)?;
                map.serialize_entry("data", data)?;
                map.end()
            }
            Self::Error { errors } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("status", status::ERROR)?;
                map.serialize_entry("errors", errors)?;
                map.end()
            }
        }
    }
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self::Success { data }
    }

    pub fn error(entry: ErrorEntry) -> Self {
        Self::Error {
            errors: vec![entry],
        }
    }

    pub fn network_error(message: impl Into<String>) -> Self {
        Self::error(ErrorEntry::new(error_codes::NETWORK_ERROR, message))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::error(ErrorEntry::new(error_codes::INTERNAL_SERVER_ERROR, message))
    }

    pub fn command_not_found(command: &str) -> Self {
        Self::error(ErrorEntry::new(
            error_codes::COMMAND_NOT_FOUND,
            messages::command_not_found(command),
        ))
    }

    pub fn token_not_set() -> Self {
        Self::error(ErrorEntry::new(
            error_codes::TOKEN_NOT_SET,
            messages::TOKEN_NOT_SET,
        ))
    }

    /// Envelope for a request rejected before dispatch. Non-validation
    /// errors are reported as internal.
    pub fn rejected(err: &Error) -> Self {
        match err {
            Error::Validation {
                field,
                message,
                invalid_value,
            } => Self::error(
                ErrorEntry::new(error_codes::VALIDATION_ERROR, message.clone())
                    .with_property(field.clone(), invalid_value.clone()),
            ),
            other => Self::internal(other.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success { data } => Some(data),
            Self::Error { .. } | Self::Relayed { .. } => None,
        }
    }

    pub fn errors(&self) -> &[ErrorEntry] {
        match self {
            Self::Success { .. } => &[],
            Self::Error { errors } | Self::Relayed { errors, .. } => errors,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        match self {
            Self::Success { data } => Envelope::Success { data: f(data) },
            Self::Error { errors } => Envelope::Error { errors },
            Self::Relayed { errors, body } => Envelope::Relayed { errors, body },
        }
    }

    pub fn try_map<U, E>(
        self,
        f: impl FnOnce(T) -> std::result::Result<U, E>,
    ) -> std::result::Result<Envelope<U>, E> {
        Ok(match self {
            Self::Success { data } => Envelope::Success { data: f(data)? },
            Self::Error { errors } => Envelope::Error { errors },
            Self::Relayed { errors, body } => Envelope::Relayed { errors, body },
        })
    }
}

impl<T: Serialize> Envelope<T> {
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Envelope<Value> {
    /// Decode the success payload into a typed record. Error envelopes pass
    /// through; a payload that does not fit `T` is a parse error.
    pub fn decode<T: DeserializeOwned>(self) -> Result<Envelope<T>> {
        self.try_map(|data| {
            serde_json::from_value(data).map_err(|e| Error::parse(format!("decode payload: {e}")))
        })
    }
}

/// Turn a raw transport outcome into an envelope.
///
/// 1. An upstream body that already is an error envelope (`status: "error"`
///    with a non-empty `errors` list) is relayed unchanged.
/// 2. Any other non-2xx response becomes one entry coded with the HTTP
///    status and its reason phrase.
/// 3. A request that got no response becomes a `NETWORK_ERROR` entry.
/// 4. Everything else is a success. An upstream `{status: "success", data}`
///    wrapper is unwrapped so the payload is not nested twice.
pub fn normalize(outcome: Outcome) -> Envelope {
    let resp = match outcome {
        Ok(resp) => resp,
        Err(e) => return Envelope::network_error(e.message),
    };

    let fallback_code = resp.status.to_string();
    let json = serde_json::from_str::<Value>(&resp.body).ok();

    if let Some(body) = &json {
        if let Some(errors) = upstream_errors(body, &fallback_code) {
            return Envelope::Relayed {
                errors,
                body: body.clone(),
            };
        }
    }

    if !resp.is_success() || json.as_ref().is_some_and(has_error_status) {
        let message = resp
            .reason
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| messages::API_REQUEST_FAILED.to_string());
        return Envelope::error(ErrorEntry::new(fallback_code, message));
    }

    let data = match json {
        Some(body) => unwrap_success(body),
        None if resp.body.trim().is_empty() => Value::Null,
        None => Value::String(resp.body),
    };
    Envelope::success(data)
}

fn has_error_status(body: &Value) -> bool {
    body.get("status").and_then(Value::as_str) == Some(status::ERROR)
}

fn upstream_errors(body: &Value, fallback_code: &str) -> Option<Vec<ErrorEntry>> {
    if !has_error_status(body) {
        return None;
    }
    let raw = body.get("errors")?.as_array()?;
    if raw.is_empty() {
        return None;
    }
    Some(
        raw.iter()
            .map(|e| {
                ErrorEntry::from_upstream(e, fallback_code).unwrap_or_else(|| {
                    ErrorEntry::new(fallback_code, messages::API_REQUEST_FAILED)
                })
            })
            .collect(),
    )
}

fn unwrap_success(body: Value) -> Value {
    match body {
        Value::Object(mut map)
            if map.get("status").and_then(Value::as_str) == Some(status::SUCCESS)
                && map.contains_key("data") =>
        {
            map.remove("data").unwrap_or_default()
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{TransportError, UpstreamResponse};
    use serde::Deserialize;
    use serde_json::json;

    fn response(status: u16, reason: Option<&str>, body: &str) -> Outcome {
        Ok(UpstreamResponse {
            status,
            reason: reason.map(String::from),
            body: body.into(),
        })
    }

    #[test]
    fn error_envelope_passes_through_unchanged() {
        let body = json!({
            "status": "error",
            "errors": [{
                "error_code": "UDAPI100050",
                "message": "Invalid token used to access API",
                "property_path": null,
                "invalid_value": null
            }]
        });
        let env = normalize(response(401, Some("Unauthorized"), &body.to_string()));
        assert_eq!(env.to_value().unwrap(), body);
    }

    #[test]
    fn pass_through_keeps_camel_case_duplicates() {
        let body = json!({
            "status": "error",
            "errors": [{
                "errorCode": "UDAPI1026",
                "message": "Instrument key is invalid",
                "propertyPath": "instrument_token",
                "invalidValue": "XYZ",
                "error_code": "UDAPI1026",
                "property_path": "instrument_token",
                "invalid_value": "XYZ"
            }]
        });
        let env = normalize(response(400, Some("Bad Request"), &body.to_string()));
        assert_eq!(env.to_value().unwrap(), body);
        let entry = &env.errors()[0];
        assert_eq!(entry.error_code, "UDAPI1026");
        assert_eq!(entry.property_path.as_deref(), Some("instrument_token"));
    }

    #[test]
    fn camel_case_only_entries_are_read() {
        let body = json!({
            "status": "error",
            "errors": [{"errorCode": "UDAPI100016", "message": "Invalid credentials"}]
        });
        let env = normalize(response(401, Some("Unauthorized"), &body.to_string()));
        let entry = &env.errors()[0];
        assert_eq!(entry.error_code, "UDAPI100016");
        assert_eq!(entry.message, "Invalid credentials");
    }

    #[test]
    fn non_2xx_without_envelope_uses_status_code() {
        for (status, reason) in [(404, "Not Found"), (500, "Internal Server Error"), (503, "Service Unavailable")] {
            let env = normalize(response(status, Some(reason), "<html>oops</html>"));
            let errors = env.errors();
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].error_code, status.to_string());
            assert_eq!(errors[0].message, reason);
            assert!(errors[0].property_path.is_none());
        }
    }

    #[test]
    fn non_2xx_without_reason_uses_fallback_message() {
        let env = normalize(response(599, None, ""));
        assert_eq!(env.errors()[0].error_code, "599");
        assert_eq!(env.errors()[0].message, messages::API_REQUEST_FAILED);
    }

    #[test]
    fn error_status_with_empty_errors_is_synthesized() {
        let env = normalize(response(400, Some("Bad Request"), r#"{"status":"error","errors":[]}"#));
        assert_eq!(env.errors().len(), 1);
        assert_eq!(env.errors()[0].error_code, "400");
    }

    #[test]
    fn transport_failure_is_network_error() {
        let env = normalize(Err(TransportError {
            message: "connection refused".into(),
        }));
        let errors = env.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_code, error_codes::NETWORK_ERROR);
        assert_eq!(errors[0].message, "connection refused");
    }

    #[test]
    fn success_wrapper_is_unwrapped() {
        let body = json!({"status": "success", "data": {"order_ids": ["A1"]}, "metadata": {"latency": 30}});
        let env = normalize(response(200, Some("OK"), &body.to_string()));
        assert_eq!(
            env.to_value().unwrap(),
            json!({"status": "success", "data": {"order_ids": ["A1"]}})
        );
    }

    #[test]
    fn bare_payload_is_wrapped() {
        let env = normalize(response(200, Some("OK"), r#"[{"isin":"INE848E01016"}]"#));
        assert_eq!(env.data(), Some(&json!([{"isin": "INE848E01016"}])));
    }

    #[test]
    fn empty_and_text_bodies() {
        assert_eq!(normalize(response(204, None, "")).data(), Some(&Value::Null));
        assert_eq!(
            normalize(response(200, Some("OK"), "pong")).data(),
            Some(&json!("pong"))
        );
    }

    #[test]
    fn decode_maps_success_and_keeps_errors() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Ids {
            order_ids: Vec<String>,
        }

        let ok: Envelope<Ids> = Envelope::success(json!({"order_ids": ["A1"]}))
            .decode()
            .unwrap();
        assert_eq!(
            ok.data(),
            Some(&Ids {
                order_ids: vec!["A1".into()]
            })
        );

        let err: Envelope<Ids> = Envelope::<Value>::network_error("down").decode().unwrap();
        assert_eq!(err.errors()[0].error_code, error_codes::NETWORK_ERROR);

        let bad = Envelope::success(json!("not an object")).decode::<Ids>();
        assert!(matches!(bad, Err(Error::Parse(_))));
    }

    #[test]
    fn rejected_validation_carries_property() {
        let err = Error::invalid_value("transaction_type", "must be BUY or SELL", "HOLD");
        let env: Envelope = Envelope::rejected(&err);
        assert_eq!(
            env.to_value().unwrap(),
            json!({
                "status": "error",
                "errors": [{
                    "error_code": "VALIDATION_ERROR",
                    "message": "must be BUY or SELL",
                    "property_path": "transaction_type",
                    "invalid_value": "HOLD"
                }]
            })
        );
    }

    #[test]
    fn relayed_error_keeps_numeric_codes_and_extra_keys() {
        let body = json!({
            "status": "error",
            "errors": [{"error_code": 1026, "message": "bad"}],
            "metadata": {"latency": 5}
        });
        let env = normalize(response(400, Some("Bad Request"), &body.to_string()));
        assert!(!env.is_success());
        assert_eq!(env.to_value().unwrap(), body);

        let entry = &env.errors()[0];
        assert_eq!(entry.error_code, "1026");
        assert!(entry.property_path.is_none());
    }

    #[test]
    fn typed_view_fills_missing_message() {
        let body = json!({"status": "error", "errors": [{"errorCode": "UDAPI1"}, "oops"]});
        let env = normalize(response(500, Some("Internal Server Error"), &body.to_string()));
        assert_eq!(env.to_value().unwrap(), body);
        assert_eq!(env.errors()[0].message, messages::API_REQUEST_FAILED);
        assert_eq!(env.errors()[1].error_code, "500");
    }

    #[test]
    fn relayed_errors_survive_decode() {
        let body = json!({"status": "error", "errors": [{"error_code": "X", "message": "y"}]});
        let env = normalize(response(401, None, &body.to_string()));
        let typed: Envelope<Vec<String>> = env.decode().unwrap();
        assert_eq!(typed.to_value().unwrap(), body);
    }
}

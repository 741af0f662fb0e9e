//! JSON-RPC 2.0 envelope shapes and the frozen protocol errors
//!
//! Decides envelope validity without invoking any resolver. Raw text parsing
//! lives here too, since a Parse Error can only be produced before a value exists.

use std::{borrow::Cow, fmt};

use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use serde_json::{Number, Value};
use thiserror::Error;

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: RpcError = RpcError::frozen(-32700, "Parse error");
pub const INVALID_REQUEST: RpcError = RpcError::frozen(-32600, "Invalid Request");
pub const METHOD_NOT_FOUND: RpcError = RpcError::frozen(-32601, "Method not found");
pub const INVALID_PARAMS: RpcError = RpcError::frozen(-32602, "Invalid params");
pub const INTERNAL_ERROR: RpcError = RpcError::frozen(-32603, "Internal error");

/// Correlation id of a call. `Null` is a real id, distinct from an absent one.
///
/// Numbers keep the exact form they arrived in, so replies echo ids beyond the
/// `i64` range (`18446744073709551615`, `1e20`) unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Null,
    Number(Number),
    String(String),
}

impl Id {
    /// Accepts null, strings and integer-valued numbers of any magnitude.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Null),
            Value::String(id) => Some(Self::String(id.clone())),
            Value::Number(number) => {
                let integral = number.is_i64()
                    || number.is_u64()
                    || number.as_f64().is_some_and(|float| float.fract() == 0.0);
                integral.then(|| Self::Number(number.clone()))
            }
            _ => None,
        }
    }
}

impl From<i64> for Id {
    fn from(id: i64) -> Self {
        Self::Number(id.into())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Number(id) => write!(f, "{id}"),
            Self::String(id) => write!(f, "{id:?}"),
        }
    }
}

/// `None` stands for an absent `id` member, which is only acceptable at the
/// outer parse stage where it marks a notification.
pub fn is_valid_id(value: Option<&Value>) -> bool {
    value.map_or(true, |value| Id::from_value(value).is_some())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: Cow<'static, str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub const fn frozen(code: i64, message: &'static str) -> Self {
        Self {
            code,
            message: Cow::Borrowed(message),
            data: None,
        }
    }

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Cow::Owned(message.into()),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// Outbound request envelope. `id: None` makes it a notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    pub method: String,
    pub params: Value,
}

impl Request {
    pub fn new(id: Option<Id>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.into(),
            params,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Result(Value),
    Error(RpcError),
}

/// Response envelope carrying exactly one of `result` or `error`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: Id,
    pub outcome: Outcome,
}

impl Response {
    pub fn success(id: Id, result: Value) -> Self {
        Self {
            id,
            outcome: Outcome::Result(result),
        }
    }

    pub fn failure(id: Id, error: RpcError) -> Self {
        Self {
            id,
            outcome: Outcome::Error(error),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }

    pub fn error(&self) -> Option<&RpcError> {
        match &self.outcome {
            Outcome::Error(error) => Some(error),
            Outcome::Result(_) => None,
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Result(result) => Some(result),
            Outcome::Error(_) => None,
        }
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("jsonrpc", JSONRPC_VERSION)?;
        map.serialize_entry("id", &self.id)?;
        match &self.outcome {
            Outcome::Result(result) => map.serialize_entry("result", result)?,
            Outcome::Error(error) => map.serialize_entry("error", error)?,
        }
        map.end()
    }
}

/// What the dispatcher hands back to a transport: one envelope or a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Single(Response),
    Batch(Vec<Response>),
}

impl Reply {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Batch(responses) if responses.is_empty())
    }
}

#[derive(Debug, Error)]
#[error("parse error: {message}")]
pub struct ParseError {
    pub message: String,
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

pub fn parse(text: &str) -> Result<Value, ParseError> {
    Ok(serde_json::from_str(text)?)
}

pub fn parse_slice(bytes: &[u8]) -> Result<Value, ParseError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_ids_cover_null_strings_and_integers() {
        assert!(is_valid_id(None));
        assert!(is_valid_id(Some(&json!(null))));
        assert!(is_valid_id(Some(&json!("abc"))));
        assert!(is_valid_id(Some(&json!(42))));
        assert!(is_valid_id(Some(&json!(-7))));
        assert!(is_valid_id(Some(&json!(3.0))));
    }

    #[test]
    fn invalid_ids_are_rejected() {
        assert!(!is_valid_id(Some(&json!({}))));
        assert!(!is_valid_id(Some(&json!([1]))));
        assert!(!is_valid_id(Some(&json!(true))));
        assert!(!is_valid_id(Some(&json!(123.5))));
    }

    #[test]
    fn integer_valued_float_id_is_kept() {
        let id = Id::from_value(&json!(3.0)).expect("integral float");
        assert_eq!(serde_json::to_value(&id).expect("serialize id"), json!(3.0));
    }

    #[test]
    fn ids_beyond_i64_are_kept_verbatim() {
        for raw in [json!(u64::MAX), json!(1e20), json!(i64::MIN)] {
            let id = Id::from_value(&raw).expect("integral id");
            assert_eq!(serde_json::to_value(&id).expect("serialize id"), raw);
        }
        assert!(is_valid_id(Some(&json!(18446744073709551615u64))));
        assert!(!is_valid_id(Some(&json!(1.5e3 + 0.25))));
    }

    #[test]
    fn success_response_serializes_envelope() {
        let response = Response::success(Id::from(1), json!("ok"));
        assert_eq!(
            serde_json::to_value(&response).expect("serialize response"),
            json!({"jsonrpc": "2.0", "id": 1, "result": "ok"})
        );
    }

    #[test]
    fn failure_response_omits_absent_data() {
        let response = Response::failure(Id::Null, INVALID_REQUEST);
        assert_eq!(
            serde_json::to_value(&response).expect("serialize response"),
            json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": {"code": -32600, "message": "Invalid Request"}
            })
        );
    }

    #[test]
    fn notification_request_has_no_id_member() {
        let request = Request::new(None, "log", json!({"message": "hi"}));
        let value = serde_json::to_value(&request).expect("serialize request");
        assert!(value.get("id").is_none());
        assert_eq!(value["jsonrpc"], "2.0");
    }

    #[test]
    fn null_id_request_keeps_id_member() {
        let request = Request::new(Some(Id::Null), "hello", json!({}));
        let value = serde_json::to_value(&request).expect("serialize request");
        assert_eq!(value.get("id"), Some(&Value::Null));
    }

    #[test]
    fn parse_reports_syntax_failures() {
        let err = parse("{\"jsonrpc\": ").expect_err("truncated json must fail");
        assert!(err.to_string().starts_with("parse error"));
        assert_eq!(parse("[1, 2]").expect("valid json"), json!([1, 2]));
    }

    #[test]
    fn frozen_errors_compare_exactly() {
        let decoded: RpcError =
            serde_json::from_value(json!({"code": -32601, "message": "Method not found"}))
                .expect("decode error object");
        assert_eq!(decoded, METHOD_NOT_FOUND);
    }
}

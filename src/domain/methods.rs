use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::{
    domain::CallContext,
    errors::RpcFailure,
    rpc::{Metadata, Method, Passthrough, SerdeSchema},
};

/// Application-defined code for arithmetic that does not fit in an `i64`.
pub const OVERFLOW_CODE: i64 = -32000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloParams {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddParams {
    pub a: i64,
    pub b: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailParams {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogParams {
    pub message: String,
}

pub type HelloMethod = Method<SerdeSchema<HelloParams>, SerdeSchema<String>>;
pub type AddMethod = Method<SerdeSchema<AddParams>, SerdeSchema<i64>>;
pub type FailMethod = Method<SerdeSchema<FailParams>, Passthrough>;
pub type LogMethod = Method<SerdeSchema<LogParams>, SerdeSchema<()>>;

pub fn hello() -> HelloMethod {
    Method::new("hello", SerdeSchema::with_keys(["name"]), SerdeSchema::new())
}

pub fn add() -> AddMethod {
    Method::new("add", SerdeSchema::with_keys(["a", "b"]), SerdeSchema::new())
}

pub fn fail() -> FailMethod {
    Method::new(
        "fail",
        SerdeSchema::with_keys(["message", "code", "data"]),
        Passthrough,
    )
}

pub fn log() -> LogMethod {
    Method::new("log", SerdeSchema::with_keys(["message"]), SerdeSchema::new())
}

pub async fn resolve_hello(
    params: HelloParams,
    _ctx: CallContext,
    _meta: Metadata,
) -> Result<String, RpcFailure> {
    Ok(format!("Hello, {}!", params.name))
}

pub async fn resolve_add(
    params: AddParams,
    _ctx: CallContext,
    _meta: Metadata,
) -> Result<i64, RpcFailure> {
    params.a.checked_add(params.b).ok_or_else(|| {
        RpcFailure::new("integer overflow")
            .with_code(OVERFLOW_CODE)
            .with_data(json!({"a": params.a, "b": params.b}))
    })
}

/// Always fails with whatever the caller asked for.
pub async fn resolve_fail(
    params: FailParams,
    _ctx: CallContext,
    _meta: Metadata,
) -> Result<Value, RpcFailure> {
    Err(RpcFailure {
        message: params.message,
        code: params.code,
        data: params.data,
    })
}

pub async fn resolve_log(
    params: LogParams,
    ctx: CallContext,
    meta: Metadata,
) -> Result<(), RpcFailure> {
    info!(
        caller = ctx.caller.as_deref().unwrap_or("unknown"),
        notification = meta.is_notification,
        message = %params.message,
        "client log"
    );
    Ok(())
}

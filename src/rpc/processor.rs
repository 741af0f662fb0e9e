//! Validation and invocation of one request envelope
//!
//! Every check runs before the resolver is touched, so resolvers only ever
//! see params that decoded cleanly. Notification replies are dropped after
//! the resolver ran, never before.

use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::rpc::{
    audit::audit_view,
    envelope::{
        Id, Response, RpcError, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION,
        METHOD_NOT_FOUND,
    },
    table::{Metadata, MethodTable, ResolverTable},
};

pub struct Processor<C> {
    methods: MethodTable,
    resolvers: ResolverTable<C>,
}

impl<C: Send + 'static> Processor<C> {
    pub(crate) fn new(methods: MethodTable, resolvers: ResolverTable<C>) -> Self {
        Self { methods, resolvers }
    }

    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    /// Returns `None` only for a well-formed notification.
    pub async fn process(&self, raw: Value, ctx: C) -> Option<Response> {
        let Value::Object(mut envelope) = raw else {
            debug!("rejecting envelope that is not an object");
            return Some(Response::failure(Id::Null, INVALID_REQUEST));
        };

        let id = match envelope.remove("id") {
            None => None,
            Some(raw_id) => match Id::from_value(&raw_id) {
                Some(id) => Some(id),
                None => {
                    debug!(id = %raw_id, "rejecting envelope with malformed id");
                    return Some(Response::failure(Id::Null, INVALID_REQUEST));
                }
            },
        };

        let version_ok = envelope.get("jsonrpc").and_then(Value::as_str) == Some(JSONRPC_VERSION);
        let method = match envelope.remove("method") {
            Some(Value::String(method)) if version_ok => method,
            _ => {
                debug!(id = ?id, "rejecting envelope without version or method");
                return Some(Response::failure(id.unwrap_or(Id::Null), INVALID_REQUEST));
            }
        };

        let (Some(entry), Some(resolver)) = (self.methods.get(&method), self.resolvers.get(&method))
        else {
            return settle(id, &method, &Value::Null, Err(METHOD_NOT_FOUND));
        };

        let Some(params) = normalize_params(envelope.remove("params"), entry.keys()) else {
            debug!(method = %method, id = ?id, "rejecting params that are not array or object");
            return Some(Response::failure(id.unwrap_or(Id::Null), INVALID_REQUEST));
        };
        let audit_params = audit_view(&params);

        let decoded = match entry.decode_params(params) {
            Ok(decoded) => decoded,
            Err(errors) => {
                let report = errors.report();
                let error = RpcError::new(
                    INVALID_PARAMS.code,
                    format!("{}: {report}", INVALID_PARAMS.message),
                )
                .with_data(Value::String(report));
                return settle(id, &method, &audit_params, Err(error));
            }
        };

        let meta = Metadata::new(id.clone());
        let outcome = match resolver.invoke(decoded, ctx, meta).await {
            Err(failure) => Err(failure.into_rpc_error()),
            Ok(_) if id.is_none() => Ok(Value::Null),
            Ok(output) => entry.encode_result(output).map_err(|errors| {
                error!(method = %method, error = %errors, "failed to encode resolver result");
                INTERNAL_ERROR
            }),
        };

        settle(id, &method, &audit_params, outcome)
    }
}

/// Positional params are mapped onto the declared keys in order. Surplus
/// values are dropped; missing ones stay absent and fail decoding.
pub fn normalize_params(params: Option<Value>, keys: Option<&[String]>) -> Option<Value> {
    match params {
        None => Some(Value::Object(Map::new())),
        Some(Value::Object(map)) => Some(Value::Object(map)),
        Some(Value::Array(values)) => Some(match keys {
            Some(keys) => Value::Object(keys.iter().cloned().zip(values).collect()),
            None => Value::Array(values),
        }),
        Some(_) => None,
    }
}

fn settle(
    id: Option<Id>,
    method: &str,
    audit_params: &Value,
    outcome: Result<Value, RpcError>,
) -> Option<Response> {
    let label = match (&id, &outcome) {
        (None, _) => "notification",
        (Some(_), Ok(_)) => "success",
        (Some(_), Err(_)) => "failure",
    };
    info!(
        method = %method,
        params = %audit_params,
        outcome = label,
        "rpc call audited"
    );

    match (id, outcome) {
        (None, Err(error)) => {
            debug!(method = %method, error = %error, "dropping failure of notification");
            None
        }
        (None, Ok(_)) => None,
        (Some(id), Ok(result)) => Some(Response::success(id, result)),
        (Some(id), Err(error)) => Some(Response::failure(id, error)),
    }
}

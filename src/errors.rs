use serde_json::Value;
use thiserror::Error;

use crate::rpc::{
    envelope::{RpcError, INTERNAL_ERROR},
    schema::ValidationErrors,
};

/// Construction-time problems with the method and resolver tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("method `{0}` is declared more than once")]
    DuplicateMethod(String),
    #[error("resolver for `{0}` is registered more than once")]
    DuplicateResolver(String),
    #[error("method `{0}` has no resolver")]
    MissingResolver(String),
    #[error("resolver `{0}` does not match any declared method")]
    UnknownResolver(String),
    #[error("resolver `{0}` was registered for a different method signature")]
    SignatureMismatch(String),
}

/// Failure raised by a resolver. Unset fields fall back to Internal Error.
#[derive(Debug, Clone, PartialEq, Default, Error)]
#[error("{}", failure_message(.message))]
pub struct RpcFailure {
    pub message: Option<String>,
    pub code: Option<i64>,
    pub data: Option<Value>,
}

impl RpcFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn internal() -> Self {
        Self::default()
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn into_rpc_error(self) -> RpcError {
        let error = match self.message {
            Some(message) => RpcError::new(self.code.unwrap_or(INTERNAL_ERROR.code), message),
            None => RpcError {
                code: self.code.unwrap_or(INTERNAL_ERROR.code),
                ..INTERNAL_ERROR
            },
        };

        match self.data {
            Some(data) => error.with_data(data),
            None => error,
        }
    }
}

fn failure_message(message: &Option<String>) -> &str {
    message.as_deref().unwrap_or("Internal error")
}

impl From<RpcError> for RpcFailure {
    fn from(error: RpcError) -> Self {
        Self {
            message: Some(error.message.into_owned()),
            code: Some(error.code),
            data: error.data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// The server answered with an error object.
    Rpc,
    InvalidResponse,
    Decode,
    Encode,
    Transport,
}

/// The one error kind a client call fails with.
///
/// Errors raised locally by the client carry code `0`; `Rpc` errors carry
/// whatever code the server sent.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ClientError {
    pub kind: ClientErrorKind,
    pub message: String,
    pub code: i64,
    pub data: Option<Value>,
}

impl ClientError {
    pub fn rpc(message: impl Into<String>, code: i64, data: Option<Value>) -> Self {
        Self {
            kind: ClientErrorKind::Rpc,
            message: message.into(),
            code,
            data,
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::local(ClientErrorKind::InvalidResponse, message.into(), None)
    }

    pub fn decode(errors: ValidationErrors) -> Self {
        Self::local(
            ClientErrorKind::Decode,
            format!("invalid response result: {errors}"),
            Some(errors.to_value()),
        )
    }

    pub fn encode(errors: ValidationErrors) -> Self {
        Self::local(
            ClientErrorKind::Encode,
            format!("invalid request params: {errors}"),
            Some(errors.to_value()),
        )
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::local(ClientErrorKind::Transport, message.into(), None)
    }

    /// Builds an `Rpc` error from a wire `error` member. A missing or
    /// non-numeric code becomes `0`.
    pub fn from_wire(error: &Value) -> Self {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let code = error
            .get("code")
            .and_then(|code| code.as_i64().or_else(|| code.as_f64().map(|f| f as i64)))
            .unwrap_or(0);

        Self::rpc(message, code, error.get("data").cloned())
    }

    fn local(kind: ClientErrorKind, message: String, data: Option<Value>) -> Self {
        Self {
            kind,
            message,
            code: 0,
            data,
        }
    }
}

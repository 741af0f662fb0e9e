//! Pluggable request/response validators
//!
//! The engine only ever calls `decode`, `encode` and, for positional params,
//! `keys`. Anything that can answer those three can describe a method shape.

use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub trait Schema: Send + Sync + 'static {
    type Target: Send + 'static;

    fn decode(&self, raw: Value) -> Result<Self::Target, ValidationErrors>;

    fn encode(&self, value: &Self::Target) -> Result<Value, ValidationErrors>;

    /// Declared field order of an object shape. Positional params are mapped
    /// onto these keys in order; shapes without declared keys receive the
    /// array untouched.
    fn keys(&self) -> Option<&[String]> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
#[error("{}", render_report(.errors))]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(path, message);
        errors
    }

    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// One line per failed field, root-level failures without a path prefix.
    pub fn report(&self) -> String {
        render_report(&self.errors)
    }

    pub fn to_value(&self) -> Value {
        Value::Array(
            self.errors
                .iter()
                .map(|error| json!({"path": error.path, "message": error.message}))
                .collect(),
        )
    }
}

fn render_report(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|error| {
            if error.path.is_empty() {
                error.message.clone()
            } else {
                format!("{}: {}", error.path, error.message)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<serde_json::Error> for ValidationErrors {
    fn from(err: serde_json::Error) -> Self {
        Self::single("", err.to_string())
    }
}

/// Shape backed by a serde type.
pub struct SerdeSchema<T> {
    keys: Option<Vec<String>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeSchema<T> {
    pub fn new() -> Self {
        Self {
            keys: None,
            _marker: PhantomData,
        }
    }

    /// Declares the object's field order for positional params.
    pub fn with_keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            keys: Some(keys.into_iter().map(Into::into).collect()),
            _marker: PhantomData,
        }
    }
}

impl<T> Default for SerdeSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Schema for SerdeSchema<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    type Target = T;

    fn decode(&self, raw: Value) -> Result<T, ValidationErrors> {
        Ok(serde_json::from_value(raw)?)
    }

    fn encode(&self, value: &T) -> Result<Value, ValidationErrors> {
        Ok(serde_json::to_value(value)?)
    }

    fn keys(&self) -> Option<&[String]> {
        self.keys.as_deref()
    }
}

/// Accepts any JSON value as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Schema for Passthrough {
    type Target = Value;

    fn decode(&self, raw: Value) -> Result<Value, ValidationErrors> {
        Ok(raw)
    }

    fn encode(&self, value: &Value) -> Result<Value, ValidationErrors> {
        Ok(value.clone())
    }
}

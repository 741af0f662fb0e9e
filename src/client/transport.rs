use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::{
    errors::ClientError,
    rpc::{Request, Server},
};

/// What a client hands to its transport: one envelope or a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    Single(Request),
    Batch(Vec<Request>),
}

/// Performs the actual exchange. `Ok(None)` means the peer sent no body.
#[async_trait]
pub trait Transport<C>: Send + Sync {
    async fn send(&self, message: Outbound, ctx: C) -> Result<Option<Value>, ClientError>;
}

/// In-process transport that hands messages straight to a [`Server`].
pub struct Loopback<C> {
    server: Server<C>,
}

impl<C> Loopback<C> {
    pub fn new(server: Server<C>) -> Self {
        Self { server }
    }
}

#[async_trait]
impl<C> Transport<C> for Loopback<C>
where
    C: Clone + Send + Sync + 'static,
{
    async fn send(&self, message: Outbound, ctx: C) -> Result<Option<Value>, ClientError> {
        let raw = serde_json::to_value(&message).map_err(|err| {
            ClientError::transport(format!("failed to serialize outbound message: {err}"))
        })?;

        self.server
            .handle(raw, ctx)
            .await
            .map(serde_json::to_value)
            .transpose()
            .map_err(|err| ClientError::transport(format!("failed to serialize reply: {err}")))
    }
}

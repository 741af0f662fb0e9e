//! Single and batch dispatch
//!
//! A batch runs every element concurrently and waits for all of them. The
//! reply keeps submission order because it is filtered from the positional
//! result list, not collected in completion order.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tracing::debug;

use crate::{
    errors::SetupError,
    rpc::{
        envelope::{self, Id, Reply, Response, INVALID_REQUEST, PARSE_ERROR},
        processor::Processor,
        table::{check_tables, MethodTable, ResolverTable},
    },
};

/// Immutable method and resolver tables, shared by every call.
pub struct Server<C> {
    processor: Arc<Processor<C>>,
}

impl<C> Clone for Server<C> {
    fn clone(&self) -> Self {
        Self {
            processor: Arc::clone(&self.processor),
        }
    }
}

impl<C> Server<C>
where
    C: Clone + Send + Sync + 'static,
{
    pub fn new(methods: MethodTable, resolvers: ResolverTable<C>) -> Result<Self, SetupError> {
        check_tables(&methods, &resolvers)?;

        Ok(Self {
            processor: Arc::new(Processor::new(methods, resolvers)),
        })
    }

    pub fn methods(&self) -> Vec<&str> {
        self.processor.methods().names()
    }

    /// Runs one envelope through validation and its resolver.
    pub async fn process(&self, raw: Value, ctx: C) -> Option<Response> {
        self.processor.process(raw, ctx).await
    }

    /// Answers a parsed message: an object, a batch, or anything else.
    pub async fn handle(&self, raw: Value, ctx: C) -> Option<Reply> {
        match raw {
            Value::Array(batch) if batch.is_empty() => {
                debug!("rejecting empty batch");
                Some(Reply::Single(Response::failure(Id::Null, INVALID_REQUEST)))
            }
            Value::Array(batch) => {
                debug!(size = batch.len(), "dispatching batch");
                let calls = batch
                    .into_iter()
                    .map(|item| self.processor.process(item, ctx.clone()));
                let responses = join_all(calls).await.into_iter().flatten().collect();
                Some(Reply::Batch(responses))
            }
            Value::Object(_) => self.processor.process(raw, ctx).await.map(Reply::Single),
            _ => Some(Reply::Single(Response::failure(Id::Null, INVALID_REQUEST))),
        }
    }

    /// Like `handle`, starting from raw text. Unparsable text answers Parse Error.
    pub async fn handle_text(&self, text: &str, ctx: C) -> Option<Reply> {
        match envelope::parse(text) {
            Ok(raw) => self.handle(raw, ctx).await,
            Err(err) => {
                debug!(error = %err, "rejecting unparsable message");
                Some(Reply::Single(Response::failure(Id::Null, PARSE_ERROR)))
            }
        }
    }
}

use std::sync::Arc;

use crate::rpc::schema::Schema;

/// Name plus request and response shape of one RPC method.
///
/// The same descriptor is used by servers to build their tables and by
/// clients to encode params and decode results, so both sides share one
/// contract. Cloning is cheap.
pub struct Method<Q, S> {
    inner: Arc<MethodInner<Q, S>>,
}

struct MethodInner<Q, S> {
    name: String,
    params: Q,
    result: S,
}

impl<Q: Schema, S: Schema> Method<Q, S> {
    pub fn new(name: impl Into<String>, params: Q, result: S) -> Self {
        Self {
            inner: Arc::new(MethodInner {
                name: name.into(),
                params,
                result,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn params(&self) -> &Q {
        &self.inner.params
    }

    pub fn result(&self) -> &S {
        &self.inner.result
    }
}

impl<Q, S> Clone for Method<Q, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

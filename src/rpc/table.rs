//! Method and resolver tables
//!
//! Both tables are keyed by method name and built once. Entries are type
//! erased so methods with different shapes can share one map; the
//! `Signature` recorded on both sides lets `Server::new` prove that every
//! resolver was bound to the descriptor it is looked up with.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    future::Future,
    marker::PhantomData,
    sync::Arc,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    errors::{RpcFailure, SetupError},
    rpc::{envelope::Id, method::Method, schema::Schema, schema::ValidationErrors},
};

pub(crate) type AnyValue = Box<dyn Any + Send>;

/// Per-call facts handed to a resolver alongside the decoded params.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub id: Option<Id>,
    pub is_notification: bool,
}

impl Metadata {
    pub fn new(id: Option<Id>) -> Self {
        Self {
            is_notification: id.is_none(),
            id,
        }
    }
}

#[async_trait]
pub trait Resolver<C, P, R>: Send + Sync {
    async fn resolve(&self, params: P, ctx: C, meta: Metadata) -> Result<R, RpcFailure>;
}

#[async_trait]
impl<C, P, R, F, Fut> Resolver<C, P, R> for F
where
    F: Fn(P, C, Metadata) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, RpcFailure>> + Send + 'static,
    C: Send + 'static,
    P: Send + 'static,
    R: Send + 'static,
{
    async fn resolve(&self, params: P, ctx: C, meta: Metadata) -> Result<R, RpcFailure> {
        (self)(params, ctx, meta).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Signature {
    params: TypeId,
    result: TypeId,
}

impl Signature {
    fn of<P: 'static, R: 'static>() -> Self {
        Self {
            params: TypeId::of::<P>(),
            result: TypeId::of::<R>(),
        }
    }
}

pub(crate) trait MethodEntry: Send + Sync {
    fn keys(&self) -> Option<&[String]>;
    fn decode_params(&self, raw: Value) -> Result<AnyValue, ValidationErrors>;
    fn encode_result(&self, value: AnyValue) -> Result<Value, ValidationErrors>;
    fn signature(&self) -> Signature;
}

impl<Q: Schema, S: Schema> MethodEntry for Method<Q, S> {
    fn keys(&self) -> Option<&[String]> {
        self.params().keys()
    }

    fn decode_params(&self, raw: Value) -> Result<AnyValue, ValidationErrors> {
        let params = self.params().decode(raw)?;
        Ok(Box::new(params))
    }

    fn encode_result(&self, value: AnyValue) -> Result<Value, ValidationErrors> {
        let value = value.downcast::<S::Target>().map_err(|_| {
            ValidationErrors::single("", "resolver returned a value of an unexpected type")
        })?;
        self.result().encode(&value)
    }

    fn signature(&self) -> Signature {
        Signature::of::<Q::Target, S::Target>()
    }
}

/// Method name to request/response shape. Names are unique.
#[derive(Clone, Default)]
pub struct MethodTable {
    entries: HashMap<String, Arc<dyn MethodEntry>>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<Q: Schema, S: Schema>(
        mut self,
        method: &Method<Q, S>,
    ) -> Result<Self, SetupError> {
        let name = method.name().to_string();
        if self.entries.contains_key(&name) {
            return Err(SetupError::DuplicateMethod(name));
        }

        self.entries.insert(name, Arc::new(method.clone()));
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names in ascending order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Arc<dyn MethodEntry>> {
        self.entries.get(name)
    }
}

#[async_trait]
pub(crate) trait ResolverEntry<C>: Send + Sync {
    fn signature(&self) -> Signature;
    async fn invoke(
        &self,
        params: AnyValue,
        ctx: C,
        meta: Metadata,
    ) -> Result<AnyValue, RpcFailure>;
}

struct Bound<Res, P, R> {
    resolver: Res,
    _marker: PhantomData<fn(P) -> R>,
}

#[async_trait]
impl<C, P, R, Res> ResolverEntry<C> for Bound<Res, P, R>
where
    C: Send + 'static,
    P: Send + 'static,
    R: Send + 'static,
    Res: Resolver<C, P, R>,
{
    fn signature(&self) -> Signature {
        Signature::of::<P, R>()
    }

    async fn invoke(
        &self,
        params: AnyValue,
        ctx: C,
        meta: Metadata,
    ) -> Result<AnyValue, RpcFailure> {
        let params = params.downcast::<P>().map_err(|_| {
            RpcFailure::internal().with_data(Value::String("params of an unexpected type".into()))
        })?;
        let output = self.resolver.resolve(*params, ctx, meta).await?;
        Ok(Box::new(output))
    }
}

/// Method name to handler, one-to-one with a `MethodTable`.
pub struct ResolverTable<C> {
    entries: HashMap<String, Arc<dyn ResolverEntry<C>>>,
}

impl<C: Send + 'static> ResolverTable<C> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn on<Q, S, Res>(mut self, method: &Method<Q, S>, resolver: Res) -> Result<Self, SetupError>
    where
        Q: Schema,
        S: Schema,
        Res: Resolver<C, Q::Target, S::Target> + 'static,
    {
        let name = method.name().to_string();
        if self.entries.contains_key(&name) {
            return Err(SetupError::DuplicateResolver(name));
        }

        let bound = Bound {
            resolver,
            _marker: PhantomData::<fn(Q::Target) -> S::Target>,
        };
        self.entries.insert(name, Arc::new(bound));
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Arc<dyn ResolverEntry<C>>> {
        self.entries.get(name)
    }
}

impl<C: Send + 'static> Default for ResolverTable<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks that both tables cover the same names with matching signatures.
pub(crate) fn check_tables<C>(
    methods: &MethodTable,
    resolvers: &ResolverTable<C>,
) -> Result<(), SetupError>
where
    C: Send + 'static,
{
    for name in methods.names() {
        let (Some(method), Some(resolver)) = (methods.get(name), resolvers.get(name)) else {
            return Err(SetupError::MissingResolver(name.to_string()));
        };
        if method.signature() != resolver.signature() {
            return Err(SetupError::SignatureMismatch(name.to_string()));
        }
    }

    if let Some(extra) = resolvers.names().into_iter().find(|name| !methods.contains(name)) {
        return Err(SetupError::UnknownResolver(extra.to_string()));
    }

    Ok(())
}

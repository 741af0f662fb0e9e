//! Demonstration service served by the binary
//!
//! Four small methods that exercise results, custom failures and
//! notifications. Descriptors are public so clients can call them with the
//! same contract the server validates against.

pub mod methods;

use crate::{
    errors::SetupError,
    rpc::{MethodTable, ResolverTable, Server},
};

/// Per-call context derived from the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Option<String>,
}

pub fn method_table() -> Result<MethodTable, SetupError> {
    MethodTable::new()
        .register(&methods::hello())?
        .register(&methods::add())?
        .register(&methods::fail())?
        .register(&methods::log())
}

pub fn resolver_table() -> Result<ResolverTable<CallContext>, SetupError> {
    ResolverTable::new()
        .on(&methods::hello(), methods::resolve_hello)?
        .on(&methods::add(), methods::resolve_add)?
        .on(&methods::fail(), methods::resolve_fail)?
        .on(&methods::log(), methods::resolve_log)
}

pub fn build_server() -> Result<Server<CallContext>, SetupError> {
    Server::new(method_table()?, resolver_table()?)
}

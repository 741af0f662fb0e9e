//! Server-side JSON-RPC 2.0 engine
//!
//! Envelope validation, method tables, request processing and batch dispatch.
//! Transports sit outside this module and only exchange `serde_json::Value`s
//! with a [`Server`].

pub mod audit;
pub mod dispatcher;
pub mod envelope;
pub mod method;
pub mod processor;
pub mod schema;
pub mod table;

pub use dispatcher::Server;
pub use envelope::{Id, Reply, Request, Response, RpcError};
pub use method::Method;
pub use schema::{Passthrough, Schema, SerdeSchema, ValidationErrors};
pub use table::{Metadata, MethodTable, Resolver, ResolverTable};

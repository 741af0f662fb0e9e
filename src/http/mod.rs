//! HTTP transport for the RPC server
//!
//! Provides the `/rpc` endpoint plus health and discovery metadata endpoints.

pub mod handlers;

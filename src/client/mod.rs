//! Client-side call preparation and reply correlation
//!
//! A [`Client`] turns typed calls into envelopes, hands them to a
//! [`Transport`] and reads the replies back into typed results.

pub mod builder;
pub mod correlator;
pub mod transport;

pub use builder::{Call, Client, ClientOptions, Prepared};
pub use correlator::{Batch, BatchResults, Slot};
pub use transport::{Loopback, Outbound, Transport};

//! DNS interception
//!
//! Every standard query is answered with a single A record for the portal's
//! address, whatever name was asked for. Anything else is dropped silently.

pub mod query;
pub mod server;

pub use query::{DnsQuery, DropReason};
pub use server::{DnsInterceptor, DnsOutcome};

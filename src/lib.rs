//! Captive portal
//!
//! DNS interception and static file serving for a wireless access point.

pub mod config;
pub mod dns;
pub mod http;
pub mod server;

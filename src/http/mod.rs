//! HTTP/1.0 static file serving.
//!
//! Every connection carries exactly one request. Only GET is served; the
//! requested path is mapped under the document root and anything that does
//! not exist is answered with the captive page instead of a 404.
//!
//! # Architecture
//!
//! - **`connection`**: per-connection state machine, from request line to close
//! - **`parser`**: request line and header line parsing
//! - **`request`**: parsed request representation
//! - **`response`**: status codes and response heads
//! - **`writer`**: head serialization and chunked body streaming
//! - **`path`**: path normalization and captive fallback
//! - **`mime`**: content type and cacheability by file extension
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← request line, then headers until a blank line
//!        └──────┬──────┘
//!               │ Request parsed (malformed header → Closed, nothing sent)
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← resolve path and content type
//!        └──────┬───────────┘
//!               │ Head ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← head, then the file in fixed-size chunks
//!        └──────┬───────────┘
//!               ▼
//!             Closed
//! ```

pub mod connection;
pub mod mime;
pub mod parser;
pub mod path;
pub mod request;
pub mod response;
pub mod writer;

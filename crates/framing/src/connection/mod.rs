//! Connection handling module
//!
//! This module drives the response parser from an asynchronous reader. It is
//! the owner the parser expects: it paces reads, drains completed responses
//! and decides when a peer that stopped mid-response should be abandoned.
//!
//! # Components
//!
//! - [`ResponseConnection`]: reads responses off one connection:
//!   - Frames pipelined responses in arrival order
//!   - Follows a keep-alive event stream into body-only framing
//!   - Fails a connection stalled in the middle of a response

mod response_connection;

pub use response_connection::ResponseConnection;

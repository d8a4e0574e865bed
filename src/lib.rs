//! Flux - HTTP/1.1 from the socket up
//!
//! Core library: request parsing, response encoding, and a
//! connection-per-task TCP server, plus the demo handler served by the binary.

pub mod config;
pub mod handlers;
pub mod http;
pub mod proxy;
pub mod server;

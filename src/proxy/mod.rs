//! Outbound HTTP client
//!
//! A minimal plain-HTTP client used to fetch upstream resources for proxying.
//! It shares the header vocabulary of the server side and streams the response
//! body back to the caller.

pub mod upstream;

pub use upstream::{build_request, fetch, UpstreamResponse};

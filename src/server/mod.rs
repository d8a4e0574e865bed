//! TCP server running one task per connection.
//!
//! Each connection is read until a full request is parsed, handed to the
//! application [`Handler`], answered once and closed. There is no keep-alive.

pub mod handler;
pub mod listener;

pub use handler::{Handler, HandlerError};
pub use listener::Server;

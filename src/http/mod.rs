//! HTTP/1.1 protocol implementation.
//!
//! The wire protocol is implemented here directly: nothing is delegated to an
//! HTTP library.
//!
//! # Architecture
//!
//! - **`headers`**: Case-insensitive, insertion ordered field collection with an
//!   incremental line parser
//! - **`request`**: Resumable request parser driven by arbitrarily sized reads
//! - **`response`**: Status codes and the header sets most responses start from
//! - **`writer`**: Serializes status lines, headers, bodies, chunks and trailers
//! - **`error`**: Protocol error taxonomy
//!
//! # Request parsing
//!
//! ```text
//!        ┌─────────────┐
//!        │    Init     │ ← Wait for a complete request line
//!        └──────┬──────┘
//!               │ METHOD SP TARGET SP HTTP/1.1
//!               ▼
//!        ┌─────────────┐
//!        │   Headers   │ ← Consume complete field lines
//!        └──────┬──────┘
//!               │ Empty line
//!               ├─ Content-Length > 0 → Body
//!               └─ otherwise → Done
//! ```
//!
//! # Example
//!
//! ```ignore
//! use flux::http::request::Request;
//! use flux::http::response::{default_headers, StatusCode};
//! use flux::http::writer::ResponseWriter;
//!
//! let req = Request::from_reader(&mut socket).await?;
//! let mut w = ResponseWriter::new(&mut socket);
//! w.write_status_line(StatusCode::Ok).await?;
//! w.write_headers(&default_headers(0)).await?;
//! ```

pub mod error;
pub mod headers;
pub mod request;
pub mod response;
pub mod writer;

pub use error::{HttpError, RequestLineError};
pub use headers::Headers;
pub use request::{ParserState, Request, RequestLine};
pub use response::StatusCode;
pub use writer::ResponseWriter;

pub(crate) const CRLF: &[u8] = b"\r\n";

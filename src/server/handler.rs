use std::future::Future;

use thiserror::Error;
use tokio::io::AsyncWrite;

use crate::http::error::HttpError;
use crate::http::request::Request;
use crate::http::response::StatusCode;
use crate::http::writer::ResponseWriter;

/// A failure the server turns into a response: the status line of `status`
/// and `message` as the body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} {}: {message}", .status.as_u16(), .status.reason_phrase())]
pub struct HandlerError {
    pub status: StatusCode,
    pub message: String,
}

impl HandlerError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::InternalServerError, message)
    }
}

impl From<HttpError> for HandlerError {
    fn from(err: HttpError) -> Self {
        Self::internal(err.to_string())
    }
}

/// Application code invoked once per parsed request.
///
/// The handler either writes a complete response through `w` or returns a
/// [`HandlerError`]. Returning `Ok(())` without writing anything yields an
/// empty `200 OK`.
pub trait Handler: Send + Sync + 'static {
    fn handle<W>(
        &self,
        w: &mut ResponseWriter<W>,
        req: &Request,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send
    where
        W: AsyncWrite + Unpin + Send;
}

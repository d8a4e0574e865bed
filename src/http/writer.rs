use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::error::{HttpError, Result};
use crate::http::headers::Headers;
use crate::http::response::StatusCode;
use crate::http::CRLF;

fn serialize_headers(headers: &Headers) -> Vec<u8> {
    let mut buf = Vec::new();

    for (name, value) in headers {
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(CRLF);
    }

    // Header/body separator
    buf.extend_from_slice(CRLF);

    buf
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    StatusLine,
    Headers,
    Body,
}

/// Writes one response to a byte sink.
///
/// Parts must be written in wire order: status line, headers, body. Headers
/// may be written a second time once the body has started; those are the
/// trailers following a chunked body.
pub struct ResponseWriter<W> {
    writer: W,
    state: WriterState,
    written: usize,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            state: WriterState::StatusLine,
            written: 0,
        }
    }

    /// True once any part of the response has been written.
    pub fn has_written(&self) -> bool {
        self.state != WriterState::StatusLine
    }

    pub fn bytes_written(&self) -> usize {
        self.written
    }

    pub async fn write_status_line(&mut self, status: StatusCode) -> Result<()> {
        if self.state != WriterState::StatusLine {
            return Err(HttpError::WriteOutOfOrder("status line"));
        }

        self.send(status.status_line()).await?;
        self.state = WriterState::Headers;
        Ok(())
    }

    /// Writes every field followed by the empty line.
    ///
    /// Called after the body has started, this emits trailers.
    pub async fn write_headers(&mut self, headers: &Headers) -> Result<()> {
        if self.state == WriterState::StatusLine {
            return Err(HttpError::WriteOutOfOrder("headers"));
        }

        self.send(&serialize_headers(headers)).await?;
        self.state = WriterState::Body;
        Ok(())
    }

    /// Writes raw bytes verbatim.
    pub async fn write_body(&mut self, data: &[u8]) -> Result<usize> {
        if self.state != WriterState::Body {
            return Err(HttpError::WriteOutOfOrder("body"));
        }

        self.send(data).await?;
        Ok(data.len())
    }

    /// Frames `data` as one chunk: hex length, CRLF, data, CRLF.
    ///
    /// An empty slice writes nothing, since a zero-length chunk ends the body.
    pub async fn write_chunked_body(&mut self, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }

        self.write_body(format!("{:x}\r\n", data.len()).as_bytes())
            .await?;
        self.write_body(data).await?;
        self.write_body(CRLF).await?;
        Ok(data.len())
    }

    /// Writes the terminating `0\r\n` chunk. Must be followed by
    /// [`write_trailers`](Self::write_trailers), with an empty set when no
    /// trailers are sent.
    pub async fn write_chunked_body_done(&mut self) -> Result<()> {
        self.write_body(b"0\r\n").await?;
        Ok(())
    }

    pub async fn write_trailers(&mut self, trailers: &Headers) -> Result<()> {
        if self.state != WriterState::Body {
            return Err(HttpError::WriteOutOfOrder("trailers"));
        }
        self.write_headers(trailers).await
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await.map_err(HttpError::Write)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    async fn send(&mut self, buf: &[u8]) -> Result<()> {
        self.writer.write_all(buf).await.map_err(HttpError::Write)?;
        self.written += buf.len();
        Ok(())
    }
}

use bytes::{Buf, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::error::{HttpError, RequestLineError, Result};
use crate::http::headers::{find_crlf, is_token_char, Headers};
use crate::http::CRLF;

/// Bytes reserved in the read buffer before each read.
pub const READ_BUFFER_SIZE: usize = 1024;

/// Position of a [`Request`] in the parsing state machine.
///
/// ```text
/// Init ──► Headers ──► Body ──► Done
///   │         │         │
///   └─────────┴─────────┴──► Error
/// ```
///
/// `Done` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Init,
    Headers,
    Body,
    Done,
    Error,
}

/// The first line of a request: `METHOD SP TARGET SP HTTP/1.1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub request_target: String,
    /// Version number without the `HTTP/` prefix, always `1.1`.
    pub http_version: String,
}

/// A request being parsed, or fully parsed once its state is `Done`.
#[derive(Debug, Clone)]
pub struct Request {
    pub request_line: RequestLine,
    pub headers: Headers,
    pub body: Vec<u8>,
    state: ParserState,
    content_length: usize,
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    pub fn new() -> Self {
        Self {
            request_line: RequestLine::default(),
            headers: Headers::new(),
            body: Vec::new(),
            state: ParserState::Init,
            content_length: 0,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// True once the parser reached a terminal state.
    pub fn is_done(&self) -> bool {
        matches!(self.state, ParserState::Done | ParserState::Error)
    }

    pub fn method(&self) -> &str {
        &self.request_line.method
    }

    pub fn target(&self) -> &str {
        &self.request_line.request_target
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// The declared `Content-Length`, or 0 when missing or not a number.
    pub fn content_length(&self) -> usize {
        self.header("content-length")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Advances the state machine over `data`.
    ///
    /// Returns the exact number of bytes consumed. Unconsumed bytes must be
    /// presented again, with more data appended, on the next call.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize> {
        if self.state == ParserState::Error {
            return Err(HttpError::RequestInErrorState);
        }

        let mut read = 0;
        loop {
            let current = &data[read..];

            match self.state {
                ParserState::Init => {
                    let parsed = parse_request_line(current).inspect_err(|_| {
                        self.state = ParserState::Error;
                    })?;

                    let Some((line, n)) = parsed else {
                        break;
                    };

                    self.request_line = line;
                    read += n;
                    self.state = ParserState::Headers;
                }

                ParserState::Headers => {
                    let (n, done) = self.headers.parse(current).inspect_err(|_| {
                        self.state = ParserState::Error;
                    })?;
                    read += n;

                    if !done {
                        break;
                    }

                    self.content_length = self.content_length();
                    self.state = if self.content_length > 0 {
                        ParserState::Body
                    } else {
                        ParserState::Done
                    };
                }

                ParserState::Body => {
                    let take = (self.content_length - self.body.len()).min(current.len());
                    if take == 0 {
                        break;
                    }

                    self.body.extend_from_slice(&current[..take]);
                    read += take;

                    if self.body.len() == self.content_length {
                        self.state = ParserState::Done;
                    }
                }

                ParserState::Done | ParserState::Error => break,
            }
        }

        Ok(read)
    }

    /// Reads from `reader` until a complete request has been parsed.
    ///
    /// End of stream before the request is complete, a short body included,
    /// fails with an `UnexpectedEof` read error.
    pub async fn from_reader<R>(reader: &mut R) -> Result<Request>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut request = Request::new();
        let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);

        while !request.is_done() {
            buf.reserve(READ_BUFFER_SIZE);

            let n = reader.read_buf(&mut buf).await.map_err(HttpError::Read)?;
            if n == 0 {
                return Err(HttpError::Read(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended before the request was complete",
                )));
            }

            let consumed = request.parse(&buf)?;
            buf.advance(consumed);
        }

        Ok(request)
    }
}

fn parse_request_line(data: &[u8]) -> Result<Option<(RequestLine, usize)>> {
    let Some(idx) = find_crlf(data) else {
        return Ok(None);
    };

    let line = std::str::from_utf8(&data[..idx])
        .map_err(|_| HttpError::MalformedRequestLine(RequestLineError::NotUtf8))?;

    let parts: Vec<&str> = line.split(' ').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        let found = parts.iter().filter(|p| !p.is_empty()).count();
        return Err(HttpError::MalformedRequestLine(
            RequestLineError::TokenCount(found),
        ));
    }

    let (method, target, version) = (parts[0], parts[1], parts[2]);

    if !method.bytes().all(is_token_char) {
        return Err(HttpError::MalformedRequestLine(
            RequestLineError::InvalidMethod(method.to_string()),
        ));
    }

    let http_version = version
        .strip_prefix("HTTP/")
        .filter(|v| *v == "1.1")
        .ok_or_else(|| {
            HttpError::MalformedRequestLine(RequestLineError::UnsupportedVersion(
                version.to_string(),
            ))
        })?;

    let line = RequestLine {
        method: method.to_string(),
        request_target: target.to_string(),
        http_version: http_version.to_string(),
    };

    Ok(Some((line, idx + CRLF.len())))
}

use std::io;

use thiserror::Error;

/// Why a request line was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestLineError {
    /// The line did not split into exactly three space separated tokens.
    TokenCount(usize),
    /// The method contains a character outside the token set.
    InvalidMethod(String),
    /// The version token is not `HTTP/1.1`.
    UnsupportedVersion(String),
    /// The line is not valid UTF-8.
    NotUtf8,
}

impl std::fmt::Display for RequestLineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestLineError::TokenCount(n) => write!(f, "expected 3 tokens, found {}", n),
            RequestLineError::InvalidMethod(m) => write!(f, "invalid method {:?}", m),
            RequestLineError::UnsupportedVersion(v) => {
                write!(f, "unsupported version {:?}, only HTTP/1.1 is supported", v)
            }
            RequestLineError::NotUtf8 => write!(f, "request line is not valid UTF-8"),
        }
    }
}

/// Errors produced by the HTTP protocol layer.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("malformed request line: {0}")]
    MalformedRequestLine(RequestLineError),

    #[error("malformed header line")]
    MalformedHeader,

    #[error("malformed field name {0:?}")]
    MalformedFieldName(String),

    #[error("request is in error state")]
    RequestInErrorState,

    #[error("failed to read request: {0}")]
    Read(#[source] io::Error),

    #[error("unrecognized status code {0}")]
    UnrecognizedStatusCode(u16),

    #[error("{0} written out of order")]
    WriteOutOfOrder(&'static str),

    #[error("failed to write response: {0}")]
    Write(#[source] io::Error),
}

impl HttpError {
    /// True for errors caused by the bytes the peer sent, as opposed to
    /// transport failures or encoder misuse.
    pub fn is_malformed_request(&self) -> bool {
        matches!(
            self,
            HttpError::MalformedRequestLine(_)
                | HttpError::MalformedHeader
                | HttpError::MalformedFieldName(_)
                | HttpError::RequestInErrorState
        )
    }
}

pub type Result<T> = std::result::Result<T, HttpError>;

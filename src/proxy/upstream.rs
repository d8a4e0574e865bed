//! Upstream connection and response streaming
//!
//! Connects to a plain HTTP server, sends a `GET` and parses the response
//! head. The body is left on the socket and read incrementally.

use anyhow::{bail, Context, Result};
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use url::Url;

use crate::http::headers::Headers;

/// Default buffer size for reading the response head
const BUFFER_SIZE: usize = 4096;

/// Upper bound on the response head
const MAX_HEAD_SIZE: usize = 64 * 1024;

const USER_AGENT: &str = "flux/1.0";

/// A response whose head has been parsed and whose body is still streaming.
pub struct UpstreamResponse {
    /// Numeric status code as sent by the upstream
    pub status_code: u16,

    /// Response headers
    pub headers: Headers,

    /// Body bytes read together with the head
    leftover: BytesMut,

    stream: TcpStream,
}

impl UpstreamResponse {
    /// Reads the next piece of the body into `buf`.
    ///
    /// Returns 0 once the upstream closed the connection.
    pub async fn read_body(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.leftover.is_empty() {
            let n = self.leftover.len().min(buf.len());
            buf[..n].copy_from_slice(&self.leftover[..n]);
            self.leftover.advance(n);
            return Ok(n);
        }

        let n = self
            .stream
            .read(buf)
            .await
            .context("Failed to read upstream body")?;
        Ok(n)
    }
}

/// Fetches `raw_url` with a `GET` over plain HTTP.
///
/// HTTPS is rejected.
pub async fn fetch(raw_url: &str) -> Result<UpstreamResponse> {
    let url = Url::parse(raw_url).context("Invalid upstream URL")?;

    match url.scheme() {
        "http" => {}
        "https" => bail!("HTTPS not supported, use HTTP"),
        other => bail!("Unsupported scheme {:?}", other),
    }

    let host = url.host_str().context("Upstream URL missing host")?;
    let port = url.port().unwrap_or(80);

    let mut stream = TcpStream::connect((host, port))
        .await
        .with_context(|| format!("Failed to connect to {}:{}", host, port))?;

    tracing::trace!(host, port, "Connected to upstream");

    stream.write_all(&build_request(&url)).await?;
    stream.flush().await?;

    read_response_head(stream).await
}

/// Serializes the `GET` request sent for `url`.
pub fn build_request(url: &Url) -> Vec<u8> {
    let mut target = url.path().to_string();
    if target.is_empty() {
        target.push('/');
    }
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };

    let mut headers = Headers::new();
    headers.set("Host", &host);
    headers.set("Connection", "close");
    headers.set("User-Agent", USER_AGENT);

    let mut buffer = format!("GET {} HTTP/1.1\r\n", target).into_bytes();
    for (name, value) in &headers {
        buffer.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
    }
    buffer.extend_from_slice(b"\r\n");

    buffer
}

async fn read_response_head(mut stream: TcpStream) -> Result<UpstreamResponse> {
    let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);

    loop {
        if let Some(end) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = buffer.split_to(end + 4);
            let (status_code, headers) = parse_response_head(&head)?;

            return Ok(UpstreamResponse {
                status_code,
                headers,
                leftover: buffer,
                stream,
            });
        }

        // Prevent unbounded header growth
        if buffer.len() > MAX_HEAD_SIZE {
            bail!("Response headers too large");
        }

        let n = stream.read_buf(&mut buffer).await?;
        if n == 0 {
            bail!("Connection closed before complete response head received");
        }
    }
}

fn parse_response_head(head: &[u8]) -> Result<(u16, Headers)> {
    let line_end = head
        .windows(2)
        .position(|w| w == b"\r\n")
        .context("Empty response")?;

    let status_line =
        std::str::from_utf8(&head[..line_end]).context("Invalid UTF-8 in status line")?;
    let parts: Vec<&str> = status_line.splitn(3, ' ').collect();

    if parts.len() < 2 || !parts[0].starts_with("HTTP/") {
        bail!("Invalid status line: {}", status_line);
    }

    let status_code: u16 = parts[1].parse().context("Invalid status code")?;

    let mut headers = Headers::new();
    let (_, done) = headers
        .parse(&head[line_end + 2..])
        .context("Invalid response headers")?;
    if !done {
        bail!("Response head not terminated");
    }

    Ok((status_code, headers))
}

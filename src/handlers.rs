//! Demo routes served by the `flux` binary.
//!
//! - `/yourproblem`: 400 page
//! - `/myproblem`: 500 page
//! - `/httpbin/<path>`: proxies `<httpbin_base>/<path>` as a chunked body with trailers
//! - `/video`: streams the configured video file as a chunked body
//! - anything else: 200 page

use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWrite};
use tracing::{debug, warn};

use crate::config::AssetsConfig;
use crate::http::headers::Headers;
use crate::http::request::Request;
use crate::http::response::{declare_trailers, default_headers, use_chunked_encoding, StatusCode};
use crate::http::writer::ResponseWriter;
use crate::proxy::fetch;
use crate::server::handler::{Handler, HandlerError};

/// Size of each upstream read forwarded as one chunk
const PROXY_CHUNK_SIZE: usize = 32;

const FILE_CHUNK_SIZE: usize = 4096;

/// Lowercase hex SHA-256 of the proxied body
pub const TRAILER_CONTENT_SHA256: &str = "X-Content-SHA256";
pub const TRAILER_CONTENT_LENGTH: &str = "X-Content-Length";

const OK_PAGE: &str = "<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was handled.</p>
  </body>
</html>";

const BAD_REQUEST_PAGE: &str = "<html>
  <head>
    <title>400 Bad Request</title>
  </head>
  <body>
    <h1>Bad Request</h1>
    <p>The server could not make sense of your request.</p>
  </body>
</html>";

const INTERNAL_ERROR_PAGE: &str = "<html>
  <head>
    <title>500 Internal Server Error</title>
  </head>
  <body>
    <h1>Internal Server Error</h1>
    <p>Something went wrong on our side.</p>
  </body>
</html>";

pub struct DemoHandler {
    assets: AssetsConfig,
}

impl DemoHandler {
    pub fn new(assets: AssetsConfig) -> Self {
        Self { assets }
    }

    async fn proxy_httpbin<W>(&self, w: &mut ResponseWriter<W>, path: &str) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let url = format!("{}/{}", self.assets.httpbin_base.trim_end_matches('/'), path);

        let mut upstream = match fetch(&url).await {
            Ok(res) => res,
            Err(e) => {
                warn!(url = %url, error = %e, "Upstream fetch failed");
                return write_page(w, StatusCode::InternalServerError, INTERNAL_ERROR_PAGE).await;
            }
        };
        debug!(url = %url, status = upstream.status_code, "Proxying upstream response");

        let mut headers = default_headers(0);
        use_chunked_encoding(&mut headers);
        headers.replace("Content-Type", "text/plain");
        declare_trailers(&mut headers, &[TRAILER_CONTENT_SHA256, TRAILER_CONTENT_LENGTH]);

        w.write_status_line(StatusCode::Ok).await?;
        w.write_headers(&headers).await?;

        let mut buf = [0u8; PROXY_CHUNK_SIZE];
        let mut hasher = Sha256::new();
        let mut total = 0usize;
        loop {
            let n = match upstream.read_body(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    warn!(url = %url, error = %e, "Upstream body read failed");
                    break;
                }
            };

            w.write_chunked_body(&buf[..n]).await?;
            hasher.update(&buf[..n]);
            total += n;
        }
        w.write_chunked_body_done().await?;

        let mut trailers = Headers::new();
        trailers.set(TRAILER_CONTENT_SHA256, &format!("{:x}", hasher.finalize()));
        trailers.set(TRAILER_CONTENT_LENGTH, &total.to_string());
        w.write_trailers(&trailers).await?;

        Ok(())
    }

    async fn stream_video<W>(&self, w: &mut ResponseWriter<W>) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut file = match tokio::fs::File::open(&self.assets.video_path).await {
            Ok(f) => f,
            Err(e) => {
                warn!(path = %self.assets.video_path.display(), error = %e, "Cannot open video");
                return write_page(w, StatusCode::InternalServerError, INTERNAL_ERROR_PAGE).await;
            }
        };

        let mut headers = default_headers(0);
        use_chunked_encoding(&mut headers);
        headers.replace("Content-Type", "video/mp4");

        w.write_status_line(StatusCode::Ok).await?;
        w.write_headers(&headers).await?;

        let mut buf = vec![0u8; FILE_CHUNK_SIZE];
        loop {
            let n = file
                .read(&mut buf)
                .await
                .map_err(|e| HandlerError::internal(e.to_string()))?;
            if n == 0 {
                break;
            }
            w.write_chunked_body(&buf[..n]).await?;
        }

        w.write_chunked_body_done().await?;
        w.write_trailers(&Headers::new()).await?;
        Ok(())
    }
}

impl Handler for DemoHandler {
    async fn handle<W>(&self, w: &mut ResponseWriter<W>, req: &Request) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let target = req.target();

        if let Some(path) = target.strip_prefix("/httpbin/") {
            return self.proxy_httpbin(w, path).await;
        }

        match target {
            "/yourproblem" => write_page(w, StatusCode::BadRequest, BAD_REQUEST_PAGE).await,
            "/myproblem" => write_page(w, StatusCode::InternalServerError, INTERNAL_ERROR_PAGE).await,
            "/video" => self.stream_video(w).await,
            _ => write_page(w, StatusCode::Ok, OK_PAGE).await,
        }
    }
}

async fn write_page<W>(w: &mut ResponseWriter<W>, status: StatusCode, page: &str) -> Result<(), HandlerError>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut headers = default_headers(page.len());
    headers.replace("Content-Type", "text/html");

    w.write_status_line(status).await?;
    w.write_headers(&headers).await?;
    w.write_body(page.as_bytes()).await?;
    Ok(())
}

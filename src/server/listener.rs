use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::http::error::HttpError;
use crate::http::request::Request;
use crate::http::response::{default_headers, StatusCode};
use crate::http::writer::ResponseWriter;
use crate::server::handler::{Handler, HandlerError};

/// Handle to a running server.
///
/// [`close`](Server::close) stops the accept loop. Connections already
/// accepted keep running until they finish on their own.
pub struct Server {
    local_addr: SocketAddr,
    closed: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    accept_loop: Option<JoinHandle<()>>,
}

impl Server {
    /// Binds `port` on all interfaces and starts accepting in the background.
    ///
    /// Port 0 picks a free port, see [`local_addr`](Server::local_addr).
    pub async fn serve<H: Handler>(port: u16, handler: H) -> anyhow::Result<Server> {
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("failed to bind port {}", port))?;
        let local_addr = listener.local_addr()?;
        info!("Listening on {}", local_addr);

        let closed = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(Notify::new());

        let accept_loop = tokio::spawn(accept_loop(
            listener,
            Arc::new(handler),
            Arc::clone(&closed),
            Arc::clone(&shutdown),
        ));

        Ok(Server {
            local_addr,
            closed,
            shutdown,
            accept_loop: Some(accept_loop),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stops accepting new connections. Does not wait for in-flight ones.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.shutdown.notify_one();
            info!("Server closing");
        }
    }

    /// Waits for the accept loop to exit. The listening socket is released
    /// once this returns.
    pub async fn join(mut self) {
        if let Some(handle) = self.accept_loop.take() {
            if let Err(e) = handle.await {
                error!("Accept loop panicked: {}", e);
            }
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.close();
    }
}

async fn accept_loop<H: Handler>(
    listener: TcpListener,
    handler: Arc<H>,
    closed: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
) {
    loop {
        let accepted = tokio::select! {
            res = listener.accept() => res,
            _ = shutdown.notified() => break,
        };

        if closed.load(Ordering::SeqCst) {
            break;
        }

        let (mut socket, peer) = match accepted {
            Ok(conn) => conn,
            Err(e) => {
                error!(error = %e, "Accept failed");
                break;
            }
        };
        info!("Accepted connection from {}", peer);

        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(handler.as_ref(), &mut socket).await {
                error!("Connection error from {}: {}", peer, e);
            }
            if let Err(e) = socket.shutdown().await {
                debug!(peer = %peer, error = %e, "Socket shutdown failed");
            }
        });
    }

    info!("Accept loop stopped");
}

/// Serves exactly one request on `stream`.
///
/// A request that fails to parse is answered with `400 Bad Request`. The
/// caller closes the stream afterwards.
pub async fn handle_connection<H, S>(handler: &H, stream: &mut S) -> Result<(), HttpError>
where
    H: Handler,
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let request = match Request::from_reader(stream).await {
        Ok(req) => req,
        Err(e) => {
            if e.is_malformed_request() {
                warn!(error = %e, "Rejecting malformed request");
            } else {
                warn!(error = %e, "Failed to read request");
            }
            let mut w = ResponseWriter::new(&mut *stream);
            w.write_status_line(StatusCode::BadRequest).await?;
            w.write_headers(&default_headers(0)).await?;
            return w.flush().await;
        }
    };

    debug!(
        method = %request.method(),
        target = %request.target(),
        body_len = request.body.len(),
        "Dispatching request"
    );

    let mut w = ResponseWriter::new(&mut *stream);
    match handler.handle(&mut w, &request).await {
        Ok(()) if !w.has_written() => {
            w.write_status_line(StatusCode::Ok).await?;
            w.write_headers(&default_headers(0)).await?;
        }
        Ok(()) => {}
        Err(e) if !w.has_written() => write_handler_error(&mut w, &e).await?,
        Err(e) => {
            warn!(
                status = e.status.as_u16(),
                message = %e.message,
                written = w.bytes_written(),
                "Handler failed after starting the response"
            );
        }
    }

    w.flush().await
}

async fn write_handler_error<W>(w: &mut ResponseWriter<W>, err: &HandlerError) -> Result<(), HttpError>
where
    W: AsyncWrite + Unpin,
{
    debug!(status = err.status.as_u16(), "Handler returned an error");

    let body = err.message.as_bytes();
    w.write_status_line(err.status).await?;
    w.write_headers(&default_headers(body.len())).await?;
    w.write_body(body).await?;
    Ok(())
}

//! End-to-end tests over real TCP connections

use std::sync::Arc;
use std::time::Duration;

use flux::http::request::Request;
use flux::http::response::{default_headers, StatusCode};
use flux::http::writer::ResponseWriter;
use flux::server::{Handler, HandlerError, Server};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Notify;

/// Answers every request with an empty 200.
struct AlwaysOk;

impl Handler for AlwaysOk {
    async fn handle<W>(&self, w: &mut ResponseWriter<W>, _req: &Request) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        w.write_status_line(StatusCode::Ok).await?;
        w.write_headers(&default_headers(0)).await?;
        Ok(())
    }
}

/// `/boom` fails with a 500, everything else echoes the request body.
struct Echo;

impl Handler for Echo {
    async fn handle<W>(&self, w: &mut ResponseWriter<W>, req: &Request) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        if req.target() == "/boom" {
            return Err(HandlerError::internal("boom\n"));
        }

        w.write_status_line(StatusCode::Ok).await?;
        w.write_headers(&default_headers(req.body.len())).await?;
        w.write_body(&req.body).await?;
        Ok(())
    }
}

/// Blocks inside the handler until released.
struct Gate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl Handler for Gate {
    async fn handle<W>(&self, w: &mut ResponseWriter<W>, _req: &Request) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        self.entered.notify_one();
        self.release.notified().await;

        w.write_status_line(StatusCode::Ok).await?;
        w.write_headers(&default_headers(4)).await?;
        w.write_body(b"late").await?;
        Ok(())
    }
}

async fn send(server: &Server, raw: &[u8]) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", server.local_addr().port()))
        .await
        .unwrap();
    stream.write_all(raw).await.unwrap();

    let mut out = String::new();
    stream.read_to_string(&mut out).await.unwrap();
    out
}

#[tokio::test]
async fn test_empty_ok_response() {
    let server = Server::serve(0, AlwaysOk).await.unwrap();
    let out = send(&server, b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").await;

    assert_eq!(
        out,
        "HTTP/1.1 200 OK\r\n\
         Content-Length: 0\r\n\
         Connection: close\r\n\
         Content-Type: text/plain\r\n\
         \r\n"
    );
    server.close();
}

#[tokio::test]
async fn test_handler_error_response() {
    let server = Server::serve(0, Echo).await.unwrap();
    let out = send(&server, b"GET /boom HTTP/1.1\r\nHost: x\r\n\r\n").await;

    let (head, body) = out.split_once("\r\n\r\n").unwrap();
    assert!(head.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert!(head.contains("Content-Length: 5"));
    assert_eq!(body, "boom\n");
    server.close();
}

#[tokio::test]
async fn test_post_body_round_trip() {
    let server = Server::serve(0, Echo).await.unwrap();
    let out = send(
        &server,
        b"POST /x HTTP/1.1\r\nHost: h\r\nContent-Length: 5\r\n\r\nhello",
    )
    .await;

    let (head, body) = out.split_once("\r\n\r\n").unwrap();
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Length: 5"));
    assert_eq!(body, "hello");
    server.close();
}

#[tokio::test]
async fn test_malformed_request_gets_400() {
    let server = Server::serve(0, AlwaysOk).await.unwrap();
    let out = send(&server, b"GET / HTTP/1.0\r\n\r\n").await;

    assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(out.contains("Connection: close\r\n"));
    server.close();
}

#[tokio::test]
async fn test_request_split_across_writes() {
    let server = Server::serve(0, Echo).await.unwrap();
    let mut stream = TcpStream::connect(("127.0.0.1", server.local_addr().port()))
        .await
        .unwrap();

    for piece in [&b"POST /x HT"[..], b"TP/1.1\r\nContent-", b"Length: 3\r\n\r\n", b"a", b"bc"] {
        stream.write_all(piece).await.unwrap();
        stream.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let mut out = String::new();
    stream.read_to_string(&mut out).await.unwrap();
    assert!(out.ends_with("\r\n\r\nabc"));
    server.close();
}

#[tokio::test]
async fn test_concurrent_connections() {
    let server = Server::serve(0, Echo).await.unwrap();
    let port = server.local_addr().port();

    let clients: Vec<_> = (0..8)
        .map(|i| {
            tokio::spawn(async move {
                let body = format!("client-{}", i);
                let raw = format!(
                    "POST / HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}",
                    body.len(),
                    body
                );
                let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
                stream.write_all(raw.as_bytes()).await.unwrap();

                let mut out = String::new();
                stream.read_to_string(&mut out).await.unwrap();
                (body, out)
            })
        })
        .collect();

    for client in clients {
        let (body, out) = client.await.unwrap();
        assert!(out.ends_with(&body));
    }
    server.close();
}

#[tokio::test]
async fn test_close_stops_accepting_but_finishes_in_flight() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let server = Server::serve(
        0,
        Gate {
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
        },
    )
    .await
    .unwrap();
    let port = server.local_addr().port();

    let mut in_flight = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    in_flight
        .write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n")
        .await
        .unwrap();
    entered.notified().await;

    server.close();
    assert!(server.is_closed());
    server.join().await;

    assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());

    release.notify_one();
    let mut out = String::new();
    in_flight.read_to_string(&mut out).await.unwrap();
    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(out.ends_with("late"));
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let server = Server::serve(0, AlwaysOk).await.unwrap();
    server.close();
    server.close();
    assert!(server.is_closed());
    server.join().await;
}

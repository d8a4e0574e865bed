//! Tests for the demo routes

use std::io::Write;

use flux::config::AssetsConfig;
use flux::handlers::DemoHandler;
use flux::http::request::Request;
use flux::http::writer::ResponseWriter;
use flux::server::Handler;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn assets() -> AssetsConfig {
    AssetsConfig {
        video_path: "/nonexistent/video.mp4".into(),
        httpbin_base: "http://127.0.0.1:1".to_string(),
    }
}

async fn request(target: &str) -> Request {
    let raw = format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", target);
    Request::from_reader(&mut raw.as_bytes()).await.unwrap()
}

async fn respond(handler: &DemoHandler, target: &str) -> Vec<u8> {
    let req = request(target).await;
    let mut w = ResponseWriter::new(Vec::new());
    handler.handle(&mut w, &req).await.unwrap();
    w.into_inner()
}

/// Decodes a chunked body, returning the data and the trailer section.
fn decode_chunked(mut rest: &[u8]) -> (Vec<u8>, String) {
    let mut data = Vec::new();
    loop {
        let line_end = rest.windows(2).position(|w| w == b"\r\n").unwrap();
        let size = usize::from_str_radix(std::str::from_utf8(&rest[..line_end]).unwrap(), 16).unwrap();
        rest = &rest[line_end + 2..];
        if size == 0 {
            return (data, String::from_utf8(rest.to_vec()).unwrap());
        }
        data.extend_from_slice(&rest[..size]);
        assert_eq!(&rest[size..size + 2], b"\r\n");
        rest = &rest[size + 2..];
    }
}

fn split_head(out: &[u8]) -> (String, &[u8]) {
    let end = out.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
    (String::from_utf8(out[..end].to_vec()).unwrap(), &out[end + 4..])
}

#[tokio::test]
async fn test_canned_pages() {
    let handler = DemoHandler::new(assets());

    let cases = [
        ("/", "HTTP/1.1 200 OK\r\n", "Success!"),
        ("/yourproblem", "HTTP/1.1 400 Bad Request\r\n", "Bad Request"),
        ("/myproblem", "HTTP/1.1 500 Internal Server Error\r\n", "Internal Server Error"),
    ];

    for (target, status_line, marker) in cases {
        let out = respond(&handler, target).await;
        let (head, body) = split_head(&out);

        assert!(head.starts_with(status_line), "{}", target);
        assert!(head.contains("Content-Type: text/html"), "{}", target);
        assert!(head.contains(&format!("Content-Length: {}", body.len())), "{}", target);
        assert!(String::from_utf8_lossy(body).contains(marker), "{}", target);
    }
}

#[tokio::test]
async fn test_video_streams_file_chunked() {
    let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&content).unwrap();

    let handler = DemoHandler::new(AssetsConfig {
        video_path: file.path().to_path_buf(),
        ..assets()
    });
    let out = respond(&handler, "/video").await;
    let (head, body) = split_head(&out);

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Transfer-Encoding: chunked"));
    assert!(head.contains("Content-Type: video/mp4"));
    assert!(!head.contains("Content-Length"));

    let (data, trailers) = decode_chunked(body);
    assert_eq!(data, content);
    assert_eq!(trailers, "\r\n");
}

#[tokio::test]
async fn test_video_missing_file() {
    let handler = DemoHandler::new(assets());
    let out = respond(&handler, "/video").await;

    assert!(out.starts_with(b"HTTP/1.1 500 Internal Server Error\r\n"));
}

#[tokio::test]
async fn test_httpbin_proxy_with_trailers() {
    let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = upstream.local_addr().unwrap().port();
    let payload = "x".repeat(70);

    let served = payload.clone();
    tokio::spawn(async move {
        let (mut socket, _) = upstream.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let n = socket.read(&mut buf).await.unwrap();
        assert!(buf[..n].starts_with(b"GET /stream/3 HTTP/1.1\r\n"));

        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}",
            served.len(),
            served
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    let handler = DemoHandler::new(AssetsConfig {
        httpbin_base: format!("http://127.0.0.1:{}", port),
        ..assets()
    });
    let out = respond(&handler, "/httpbin/stream/3").await;
    let (head, body) = split_head(&out);

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Transfer-Encoding: chunked"));
    assert!(head.contains("Trailer: X-Content-SHA256, X-Content-Length"));
    assert!(!head.contains("Content-Length:"));

    let (data, trailers) = decode_chunked(body);
    assert_eq!(data, payload.as_bytes());
    assert_eq!(
        trailers,
        "X-Content-SHA256: c71bd109227e23434ecf71fd0a344a209136c79ae5a0bda2b5ca442d699a3cd9\r\n\
         X-Content-Length: 70\r\n\
         \r\n"
    );
}

#[tokio::test]
async fn test_httpbin_upstream_unreachable() {
    let handler = DemoHandler::new(AssetsConfig {
        httpbin_base: "https://httpbin.org".to_string(),
        ..assets()
    });
    let out = respond(&handler, "/httpbin/get").await;

    assert!(out.starts_with(b"HTTP/1.1 500 Internal Server Error\r\n"));
}

//! Minimal HTTP/1.1 JSON transport used by the registry client.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

use crate::error::{ClientError, ClientResult};

/// Status and body of a completed request.
#[derive(Debug)]
pub(crate) struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body decoded as UTF-8, lossily.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn parse_url(url: &str) -> ClientResult<(String, u16, String)> {
    let uri: hyper::Uri = url
        .parse()
        .map_err(|e| ClientError::InvalidUrl(format!("{url}: {e}")))?;

    let host = uri
        .host()
        .ok_or_else(|| ClientError::InvalidUrl(format!("{url}: missing host")))?
        .to_owned();

    let port = uri.port_u16().unwrap_or_else(|| match uri.scheme_str() {
        Some("https") => 443,
        _ => 80,
    });

    let path = uri
        .path_and_query()
        .map_or_else(|| "/".to_owned(), ToString::to_string);

    Ok((host, port, path))
}

/// Send a request and collect the response.
///
/// The timeout bounds the connect and then the entire exchange, handshake
/// through the last body byte, so a server that answers headers and then
/// stalls the body cannot hang the caller.
///
/// Connection refusal is reported as [`ClientError::ConnectionRefused`] so
/// callers can distinguish a dead instance from other transport failures.
pub(crate) async fn request(
    method: Method,
    url: &str,
    body: Option<Vec<u8>>,
    timeout: Duration,
) -> ClientResult<HttpResponse> {
    let (host, port, path) = parse_url(url)?;
    let addr = format!("{host}:{port}");

    let stream = tokio::time::timeout(timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| ClientError::Timeout)?
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::ConnectionRefused {
                ClientError::ConnectionRefused(addr.clone())
            } else {
                ClientError::Http(format!("connect {addr}: {e}"))
            }
        })?;

    tokio::time::timeout(timeout, exchange(stream, method, &host, path, body, url))
        .await
        .map_err(|_| ClientError::Timeout)?
}

async fn exchange(
    stream: TcpStream,
    method: Method,
    host: &str,
    path: String,
    body: Option<Vec<u8>>,
    url: &str,
) -> ClientResult<HttpResponse> {
    let io = TokioIo::new(stream);
    let (mut sender, conn) = http1::handshake(io)
        .await
        .map_err(|e| ClientError::Http(format!("handshake {url}: {e}")))?;

    // Drive the connection until the exchange completes.
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!(error = %e, "http connection error");
        }
    });

    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header("host", host)
        .header("accept", "application/json");

    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }

    let request = builder
        .body(Full::new(Bytes::from(body.unwrap_or_default())))
        .map_err(|e| ClientError::Http(format!("build request: {e}")))?;

    let response = sender
        .send_request(request)
        .await
        .map_err(|e| ClientError::Http(format!("send {url}: {e}")))?;

    let status = response.status().as_u16();
    let body = response
        .collect()
        .await
        .map_err(|e| ClientError::Http(format!("read body {url}: {e}")))?
        .to_bytes();

    Ok(HttpResponse { status, body })
}

/// Liveness check: `GET {base}ping` must answer 2xx with body exactly
/// `Success`. Every other outcome, transport failures included, counts as a
/// failed ping rather than an error.
pub(crate) async fn ping(base: &str, timeout: Duration) -> bool {
    let url = format!("{base}ping");
    match request(Method::GET, &url, None, timeout).await {
        Ok(response) => response.is_success() && response.body.as_ref() == b"Success",
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "ping failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_url_with_port() {
        let (host, port, path) = parse_url("http://localhost:5000/v1/entries").unwrap();
        assert_eq!(host, "localhost");
        assert_eq!(port, 5000);
        assert_eq!(path, "/v1/entries");
    }

    #[test]
    fn parse_url_default_ports() {
        let (_, port, _) = parse_url("http://example.com/").unwrap();
        assert_eq!(port, 80);
        let (_, port, _) = parse_url("https://example.com/").unwrap();
        assert_eq!(port, 443);
    }

    #[test]
    fn parse_url_missing_host() {
        assert!(matches!(
            parse_url("/just/a/path"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn connection_refused_is_classified() {
        // Port 1 is essentially never listening.
        let err = request(
            Method::GET,
            "http://127.0.0.1:1/v1/ping",
            None,
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(err.is_connection_refused());
    }

    #[tokio::test]
    async fn ping_against_dead_host_is_false() {
        assert!(!ping("http://127.0.0.1:1/v1/", Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn stalled_body_times_out() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Answers the headers, sends part of the promised body, then goes
        // silent with the connection held open.
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\npartial")
                .await
                .unwrap();
            std::future::pending::<()>().await;
        });

        let url = format!("http://{addr}/v1/entries/Foo");
        let started = std::time::Instant::now();
        let err = request(Method::GET, &url, None, Duration::from_millis(200))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Timeout));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use station_common::{
    codec::{encode_http_get, Progress, Response, ResponseParser},
    config::HttpConfig,
    ParseError, Scheme, Uri, UriError,
};
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::oneshot,
    time::timeout,
};
use tracing::debug;

const READ_CHUNK: usize = 1024;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error(transparent)]
    Uri(#[from] UriError),
    #[error("https is not supported")]
    UnsupportedScheme,
    #[error("a request is already in flight")]
    Busy,
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },
    #[error("connect to {0} timed out")]
    ConnectTimeout(String),
    #[error("no data within {0} ms")]
    ReceiveTimeout(u64),
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub type HttpResult = Result<Response, HttpError>;

struct SlotGuard(Arc<AtomicBool>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    config: HttpConfig,
    busy: Arc<AtomicBool>,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Self {
        Self {
            config,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    #[cfg(test)]
    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Starts a GET. Invalid URIs and a busy slot fail synchronously; every
    /// other outcome arrives once on the returned receiver.
    pub fn get(&self, url: &str) -> Result<oneshot::Receiver<HttpResult>, HttpError> {
        let uri = Uri::parse(url)?;
        if uri.scheme == Scheme::Https {
            return Err(HttpError::UnsupportedScheme);
        }

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(HttpError::Busy);
        }
        let slot = SlotGuard(self.busy.clone());

        let (done, rx) = oneshot::channel();
        let config = self.config.clone();
        tokio::spawn(async move {
            let result = exchange(&uri, &config).await;
            drop(slot);
            let _ = done.send(result);
        });

        Ok(rx)
    }
}

async fn exchange(uri: &Uri, config: &HttpConfig) -> HttpResult {
    let addr = format!("{}:{}", uri.host, uri.port);
    let connect_timeout = Duration::from_millis(config.connect_timeout_ms);

    let mut stream = timeout(connect_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| HttpError::ConnectTimeout(addr.clone()))?
        .map_err(|source| HttpError::Connect {
            addr: addr.clone(),
            source,
        })?;

    stream.write_all(encode_http_get(uri).as_bytes()).await?;
    debug!(%addr, path = %uri.path, "http request sent");

    let receive_timeout = Duration::from_millis(config.receive_timeout_ms);
    let mut parser = ResponseParser::with_limit(config.max_response_bytes);
    let mut chunk = [0_u8; READ_CHUNK];
    loop {
        let read = timeout(receive_timeout, stream.read(&mut chunk))
            .await
            .map_err(|_| HttpError::ReceiveTimeout(config.receive_timeout_ms))??;
        if read == 0 {
            break;
        }
        if parser.push(&chunk[..read])? == Progress::Complete {
            break;
        }
    }

    let response = parser.finish()?;
    debug!(
        %addr,
        status = response.status_code,
        body_len = response.body.len(),
        "http response received"
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::net::TcpListener;

    fn config() -> HttpConfig {
        HttpConfig {
            connect_timeout_ms: 1_000,
            receive_timeout_ms: 1_000,
            max_response_bytes: 4_096,
        }
    }

    /// Accepts one connection, reads the request and answers with `chunks`,
    /// pausing between them. The server task yields the request text.
    async fn serve_once(chunks: Vec<&'static str>) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = vec![0_u8; 1024];
            let read = socket.read(&mut request).await.unwrap();
            for chunk in chunks {
                socket.write_all(chunk.as_bytes()).await.unwrap();
                socket.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            String::from_utf8_lossy(&request[..read]).to_string()
        });

        (format!("http://127.0.0.1:{port}/api/Key/q/1,2.json"), server)
    }

    #[tokio::test]
    async fn fetches_response_streamed_in_chunks() {
        let (url, server) = serve_once(vec![
            "HTTP/1.1 200 OK\r\nContent-Le",
            "ngth: 11\r\n\r\nhello",
            " world",
        ])
        .await;
        let client = HttpClient::new(config());

        let response = client.get(&url).unwrap().await.unwrap().unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, b"hello world".to_vec());
        assert_eq!(
            server.await.unwrap(),
            "GET /api/Key/q/1,2.json HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n"
        );
        assert!(!client.is_busy());
    }

    #[tokio::test]
    async fn second_request_fails_fast_while_first_is_pending() {
        let (url, _server) = serve_once(vec![
            "HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n",
        ])
        .await;
        let client = HttpClient::new(config());

        let first = client.get(&url).unwrap();
        assert!(matches!(client.get(&url), Err(HttpError::Busy)));

        let response = first.await.unwrap().unwrap();
        assert_eq!(response.status_code, 204);

        // Slot is free again once the first one completed.
        assert!(!client.is_busy());
    }

    #[tokio::test]
    async fn rejects_invalid_and_https_uris_synchronously() {
        let client = HttpClient::new(config());

        assert!(matches!(client.get("ftp://host/"), Err(HttpError::Uri(_))));
        assert!(matches!(
            client.get("https://api.example.com/"),
            Err(HttpError::UnsupportedScheme)
        ));
        assert!(!client.is_busy());
    }

    #[tokio::test]
    async fn reports_truncated_body() {
        let (url, _server) = serve_once(vec![
            "HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nshort",
        ])
        .await;
        let client = HttpClient::new(config());

        let result = client.get(&url).unwrap().await.unwrap();

        assert!(matches!(
            result,
            Err(HttpError::Parse(ParseError::Truncated {
                received: 5,
                expected: 100
            }))
        ));
    }

    #[tokio::test]
    async fn rejects_response_over_size_limit() {
        let (url, _server) = serve_once(vec![
            "HTTP/1.1 200 OK\r\nContent-Length: 5000000\r\n\r\n",
        ])
        .await;
        let client = HttpClient::new(config());

        let result = client.get(&url).unwrap().await.unwrap();

        assert!(matches!(
            result,
            Err(HttpError::Parse(ParseError::TooLarge { limit: 4_096 }))
        ));
        assert!(!client.is_busy());
    }

    #[tokio::test]
    async fn reports_malformed_status_line() {
        let (url, _server) = serve_once(vec!["SSH-2.0-OpenSSH\r\n\r\n"]).await;
        let client = HttpClient::new(config());

        let result = client.get(&url).unwrap().await.unwrap();

        assert!(matches!(
            result,
            Err(HttpError::Parse(ParseError::StatusLine(_)))
        ));
    }

    #[tokio::test]
    async fn reports_connect_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let client = HttpClient::new(config());

        let result = client
            .get(&format!("http://127.0.0.1:{port}/"))
            .unwrap()
            .await
            .unwrap();

        assert!(matches!(
            result,
            Err(HttpError::Connect { .. }) | Err(HttpError::ConnectTimeout(_))
        ));
    }
}

//! HTTP client for the streaming chat endpoint

use std::pin::Pin;
use std::time::Duration;

use futures::StreamExt;
use tokio_stream::Stream;

use crate::error::{Error, Result};
use crate::types::ChatRequest;

/// Raw response body chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Client for one chat endpoint
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl ChatClient {
    /// Create a client for `endpoint` with no request timeout
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_timeout(endpoint, None)
    }

    /// Create a client, optionally bounding each request by `timeout`
    pub fn with_timeout(endpoint: &str, timeout: Option<Duration>) -> Result<Self> {
        let endpoint = reqwest::Url::parse(endpoint.trim())
            .map_err(|e| Error::InvalidConfig(format!("invalid endpoint '{}': {}", endpoint, e)))?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// POST the request and return the response body as a chunk stream.
    ///
    /// Non-success statuses are turned into [`Error::Status`] before any body
    /// chunk is handed out.
    pub async fn open(&self, request: &ChatRequest) -> Result<ByteStream> {
        tracing::debug!(
            "POST {} ({} history turns, {} files)",
            self.endpoint,
            request.history.len(),
            request.files.len()
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::status(status.as_u16(), body));
        }

        let body = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| Error::Body(e.to_string()))
        });

        Ok(Box::pin(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::consume;
    use crate::types::Turn;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single canned response and hand back the raw request
    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/stream", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&request) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });

        (url, handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= header_end + 4 + content_length
    }

    #[test]
    fn test_rejects_invalid_endpoint() {
        let err = ChatClient::new("not a url").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_open_streams_body_and_sends_json() {
        let (url, server) = serve_once(concat!(
            "HTTP/1.1 200 OK\r\n",
            "content-type: text/event-stream\r\n",
            "connection: close\r\n",
            "\r\n",
            "data: {\"content\":\"Hi\"}\n\n",
            "data: {\"content\":\" there\"}\n\n",
        ))
        .await;

        let client = ChatClient::new(&url).unwrap();
        let request = ChatRequest::new("hello", &[Turn::bot("Hello! How can I help you today?")]);
        let body = client.open(&request).await.unwrap();

        let updates: Vec<_> = consume(body, 1).collect().await;
        let last = updates.last().unwrap().as_ref().unwrap();
        assert_eq!(
            last,
            &crate::stream::ConversationUpdate::Text {
                index: 1,
                text: "Hi there".into()
            }
        );

        let raw_request = server.await.unwrap();
        assert!(raw_request.starts_with("POST /stream"));
        let (_, json_body) = raw_request.split_once("\r\n\r\n").unwrap();
        let sent: ChatRequest = serde_json::from_str(json_body).unwrap();
        assert_eq!(sent, request);
    }

    #[tokio::test]
    async fn test_open_maps_error_status() {
        let (url, server) = serve_once(concat!(
            "HTTP/1.1 503 Service Unavailable\r\n",
            "content-length: 4\r\n",
            "connection: close\r\n",
            "\r\n",
            "down",
        ))
        .await;

        let client = ChatClient::new(&url).unwrap();
        let err = match client.open(&ChatRequest::new("hi", &[])).await {
            Ok(_) => panic!("expected status error"),
            Err(e) => e,
        };
        match err {
            Error::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "down");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        server.await.unwrap();
    }
}

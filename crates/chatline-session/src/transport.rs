//! Transport abstraction for opening reply streams

use async_trait::async_trait;
use chatline_stream::{ByteStream, ChatClient, ChatRequest, Result};

/// Something that can send a chat request and hand back the reply body
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request`, returning the raw body chunks
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream>;
}

/// HTTP transport backed by [`ChatClient`]
pub struct HttpTransport {
    client: ChatClient,
}

impl HttpTransport {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream> {
        self.client.open(request).await
    }
}

//! WebSocket transport built on tokio-tungstenite.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, OnceCell};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use crate::error::{Error, Result};
use crate::transport::{Frame, Transport};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

struct Connection {
    write: Mutex<WsWriter>,
    read: Mutex<WsReader>,
}

/// WebSocket transport.
///
/// The connection is opened lazily by the first call to [`Transport::resume`]
/// (or the first send/receive). A cancelled transport never reconnects.
pub struct WebSocketTransport {
    request: Mutex<Option<http::Request<()>>>,
    connection: OnceCell<Connection>,
    cancelled: AtomicBool,
}

impl WebSocketTransport {
    /// Creates an unconnected transport for the given handshake request.
    pub fn new(request: http::Request<()>) -> Self {
        Self {
            request: Mutex::new(Some(request)),
            connection: OnceCell::new(),
            cancelled: AtomicBool::new(false),
        }
    }

    async fn connection(&self) -> Result<&Connection> {
        if self.cancelled.load(Ordering::Acquire) {
            return Err(Error::SessionClosed);
        }
        self.connection
            .get_or_try_init(|| async {
                let request = self
                    .request
                    .lock()
                    .await
                    .take()
                    .ok_or_else(|| Error::Connection("connection attempt already made".to_string()))?;
                debug!("Connecting to: {}", request.uri());

                let (ws_stream, _response) = connect_async(request)
                    .await
                    .map_err(|e| Error::Connection(format!("Failed to connect: {}", e)))?;
                let (write, read) = ws_stream.split();

                Ok(Connection {
                    write: Mutex::new(write),
                    read: Mutex::new(read),
                })
            })
            .await
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn resume(&self) -> Result<()> {
        self.connection().await.map(|_| ())
    }

    async fn send_text(&self, text: String) -> Result<()> {
        let conn = self.connection().await?;
        let mut write = conn.write.lock().await;
        write.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn receive(&self) -> Result<Frame> {
        let conn = self.connection().await?;
        let mut read = conn.read.lock().await;
        loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Frame::Text(text.as_str().to_string())),
                Some(Ok(Message::Binary(data))) => return Ok(Frame::Binary(data.to_vec())),
                Some(Ok(Message::Close(frame))) => {
                    debug!("WebSocket closed by server: {:?}", frame);
                    return Err(Error::Connection("closed by server".to_string()));
                }
                // tungstenite answers pings on the next write
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Frame(_))) => continue,
                Some(Err(e)) => return Err(Error::WebSocket(e)),
                None => return Err(Error::Connection("stream ended".to_string())),
            }
        }
    }

    async fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(conn) = self.connection.get() {
            let mut write = conn.write.lock().await;
            match tokio::time::timeout(CLOSE_TIMEOUT, write.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!("Close error: {}", e),
                Err(_) => debug!("Close timed out after {:?}", CLOSE_TIMEOUT),
            }
        }
    }
}

//! Transport abstraction used by [`Session`](crate::Session).

use async_trait::async_trait;

use crate::error::Result;

/// One frame received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// A bidirectional message transport, typically a WebSocket.
///
/// The session keeps at most one `receive` outstanding and serializes all
/// `send_text` calls, so implementations do not need to handle concurrent
/// reads or concurrent writes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Starts (or resumes) the underlying connection. Must be idempotent.
    async fn resume(&self) -> Result<()>;

    /// Writes one complete text frame.
    async fn send_text(&self, text: String) -> Result<()>;

    /// Waits for the next frame. Any error is treated as fatal by the session.
    async fn receive(&self) -> Result<Frame>;

    /// Closes the connection. Outstanding and later calls may fail.
    async fn cancel(&self);
}

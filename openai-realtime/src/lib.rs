//! OpenAI Realtime voice sessions for Rust.
//!
//! This crate drives one realtime session over a WebSocket: it sends the
//! session configuration as the first frame, turns every inbound JSON frame
//! into a typed [`ServerEvent`], and lets callers send commands at any time.
//!
//! # Features
//!
//! - Typed session configuration (audio formats, VAD, tools, token limits)
//! - Typed client commands and server events
//! - Single-consumer event stream that ends when the session is torn down
//! - Pluggable [`Transport`] for tests or non-WebSocket carriers
//!
//! # Example
//!
//! ```rust,no_run
//! use rtvoice_openai_realtime::{Client, ServerEvent, SessionConfiguration};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new("your-api-key")?;
//!
//!     let config = SessionConfiguration::voice_assistant()
//!         .with_instructions("You are a helpful assistant.");
//!     let session = client.connect_websocket(config).await?;
//!     let mut events = session.events();
//!
//!     session.add_user_message("Hello!").await?;
//!     session.create_response(None).await?;
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             ServerEvent::ResponseTranscriptDelta { delta } => print!("{}", delta),
//!             ServerEvent::ResponseDone => break,
//!             _ => {}
//!         }
//!     }
//!
//!     session.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod command;
pub mod error;
pub mod event;
pub mod session;
pub mod transport;
pub mod types;
pub mod websocket;

#[cfg(test)]
mod tests;

// Re-export main types
pub use client::{Client, ClientBuilder};
pub use command::ClientCommand;
pub use error::{Error, Result};
pub use event::ServerEvent;
pub use session::{EARLY_DISCONNECT_THRESHOLD, EventStream, MAX_PENDING_EVENTS, Session};
pub use transport::{Frame, Transport};
pub use types::*;
pub use websocket::WebSocketTransport;

// Re-export event type constants
pub use event::{
    EVENT_TYPE_ERROR, EVENT_TYPE_INPUT_AUDIO_BUFFER_SPEECH_STARTED,
    EVENT_TYPE_INPUT_AUDIO_BUFFER_SPEECH_STOPPED, EVENT_TYPE_INPUT_AUDIO_BUFFER_TRANSCRIPT,
    EVENT_TYPE_INPUT_AUDIO_TRANSCRIPTION_COMPLETED, EVENT_TYPE_INPUT_AUDIO_TRANSCRIPTION_DELTA,
    EVENT_TYPE_MCP_LIST_TOOLS_COMPLETED, EVENT_TYPE_MCP_LIST_TOOLS_FAILED,
    EVENT_TYPE_MCP_LIST_TOOLS_IN_PROGRESS, EVENT_TYPE_RESPONSE_AUDIO_DELTA,
    EVENT_TYPE_RESPONSE_AUDIO_TRANSCRIPT_DELTA, EVENT_TYPE_RESPONSE_AUDIO_TRANSCRIPT_DONE,
    EVENT_TYPE_RESPONSE_CREATED, EVENT_TYPE_RESPONSE_DONE,
    EVENT_TYPE_RESPONSE_FUNCTION_CALL_ARGUMENTS_DONE, EVENT_TYPE_RESPONSE_TEXT_DELTA,
    EVENT_TYPE_SESSION_CREATED, EVENT_TYPE_SESSION_UPDATED,
};

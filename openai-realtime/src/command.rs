//! Client commands (client → server).
//!
//! [`Session::send`](crate::Session::send) accepts any `Serialize` value, so
//! callers are free to build their own command shapes. [`ClientCommand`]
//! covers the commands this crate knows about.

use base64::Engine;
use serde::Serialize;

use crate::types::{ConversationItem, ResponseOptions, SessionConfiguration};

pub const EVENT_TYPE_SESSION_UPDATE: &str = "session.update";
pub const EVENT_TYPE_INPUT_AUDIO_BUFFER_APPEND: &str = "input_audio_buffer.append";
pub const EVENT_TYPE_INPUT_AUDIO_BUFFER_COMMIT: &str = "input_audio_buffer.commit";
pub const EVENT_TYPE_INPUT_AUDIO_BUFFER_CLEAR: &str = "input_audio_buffer.clear";
pub const EVENT_TYPE_CONVERSATION_ITEM_CREATE: &str = "conversation.item.create";
pub const EVENT_TYPE_RESPONSE_CREATE: &str = "response.create";
pub const EVENT_TYPE_RESPONSE_CANCEL: &str = "response.cancel";

/// A command sent from the client to the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    #[serde(rename = "session.update")]
    SessionUpdate {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        session: SessionConfiguration,
    },

    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        /// Base64-encoded audio in the session's input format.
        audio: String,
    },

    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
    },

    #[serde(rename = "input_audio_buffer.clear")]
    InputAudioBufferClear {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
    },

    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        item: ConversationItem,
    },

    #[serde(rename = "response.create")]
    ResponseCreate {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<ResponseOptions>,
    },

    #[serde(rename = "response.cancel")]
    ResponseCancel {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
    },
}

impl ClientCommand {
    pub fn session_update(session: SessionConfiguration) -> Self {
        ClientCommand::SessionUpdate {
            event_id: None,
            session,
        }
    }

    /// Appends already base64-encoded audio.
    pub fn append_audio_base64(audio: impl Into<String>) -> Self {
        ClientCommand::InputAudioBufferAppend {
            event_id: None,
            audio: audio.into(),
        }
    }

    /// Appends raw audio bytes, base64-encoding them.
    pub fn append_audio(audio: &[u8]) -> Self {
        Self::append_audio_base64(base64::engine::general_purpose::STANDARD.encode(audio))
    }

    pub fn commit_input() -> Self {
        ClientCommand::InputAudioBufferCommit { event_id: None }
    }

    pub fn clear_input() -> Self {
        ClientCommand::InputAudioBufferClear { event_id: None }
    }

    pub fn create_item(item: ConversationItem) -> Self {
        ClientCommand::ConversationItemCreate {
            event_id: None,
            item,
        }
    }

    pub fn create_response(response: Option<ResponseOptions>) -> Self {
        ClientCommand::ResponseCreate {
            event_id: None,
            response,
        }
    }

    pub fn cancel_response() -> Self {
        ClientCommand::ResponseCancel { event_id: None }
    }

    /// Attaches a client-generated event ID, echoed by the server in errors.
    pub fn with_event_id(mut self, id: impl Into<String>) -> Self {
        let slot = match &mut self {
            ClientCommand::SessionUpdate { event_id, .. }
            | ClientCommand::InputAudioBufferAppend { event_id, .. }
            | ClientCommand::InputAudioBufferCommit { event_id }
            | ClientCommand::InputAudioBufferClear { event_id }
            | ClientCommand::ConversationItemCreate { event_id, .. }
            | ClientCommand::ResponseCreate { event_id, .. }
            | ClientCommand::ResponseCancel { event_id } => event_id,
        };
        *slot = Some(id.into());
        self
    }

    /// Returns the wire discriminator of this command.
    pub fn event_type(&self) -> &'static str {
        match self {
            ClientCommand::SessionUpdate { .. } => EVENT_TYPE_SESSION_UPDATE,
            ClientCommand::InputAudioBufferAppend { .. } => EVENT_TYPE_INPUT_AUDIO_BUFFER_APPEND,
            ClientCommand::InputAudioBufferCommit { .. } => EVENT_TYPE_INPUT_AUDIO_BUFFER_COMMIT,
            ClientCommand::InputAudioBufferClear { .. } => EVENT_TYPE_INPUT_AUDIO_BUFFER_CLEAR,
            ClientCommand::ConversationItemCreate { .. } => EVENT_TYPE_CONVERSATION_ITEM_CREATE,
            ClientCommand::ResponseCreate { .. } => EVENT_TYPE_RESPONSE_CREATE,
            ClientCommand::ResponseCancel { .. } => EVENT_TYPE_RESPONSE_CANCEL,
        }
    }
}

/// Generates a client event ID.
pub(crate) fn generate_event_id() -> String {
    format!("evt_{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}

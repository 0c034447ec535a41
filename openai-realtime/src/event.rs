//! Server events (server → client).

use base64::Engine;

use crate::types::SessionConfiguration;

/// Error event.
pub const EVENT_TYPE_ERROR: &str = "error";

/// Session events.
pub const EVENT_TYPE_SESSION_CREATED: &str = "session.created";
pub const EVENT_TYPE_SESSION_UPDATED: &str = "session.updated";

/// Input audio buffer events.
pub const EVENT_TYPE_INPUT_AUDIO_BUFFER_SPEECH_STARTED: &str = "input_audio_buffer.speech_started";
pub const EVENT_TYPE_INPUT_AUDIO_BUFFER_SPEECH_STOPPED: &str = "input_audio_buffer.speech_stopped";
pub const EVENT_TYPE_INPUT_AUDIO_BUFFER_TRANSCRIPT: &str = "input_audio_buffer.transcript";

/// Input transcription events.
pub const EVENT_TYPE_INPUT_AUDIO_TRANSCRIPTION_DELTA: &str =
    "conversation.item.input_audio_transcription.delta";
pub const EVENT_TYPE_INPUT_AUDIO_TRANSCRIPTION_COMPLETED: &str =
    "conversation.item.input_audio_transcription.completed";

/// Response events.
pub const EVENT_TYPE_RESPONSE_CREATED: &str = "response.created";
pub const EVENT_TYPE_RESPONSE_DONE: &str = "response.done";
pub const EVENT_TYPE_RESPONSE_TEXT_DELTA: &str = "response.text.delta";
pub const EVENT_TYPE_RESPONSE_AUDIO_DELTA: &str = "response.audio.delta";
pub const EVENT_TYPE_RESPONSE_AUDIO_TRANSCRIPT_DELTA: &str = "response.audio_transcript.delta";
pub const EVENT_TYPE_RESPONSE_AUDIO_TRANSCRIPT_DONE: &str = "response.audio_transcript.done";
pub const EVENT_TYPE_RESPONSE_FUNCTION_CALL_ARGUMENTS_DONE: &str =
    "response.function_call_arguments.done";

/// MCP tool listing events.
pub const EVENT_TYPE_MCP_LIST_TOOLS_IN_PROGRESS: &str = "mcp_list_tools.in_progress";
pub const EVENT_TYPE_MCP_LIST_TOOLS_COMPLETED: &str = "mcp_list_tools.completed";
pub const EVENT_TYPE_MCP_LIST_TOOLS_FAILED: &str = "mcp_list_tools.failed";

/// A decoded server event.
///
/// Built by [`codec::decode`](crate::codec::decode); see there for how frames
/// with unknown or missing discriminators are treated.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Server-reported error. The `error` field is passed through untouched.
    Error { error: serde_json::Value },

    SessionCreated { session: Option<SessionConfiguration> },
    SessionUpdated { session: Option<SessionConfiguration> },

    ResponseCreated,
    ResponseDone,

    /// Base64-encoded chunk of output audio.
    ResponseAudioDelta { delta: String },
    ResponseTextDelta { delta: String },
    ResponseTranscriptDelta { delta: String },
    ResponseTranscriptDone { transcript: String },

    ResponseFunctionCallArgumentsDone {
        name: String,
        arguments: String,
        call_id: String,
    },

    InputAudioBufferSpeechStarted,
    InputAudioBufferSpeechStopped,
    InputAudioBufferTranscript { transcript: String },
    InputAudioTranscriptionDelta { delta: String },
    InputAudioTranscriptionCompleted { transcript: String },

    McpListToolsInProgress,
    /// The complete `mcp_list_tools.completed` frame.
    McpListToolsCompleted { payload: serde_json::Value },
    McpListToolsFailed { message: Option<String> },
}

impl ServerEvent {
    /// Returns the wire discriminator of this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            ServerEvent::Error { .. } => EVENT_TYPE_ERROR,
            ServerEvent::SessionCreated { .. } => EVENT_TYPE_SESSION_CREATED,
            ServerEvent::SessionUpdated { .. } => EVENT_TYPE_SESSION_UPDATED,
            ServerEvent::ResponseCreated => EVENT_TYPE_RESPONSE_CREATED,
            ServerEvent::ResponseDone => EVENT_TYPE_RESPONSE_DONE,
            ServerEvent::ResponseAudioDelta { .. } => EVENT_TYPE_RESPONSE_AUDIO_DELTA,
            ServerEvent::ResponseTextDelta { .. } => EVENT_TYPE_RESPONSE_TEXT_DELTA,
            ServerEvent::ResponseTranscriptDelta { .. } => EVENT_TYPE_RESPONSE_AUDIO_TRANSCRIPT_DELTA,
            ServerEvent::ResponseTranscriptDone { .. } => EVENT_TYPE_RESPONSE_AUDIO_TRANSCRIPT_DONE,
            ServerEvent::ResponseFunctionCallArgumentsDone { .. } => {
                EVENT_TYPE_RESPONSE_FUNCTION_CALL_ARGUMENTS_DONE
            }
            ServerEvent::InputAudioBufferSpeechStarted => {
                EVENT_TYPE_INPUT_AUDIO_BUFFER_SPEECH_STARTED
            }
            ServerEvent::InputAudioBufferSpeechStopped => {
                EVENT_TYPE_INPUT_AUDIO_BUFFER_SPEECH_STOPPED
            }
            ServerEvent::InputAudioBufferTranscript { .. } => EVENT_TYPE_INPUT_AUDIO_BUFFER_TRANSCRIPT,
            ServerEvent::InputAudioTranscriptionDelta { .. } => {
                EVENT_TYPE_INPUT_AUDIO_TRANSCRIPTION_DELTA
            }
            ServerEvent::InputAudioTranscriptionCompleted { .. } => {
                EVENT_TYPE_INPUT_AUDIO_TRANSCRIPTION_COMPLETED
            }
            ServerEvent::McpListToolsInProgress => EVENT_TYPE_MCP_LIST_TOOLS_IN_PROGRESS,
            ServerEvent::McpListToolsCompleted { .. } => EVENT_TYPE_MCP_LIST_TOOLS_COMPLETED,
            ServerEvent::McpListToolsFailed { .. } => EVENT_TYPE_MCP_LIST_TOOLS_FAILED,
        }
    }

    /// Returns true if this is an error event.
    pub fn is_error(&self) -> bool {
        matches!(self, ServerEvent::Error { .. })
    }

    /// Human-readable message of an error event.
    ///
    /// Accepts both `{"error": {"message": ...}}` and `{"error": "..."}`.
    pub fn error_message(&self) -> Option<String> {
        match self {
            ServerEvent::Error { error } => match error {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Object(map) => map
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .or_else(|| Some(error.to_string())),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            },
            _ => None,
        }
    }

    /// Decodes the PCM payload of a `response.audio.delta` event.
    /// Returns None for other events or invalid base64.
    pub fn decode_audio(&self) -> Option<Vec<u8>> {
        match self {
            ServerEvent::ResponseAudioDelta { delta } => {
                base64::engine::general_purpose::STANDARD.decode(delta).ok()
            }
            _ => None,
        }
    }
}

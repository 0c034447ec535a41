//! Wire codec: commands to JSON text frames, JSON text frames to events.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::event::*;

/// Encodes a command as a JSON text frame.
///
/// Object keys are emitted in sorted order (serde_json's default `Map` is a
/// `BTreeMap`), so equal commands always produce identical frames.
pub fn encode<C: Serialize + ?Sized>(command: &C) -> Result<String> {
    let value = serde_json::to_value(command)?;
    Ok(serde_json::to_string(&value)?)
}

/// Decodes one JSON text frame.
///
/// - `Ok(Some(event))` for a known discriminator.
/// - `Ok(None)` for an unknown discriminator, or a known one whose payload
///   fields are missing. The frame is logged and skipped.
/// - `Err(Error::Protocol)` if the frame is not a JSON object or has no
///   string `type` field.
pub fn decode(text: &str) -> Result<Option<ServerEvent>> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| Error::Protocol(format!("frame is not valid JSON: {}", e)))?;
    let Value::Object(frame) = value else {
        return Err(Error::Protocol("frame is not a JSON object".to_string()));
    };
    let event_type = match frame.get("type") {
        Some(Value::String(t)) => t.as_str(),
        Some(_) => return Err(Error::Protocol("frame `type` is not a string".to_string())),
        None => return Err(Error::Protocol("frame has no `type` field".to_string())),
    };

    let event = match event_type {
        EVENT_TYPE_ERROR => Some(ServerEvent::Error {
            error: frame.get("error").cloned().unwrap_or(Value::Null),
        }),
        EVENT_TYPE_SESSION_CREATED => Some(ServerEvent::SessionCreated {
            session: session(&frame),
        }),
        EVENT_TYPE_SESSION_UPDATED => Some(ServerEvent::SessionUpdated {
            session: session(&frame),
        }),
        EVENT_TYPE_RESPONSE_CREATED => Some(ServerEvent::ResponseCreated),
        EVENT_TYPE_RESPONSE_DONE => Some(ServerEvent::ResponseDone),
        EVENT_TYPE_RESPONSE_AUDIO_DELTA => {
            string(&frame, "delta").map(|delta| ServerEvent::ResponseAudioDelta { delta })
        }
        EVENT_TYPE_RESPONSE_TEXT_DELTA => {
            string(&frame, "delta").map(|delta| ServerEvent::ResponseTextDelta { delta })
        }
        EVENT_TYPE_RESPONSE_AUDIO_TRANSCRIPT_DELTA => {
            string(&frame, "delta").map(|delta| ServerEvent::ResponseTranscriptDelta { delta })
        }
        EVENT_TYPE_RESPONSE_AUDIO_TRANSCRIPT_DONE => string(&frame, "transcript")
            .map(|transcript| ServerEvent::ResponseTranscriptDone { transcript }),
        EVENT_TYPE_RESPONSE_FUNCTION_CALL_ARGUMENTS_DONE => {
            match (
                string(&frame, "name"),
                string(&frame, "arguments"),
                string(&frame, "call_id"),
            ) {
                (Some(name), Some(arguments), Some(call_id)) => {
                    Some(ServerEvent::ResponseFunctionCallArgumentsDone {
                        name,
                        arguments,
                        call_id,
                    })
                }
                _ => None,
            }
        }
        EVENT_TYPE_INPUT_AUDIO_BUFFER_SPEECH_STARTED => {
            Some(ServerEvent::InputAudioBufferSpeechStarted)
        }
        EVENT_TYPE_INPUT_AUDIO_BUFFER_SPEECH_STOPPED => {
            Some(ServerEvent::InputAudioBufferSpeechStopped)
        }
        EVENT_TYPE_INPUT_AUDIO_BUFFER_TRANSCRIPT => string(&frame, "transcript")
            .map(|transcript| ServerEvent::InputAudioBufferTranscript { transcript }),
        EVENT_TYPE_INPUT_AUDIO_TRANSCRIPTION_DELTA => string(&frame, "delta")
            .map(|delta| ServerEvent::InputAudioTranscriptionDelta { delta }),
        EVENT_TYPE_INPUT_AUDIO_TRANSCRIPTION_COMPLETED => string(&frame, "transcript")
            .map(|transcript| ServerEvent::InputAudioTranscriptionCompleted { transcript }),
        EVENT_TYPE_MCP_LIST_TOOLS_IN_PROGRESS => Some(ServerEvent::McpListToolsInProgress),
        EVENT_TYPE_MCP_LIST_TOOLS_COMPLETED => Some(ServerEvent::McpListToolsCompleted {
            payload: Value::Object(frame.clone()),
        }),
        EVENT_TYPE_MCP_LIST_TOOLS_FAILED => Some(ServerEvent::McpListToolsFailed {
            message: frame
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .or_else(|| frame.get("message").and_then(Value::as_str))
                .map(str::to_string),
        }),
        other => {
            debug!("Unhandled event type: {}", other);
            return Ok(None);
        }
    };

    if event.is_none() {
        warn!("Dropping {} event with missing payload fields", event_type);
    }
    Ok(event)
}

fn string(frame: &Map<String, Value>, key: &str) -> Option<String> {
    frame.get(key).and_then(Value::as_str).map(str::to_string)
}

fn session(frame: &Map<String, Value>) -> Option<crate::types::SessionConfiguration> {
    let raw = frame.get("session")?;
    match serde_json::from_value(raw.clone()) {
        Ok(session) => Some(session),
        Err(e) => {
            warn!("Ignoring undecodable session payload: {}", e);
            None
        }
    }
}

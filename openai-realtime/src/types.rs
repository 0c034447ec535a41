//! Type definitions for OpenAI Realtime sessions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize, Serializer};

// ============================================================================
// Models
// ============================================================================

/// GPT-4o realtime preview model.
pub const MODEL_GPT4O_REALTIME_PREVIEW: &str = "gpt-4o-realtime-preview";
/// GPT-4o realtime preview model (2024-12-17 version).
pub const MODEL_GPT4O_REALTIME_PREVIEW_20241217: &str = "gpt-4o-realtime-preview-2024-12-17";
/// GPT-4o mini realtime preview model.
pub const MODEL_GPT4O_MINI_REALTIME_PREVIEW: &str = "gpt-4o-mini-realtime-preview";

/// Default input transcription model.
pub const TRANSCRIPTION_MODEL_WHISPER_1: &str = "whisper-1";

// ============================================================================
// Voices
// ============================================================================

pub const VOICE_ALLOY: &str = "alloy";
pub const VOICE_ASH: &str = "ash";
pub const VOICE_BALLAD: &str = "ballad";
pub const VOICE_CORAL: &str = "coral";
pub const VOICE_ECHO: &str = "echo";
pub const VOICE_SAGE: &str = "sage";
pub const VOICE_SHIMMER: &str = "shimmer";
pub const VOICE_VERSE: &str = "verse";

// ============================================================================
// Enumerations
// ============================================================================

/// Audio encoding used for input or output audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    /// 16-bit PCM audio at 24kHz, mono, little-endian.
    Pcm16,
    /// G.711 μ-law audio at 8kHz.
    G711Ulaw,
    /// G.711 A-law audio at 8kHz.
    G711Alaw,
}

/// Output modality of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Audio,
}

/// How eagerly semantic VAD ends the user's turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Eagerness {
    Low,
    Medium,
    High,
    Auto,
}

/// Ceiling on the number of output tokens of a response.
///
/// Serialized as an integer, or as the string `"inf"` when unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawMaxOutputTokens")]
pub enum MaxOutputTokens {
    Limited(u32),
    Infinite,
}

impl Serialize for MaxOutputTokens {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MaxOutputTokens::Limited(n) => serializer.serialize_u32(*n),
            MaxOutputTokens::Infinite => serializer.serialize_str("inf"),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMaxOutputTokens {
    Limited(u32),
    Text(String),
}

impl TryFrom<RawMaxOutputTokens> for MaxOutputTokens {
    type Error = String;

    fn try_from(raw: RawMaxOutputTokens) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawMaxOutputTokens::Limited(n) => Ok(MaxOutputTokens::Limited(n)),
            RawMaxOutputTokens::Text(s) if s == "inf" => Ok(MaxOutputTokens::Infinite),
            RawMaxOutputTokens::Text(s) => Err(format!("invalid max output tokens: {:?}", s)),
        }
    }
}

// ============================================================================
// Session Configuration
// ============================================================================

/// Input audio transcription configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Transcription model, e.g. `whisper-1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Voice activity detection policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnDetection {
    /// Server-side VAD based on audio energy.
    ServerVad {
        /// Padding before speech start (ms).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix_padding_ms: Option<u32>,
        /// Silence duration that ends the turn (ms).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        silence_duration_ms: Option<u32>,
        /// Activation threshold (0.0-1.0).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        threshold: Option<f64>,
    },
    /// Semantic VAD that decides based on what the user said.
    SemanticVad {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        eagerness: Option<Eagerness>,
    },
}

impl TurnDetection {
    /// Server VAD with only a threshold set.
    pub fn server_vad(threshold: f64) -> Self {
        TurnDetection::ServerVad {
            prefix_padding_ms: None,
            silence_duration_ms: None,
            threshold: Some(threshold),
        }
    }

    /// Semantic VAD with the given eagerness.
    pub fn semantic_vad(eagerness: Eagerness) -> Self {
        TurnDetection::SemanticVad {
            eagerness: Some(eagerness),
        }
    }
}

/// Function tool definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool type. Always "function".
    #[serde(rename = "type")]
    pub tool_type: String,

    /// Function name.
    pub name: String,

    /// Function description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema for function parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<HashMap<String, serde_json::Value>>,
}

impl Tool {
    /// Creates a new function tool.
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            tool_type: "function".to_string(),
            name: name.into(),
            description: None,
            parameters: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the parameters schema.
    pub fn with_parameters(mut self, parameters: HashMap<String, serde_json::Value>) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

/// Session parameters sent with `session.update`.
///
/// Every field is optional; absent fields are omitted from the wire format so
/// the server keeps its current value. The same type decodes the `session`
/// object the server echoes back in `session.created` and `session.updated`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<AudioFormat>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<TranscriptionConfig>,

    /// System prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_response_output_tokens: Option<MaxOutputTokens>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<Modality>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<AudioFormat>,

    /// Sampling temperature (0.6-1.2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,

    /// Voice ID for audio output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Available function tools.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,

    /// Tool choice: "auto", "none" or "required".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
}

impl SessionConfiguration {
    /// A full voice-assistant configuration: PCM16 both ways, whisper
    /// transcription, audio+text output, unbounded tokens and server VAD.
    pub fn voice_assistant() -> Self {
        Self {
            input_audio_format: Some(AudioFormat::Pcm16),
            input_audio_transcription: Some(TranscriptionConfig {
                model: Some(TRANSCRIPTION_MODEL_WHISPER_1.to_string()),
            }),
            instructions: None,
            max_response_output_tokens: Some(MaxOutputTokens::Infinite),
            modalities: Some(vec![Modality::Audio, Modality::Text]),
            output_audio_format: Some(AudioFormat::Pcm16),
            temperature: Some(0.8),
            turn_detection: Some(TurnDetection::ServerVad {
                prefix_padding_ms: Some(300),
                silence_duration_ms: Some(500),
                threshold: Some(0.5),
            }),
            voice: Some(VOICE_ALLOY.to_string()),
            tools: Vec::new(),
            tool_choice: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_modalities(mut self, modalities: Vec<Modality>) -> Self {
        self.modalities = Some(modalities);
        self
    }

    pub fn with_turn_detection(mut self, turn_detection: TurnDetection) -> Self {
        self.turn_detection = Some(turn_detection);
        self
    }

    pub fn with_max_response_output_tokens(mut self, max: MaxOutputTokens) -> Self {
        self.max_response_output_tokens = Some(max);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }
}

// ============================================================================
// Response / Conversation
// ============================================================================

/// Per-response overrides sent with `response.create`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseOptions {
    /// Instructions override for this response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Output modalities for this response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<Modality>>,

    /// Voice override for this response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Temperature override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Conversation item sent with `conversation.item.create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationItem {
    Message {
        role: String,
        content: Vec<ContentPart>,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
}

impl ConversationItem {
    /// Creates a user text message item.
    pub fn user_text(text: impl Into<String>) -> Self {
        ConversationItem::Message {
            role: "user".to_string(),
            content: vec![ContentPart::InputText { text: text.into() }],
        }
    }

    /// Creates a function call output item.
    pub fn function_call_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        ConversationItem::FunctionCallOutput {
            call_id: call_id.into(),
            output: output.into(),
        }
    }
}

/// Content part of a message item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText { text: String },
    InputAudio {
        audio: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transcript: Option<String>,
    },
    Text { text: String },
}

//! Realtime conversation command.

use std::io::Write;
use std::time::Duration;

use clap::Args;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use rtvoice_cli::config::Context;
use rtvoice_cli::output::{Output, OutputFormat, write_file};
use rtvoice_openai_realtime::{
    AudioFormat, EventStream, Modality, ServerEvent, Session, SessionConfiguration,
};

use super::{
    create_client, format_bytes, get_context, load_request, print_error, print_info,
    print_success, print_warning,
};
use crate::Cli;

/// Run one realtime conversation turn.
///
/// Sends a text prompt and/or streams an audio file, prints the assistant's
/// transcript as it arrives and saves the reply audio with `-o`. The turn
/// ends at `response.done`, after the idle timeout, or on Ctrl-C.
///
/// Audio files are raw mono PCM16 at 24kHz (or G.711 at 8kHz when the
/// session's input format says so). Server VAD detects the end of speech,
/// so one second of silence is appended after the file.
#[derive(Args)]
pub struct ChatCommand {
    /// Text prompt to send
    #[arg(short = 'p', long)]
    prompt: Option<String>,
    /// Raw audio file to stream as input
    #[arg(long)]
    audio: Option<String>,
    /// Model to use (overrides file and context)
    #[arg(long)]
    model: Option<String>,
    /// Voice for audio output (overrides file and context)
    #[arg(long)]
    voice: Option<String>,
    /// System instructions (overrides file and context)
    #[arg(long)]
    instructions: Option<String>,
    /// Ask for text only, no audio
    #[arg(long)]
    text_only: bool,
    /// Seconds to wait for the next server event
    #[arg(long, default_value_t = 60)]
    timeout: u64,
}

/// Chat request loaded with `-f`.
#[derive(Debug, Clone, Default, Deserialize)]
struct ChatFile {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    audio_file: Option<String>,
    #[serde(default)]
    session: Option<SessionConfiguration>,
}

/// What happened during the turn; printed with `--json`.
#[derive(Debug, Default, Serialize)]
struct Outcome {
    model: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    input_transcript: String,
    transcript: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    text: String,
    audio_bytes: usize,
    responses: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
    #[serde(skip)]
    audio: Vec<u8>,
}

impl ChatCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        let file: ChatFile = match cli.input.as_deref() {
            Some(path) => load_request(path)?,
            None => ChatFile::default(),
        };

        let prompt = self.prompt.clone().or_else(|| file.prompt.clone());
        let audio_path = self.audio.clone().or_else(|| file.audio_file.clone());
        if prompt.is_none() && audio_path.is_none() {
            anyhow::bail!("nothing to send, use --prompt or --audio");
        }
        let audio = match audio_path {
            Some(ref path) => Some(
                std::fs::read(path).map_err(|e| anyhow::anyhow!("reading {}: {}", path, e))?,
            ),
            None => None,
        };

        let model = self.model.as_deref().or(file.model.as_deref());
        let client = create_client(ctx.as_ref(), model)?;
        let session_config = self.session_configuration(ctx.as_ref(), &file);

        if let Some(ref ctx) = ctx {
            tracing::debug!("Using context: {}", ctx.name);
        }
        tracing::debug!("Session configuration: {:?}", session_config);

        print_info(&format!("Connecting to {}...", client.model()));
        let session = client.connect_websocket(session_config).await?;
        let mut events = session.events();
        print_success("Connected");

        let mut outcome = Outcome {
            model: client.model().to_string(),
            ..Default::default()
        };
        let turn = Turn {
            session: &session,
            prompt: prompt.as_deref(),
            audio: audio.as_deref(),
            idle: Duration::from_secs(self.timeout),
        };

        let result = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                print_warning("Interrupted");
                Ok(())
            }
            result = turn.run(&mut events, &mut outcome) => result,
        };
        session.disconnect().await;
        println!();
        result?;

        if let Some(ref path) = cli.output {
            if outcome.audio.is_empty() {
                print_warning("No audio received");
            } else {
                write_file(path, &outcome.audio)?;
                print_success(&format!(
                    "Audio saved to: {} ({})",
                    path,
                    format_bytes(outcome.audio.len())
                ));
            }
        }
        if cli.json {
            Output::new(OutputFormat::Json, None).write(&outcome)?;
        }
        Ok(())
    }

    /// Builds the session configuration. Later sources win: recommended
    /// defaults, then the context, then the `-f` file, then flags.
    fn session_configuration(&self, ctx: Option<&Context>, file: &ChatFile) -> SessionConfiguration {
        let mut config = SessionConfiguration::voice_assistant();

        if let Some(ctx) = ctx {
            if !ctx.default_voice.is_empty() {
                config.voice = Some(ctx.default_voice.clone());
            }
            if let Some(instructions) = ctx.get_extra("instructions") {
                config.instructions = Some(instructions.to_string());
            }
        }
        if let Some(ref session) = file.session {
            merge_session(&mut config, session.clone());
        }
        if let Some(ref voice) = self.voice {
            config.voice = Some(voice.clone());
        }
        if let Some(ref instructions) = self.instructions {
            config.instructions = Some(instructions.clone());
        }
        if self.text_only {
            config.modalities = Some(vec![Modality::Text]);
        }
        config
    }
}

/// Copies every field set in `src` over `dst`.
fn merge_session(dst: &mut SessionConfiguration, src: SessionConfiguration) {
    macro_rules! take {
        ($($field:ident),*) => {
            $(if src.$field.is_some() {
                dst.$field = src.$field;
            })*
        };
    }
    take!(
        input_audio_format,
        input_audio_transcription,
        instructions,
        max_response_output_tokens,
        modalities,
        output_audio_format,
        temperature,
        turn_detection,
        voice,
        tool_choice
    );
    if !src.tools.is_empty() {
        dst.tools = src.tools;
    }
}

/// Bytes per 100 ms chunk and the silence byte for an input format.
fn chunk_profile(format: Option<AudioFormat>) -> (usize, u8) {
    match format {
        Some(AudioFormat::G711Ulaw) => (800, 0xff),
        Some(AudioFormat::G711Alaw) => (800, 0xd5),
        Some(AudioFormat::Pcm16) | None => (4800, 0x00),
    }
}

struct Turn<'a> {
    session: &'a Session,
    prompt: Option<&'a str>,
    audio: Option<&'a [u8]>,
    idle: Duration,
}

impl Turn<'_> {
    async fn run(&self, events: &mut EventStream, outcome: &mut Outcome) -> anyhow::Result<()> {
        let mut pending = 0usize;

        if let Some(audio) = self.audio {
            self.stream_audio(audio).await?;
            pending += 1;
        }
        if let Some(prompt) = self.prompt {
            self.session.add_user_message(prompt).await?;
            self.session.create_response(None).await?;
            pending += 1;
        }

        let mut answered_tools = false;
        loop {
            let event = match timeout(self.idle, events.recv()).await {
                Ok(Some(event)) => event,
                Ok(None) => {
                    print_warning("Session closed");
                    return Ok(());
                }
                Err(_) => {
                    print_warning("Timeout waiting for response");
                    return Ok(());
                }
            };

            match event {
                ServerEvent::SessionCreated { .. } => tracing::debug!("Session created"),
                ServerEvent::SessionUpdated { .. } => tracing::debug!("Session updated"),
                ServerEvent::InputAudioBufferSpeechStarted => print_info("Speech started"),
                ServerEvent::InputAudioBufferSpeechStopped => print_info("Speech stopped"),
                ServerEvent::InputAudioTranscriptionCompleted { transcript } => {
                    print_info(&format!("You: {}", transcript.trim()));
                    outcome.input_transcript.push_str(&transcript);
                }
                ServerEvent::ResponseTranscriptDelta { delta } => {
                    print!("{}", delta);
                    std::io::stdout().flush()?;
                    outcome.transcript.push_str(&delta);
                }
                ServerEvent::ResponseTextDelta { delta } => {
                    print!("{}", delta);
                    std::io::stdout().flush()?;
                    outcome.text.push_str(&delta);
                }
                ServerEvent::ResponseAudioDelta { .. } => {
                    if let Some(pcm) = event.decode_audio() {
                        outcome.audio_bytes += pcm.len();
                        outcome.audio.extend_from_slice(&pcm);
                    }
                }
                ServerEvent::ResponseFunctionCallArgumentsDone { name, call_id, .. } => {
                    print_warning(&format!("Model called tool {}, which is not available", name));
                    let output = serde_json::json!({
                        "error": format!("tool {} is not available", name)
                    });
                    self.session
                        .add_function_call_output(&call_id, &output.to_string())
                        .await?;
                    answered_tools = true;
                }
                ServerEvent::ResponseDone => {
                    outcome.responses += 1;
                    pending = pending.saturating_sub(1);
                    if answered_tools {
                        answered_tools = false;
                        self.session.create_response(None).await?;
                        pending += 1;
                    }
                    if pending == 0 {
                        return Ok(());
                    }
                }
                ServerEvent::Error { .. } => {
                    let message = event
                        .error_message()
                        .unwrap_or_else(|| "unknown error".to_string());
                    print_error(&message);
                    outcome.errors.push(message);
                }
                other => tracing::debug!("Event: {}", other.event_type()),
            }
        }
    }

    async fn stream_audio(&self, audio: &[u8]) -> anyhow::Result<()> {
        let format = self.session.configuration().input_audio_format;
        let (chunk_size, silence) = chunk_profile(format);
        print_info(&format!("Streaming {} of audio", format_bytes(audio.len())));

        for chunk in audio.chunks(chunk_size) {
            self.session.append_audio(chunk).await?;
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        let padding = vec![silence; chunk_size];
        for _ in 0..10 {
            self.session.append_audio(&padding).await?;
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        Ok(())
    }
}

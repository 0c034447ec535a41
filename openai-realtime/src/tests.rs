//! Session tests against an in-memory transport.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_test::assert_ok;

use super::*;

const WAIT: Duration = Duration::from_secs(2);

/// Transport fed by the test: frames are pushed in, writes are recorded.
struct MockTransport {
    writes: parking_lot::Mutex<Vec<String>>,
    incoming_tx: mpsc::UnboundedSender<Result<Frame>>,
    incoming_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<Frame>>>,
    resume_delay: Option<Duration>,
    fail_sends: AtomicBool,
    stall_sends: AtomicBool,
    receive_calls: AtomicUsize,
    resumes: AtomicUsize,
    cancels: AtomicUsize,
}

impl MockTransport {
    fn new() -> Arc<Self> {
        Self::build(None)
    }

    fn with_resume_delay(delay: Duration) -> Arc<Self> {
        Self::build(Some(delay))
    }

    fn build(resume_delay: Option<Duration>) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            writes: parking_lot::Mutex::new(Vec::new()),
            incoming_tx: tx,
            incoming_rx: tokio::sync::Mutex::new(rx),
            resume_delay,
            fail_sends: AtomicBool::new(false),
            stall_sends: AtomicBool::new(false),
            receive_calls: AtomicUsize::new(0),
            resumes: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
        })
    }

    fn push_text(&self, text: &str) {
        let _ = self.incoming_tx.send(Ok(Frame::Text(text.to_string())));
    }

    fn push_binary(&self, data: &[u8]) {
        let _ = self.incoming_tx.send(Ok(Frame::Binary(data.to_vec())));
    }

    fn push_error(&self, err: Error) {
        let _ = self.incoming_tx.send(Err(err));
    }

    fn writes(&self) -> Vec<Value> {
        self.writes
            .lock()
            .iter()
            .map(|w| serde_json::from_str(w).unwrap())
            .collect()
    }

    fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    /// Waits until `n` frames have been consumed by the receive loop.
    async fn wait_for_received(&self, n: usize) {
        tokio::time::timeout(WAIT, async {
            while self.receive_calls.load(Ordering::SeqCst) <= n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for frames to be consumed");
    }

    async fn wait_for_writes(&self, n: usize) {
        tokio::time::timeout(WAIT, async {
            while self.write_count() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for writes");
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn resume(&self) -> Result<()> {
        if let Some(delay) = self.resume_delay {
            tokio::time::sleep(delay).await;
        }
        self.resumes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_text(&self, text: String) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::Transport("write failed".to_string()));
        }
        if self.stall_sends.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.writes.lock().push(text);
        Ok(())
    }

    async fn receive(&self) -> Result<Frame> {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.incoming_rx.lock().await;
        match rx.recv().await {
            Some(frame) => frame,
            None => std::future::pending().await,
        }
    }

    async fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

async fn next_event(events: &mut EventStream) -> Option<ServerEvent> {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for event")
}

async fn wait_torn_down(session: &Session) {
    tokio::time::timeout(WAIT, async {
        while !session.is_torn_down() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for teardown");
}

fn assistant_config() -> SessionConfiguration {
    SessionConfiguration::default()
        .with_voice(VOICE_SHIMMER)
        .with_modalities(vec![Modality::Audio, Modality::Text])
        .with_turn_detection(TurnDetection::server_vad(0.5))
}

// ============================================================================
// Handshake
// ============================================================================

#[tokio::test]
async fn test_handshake_then_session_events() {
    let transport = MockTransport::new();
    let session = Session::create(transport.clone(), assistant_config());
    let mut events = session.events();

    transport.wait_for_writes(1).await;
    transport.push_text(r#"{"type":"session.created","session":{"id":"sess_1"}}"#);
    transport.push_text(r#"{"type":"session.updated","session":{"voice":"shimmer"}}"#);

    assert!(matches!(
        next_event(&mut events).await,
        Some(ServerEvent::SessionCreated { .. })
    ));
    let Some(ServerEvent::SessionUpdated { session: Some(echo) }) = next_event(&mut events).await
    else {
        panic!("expected session.updated");
    };
    assert_eq!(echo.voice.as_deref(), Some(VOICE_SHIMMER));

    let writes = transport.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(
        writes[0],
        json!({
            "type": "session.update",
            "session": {
                "modalities": ["audio", "text"],
                "turn_detection": {"type": "server_vad", "threshold": 0.5},
                "voice": "shimmer"
            }
        })
    );
    assert_eq!(transport.resumes.load(Ordering::SeqCst), 1);
    assert_eq!(session.configuration(), &assistant_config());
}

#[tokio::test]
async fn test_handshake_precedes_early_sends() {
    let transport = MockTransport::with_resume_delay(Duration::from_millis(50));
    let session = Arc::new(Session::create(
        transport.clone(),
        SessionConfiguration::voice_assistant(),
    ));

    let sender = session.clone();
    let send = tokio::spawn(async move { sender.add_user_message("hi").await });
    send.await.unwrap().unwrap();

    let writes = transport.writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0]["type"], "session.update");
    assert_eq!(writes[0]["session"]["max_response_output_tokens"], "inf");
    assert_eq!(writes[1]["type"], "conversation.item.create");
    assert_eq!(writes[1]["item"]["content"][0]["text"], "hi");
    assert!(writes[1]["event_id"].as_str().unwrap().starts_with("evt_"));
}

// ============================================================================
// Receive loop
// ============================================================================

#[tokio::test]
async fn test_events_published_before_subscription_are_kept() {
    let transport = MockTransport::new();
    let session = Session::create(transport.clone(), SessionConfiguration::default());

    transport.push_text(r#"{"type":"session.created"}"#);
    transport.wait_for_writes(1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut events = session.events();
    assert_eq!(
        next_event(&mut events).await,
        Some(ServerEvent::SessionCreated { session: None })
    );
}

#[tokio::test]
async fn test_backlog_keeps_newest_events() {
    let transport = MockTransport::new();
    let session = Session::create(transport.clone(), SessionConfiguration::default());

    let total = MAX_PENDING_EVENTS + 10;
    for i in 0..total {
        transport.push_text(&format!(r#"{{"type":"response.text.delta","delta":"{}"}}"#, i));
    }
    transport.wait_for_received(total).await;

    let mut events = session.events();
    for i in 10..total {
        assert_eq!(
            next_event(&mut events).await,
            Some(ServerEvent::ResponseTextDelta {
                delta: i.to_string()
            })
        );
    }

    transport.push_text(r#"{"type":"response.done"}"#);
    assert_eq!(next_event(&mut events).await, Some(ServerEvent::ResponseDone));
}

#[tokio::test]
async fn test_backlog_is_dropped_on_teardown() {
    let transport = MockTransport::new();
    let session = Session::create(transport.clone(), SessionConfiguration::default());

    transport.push_text(r#"{"type":"response.created"}"#);
    transport.wait_for_received(1).await;

    session.disconnect().await;
    let mut events = session.events();
    assert_eq!(next_event(&mut events).await, None);
}

#[tokio::test]
async fn test_order_preserved_and_unknown_skipped() {
    let transport = MockTransport::new();
    let session = Session::create(transport.clone(), SessionConfiguration::default());
    let mut events = session.events();

    transport.push_text(r#"{"type":"response.created"}"#);
    transport.push_text(r#"{"type":"rate_limits.updated","rate_limits":[]}"#);
    transport.push_text(r#"{"type":"error","error":{"message":"bad request"}}"#);
    transport.push_text(r#"{"type":"response.audio.delta","delta":"AAE="}"#);
    transport.push_text(r#"{"type":"response.audio.delta"}"#);
    transport.push_text(r#"{"type":"response.done"}"#);

    assert_eq!(next_event(&mut events).await, Some(ServerEvent::ResponseCreated));
    let error = next_event(&mut events).await.unwrap();
    assert_eq!(error.error_message().as_deref(), Some("bad request"));
    let audio = next_event(&mut events).await.unwrap();
    assert_eq!(audio.decode_audio(), Some(vec![0x00, 0x01]));
    assert_eq!(next_event(&mut events).await, Some(ServerEvent::ResponseDone));

    // Error frames and skipped frames do not end the session.
    assert!(!session.is_torn_down());
    assert_eq!(transport.cancel_count(), 0);
}

#[tokio::test]
async fn test_function_call_arguments_done() {
    let transport = MockTransport::new();
    let session = Session::create(transport.clone(), SessionConfiguration::default());
    let mut events = session.events();

    transport.push_text(
        r#"{"type":"response.function_call_arguments.done","name":"get_weather","arguments":"{\"city\":\"Paris\"}","call_id":"call_1"}"#,
    );

    assert_eq!(
        next_event(&mut events).await,
        Some(ServerEvent::ResponseFunctionCallArgumentsDone {
            name: "get_weather".to_string(),
            arguments: r#"{"city":"Paris"}"#.to_string(),
            call_id: "call_1".to_string(),
        })
    );
}

#[tokio::test]
async fn test_binary_utf8_frame_is_decoded() {
    let transport = MockTransport::new();
    let session = Session::create(transport.clone(), SessionConfiguration::default());
    let mut events = session.events();

    transport.push_binary(br#"{"type":"input_audio_buffer.speech_started"}"#);
    assert_eq!(
        next_event(&mut events).await,
        Some(ServerEvent::InputAudioBufferSpeechStarted)
    );
}

#[tokio::test]
async fn test_binary_non_utf8_frame_tears_down() {
    let transport = MockTransport::new();
    let session = Session::create(transport.clone(), SessionConfiguration::default());
    let mut events = session.events();

    transport.push_binary(&[0xff, 0xfe, 0x00]);
    assert_eq!(next_event(&mut events).await, None);
    assert!(session.is_torn_down());
    assert_eq!(transport.cancel_count(), 1);
}

#[tokio::test]
async fn test_malformed_frame_tears_down() {
    let transport = MockTransport::new();
    let session = Session::create(transport.clone(), SessionConfiguration::default());
    let mut events = session.events();

    transport.push_text(r#"{"type":"response.created"}"#);
    transport.push_text("{not json");
    transport.push_text(r#"{"type":"response.done"}"#);

    assert_eq!(next_event(&mut events).await, Some(ServerEvent::ResponseCreated));
    assert_eq!(next_event(&mut events).await, None);
    assert_eq!(transport.cancel_count(), 1);

    let before = transport.write_count();
    assert_ok!(session.commit_input().await);
    assert_eq!(transport.write_count(), before);
}

#[tokio::test]
async fn test_missing_type_tears_down() {
    let transport = MockTransport::new();
    let session = Session::create(transport.clone(), SessionConfiguration::default());
    let mut events = session.events();

    transport.push_text(r#"{"delta":"abc"}"#);
    assert_eq!(next_event(&mut events).await, None);
    assert!(session.is_torn_down());
}

#[tokio::test]
async fn test_receive_failure_ends_stream_and_silences_sends() {
    let transport = MockTransport::new();
    let session = Session::create(transport.clone(), SessionConfiguration::default());
    let mut events = session.events();
    transport.wait_for_writes(1).await;

    transport.push_error(Error::Connection("connection reset".to_string()));
    assert_eq!(next_event(&mut events).await, None);
    assert!(session.is_torn_down());

    let before = transport.write_count();
    assert_ok!(session.commit_input().await);
    assert_ok!(session.create_response(None).await);
    assert_eq!(transport.write_count(), before);
    assert_eq!(transport.cancel_count(), 1);
}

// ============================================================================
// Subscriptions
// ============================================================================

#[tokio::test]
async fn test_new_subscription_supersedes_previous() {
    let transport = MockTransport::new();
    let session = Session::create(transport.clone(), SessionConfiguration::default());

    let mut first = session.events();
    let mut second = session.events();
    assert_eq!(next_event(&mut first).await, None);

    transport.push_text(r#"{"type":"response.done"}"#);
    assert_eq!(next_event(&mut second).await, Some(ServerEvent::ResponseDone));
    assert!(!session.is_torn_down());
}

#[tokio::test]
async fn test_events_after_teardown_is_finished() {
    let transport = MockTransport::new();
    let session = Session::create(transport.clone(), SessionConfiguration::default());
    let mut events = session.events();

    session.disconnect().await;
    assert_eq!(next_event(&mut events).await, None);

    let mut late = session.events();
    assert_eq!(next_event(&mut late).await, None);
}

#[tokio::test]
async fn test_event_stream_implements_stream() {
    use futures::StreamExt;

    let transport = MockTransport::new();
    let session = Session::create(transport.clone(), SessionConfiguration::default());
    let events = session.events();

    transport.push_text(r#"{"type":"response.text.delta","delta":"He"}"#);
    transport.push_text(r#"{"type":"response.text.delta","delta":"llo"}"#);
    transport.push_text(r#"{"type":"response.done"}"#);

    let text = tokio::time::timeout(
        WAIT,
        events
            .take_while(|e| futures::future::ready(*e != ServerEvent::ResponseDone))
            .filter_map(|e| async move {
                match e {
                    ServerEvent::ResponseTextDelta { delta } => Some(delta),
                    _ => None,
                }
            })
            .collect::<String>(),
    )
    .await
    .unwrap();
    assert_eq!(text, "Hello");
}

// ============================================================================
// Send gate and teardown
// ============================================================================

#[tokio::test]
async fn test_concurrent_sends_are_written_whole() {
    let transport = MockTransport::new();
    let session = Arc::new(Session::create(
        transport.clone(),
        SessionConfiguration::default(),
    ));

    let mut handles = Vec::new();
    for i in 0..20 {
        let session = session.clone();
        handles.push(tokio::spawn(async move {
            session.add_user_message(&format!("message {}", i)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let writes = transport.writes();
    assert_eq!(writes.len(), 21);
    assert_eq!(writes[0]["type"], "session.update");
    let texts: HashSet<String> = writes[1..]
        .iter()
        .map(|w| w["item"]["content"][0]["text"].as_str().unwrap().to_string())
        .collect();
    let expected: HashSet<String> = (0..20).map(|i| format!("message {}", i)).collect();
    assert_eq!(texts, expected);
}

#[tokio::test]
async fn test_concurrent_disconnects_cancel_once() {
    let transport = MockTransport::new();
    let session = Arc::new(Session::create(
        transport.clone(),
        SessionConfiguration::default(),
    ));
    transport.wait_for_writes(1).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let session = session.clone();
        handles.push(tokio::spawn(async move { session.disconnect().await }));
    }
    // Racing a transport failure against the disconnects.
    transport.push_error(Error::Connection("gone".to_string()));
    for handle in handles {
        handle.await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(session.is_torn_down());
    assert_eq!(transport.cancel_count(), 1);
}

#[tokio::test]
async fn test_disconnect_during_stalled_write() {
    let transport = MockTransport::new();
    let session = Arc::new(Session::create(
        transport.clone(),
        SessionConfiguration::default(),
    ));
    transport.wait_for_writes(1).await;

    transport.stall_sends.store(true, Ordering::SeqCst);
    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.commit_input().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!pending.is_finished());

    tokio::time::timeout(WAIT, session.disconnect())
        .await
        .expect("disconnect blocked by stalled write");
    let result = tokio::time::timeout(WAIT, pending)
        .await
        .expect("stalled send never resolved")
        .unwrap();
    assert_ok!(result);
    assert_eq!(transport.cancel_count(), 1);
}

#[tokio::test]
async fn test_send_after_disconnect_is_noop() {
    let transport = MockTransport::new();
    let session = Session::create(transport.clone(), SessionConfiguration::default());
    transport.wait_for_writes(1).await;

    session.disconnect().await;
    session.disconnect().await;
    assert_ok!(session.append_audio(&[0u8; 480]).await);
    assert_ok!(session.send_raw(json!({"type": "response.cancel"})).await);

    assert_eq!(transport.write_count(), 1);
    assert_eq!(transport.cancel_count(), 1);
}

#[tokio::test]
async fn test_write_failure_is_returned_and_session_survives() {
    let transport = MockTransport::new();
    let session = Session::create(transport.clone(), SessionConfiguration::default());
    let mut events = session.events();
    transport.wait_for_writes(1).await;

    transport.fail_sends.store(true, Ordering::SeqCst);
    let err = session.cancel_response().await.unwrap_err();
    assert!(err.is_transport());
    assert!(!session.is_torn_down());

    transport.fail_sends.store(false, Ordering::SeqCst);
    session.clear_input().await.unwrap();
    assert_eq!(transport.writes()[1]["type"], "input_audio_buffer.clear");

    transport.push_text(r#"{"type":"response.done"}"#);
    assert_eq!(next_event(&mut events).await, Some(ServerEvent::ResponseDone));
}

#[tokio::test]
async fn test_drop_tears_down() {
    let transport = MockTransport::new();
    let session = Session::create(transport.clone(), SessionConfiguration::default());
    transport.wait_for_writes(1).await;
    drop(session);

    tokio::time::timeout(WAIT, async {
        while transport.cancel_count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(transport.cancel_count(), 1);
}

#[tokio::test]
async fn test_uptime_advances() {
    let transport = MockTransport::new();
    let session = Session::create(transport.clone(), SessionConfiguration::default());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(session.uptime() >= Duration::from_millis(10));
    session.disconnect().await;
    wait_torn_down(&session).await;
}

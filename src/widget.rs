//! Voice chat controller
//!
//! Owns one record → upload → render cycle at a time and the widget state
//! machine: `Idle → Recording → Uploading → Idle`, with an error escape from
//! `Uploading` back to `Idle` through the fallback path. Cycles are
//! serialized: a toggle arriving while an upload is in flight is rejected
//! and the in-flight cycle is unaffected.

use std::path::PathBuf;

use crate::client::{ChatBackend, ChatResponse};
use crate::session::SessionId;
use crate::transcript::{ChatMessage, Sender, StatusLine, Transcript};
use crate::voice::{Recorder, samples_to_wav};
use crate::{Error, Result};

/// System message rendered when the server reports a failure
pub const TROUBLE_MESSAGE: &str = "(System) I'm having trouble connecting right now.";

/// System message rendered when the request itself fails
pub const FAILURE_MESSAGE: &str = "(System) Something went wrong.";

/// Fallback audio asset served by the agent, played on any upload failure
pub const FALLBACK_AUDIO_PATH: &str = "/static/fallback.wav";

/// Widget lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetState {
    /// Ready for a new recording cycle
    Idle,
    /// Microphone acquired, accumulating chunks
    Recording,
    /// Recording finalized, upload in flight
    Uploading,
}

/// Output seam for playback
///
/// Playback is fire-and-forget with logged failure: the widget logs a `play`
/// error at warn level and carries on, so tests can assert on the contract
/// without real audio hardware.
pub trait AudioSink {
    /// Play encoded audio bytes (WAV or MP3), blocking until done
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    fn play(&mut self, bytes: &[u8]) -> Result<()>;
}

/// The voice chat widget
///
/// Constructed once at startup and torn down on exit; all state that the
/// original design held as process-wide globals lives here.
pub struct VoiceChatWidget<R, B, S> {
    session: SessionId,
    state: WidgetState,
    recorder: R,
    backend: B,
    sink: S,
    transcript: Transcript,
    status: StatusLine,
    playback_source: Option<String>,
    fallback_override: Option<PathBuf>,
}

impl<R: Recorder, B: ChatBackend, S: AudioSink> VoiceChatWidget<R, B, S> {
    /// Create a widget bound to a session
    pub fn new(session: SessionId, recorder: R, backend: B, sink: S) -> Self {
        Self {
            session,
            state: WidgetState::Idle,
            recorder,
            backend,
            sink,
            transcript: Transcript::new(),
            status: StatusLine::new(),
            playback_source: None,
            fallback_override: None,
        }
    }

    /// Use a local file for fallback audio instead of fetching it
    #[must_use]
    pub fn with_fallback_override(mut self, path: Option<PathBuf>) -> Self {
        self.fallback_override = path;
        self
    }

    /// The session this widget uploads under
    #[must_use]
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> WidgetState {
        self.state
    }

    /// Transcript messages appended so far
    #[must_use]
    pub fn transcript(&self) -> &[ChatMessage] {
        self.transcript.messages()
    }

    /// Current status line text
    #[must_use]
    pub fn status(&self) -> &str {
        self.status.text()
    }

    /// Source of the most recent playback attempt (primary or fallback)
    #[must_use]
    pub fn playback_source(&self) -> Option<&str> {
        self.playback_source.as_deref()
    }

    /// Advance the widget: start recording, stop-and-send, or reject
    ///
    /// Capture and transport failures are handled internally (status text,
    /// system message, fallback audio) and do not surface as errors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] if a previous cycle is still uploading
    pub async fn toggle(&mut self) -> Result<()> {
        match self.state {
            WidgetState::Idle => {
                self.start();
                Ok(())
            }
            WidgetState::Recording => {
                self.stop_and_send().await;
                Ok(())
            }
            WidgetState::Uploading => {
                tracing::warn!("toggle rejected, upload in flight");
                Err(Error::Busy)
            }
        }
    }

    /// Begin a recording cycle
    fn start(&mut self) {
        match self.recorder.start() {
            Ok(()) => {
                self.state = WidgetState::Recording;
                self.status.set("Recording... (toggle again to stop)");
            }
            Err(e) => {
                // Recording never starts; the user may simply retry
                tracing::warn!(error = %e, "microphone unavailable");
                self.status.set(format!("Microphone unavailable: {e}"));
            }
        }
    }

    /// Finalize the recording and run the upload/response cycle
    async fn stop_and_send(&mut self) {
        self.state = WidgetState::Uploading;
        self.status.set("Processing audio...");

        let samples = match self.recorder.finalize() {
            Ok(samples) => samples,
            Err(e) => {
                tracing::warn!(error = %e, "finalize failed");
                self.status.set(format!("Error: {e}"));
                self.state = WidgetState::Idle;
                return;
            }
        };

        // Zero chunks still upload; the server decides what an empty
        // recording means
        match samples_to_wav(&samples, self.recorder.sample_rate()) {
            Ok(wav) => {
                self.status.set("Sending audio to server...");
                self.upload(wav).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "wav encoding failed");
                self.status.set(format!("Error: {e}"));
            }
        }

        self.state = WidgetState::Idle;
    }

    async fn upload(&mut self, wav: Vec<u8>) {
        match self.backend.chat(&self.session, wav).await {
            Ok(response) => self.apply_response(response).await,
            Err(e @ Error::ServerStatus { .. }) => {
                self.transcript.append(TROUBLE_MESSAGE, Sender::Bot);
                self.play_fallback().await;
                self.status.set(format!("Error: {e}"));
            }
            Err(e) => {
                self.transcript.append(FAILURE_MESSAGE, Sender::Bot);
                self.play_fallback().await;
                self.status.set(format!("Error: {e}"));
            }
        }
    }

    /// Apply each present response field as one independent UI effect
    async fn apply_response(&mut self, response: ChatResponse) {
        if let Some(diag) = &response.error {
            tracing::debug!(error = %diag, "server-side diagnostic");
        }

        if let Some(text) = response.transcription.filter(|t| !t.is_empty()) {
            self.transcript.append(text, Sender::User);
        }
        if let Some(text) = response.llm_response.filter(|t| !t.is_empty()) {
            self.transcript.append(text, Sender::Bot);
        }
        if let Some(url) = response.audio_url.filter(|u| !u.is_empty()) {
            self.play_remote(&url).await;
        }

        self.status.set("Response received");
    }

    /// Fetch and play agent audio, best-effort
    async fn play_remote(&mut self, url: &str) {
        self.playback_source = Some(self.backend.resolve_url(url));

        match self.backend.fetch_audio(url).await {
            Ok(bytes) => {
                if let Err(e) = self.sink.play(&bytes) {
                    tracing::warn!(error = %e, url, "playback failed");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, url, "audio fetch failed");
            }
        }
    }

    /// Play the fallback asset, best-effort
    async fn play_fallback(&mut self) {
        if let Some(path) = self.fallback_override.clone() {
            self.playback_source = Some(path.display().to_string());
            match std::fs::read(&path) {
                Ok(bytes) => {
                    if let Err(e) = self.sink.play(&bytes) {
                        tracing::warn!(error = %e, "fallback playback failed");
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "fallback asset unreadable");
                }
            }
            return;
        }

        self.play_remote(FALLBACK_AUDIO_PATH).await;
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct NullRecorder;

    impl Recorder for NullRecorder {
        fn start(&mut self) -> Result<()> {
            Ok(())
        }
        fn finalize(&mut self) -> Result<Vec<f32>> {
            Ok(Vec::new())
        }
        fn sample_rate(&self) -> u32 {
            16000
        }
    }

    struct NullBackend;

    #[async_trait]
    impl ChatBackend for NullBackend {
        async fn chat(&self, _session: &SessionId, _wav: Vec<u8>) -> Result<ChatResponse> {
            Ok(ChatResponse::default())
        }
        async fn fetch_audio(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
        fn resolve_url(&self, url: &str) -> String {
            url.to_string()
        }
    }

    struct NullSink;

    impl AudioSink for NullSink {
        fn play(&mut self, _bytes: &[u8]) -> Result<()> {
            Ok(())
        }
    }

    fn widget() -> VoiceChatWidget<NullRecorder, NullBackend, NullSink> {
        VoiceChatWidget::new(
            SessionId::resolve(Some("test")),
            NullRecorder,
            NullBackend,
            NullSink,
        )
    }

    #[tokio::test]
    async fn toggle_while_uploading_is_rejected() {
        let mut w = widget();
        w.state = WidgetState::Uploading;

        assert!(matches!(w.toggle().await, Err(Error::Busy)));
        // The in-flight cycle is untouched
        assert_eq!(w.state(), WidgetState::Uploading);
    }

    #[tokio::test]
    async fn toggle_walks_the_state_machine() {
        let mut w = widget();
        assert_eq!(w.state(), WidgetState::Idle);

        w.toggle().await.unwrap();
        assert_eq!(w.state(), WidgetState::Recording);

        w.toggle().await.unwrap();
        assert_eq!(w.state(), WidgetState::Idle);
    }

    struct FailingRecorder;

    impl Recorder for FailingRecorder {
        fn start(&mut self) -> Result<()> {
            Err(Error::Audio("no input device available".to_string()))
        }
        fn finalize(&mut self) -> Result<Vec<f32>> {
            Ok(Vec::new())
        }
        fn sample_rate(&self) -> u32 {
            16000
        }
    }

    #[tokio::test]
    async fn capture_failure_reports_status_and_stays_idle() {
        let mut w = VoiceChatWidget::new(
            SessionId::resolve(Some("test")),
            FailingRecorder,
            NullBackend,
            NullSink,
        );

        w.toggle().await.unwrap();
        assert_eq!(w.state(), WidgetState::Idle);
        assert!(w.status().starts_with("Microphone unavailable"));
        assert!(w.transcript().is_empty());
    }
}

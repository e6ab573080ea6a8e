//! HTTP client for the conversational agent endpoint
//!
//! One request shape: the finalized recording goes up as multipart form data
//! to `POST {server}/agent/chat/{session_id}`, and the response comes back as
//! JSON with three optional fields. There is no retry, no auth, and no
//! cancellation; a non-2xx status and a transport failure are distinguishable
//! so the widget can pick the right system message.

use async_trait::async_trait;
use serde::Deserialize;

use crate::session::SessionId;
use crate::{Error, Result};

/// Response from the agent chat endpoint
///
/// Every field is optional; a missing field simply skips the corresponding
/// UI effect. `error` is a server-side diagnostic that is logged, never
/// rendered into the transcript.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    /// Transcription of the uploaded user audio
    #[serde(default)]
    pub transcription: Option<String>,

    /// Agent reply text
    #[serde(default)]
    pub llm_response: Option<String>,

    /// URL of synthesized reply audio, absolute or server-relative
    #[serde(default, rename = "audioUrl")]
    pub audio_url: Option<String>,

    /// Server-side diagnostic string
    #[serde(default)]
    pub error: Option<String>,
}

/// Backend seam for the chat upload/response cycle
///
/// The widget talks to the server only through this trait so tests can run
/// the full cycle against a fake without a network.
#[async_trait]
pub trait ChatBackend {
    /// Upload a finalized WAV recording for a session
    async fn chat(&self, session: &SessionId, wav: Vec<u8>) -> Result<ChatResponse>;

    /// Fetch encoded audio bytes from a (possibly relative) URL
    async fn fetch_audio(&self, url: &str) -> Result<Vec<u8>>;

    /// Resolve a server-relative audio path against the agent base URL
    fn resolve_url(&self, url: &str) -> String;
}

/// reqwest-backed client for a remote chat agent
pub struct AgentClient {
    client: reqwest::Client,
    base_url: String,
}

impl AgentClient {
    /// Create a client for the given server base URL
    #[must_use]
    pub fn new(server_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    /// The chat endpoint for a session
    fn chat_url(&self, session: &SessionId) -> String {
        format!("{}/agent/chat/{}", self.base_url, session)
    }
}

#[async_trait]
impl ChatBackend for AgentClient {
    async fn chat(&self, session: &SessionId, wav: Vec<u8>) -> Result<ChatResponse> {
        let url = self.chat_url(session);
        tracing::debug!(%url, wav_bytes = wav.len(), "uploading recording");

        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(wav)
                .file_name("user_audio.wav")
                .mime_str("audio/wav")?,
        );

        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            // Body may still be JSON; keep it for diagnostics
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "agent returned error");
            return Err(Error::ServerStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        if let Some(diag) = &parsed.error {
            tracing::debug!(error = %diag, "server-side diagnostic");
        }
        Ok(parsed)
    }

    async fn fetch_audio(&self, url: &str) -> Result<Vec<u8>> {
        let url = self.resolve_url(url);
        tracing::debug!(%url, "fetching audio");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::ServerStatus {
                status: status.as_u16(),
                body: String::new(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{url}", self.base_url)
        } else {
            format!("{}/{url}", self.base_url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_with_all_fields_deserializes() {
        let json = r#"{
            "transcription": "hello",
            "llm_response": "hi there",
            "audioUrl": "/a.mp3"
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.transcription.as_deref(), Some("hello"));
        assert_eq!(response.llm_response.as_deref(), Some("hi there"));
        assert_eq!(response.audio_url.as_deref(), Some("/a.mp3"));
        assert!(response.error.is_none());
    }

    #[test]
    fn missing_fields_are_skipped_not_errors() {
        let response: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(response.transcription.is_none());
        assert!(response.llm_response.is_none());
        assert!(response.audio_url.is_none());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"transcription":"x","extra":42}"#).unwrap();
        assert_eq!(response.transcription.as_deref(), Some("x"));
    }

    #[test]
    fn chat_url_is_keyed_by_session() {
        let client = AgentClient::new("http://localhost:8000/");
        let session = SessionId::resolve(Some("abc123"));
        assert_eq!(
            client.chat_url(&session),
            "http://localhost:8000/agent/chat/abc123"
        );
    }

    #[test]
    fn resolve_url_handles_absolute_and_relative() {
        let client = AgentClient::new("http://localhost:8000");
        assert_eq!(
            client.resolve_url("https://cdn.example.com/a.mp3"),
            "https://cdn.example.com/a.mp3"
        );
        assert_eq!(
            client.resolve_url("/static/fallback.wav"),
            "http://localhost:8000/static/fallback.wav"
        );
        assert_eq!(
            client.resolve_url("a.mp3"),
            "http://localhost:8000/a.mp3"
        );
    }
}

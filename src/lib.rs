//! Voxchat - terminal voice chat client for conversational AI agents
//!
//! This library provides the pieces of a push-to-talk chat client:
//! - Microphone capture into an ordered chunk accumulator
//! - Multipart upload of the finalized recording to an agent endpoint
//! - Append-only transcript rendering and a single status line
//! - Best-effort playback of returned or fallback audio
//!
//! # Architecture
//!
//! ```text
//! toggle ──► VoiceChatWidget ──► Recorder (cpal, 16kHz mono)
//!                │
//!                ├──► ChatBackend (reqwest, POST /agent/chat/{session})
//!                │
//!                ├──► Transcript + StatusLine (terminal)
//!                │
//!                └──► AudioSink (cpal, WAV/MP3 decode)
//! ```
//!
//! The widget serializes recording cycles; only one upload is ever in
//! flight.

pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod transcript;
pub mod voice;
pub mod widget;

pub use client::{AgentClient, ChatBackend, ChatResponse};
pub use config::Config;
pub use error::{Error, Result};
pub use session::SessionId;
pub use transcript::{ChatMessage, Sender, StatusLine, Transcript};
pub use voice::{AudioCapture, AudioPlayback, Recorder, SAMPLE_RATE, samples_to_wav};
pub use widget::{
    AudioSink, FALLBACK_AUDIO_PATH, FAILURE_MESSAGE, TROUBLE_MESSAGE, VoiceChatWidget,
    WidgetState,
};

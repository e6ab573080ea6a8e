//! Voice processing module
//!
//! Microphone capture into an ordered chunk accumulator, WAV encoding for
//! upload, and best-effort playback of returned audio.

mod capture;
mod playback;

pub use capture::{AudioCapture, ChunkBuffer, Recorder, SAMPLE_RATE, samples_to_wav};
pub use playback::{AudioFormat, AudioPlayback, decode_audio, detect_format};

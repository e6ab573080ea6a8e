//! Audio playback to speakers
//!
//! Returned audio arrives as encoded bytes (WAV from the fallback asset, MP3
//! from most synthesis providers); the container is sniffed from the leading
//! bytes. Playback is best-effort and blocking, sized by the decoded sample
//! count.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};

use crate::widget::AudioSink;
use crate::{Error, Result};

/// Encoded audio container kinds the client can play
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// RIFF waveform container
    Wav,
    /// MPEG layer III stream (with or without ID3 tag)
    Mp3,
}

/// Sniff the audio container from the leading bytes
#[must_use]
pub fn detect_format(bytes: &[u8]) -> Option<AudioFormat> {
    if bytes.len() < 4 {
        return None;
    }
    if &bytes[..4] == b"RIFF" {
        return Some(AudioFormat::Wav);
    }
    if &bytes[..3] == b"ID3" {
        return Some(AudioFormat::Mp3);
    }
    // MPEG frame sync: 11 set bits
    if bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0 {
        return Some(AudioFormat::Mp3);
    }
    None
}

/// Decode encoded audio bytes to mono f32 samples and their sample rate
///
/// # Errors
///
/// Returns error if the container is unrecognized or decoding fails
pub fn decode_audio(bytes: &[u8]) -> Result<(Vec<f32>, u32)> {
    match detect_format(bytes) {
        Some(AudioFormat::Wav) => decode_wav(bytes),
        Some(AudioFormat::Mp3) => decode_mp3(bytes),
        None => Err(Error::Audio("unrecognized audio container".to_string())),
    }
}

fn decode_wav(bytes: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| Error::Audio(e.to_string()))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max = f32::from(i16::MAX);
            reader
                .samples::<i16>()
                .map(|s| s.map(|v| f32::from(v) / max))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Audio(e.to_string()))?
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Audio(e.to_string()))?,
    };

    Ok((downmix(&interleaved, spec.channels), spec.sample_rate))
}

fn decode_mp3(bytes: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(bytes));
    let mut samples = Vec::new();
    let mut sample_rate = 0u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    sample_rate = u32::try_from(frame.sample_rate).unwrap_or(0);
                }
                let interleaved: Vec<f32> = frame
                    .data
                    .iter()
                    .map(|&s| f32::from(s) / 32768.0)
                    .collect();
                let channels = u16::try_from(frame.channels).unwrap_or(1);
                samples.extend(downmix(&interleaved, channels));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    if sample_rate == 0 {
        return Err(Error::Audio("MP3 stream contained no frames".to_string()));
    }
    Ok((samples, sample_rate))
}

/// Average interleaved frames down to mono
#[allow(clippy::cast_precision_loss)]
fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    let channels = usize::from(channels.max(1));
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Linear interpolation between sample rates
///
/// Used when the output device cannot run at the decoded rate. Quality is
/// adequate for speech.
#[must_use]
pub(crate) fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = f64::from(from_rate) / f64::from(to_rate);
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let out_len = ((samples.len() as f64) / ratio).round() as usize;

    (0..out_len)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let pos = i as f64 * ratio;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let idx = pos.floor() as usize;
            #[allow(clippy::cast_possible_truncation)]
            let frac = (pos - pos.floor()) as f32;
            let a = samples[idx.min(samples.len() - 1)];
            let b = samples[(idx + 1).min(samples.len() - 1)];
            a + (b - a) * frac
        })
        .collect()
}

/// Plays audio to the default output device
pub struct AudioPlayback {
    device: Device,
}

impl AudioPlayback {
    /// Create a new audio playback instance
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available
    pub fn new() -> Result<Self> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            "audio playback initialized"
        );

        Ok(Self { device })
    }

    /// Play mono f32 samples at the given rate, blocking until done
    ///
    /// # Errors
    ///
    /// Returns error if the output stream cannot be built
    pub fn play_samples(&self, samples: Vec<f32>, sample_rate: u32) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let (config, samples) = self.output_config_for(sample_rate, samples)?;
        let rate = config.sample_rate.0;
        let channels = usize::from(config.channels);

        let samples = Arc::new(samples);
        let position = Arc::new(Mutex::new(0usize));
        let finished = Arc::new(Mutex::new(false));

        let cb_samples = Arc::clone(&samples);
        let cb_position = Arc::clone(&position);
        let cb_finished = Arc::clone(&finished);

        let stream = self
            .device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = cb_position.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                    for frame in data.chunks_mut(channels) {
                        let sample = if *pos < cb_samples.len() {
                            let s = cb_samples[*pos];
                            *pos += 1;
                            s
                        } else {
                            *cb_finished
                                .lock()
                                .unwrap_or_else(std::sync::PoisonError::into_inner) = true;
                            0.0
                        };
                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        // Poll for completion, bounded by the expected duration plus slack
        let duration_ms = (samples.len() as u64 * 1000) / u64::from(rate);
        let timeout = std::time::Duration::from_millis(duration_ms + 500);
        let start = std::time::Instant::now();

        while !*finished
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
        {
            if start.elapsed() > timeout {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
        std::thread::sleep(std::time::Duration::from_millis(100));

        drop(stream);
        tracing::debug!(samples = samples.len(), rate, "playback complete");
        Ok(())
    }

    /// Pick an output config at the requested rate, resampling if unsupported
    fn output_config_for(
        &self,
        sample_rate: u32,
        samples: Vec<f32>,
    ) -> Result<(StreamConfig, Vec<f32>)> {
        let supported = self
            .device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                (c.channels() == 1 || c.channels() == 2)
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            });

        if let Some(config) = supported {
            return Ok((
                config.with_sample_rate(SampleRate(sample_rate)).config(),
                samples,
            ));
        }

        // Device cannot run at the decoded rate
        let default = self
            .device
            .default_output_config()
            .map_err(|e| Error::Audio(e.to_string()))?;
        let device_rate = default.sample_rate().0;
        tracing::debug!(from = sample_rate, to = device_rate, "resampling for playback");
        let resampled = resample_linear(&samples, sample_rate, device_rate);
        Ok((default.config(), resampled))
    }
}

impl AudioSink for AudioPlayback {
    fn play(&mut self, bytes: &[u8]) -> Result<()> {
        let (samples, sample_rate) = decode_audio(bytes)?;
        self.play_samples(samples, sample_rate)
    }
}

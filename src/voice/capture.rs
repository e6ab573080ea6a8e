//! Audio capture from microphone

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Ordered accumulator of captured sample chunks
///
/// One chunk per capture callback. Reset at the start of each recording
/// cycle; concatenated into a single sample vector when the cycle stops.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: Vec<Vec<f32>>,
}

impl ChunkBuffer {
    /// Append one chunk of samples
    pub fn push(&mut self, chunk: &[f32]) {
        self.chunks.push(chunk.to_vec());
    }

    /// Drop all buffered chunks
    pub fn reset(&mut self) {
        self.chunks.clear();
    }

    /// Number of chunks buffered so far
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Concatenate all chunks in arrival order, leaving the buffer empty
    #[must_use]
    pub fn concat(&mut self) -> Vec<f32> {
        let chunks = std::mem::take(&mut self.chunks);
        let total: usize = chunks.iter().map(Vec::len).sum();
        let mut samples = Vec::with_capacity(total);
        for chunk in chunks {
            samples.extend(chunk);
        }
        samples
    }

    /// Snapshot of all buffered samples without consuming them
    #[must_use]
    pub fn snapshot(&self) -> Vec<f32> {
        self.chunks.iter().flatten().copied().collect()
    }
}

/// Single-shot recording source
///
/// `start` acquires the device and resets the accumulator; `finalize` is the
/// completion continuation: it releases the device unconditionally and yields
/// the concatenated samples of the cycle.
pub trait Recorder {
    /// Begin a recording cycle
    ///
    /// # Errors
    ///
    /// Returns error if the capture device cannot be acquired
    fn start(&mut self) -> Result<()>;

    /// End the cycle, releasing the device and returning all captured samples
    ///
    /// Zero captured chunks yield an empty vector, not an error.
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot be finalized
    fn finalize(&mut self) -> Result<Vec<f32>>;

    /// Sample rate of the captured audio
    fn sample_rate(&self) -> u32;
}

/// Captures audio from the default input device
pub struct AudioCapture {
    config: StreamConfig,
    buffer: Arc<Mutex<ChunkBuffer>>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Create a new audio capture instance
    ///
    /// # Errors
    ///
    /// Returns error if no suitable input device is available
    pub fn new() -> Result<Self> {
        let device = default_input_device()?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable input config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            config,
            buffer: Arc::new(Mutex::new(ChunkBuffer::default())),
            stream: None,
        })
    }

    /// Number of chunks captured in the current cycle
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.buffer.lock().map(|b| b.chunk_count()).unwrap_or(0)
    }

    /// Snapshot of the samples captured so far, without consuming them
    #[must_use]
    pub fn peek_samples(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|b| b.snapshot())
            .unwrap_or_default()
    }

    /// Drop everything captured so far
    pub fn clear(&self) {
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.reset();
        }
    }
}

impl Recorder for AudioCapture {
    fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        // No carry-over from a prior cycle
        self.clear();

        let buffer = Arc::clone(&self.buffer);
        let device = default_input_device()?;
        let config = self.config.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.push(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    fn finalize(&mut self) -> Result<Vec<f32>> {
        // Dropping the stream releases the microphone, on every path
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }

        let (chunks, samples) = self
            .buffer
            .lock()
            .map(|mut buf| (buf.chunk_count(), buf.concat()))
            .unwrap_or_default();

        tracing::debug!(chunks, samples = samples.len(), "recording finalized");
        Ok(samples)
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }
}

fn default_input_device() -> Result<Device> {
    cpal::default_host()
        .default_input_device()
        .ok_or_else(|| Error::Audio("no input device available".to_string()))
}

/// Convert f32 samples to a 16-bit PCM mono WAV container
///
/// An empty sample set produces a valid header-only WAV; the upload is still
/// attempted and the server decides.
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_buffer_preserves_order() {
        let mut buffer = ChunkBuffer::default();
        buffer.push(&[0.1, 0.2]);
        buffer.push(&[0.3]);
        assert_eq!(buffer.chunk_count(), 2);
        assert_eq!(buffer.concat(), vec![0.1, 0.2, 0.3]);
        assert_eq!(buffer.chunk_count(), 0);
    }

    #[test]
    fn chunk_buffer_reset_drops_everything() {
        let mut buffer = ChunkBuffer::default();
        buffer.push(&[0.5; 64]);
        buffer.reset();
        assert_eq!(buffer.chunk_count(), 0);
        assert!(buffer.concat().is_empty());
    }

    #[test]
    fn chunk_buffer_snapshot_does_not_consume() {
        let mut buffer = ChunkBuffer::default();
        buffer.push(&[1.0, -1.0]);
        assert_eq!(buffer.snapshot(), vec![1.0, -1.0]);
        assert_eq!(buffer.chunk_count(), 1);
    }

    #[test]
    fn wav_encoding_produces_expected_spec() {
        let samples = vec![0.0, 0.5, -0.5, 1.0];
        let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

        let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, SAMPLE_RATE);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len(), 4);
    }

    #[test]
    fn wav_encoding_clamps_out_of_range_samples() {
        let wav = samples_to_wav(&[2.0, -2.0], SAMPLE_RATE).unwrap();
        let mut reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, vec![32767, -32768]);
    }

    #[test]
    fn empty_recording_encodes_to_valid_header_only_wav() {
        let wav = samples_to_wav(&[], SAMPLE_RATE).unwrap();
        assert!(!wav.is_empty());
        let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        assert_eq!(reader.len(), 0);
    }
}

//! Streaming Opus/WebM encoding through an ffmpeg child.
//!
//! ffmpeg reads raw f32le PCM on stdin and muxes an Opus/WebM stream to
//! stdout. A writer thread feeds it captured samples; a reader thread
//! chops stdout into fragments and forwards them to the session.
//! Closing stdin is the finalize signal: ffmpeg flushes the container,
//! stdout reaches EOF, and the fragment channel closes.

use crate::audio::capture::{self, MicInput};
use crate::audio::{ActiveCapture, CaptureControl, FragmentSource};
use crate::error::{DictationError, Result};
use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::Receiver;
use std::thread::JoinHandle;
use tokio::sync::mpsc;

/// Read granularity on the encoder's stdout; one read = one fragment.
const FRAGMENT_BYTES: usize = 8 * 1024;

/// Queue depth between the reader thread and the collector task.
const FRAGMENT_QUEUE: usize = 32;

/// Fragment source backed by the default or a named microphone.
pub struct MicOpusSource {
    device: Option<String>,
}

impl MicOpusSource {
    pub fn new(device: Option<String>) -> Self {
        Self { device }
    }
}

impl FragmentSource for MicOpusSource {
    fn begin(&mut self) -> Result<ActiveCapture> {
        let (mic, samples) = capture::open_input(self.device.as_deref())?;
        begin_encoding(mic, samples)
    }
}

/// Wire an opened microphone to a fresh encoder child.
fn begin_encoding(mic: MicInput, samples: Receiver<Vec<f32>>) -> Result<ActiveCapture> {
    let mut child = spawn_ffmpeg(mic.sample_rate, mic.channels)?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| DictationError::Encoder("ffmpeg stdin not piped".to_string()))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| DictationError::Encoder("ffmpeg stdout not piped".to_string()))?;

    let (fragment_tx, fragment_rx) = mpsc::channel(FRAGMENT_QUEUE);

    // Writer: samples -> f32le bytes -> ffmpeg stdin. Exits when the
    // capture shuts down and its channel closes; dropping stdin then
    // finalizes the container.
    let writer = std::thread::Builder::new()
        .name("murmur-encoder-in".to_string())
        .spawn(move || {
            while let Ok(chunk) = samples.recv() {
                let mut bytes = Vec::with_capacity(chunk.len() * 4);
                for sample in chunk {
                    bytes.extend_from_slice(&sample.to_le_bytes());
                }
                if stdin.write_all(&bytes).is_err() {
                    // encoder went away; stop feeding it
                    break;
                }
            }
        })
        .map_err(|e| DictationError::Encoder(format!("writer thread: {e}")))?;

    // Reader: ffmpeg stdout -> fragments. Owns the child so it can reap
    // it after EOF and surface stderr on failure.
    std::thread::Builder::new()
        .name("murmur-encoder-out".to_string())
        .spawn(move || {
            let mut buf = [0u8; FRAGMENT_BYTES];
            let mut forward = true;
            loop {
                match stdout.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        // If the session consumer is gone, keep reading to
                        // EOF anyway; a full stdout pipe would wedge ffmpeg
                        // and the reap below with it.
                        if forward && fragment_tx.blocking_send(buf[..n].to_vec()).is_err() {
                            forward = false;
                        }
                    }
                    Err(e) => {
                        tracing::error!("encoder stdout read failed: {e}");
                        break;
                    }
                }
            }
            reap(child);
            // fragment_tx drops here, closing the channel
        })
        .map_err(|e| DictationError::Encoder(format!("reader thread: {e}")))?;

    Ok(ActiveCapture {
        fragments: fragment_rx,
        control: Box::new(OpusControl {
            mic,
            writer: Some(writer),
            finalized: false,
        }),
    })
}

struct OpusControl {
    mic: MicInput,
    writer: Option<JoinHandle<()>>,
    finalized: bool,
}

impl CaptureControl for OpusControl {
    fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;

        // Release the device first; the sample channel closes with the
        // stream, the writer drains and drops stdin, ffmpeg flushes.
        self.mic.shut_down();
        if let Some(writer) = self.writer.take() {
            let _ = writer.join();
        }
    }
}

impl Drop for OpusControl {
    fn drop(&mut self) {
        self.finalize();
    }
}

fn spawn_ffmpeg(sample_rate: u32, channels: u16) -> Result<Child> {
    let rate = sample_rate.to_string();
    let chans = channels.to_string();

    Command::new("ffmpeg")
        .args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "f32le",
            "-ar",
            &rate,
            "-ac",
            &chans,
            "-i",
            "pipe:0",
            "-c:a",
            "libopus",
            "-b:a",
            "64k",
            "-f",
            "webm",
            "pipe:1",
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DictationError::Encoder(
                    "ffmpeg not found. Install FFmpeg and make sure it is on PATH".to_string(),
                )
            } else {
                DictationError::Encoder(format!("failed to spawn ffmpeg: {e}"))
            }
        })
}

/// Wait for the child and log its stderr if it failed.
fn reap(mut child: Child) {
    let mut stderr_text = String::new();
    if let Some(mut stderr) = child.stderr.take() {
        let _ = stderr.read_to_string(&mut stderr_text);
    }
    match child.wait() {
        Ok(status) if status.success() => {}
        Ok(status) => {
            tracing::error!("ffmpeg exited with {status}: {}", stderr_text.trim());
        }
        Err(e) => tracing::error!("failed to wait for ffmpeg: {e}"),
    }
}

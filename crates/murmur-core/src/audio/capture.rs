//! Platform input stream handling.
//!
//! cpal stream handles are not `Send`, so each capture runs on its own
//! thread that builds the stream, keeps it alive until told to stop, and
//! drops it to release the device. Samples leave the audio callback as
//! f32 chunks over an unbounded channel; the callback itself never
//! blocks.

use crate::error::{DictationError, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Stream errors seen during the current capture, rate-limited in logs.
/// ALSA produces these in bursts on some hardware and they are non-fatal.
static STREAM_ERROR_COUNT: AtomicU64 = AtomicU64::new(0);

/// Control handle for a microphone opened for one session. The captured
/// samples arrive on the receiver returned alongside it by `open_input`.
pub struct MicInput {
    pub sample_rate: u32,
    pub channels: u16,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl MicInput {
    /// Tear the stream down and release the device. Idempotent; also runs
    /// on drop so an abandoned capture cannot hold the microphone open.
    pub fn shut_down(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for MicInput {
    fn drop(&mut self) {
        self.shut_down();
    }
}

/// Open the named (or default) input device and start capturing.
pub fn open_input(device_name: Option<&str>) -> Result<(MicInput, Receiver<Vec<f32>>)> {
    STREAM_ERROR_COUNT.store(0, Ordering::Relaxed);

    let device = super::devices::resolve_input_device(device_name)?;
    let config = device
        .default_input_config()
        .map_err(|e| classify("default input config", e))?;

    let sample_rate = config.sample_rate();
    let channels = config.channels();
    let sample_format = config.sample_format();
    let stream_config: StreamConfig = config.into();

    let (tx, rx) = mpsc::channel();
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    // The thread reports how stream construction went before settling
    // into its keep-alive loop.
    let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

    let thread = std::thread::Builder::new()
        .name("murmur-capture".to_string())
        .spawn(move || {
            let built = match sample_format {
                SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, tx),
                SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, tx),
                SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, tx),
                other => Err(DictationError::DeviceUnavailable(format!(
                    "unsupported sample format {other:?}"
                ))),
            };

            let stream = match built {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(classify("stream start", e)));
                return;
            }
            let _ = ready_tx.send(Ok(()));

            while !stop_flag.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(20));
            }
            // dropping the stream here closes the device and the sample
            // channel with it
        })
        .map_err(|e| DictationError::DeviceUnavailable(format!("capture thread: {e}")))?;

    match ready_rx.recv() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            let _ = thread.join();
            return Err(e);
        }
        Err(_) => {
            let _ = thread.join();
            return Err(DictationError::DeviceUnavailable(
                "capture thread exited during startup".to_string(),
            ));
        }
    }

    tracing::debug!(sample_rate, channels, "microphone opened");

    let mic = MicInput {
        sample_rate,
        channels,
        stop,
        thread: Some(thread),
    };
    Ok((mic, rx))
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    tx: Sender<Vec<f32>>,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    let err_fn = |err| {
        let count = STREAM_ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
        if count == 0 {
            tracing::warn!("audio stream error (non-fatal, further ones suppressed): {err}");
        } else if count.is_multiple_of(1000) {
            tracing::debug!("audio stream: {count} non-fatal errors so far");
        }
    };

    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let chunk: Vec<f32> = data.iter().map(|&s| cpal::Sample::from_sample(s)).collect();
                if !chunk.is_empty() {
                    // unbounded send, never blocks the audio callback
                    let _ = tx.send(chunk);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| classify("input stream", e))?;

    Ok(stream)
}

/// Sort a host error into the permission/device taxonomy. Hosts report
/// denied capture permission only through their error text, so this is a
/// wording check with device-unavailable as the fallback.
fn classify(context: &str, err: impl std::fmt::Display) -> DictationError {
    let message = err.to_string();
    let lower = message.to_ascii_lowercase();
    if lower.contains("permission") || lower.contains("access denied") || lower.contains("not permitted")
    {
        DictationError::PermissionDenied(message)
    } else {
        DictationError::DeviceUnavailable(format!("{context}: {message}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_permission_wording() {
        let err = classify("input stream", "Operation not permitted by the user");
        assert!(matches!(err, DictationError::PermissionDenied(_)));

        let err = classify("input stream", "Access denied for capture device");
        assert!(matches!(err, DictationError::PermissionDenied(_)));
    }

    #[test]
    fn test_classify_defaults_to_device() {
        let err = classify("default input config", "device disconnected");
        match err {
            DictationError::DeviceUnavailable(msg) => {
                assert!(msg.contains("default input config"));
                assert!(msg.contains("device disconnected"));
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }
}

//! Live recognition on whisper.cpp via whisper-rs.
//!
//! Audio accumulates in a phrase window. A ticker decodes the window
//! periodically for interim text; an energy gate watches for trailing
//! silence and, when a phrase ends, decodes it one last time as final
//! text and starts a fresh window. Decoding runs on a dedicated thread
//! so the sample loop never stalls behind the model.

use std::mem;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Once};
use std::thread;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState,
};

use super::{SpeechEngine, TranscriptEvent};
use crate::error::{DictationError, Result};
use crate::resample::ENGINE_SAMPLE_RATE;

/// How often the in-progress window is decoded for interim text.
const INTERIM_PERIOD: Duration = Duration::from_millis(1200);

/// Trailing silence that ends a phrase.
const SILENCE_HOLD: Duration = Duration::from_millis(900);

/// RMS below this counts as silence.
const SILENCE_RMS: f32 = 0.015;

/// Hard cap on the phrase window, whisper's native decode span.
const MAX_WINDOW_SAMPLES: usize = 30 * ENGINE_SAMPLE_RATE as usize;

/// whisper.cpp rejects inputs shorter than one second.
const MIN_DECODE_SAMPLES: usize = ENGINE_SAMPLE_RATE as usize;

static LOGGING_HOOKS: Once = Once::new();

/// Streaming engine backed by a local whisper.cpp model pack.
pub struct LocalWhisperEngine {
    model_path: PathBuf,
    language: String,
}

impl LocalWhisperEngine {
    pub fn new(model_path: impl Into<PathBuf>, language: impl Into<String>) -> Result<Self> {
        let model_path = model_path.into();
        if !model_path.is_file() {
            return Err(DictationError::Engine(format!(
                "model not found at: {}",
                model_path.display()
            )));
        }
        Ok(Self {
            model_path,
            language: language.into(),
        })
    }
}

#[async_trait::async_trait]
impl SpeechEngine for LocalWhisperEngine {
    fn name(&self) -> &'static str {
        "local-whisper"
    }

    async fn run(
        &mut self,
        mut samples: mpsc::Receiver<Vec<f32>>,
        events: mpsc::Sender<TranscriptEvent>,
    ) -> Result<()> {
        let (job_tx, job_rx) = std_mpsc::channel::<DecodeJob>();
        let (ready_tx, ready_rx) = oneshot::channel();
        let busy = Arc::new(AtomicBool::new(false));

        let model_path = self.model_path.clone();
        let language = self.language.clone();
        let worker_busy = busy.clone();
        let worker = thread::Builder::new()
            .name("murmur-decode".into())
            .spawn(move || decode_worker(model_path, language, job_rx, events, worker_busy, ready_tx))
            .map_err(|e| DictationError::Engine(format!("spawn decode thread: {e}")))?;

        ready_rx
            .await
            .map_err(|_| DictationError::Engine("decode thread exited during model load".into()))??;
        info!(path = %self.model_path.display(), "model loaded, listening");

        let mut window: Vec<f32> = Vec::new();
        let mut gate = PhraseGate::new(SILENCE_RMS, SILENCE_HOLD);
        let mut ticker = interval(INTERIM_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                chunk = samples.recv() => {
                    let Some(chunk) = chunk else { break };
                    let boundary = gate.observe(&chunk, ENGINE_SAMPLE_RATE);
                    window.extend_from_slice(&chunk);
                    if boundary || window.len() >= MAX_WINDOW_SAMPLES {
                        debug!(samples = window.len(), "phrase complete");
                        if job_tx.send(DecodeJob::Final(mem::take(&mut window))).is_err() {
                            break;
                        }
                        gate.reset();
                    }
                }
                _ = ticker.tick() => {
                    // Skip the tick while the decoder is mid-decode;
                    // queueing interims behind a slow model only adds lag.
                    if !window.is_empty() && !busy.load(Ordering::Relaxed) {
                        if job_tx.send(DecodeJob::Interim(window.clone())).is_err() {
                            break;
                        }
                    }
                }
            }
        }

        if !window.is_empty() {
            let _ = job_tx.send(DecodeJob::Final(window));
        }
        drop(job_tx);

        let _ = tokio::task::spawn_blocking(move || worker.join()).await;
        Ok(())
    }
}

enum DecodeJob {
    Interim(Vec<f32>),
    Final(Vec<f32>),
}

fn decode_worker(
    model_path: PathBuf,
    language: String,
    jobs: std_mpsc::Receiver<DecodeJob>,
    events: mpsc::Sender<TranscriptEvent>,
    busy: Arc<AtomicBool>,
    ready: oneshot::Sender<Result<()>>,
) {
    let mut decoder = match WhisperDecoder::new(&model_path, language) {
        Ok(decoder) => {
            let _ = ready.send(Ok(()));
            decoder
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    while let Ok(job) = jobs.recv() {
        let (samples, is_final) = match job {
            DecodeJob::Interim(samples) => (samples, false),
            DecodeJob::Final(samples) => (samples, true),
        };

        busy.store(true, Ordering::Relaxed);
        let decoded = decoder.decode(samples);
        busy.store(false, Ordering::Relaxed);

        match decoded {
            Ok(text) if !text.is_empty() => {
                let event = if is_final {
                    TranscriptEvent::Final(text)
                } else {
                    TranscriptEvent::Interim(text)
                };
                if events.blocking_send(event).is_err() {
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "decode failed"),
        }
    }
}

struct WhisperDecoder {
    state: WhisperState,
    language: String,
}

impl WhisperDecoder {
    fn new(model_path: &Path, language: String) -> Result<Self> {
        LOGGING_HOOKS.call_once(whisper_rs::install_logging_hooks);

        let path = model_path
            .to_str()
            .ok_or_else(|| DictationError::Engine("model path is not valid UTF-8".into()))?;

        let ctx = WhisperContext::new_with_params(path, WhisperContextParameters::default())
            .map_err(|e| DictationError::Engine(format!("load model: {e}")))?;

        // Leaked so the state can outlive this scope; the model stays
        // loaded for the rest of the process anyway.
        let ctx: &'static WhisperContext = Box::leak(Box::new(ctx));
        let state = ctx
            .create_state()
            .map_err(|e| DictationError::Engine(format!("create decode state: {e}")))?;

        Ok(Self { state, language })
    }

    fn decode(&mut self, samples: Vec<f32>) -> Result<String> {
        let samples = pad_to_min(samples);

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(&self.language));
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        self.state
            .full(params, &samples)
            .map_err(|e| DictationError::Engine(format!("inference failed: {e}")))?;

        let mut text = String::new();
        for i in 0..self.state.full_n_segments() {
            if let Some(segment) = self.state.get_segment(i)
                && let Ok(segment_text) = segment.to_str()
            {
                text.push_str(segment_text);
            }
        }

        Ok(text.trim().to_string())
    }
}

fn pad_to_min(mut samples: Vec<f32>) -> Vec<f32> {
    if samples.len() < MIN_DECODE_SAMPLES {
        samples.resize(MIN_DECODE_SAMPLES, 0.0);
    }
    samples
}

/// Detects phrase boundaries from signal energy: a phrase ends once it
/// has contained voice and then goes quiet for the hold duration.
struct PhraseGate {
    threshold: f32,
    hold: Duration,
    voiced: bool,
    quiet: Duration,
}

impl PhraseGate {
    fn new(threshold: f32, hold: Duration) -> Self {
        Self {
            threshold,
            hold,
            voiced: false,
            quiet: Duration::ZERO,
        }
    }

    /// Feed one chunk; returns true when a phrase just ended.
    fn observe(&mut self, chunk: &[f32], sample_rate: u32) -> bool {
        if chunk.is_empty() {
            return false;
        }
        let span = Duration::from_secs_f64(chunk.len() as f64 / sample_rate as f64);
        if rms(chunk) >= self.threshold {
            self.voiced = true;
            self.quiet = Duration::ZERO;
            return false;
        }
        self.quiet += span;
        if self.voiced && self.quiet >= self.hold {
            self.reset();
            return true;
        }
        false
    }

    fn reset(&mut self) {
        self.voiced = false;
        self.quiet = Duration::ZERO;
    }
}

fn rms(chunk: &[f32]) -> f32 {
    (chunk.iter().map(|x| x * x).sum::<f32>() / chunk.len() as f32).sqrt()
}

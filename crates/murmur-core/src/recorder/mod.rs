//! Recording lifecycle control.
//!
//! `RecordingController` owns the two-state machine at the center of the
//! tool: `Idle --start--> Recording --stop--> Idle`, driven by a single
//! toggle. Each start opens a capture through the `FragmentSource` seam
//! and spawns one collector task that buffers fragments, assembles the
//! payload once the capture finalizes, uploads it, and applies the
//! outcome to the surface. Sessions are tagged with monotonically
//! increasing ids; an outcome is applied only if its session is still
//! the most recently started one, so an upload that settles late cannot
//! clobber the UI of a newer recording.

pub mod session;

use crate::audio::{CaptureControl, FragmentSource};
use crate::client::{TranscriptionOutcome, Transcriber};
use crate::error::{DictationError, Result};
use crate::surface::{
    NO_SPEECH_MESSAGE, PROCESSING_MESSAGE, SharedSurface, ToggleLabel, UPLOAD_FAILED_MESSAGE,
};
use session::{FragmentBuffer, SessionId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// The controller's two lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
}

struct ActiveSession {
    id: SessionId,
    control: Box<dyn CaptureControl>,
}

pub struct RecordingController {
    source: Box<dyn FragmentSource>,
    transcriber: Arc<dyn Transcriber>,
    surface: SharedSurface,
    state: RecordingState,
    active: Option<ActiveSession>,
    pending: Vec<JoinHandle<()>>,
    latest: Arc<AtomicU64>,
    next_id: u64,
}

impl RecordingController {
    pub fn new(
        source: Box<dyn FragmentSource>,
        transcriber: Arc<dyn Transcriber>,
        surface: SharedSurface,
    ) -> Self {
        surface.set_toggle_label(ToggleLabel::Start);
        Self {
            source,
            transcriber,
            surface,
            state: RecordingState::Idle,
            active: None,
            pending: Vec::new(),
            latest: Arc::new(AtomicU64::new(0)),
            next_id: 0,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// One control, two meanings: start when idle, stop when recording.
    /// Returns the state after the transition.
    pub fn toggle(&mut self) -> Result<RecordingState> {
        match self.state {
            RecordingState::Idle => self.start()?,
            RecordingState::Recording => self.stop(),
        }
        Ok(self.state)
    }

    /// Begin a new session. No-op while already recording. On capture
    /// failure the state stays `Idle` and the error is returned for the
    /// front end to display.
    pub fn start(&mut self) -> Result<()> {
        if self.state == RecordingState::Recording {
            tracing::debug!("start ignored, already recording");
            return Ok(());
        }

        let id = SessionId::new(self.next_id + 1);
        let capture = match self.source.begin() {
            Ok(capture) => capture,
            Err(e) => {
                tracing::error!("could not start recording: {e}");
                return Err(e);
            }
        };
        self.next_id += 1;
        self.latest.store(id.raw(), Ordering::SeqCst);

        let task = tokio::spawn(run_session(
            id,
            capture.fragments,
            self.transcriber.clone(),
            self.surface.clone(),
            self.latest.clone(),
        ));
        self.pending.push(task);
        self.active = Some(ActiveSession {
            id,
            control: capture.control,
        });
        self.state = RecordingState::Recording;
        self.surface.set_toggle_label(ToggleLabel::Stop);
        tracing::info!(session = %id, "recording started");
        Ok(())
    }

    /// End the active session. No-op while idle, so calling it twice is
    /// the same as calling it once. The microphone is released before
    /// this returns; the upload continues in the session's collector.
    pub fn stop(&mut self) {
        if self.state == RecordingState::Idle {
            tracing::debug!("stop ignored while idle");
            return;
        }

        if let Some(mut active) = self.active.take() {
            active.control.finalize();
            tracing::info!(session = %active.id, "recording stopped, finalizing");
        }
        self.state = RecordingState::Idle;
        self.surface.set_toggle_label(ToggleLabel::Start);
    }

    /// Await every collector spawned so far, letting a CLI invocation
    /// print the outcome before exiting. Superseded sessions finish here
    /// too; their outcomes are discarded by the id check.
    pub async fn settle(&mut self) {
        for task in self.pending.drain(..) {
            let _ = task.await;
        }
    }
}

/// Collector for one session: buffer fragments until the capture
/// finalizes, then assemble, upload, and apply.
async fn run_session(
    id: SessionId,
    mut fragments: mpsc::Receiver<Vec<u8>>,
    transcriber: Arc<dyn Transcriber>,
    surface: SharedSurface,
    latest: Arc<AtomicU64>,
) {
    let mut buffer = FragmentBuffer::default();
    while let Some(chunk) = fragments.recv().await {
        buffer.push(chunk);
    }

    // channel closed: the encoder has flushed everything it will emit
    tracing::debug!(
        session = %id,
        fragments = buffer.fragment_count(),
        bytes = buffer.total_bytes(),
        "payload assembled"
    );
    let payload = buffer.into_payload();

    if latest.load(Ordering::SeqCst) == id.raw() {
        surface.show_transcript(PROCESSING_MESSAGE);
    }

    let outcome = transcriber.upload(payload).await;

    if latest.load(Ordering::SeqCst) != id.raw() {
        tracing::debug!(session = %id, "discarding outcome of superseded session");
        return;
    }

    match outcome.and_then(TranscriptionOutcome::require_text) {
        Ok((text, file_url)) => {
            tracing::info!(session = %id, chars = text.len(), "transcription complete");
            surface.show_transcript(&text);
            if let Some(url) = file_url {
                surface.offer_download(&url);
            }
        }
        Err(DictationError::NoSpeechDetected) => {
            tracing::info!(session = %id, "no speech detected");
            surface.show_transcript(NO_SPEECH_MESSAGE);
        }
        Err(e) => {
            tracing::error!(session = %id, "upload failed: {e}");
            surface.show_transcript(UPLOAD_FAILED_MESSAGE);
        }
    }
}

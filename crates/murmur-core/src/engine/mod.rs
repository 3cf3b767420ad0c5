//! On-device speech recognition.
//!
//! ```text
//! pack     - model pack catalog, install locations, availability
//! install  - streaming pack download with progress
//! whisper  - live engine on whisper.cpp (feature "local-engine")
//! ```
//!
//! The live engine consumes 16 kHz mono samples and emits a stream of
//! transcript events: interim text that revises as more audio arrives,
//! and final text that is settled and will not change.

pub mod install;
pub mod pack;
#[cfg(feature = "local-engine")]
pub mod whisper;

use tokio::sync::mpsc;

use crate::error::Result;

pub use install::{install_pack, InstallProgress};
pub use pack::{PackInfo, DEFAULT_PACK};

#[cfg(feature = "local-engine")]
pub use whisper::LocalWhisperEngine;

/// Whether a model pack can back the live engine right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// Installed and verified; live recognition can start.
    Available,
    /// In the catalog but not installed yet.
    Downloadable,
    /// Not a pack this build knows about.
    Unavailable,
}

/// One unit of live engine output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    /// Provisional text for the phrase still in progress. Each interim
    /// event replaces the previous one.
    Interim(String),
    /// Settled text for a completed phrase. Appended, never revised.
    Final(String),
}

/// A streaming recognizer.
///
/// `run` consumes samples until the channel closes, then flushes any
/// remaining audio as a final event and returns.
#[async_trait::async_trait]
pub trait SpeechEngine: Send {
    fn name(&self) -> &'static str;

    async fn run(
        &mut self,
        samples: mpsc::Receiver<Vec<f32>>,
        events: mpsc::Sender<TranscriptEvent>,
    ) -> Result<()>;
}

/// Rolling transcript assembled from engine events: everything
/// finalized so far plus the current interim tail.
#[derive(Debug, Default)]
pub struct LiveTranscript {
    finalized: String,
    interim: String,
}

impl LiveTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: TranscriptEvent) {
        match event {
            TranscriptEvent::Interim(text) => self.interim = text,
            TranscriptEvent::Final(text) => {
                push_phrase(&mut self.finalized, &text);
                self.interim.clear();
            }
        }
    }

    /// Current display text.
    pub fn render(&self) -> String {
        let mut out = self.finalized.clone();
        push_phrase(&mut out, &self.interim);
        out
    }

    /// Settled text only, without the interim tail.
    pub fn finalized(&self) -> &str {
        &self.finalized
    }

    pub fn is_empty(&self) -> bool {
        self.finalized.is_empty() && self.interim.is_empty()
    }
}

/// Append `phrase` to `out` with a single separating space.
fn push_phrase(out: &mut String, phrase: &str) {
    let phrase = phrase.trim();
    if phrase.is_empty() {
        return;
    }
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(phrase);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interim_replaces_previous_interim() {
        let mut live = LiveTranscript::new();
        live.apply(TranscriptEvent::Interim("hel".into()));
        live.apply(TranscriptEvent::Interim("hello th".into()));
        assert_eq!(live.render(), "hello th");
    }

    #[test]
    fn test_final_clears_interim_and_accumulates() {
        let mut live = LiveTranscript::new();
        live.apply(TranscriptEvent::Interim("hello wor".into()));
        live.apply(TranscriptEvent::Final("hello world".into()));
        assert_eq!(live.render(), "hello world");
        assert_eq!(live.finalized(), "hello world");

        live.apply(TranscriptEvent::Interim("how ar".into()));
        assert_eq!(live.render(), "hello world how ar");

        live.apply(TranscriptEvent::Final("how are you".into()));
        assert_eq!(live.render(), "hello world how are you");
    }

    #[test]
    fn test_blank_events_do_not_add_separators() {
        let mut live = LiveTranscript::new();
        live.apply(TranscriptEvent::Final("  ".into()));
        assert!(live.is_empty());
        live.apply(TranscriptEvent::Final("one".into()));
        live.apply(TranscriptEvent::Final("".into()));
        assert_eq!(live.render(), "one");
    }
}

//! Abstract UI surface the controller drives.
//!
//! Three affordances only: a toggle control whose label flips between
//! start and stop, one text region shared by transcripts and status
//! messages, and a download control revealed after a successful
//! transcription. Front ends (terminal, tests) implement this trait;
//! the controller never talks to a concrete UI.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Status line shown while the upload is in flight
pub const PROCESSING_MESSAGE: &str = "Processing transcription...";

/// Shown when the server answered without transcript text
pub const NO_SPEECH_MESSAGE: &str = "No voice detected, please try again";

/// Shown when the upload itself failed
pub const UPLOAD_FAILED_MESSAGE: &str = "transcription failed";

/// The two labels of the toggle control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleLabel {
    Start,
    Stop,
}

impl fmt::Display for ToggleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToggleLabel::Start => write!(f, "Start Recording"),
            ToggleLabel::Stop => write!(f, "Stop Recording"),
        }
    }
}

pub trait UiSurface: Send {
    /// Relabel the toggle control.
    fn set_toggle_label(&mut self, label: ToggleLabel);

    /// Replace the transcript region's contents. Status and failure
    /// strings go through here too; there is no separate status line.
    fn show_transcript(&mut self, text: &str);

    /// Reveal the download control, bound to `url`. Once revealed it is
    /// never hidden again, only retargeted by a later success.
    fn offer_download(&mut self, url: &str);
}

/// Cloneable handle to one [`UiSurface`], shared between the controller
/// and its background sessions.
#[derive(Clone)]
pub struct SharedSurface {
    inner: Arc<Mutex<dyn UiSurface>>,
}

impl SharedSurface {
    pub fn new(surface: impl UiSurface + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(surface)),
        }
    }

    pub fn set_toggle_label(&self, label: ToggleLabel) {
        self.inner.lock().unwrap().set_toggle_label(label);
    }

    pub fn show_transcript(&self, text: &str) {
        self.inner.lock().unwrap().show_transcript(text);
    }

    pub fn offer_download(&self, url: &str) {
        self.inner.lock().unwrap().offer_download(url);
    }
}

//! Terminal rendering of the recording surface.

use std::sync::{Arc, Mutex};

use console::style;
use murmur_core::surface::{
    NO_SPEECH_MESSAGE, PROCESSING_MESSAGE, ToggleLabel, UPLOAD_FAILED_MESSAGE, UiSurface,
};

/// Prints surface updates as they happen and remembers the transcript
/// file URL so the command can offer to save it after settling.
pub struct TerminalSurface {
    label: ToggleLabel,
    download: Arc<Mutex<Option<String>>>,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self {
            label: ToggleLabel::Start,
            download: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle to the stored file URL; stays readable after the surface
    /// moves into the controller.
    pub fn download_url(&self) -> Arc<Mutex<Option<String>>> {
        self.download.clone()
    }
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl UiSurface for TerminalSurface {
    fn set_toggle_label(&mut self, label: ToggleLabel) {
        if label == self.label {
            return;
        }
        self.label = label;
        match label {
            ToggleLabel::Stop => println!(
                "{} {}",
                style("●").red(),
                style("Recording... press Enter to stop").bold()
            ),
            ToggleLabel::Start => println!("{}", style("Recording stopped.").dim()),
        }
    }

    fn show_transcript(&mut self, text: &str) {
        match text {
            PROCESSING_MESSAGE => println!("{}", style(text).dim()),
            NO_SPEECH_MESSAGE => println!("{}", style(text).yellow()),
            UPLOAD_FAILED_MESSAGE => println!("{}", style(text).red()),
            _ => println!("{text}"),
        }
    }

    fn offer_download(&mut self, url: &str) {
        *self.download.lock().unwrap() = Some(url.to_string());
        println!("{} {url}", style("Transcript file:").cyan());
    }
}

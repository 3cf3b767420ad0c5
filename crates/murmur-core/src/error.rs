//! Error taxonomy for the dictation pipeline.
//!
//! Every failure a recording attempt can end in maps to one of these
//! variants. All of them are recoverable at the UI boundary: the caller
//! shows a status string and the user may simply record again. Nothing
//! here is retried automatically.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DictationError {
    /// Microphone access was refused by the platform.
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    /// No usable input device, or the device vanished while opening it.
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The encoder child process could not be spawned or its pipes broke.
    #[error("audio encoder error: {0}")]
    Encoder(String),

    /// Network failure, non-success HTTP status, or a response body that
    /// does not parse as a transcription outcome.
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// The server answered successfully but returned no transcript text.
    #[error("no speech detected")]
    NoSpeechDetected,

    /// Downloading or verifying a model pack failed.
    #[error("pack install failed: {0}")]
    Install(String),

    /// Local recognition engine failure.
    #[error("engine error: {0}")]
    Engine(String),
}

pub type Result<T> = std::result::Result<T, DictationError>;

impl DictationError {
    /// True for failures of microphone acquisition, where the session
    /// never left `Idle`.
    pub fn is_capture(&self) -> bool {
        matches!(
            self,
            DictationError::PermissionDenied(_) | DictationError::DeviceUnavailable(_)
        )
    }
}

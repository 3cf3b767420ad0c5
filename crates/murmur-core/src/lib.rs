pub mod audio;
pub mod client;
pub mod engine;
pub mod error;
pub mod recorder;
pub mod resample;
pub mod settings;
pub mod surface;

pub use audio::{list_input_devices, InputDeviceInfo, MicOpusSource};
pub use client::{HttpTranscriber, Transcriber, TranscriptionOutcome};
pub use error::{DictationError, Result};
pub use recorder::{RecordingController, RecordingState};
pub use settings::Settings;
pub use surface::{SharedSurface, ToggleLabel, UiSurface};

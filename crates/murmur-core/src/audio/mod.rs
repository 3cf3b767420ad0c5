//! Microphone capture and encoding.
//!
//! The capture side of a session is split in two: `capture` owns the
//! platform input stream on a dedicated thread and delivers raw f32
//! sample chunks, `encoder` pipes those samples through an ffmpeg child
//! that muxes an Opus/WebM stream and hands it back as fragments. The
//! controller only sees the `FragmentSource` seam defined here.

pub mod capture;
pub mod devices;
pub mod encoder;

pub use capture::{open_input, MicInput};
pub use devices::{list_input_devices, InputDeviceInfo};
pub use encoder::MicOpusSource;

use crate::error::Result;
use tokio::sync::mpsc;

/// Control half of a running capture.
///
/// `finalize` asks the encoder to flush and close the fragment channel,
/// releasing the microphone first. It must be idempotent; the second and
/// later calls do nothing.
pub trait CaptureControl: Send {
    fn finalize(&mut self);
}

/// A capture in progress: encoded fragments arrive on `fragments` until
/// the control is finalized and the encoder has flushed, at which point
/// the channel closes. Closure of the channel is the finalize event.
pub struct ActiveCapture {
    pub fragments: mpsc::Receiver<Vec<u8>>,
    pub control: Box<dyn CaptureControl>,
}

/// Source of encoded audio fragments, one `begin` per session.
///
/// The microphone-backed implementation lives in `encoder`; tests supply
/// scripted sources.
pub trait FragmentSource: Send {
    fn begin(&mut self) -> Result<ActiveCapture>;
}

//! Shared helpers for the command implementations.

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::io::Write;

/// Encoding needs the ffmpeg binary on PATH; bail out early with install
/// hints instead of failing mid-recording.
pub fn ensure_ffmpeg_installed() -> Result<()> {
    if std::process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .is_err()
    {
        eprintln!("Error: FFmpeg is not installed or not in PATH.");
        eprintln!("\nmurmur encodes recordings with FFmpeg.");
        eprintln!("Please install it:");
        eprintln!("  - Ubuntu/Debian: sudo apt install ffmpeg");
        eprintln!("  - macOS: brew install ffmpeg");
        eprintln!("  - Or visit: https://ffmpeg.org/download.html\n");
        std::process::exit(1);
    }
    Ok(())
}

/// Block until Enter (or Ctrl+C, treated the same) without echoing keys.
pub fn wait_for_enter() -> Result<()> {
    std::io::stdout().flush()?;

    enable_raw_mode()?;

    loop {
        if let Event::Key(key_event) = event::read()? {
            match key_event.code {
                KeyCode::Enter => break,
                KeyCode::Char('c') if key_event.modifiers.contains(KeyModifiers::CONTROL) => break,
                _ => {}
            }
        }
    }

    disable_raw_mode()?;

    Ok(())
}

//! One-shot recording through the transcription server.
//!
//! Start the microphone, wait for Enter, stop, then let the session
//! finish its upload and print the outcome. The transcript file offer
//! comes last so the prompt never interleaves with session output.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};
use murmur_core::{
    HttpTranscriber, MicOpusSource, RecordingController, Settings, SharedSurface,
};

use crate::app;
use crate::args::RecordArgs;
use crate::surface::TerminalSurface;

pub async fn run(args: RecordArgs) -> Result<()> {
    let mut settings = Settings::load()?;
    if let Some(url) = args.server_url {
        settings.server_url = url;
    }
    if let Some(device) = args.device {
        settings.input_device = Some(device);
    }

    app::ensure_ffmpeg_installed()?;

    let transcriber = Arc::new(HttpTranscriber::new(&settings.server_url)?);
    let source = MicOpusSource::new(settings.input_device.clone());

    let surface = TerminalSurface::new();
    let download = surface.download_url();

    let mut controller = RecordingController::new(
        Box::new(source),
        transcriber.clone(),
        SharedSurface::new(surface),
    );

    if let Err(e) = controller.start() {
        if e.is_capture() {
            eprintln!("Could not open the microphone. `murmur devices` lists usable inputs.");
        }
        return Err(e.into());
    }
    app::wait_for_enter()?;
    controller.stop();
    controller.settle().await;

    let file_url = download.lock().unwrap().clone();
    if let Some(file_url) = file_url
        && !args.no_save
    {
        let wants_file = args.save
            || Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt("Save the transcript file here?")
                .default(true)
                .interact()?;
        if wants_file {
            let saved = transcriber.fetch_artifact(&file_url, Path::new(".")).await?;
            println!("{} {}", style("Saved").green(), saved.display());
        }
    }

    Ok(())
}

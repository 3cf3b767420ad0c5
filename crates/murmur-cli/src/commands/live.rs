//! Live on-device transcription.
//!
//! The configured model pack gates the whole command: available packs
//! stream immediately, downloadable ones are installed (after a
//! confirmation) and the user re-runs, unknown names only print a hint.
//! While streaming, capture runs at the device's native rate; a bridge
//! thread resamples to the engine rate and feeds the recognizer. Final
//! phrases print as permanent lines, the in-progress phrase redraws
//! dimmed in place.

use anyhow::Result;

use crate::args::LiveArgs;

#[cfg(feature = "local-engine")]
pub async fn run(args: LiveArgs) -> Result<()> {
    use murmur_core::Settings;
    use murmur_core::engine::{Availability, pack};

    let mut settings = Settings::load()?;
    if let Some(pack) = args.pack {
        settings.pack = pack;
    }
    if let Some(language) = args.language {
        settings.language = language;
    }
    if let Some(device) = args.device {
        settings.input_device = Some(device);
    }

    match pack::availability(&settings.pack) {
        Availability::Available => stream(&settings).await,
        Availability::Downloadable => download(&settings.pack).await,
        Availability::Unavailable => {
            println!("Local model pack '{}' is not available", settings.pack);
            println!("Known packs:");
            for known in pack::PACKS {
                println!("  {:<8} {}", known.name, known.description);
            }
            Ok(())
        }
    }
}

/// The downloadable branch: confirm, install with progress, and ask for
/// a fresh run rather than continuing into streaming.
#[cfg(feature = "local-engine")]
async fn download(name: &str) -> Result<()> {
    use dialoguer::{Confirm, theme::ColorfulTheme};
    use murmur_core::engine::pack;

    let Some(pack) = pack::find(name) else {
        anyhow::bail!("unknown model pack '{name}'");
    };

    println!(
        "Model pack '{}' ({}) is not installed.",
        pack.name, pack.description
    );
    let proceed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Download it now?")
        .default(true)
        .interact()?;
    if !proceed {
        return Ok(());
    }

    println!("{} model pack is downloading...", pack.name);
    match super::packs::install_with_progress(pack).await {
        Ok(_) => {
            println!(
                "{} model pack downloaded. Run 'murmur live' again.",
                pack.name
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{} model pack failed to download", pack.name);
            Err(e.into())
        }
    }
}

#[cfg(feature = "local-engine")]
async fn stream(settings: &murmur_core::Settings) -> Result<()> {
    use console::{Term, style};
    use murmur_core::audio::open_input;
    use murmur_core::engine::pack;
    use murmur_core::engine::whisper::LocalWhisperEngine;
    use murmur_core::engine::{LiveTranscript, SpeechEngine, TranscriptEvent};
    use murmur_core::resample::StreamResampler;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::sync::mpsc;

    let Some(pack) = pack::find(&settings.pack) else {
        anyhow::bail!("unknown model pack '{}'", settings.pack);
    };

    println!("Loading model pack '{}'...", pack.name);
    let mut engine = LocalWhisperEngine::new(pack.install_path(), settings.language.clone())?;
    tracing::debug!(engine = engine.name(), pack = pack.name, "engine ready");

    let (mut mic, raw_samples) = open_input(settings.input_device.as_deref())?;
    let resampler = StreamResampler::new(mic.sample_rate, mic.channels)?;
    let (sample_tx, sample_rx) = mpsc::channel::<Vec<f32>>(32);

    let bridge = std::thread::Builder::new()
        .name("murmur-live-bridge".into())
        .spawn(move || bridge_loop(raw_samples, resampler, sample_tx))?;

    let (event_tx, mut events) = mpsc::channel::<TranscriptEvent>(16);
    let engine_task = tokio::spawn(async move { engine.run(sample_rx, event_tx).await });

    println!(
        "{} {}",
        style("●").red(),
        style("Listening... press Enter to stop").bold()
    );

    let term = Term::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut transcript = LiveTranscript::new();
    let mut stopped = false;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match &event {
                    TranscriptEvent::Interim(text) => {
                        let width = term.size().1 as usize;
                        term.clear_line()?;
                        term.write_str(
                            &style(tail_fit(text, width.saturating_sub(1))).dim().to_string(),
                        )?;
                    }
                    TranscriptEvent::Final(text) => {
                        term.clear_line()?;
                        println!("{text}");
                    }
                }
                transcript.apply(event);
            }
            _ = lines.next_line(), if !stopped => {
                stopped = true;
                mic.shut_down();
            }
        }
    }

    let _ = bridge.join();
    engine_task.await??;

    term.clear_line()?;
    if !transcript.is_empty() {
        println!();
        println!("{}", transcript.finalized());
    }

    Ok(())
}

#[cfg(not(feature = "local-engine"))]
pub async fn run(_args: LiveArgs) -> Result<()> {
    anyhow::bail!("this build has no local engine; rebuild with the local-engine feature")
}

/// Pump captured chunks through the resampler into the engine channel,
/// flushing the buffered tail when capture ends.
#[cfg(feature = "local-engine")]
fn bridge_loop(
    raw: std::sync::mpsc::Receiver<Vec<f32>>,
    mut resampler: murmur_core::resample::StreamResampler,
    tx: tokio::sync::mpsc::Sender<Vec<f32>>,
) {
    for chunk in raw {
        match resampler.push(&chunk) {
            Ok(block) if block.is_empty() => {}
            Ok(block) => {
                if tx.blocking_send(block).is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::error!("resampling failed: {e}");
                return;
            }
        }
    }
    if let Ok(tail) = resampler.finish()
        && !tail.is_empty()
    {
        let _ = tx.blocking_send(tail);
    }
}

/// Last `max_chars` characters of `text`, for a single-line readout.
#[cfg(feature = "local-engine")]
fn tail_fit(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    text.char_indices()
        .nth(count - max_chars)
        .map(|(idx, _)| &text[idx..])
        .unwrap_or("")
}

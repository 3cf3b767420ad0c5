//! List and install recognition model packs.

use anyhow::Result;
use console::{Term, style};
use murmur_core::Settings;
use murmur_core::engine::pack::{self, PackInfo};
use murmur_core::engine::{Availability, InstallProgress, install_pack};

use crate::args::PacksCommand;

pub async fn run(command: Option<PacksCommand>) -> Result<()> {
    match command.unwrap_or(PacksCommand::List) {
        PacksCommand::List => list(),
        PacksCommand::Install { name } => {
            let Some(pack) = pack::find(&name) else {
                eprintln!("Unknown pack '{name}'. Known packs:");
                for known in pack::PACKS {
                    eprintln!("  {}", known.name);
                }
                anyhow::bail!("unknown pack '{name}'");
            };
            install(pack).await?;
            Ok(())
        }
    }
}

fn list() -> Result<()> {
    let settings = Settings::load()?;

    println!("Model packs:");
    for pack in pack::PACKS {
        let marker = if pack.name == settings.pack { "*" } else { " " };
        let status = match pack::availability(pack.name) {
            Availability::Available => style("installed").green().to_string(),
            Availability::Downloadable => style("not installed").dim().to_string(),
            Availability::Unavailable => style("unavailable").red().to_string(),
        };
        println!(
            "{marker} {:<8} {:<32} {status}",
            pack.name, pack.description
        );
    }
    println!();
    println!("Install with: murmur packs install <name>");

    Ok(())
}

async fn install(pack: &'static PackInfo) -> Result<std::path::PathBuf> {
    println!("Downloading {} ({})...", pack.name, pack.description);
    let path = install_with_progress(pack).await?;
    println!("{} {}", style("Installed").green(), path.display());
    Ok(path)
}

/// Download a pack with a single-line progress readout, no framing
/// output. Shared with live mode's install-on-first-use path, which
/// prints its own messages around it.
pub async fn install_with_progress(
    pack: &'static PackInfo,
) -> murmur_core::Result<std::path::PathBuf> {
    let term = Term::stdout();
    let mut last_shown = u64::MAX;
    let path = install_pack(pack, |progress| {
        if let Some(line) = render_progress(progress, &mut last_shown) {
            term.clear_line().ok();
            term.write_str(&line).ok();
        }
    })
    .await?;

    term.clear_line().ok();
    Ok(path)
}

/// Progress line, or None when nothing visible changed since the last
/// call. `last_shown` carries the previously rendered percent or MB.
fn render_progress(progress: InstallProgress, last_shown: &mut u64) -> Option<String> {
    match progress.percent() {
        Some(percent) => {
            if u64::from(percent) == *last_shown {
                return None;
            }
            *last_shown = u64::from(percent);
            let total = progress.total.unwrap_or(0);
            Some(format!(
                "  {} / {} ({percent}%)",
                fmt_mb(progress.downloaded),
                fmt_mb(total)
            ))
        }
        None => {
            let mb = progress.downloaded / (1024 * 1024);
            if mb == *last_shown {
                return None;
            }
            *last_shown = mb;
            Some(format!("  {} downloaded", fmt_mb(progress.downloaded)))
        }
    }
}

fn fmt_mb(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_line_skips_repeat_percent() {
        let mut last = u64::MAX;
        let first = render_progress(
            InstallProgress {
                downloaded: 100,
                total: Some(1000),
            },
            &mut last,
        );
        assert!(first.unwrap().contains("10%"));

        let repeat = render_progress(
            InstallProgress {
                downloaded: 105,
                total: Some(1000),
            },
            &mut last,
        );
        assert!(repeat.is_none());
    }

    #[test]
    fn test_progress_line_without_total_steps_by_mb() {
        let mut last = u64::MAX;
        assert!(
            render_progress(
                InstallProgress {
                    downloaded: 512 * 1024,
                    total: None,
                },
                &mut last,
            )
            .is_some()
        );
        assert!(
            render_progress(
                InstallProgress {
                    downloaded: 700 * 1024,
                    total: None,
                },
                &mut last,
            )
            .is_none()
        );
        assert!(
            render_progress(
                InstallProgress {
                    downloaded: 2 * 1024 * 1024,
                    total: None,
                },
                &mut last,
            )
            .is_some()
        );
    }

    #[test]
    fn test_fmt_mb() {
        assert_eq!(fmt_mb(466 * 1024 * 1024), "466.0 MB");
    }
}

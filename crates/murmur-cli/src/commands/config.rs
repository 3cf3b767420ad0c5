//! Show or change persistent settings.

use anyhow::Result;
use console::style;
use murmur_core::Settings;
use murmur_core::client::validate_base_url;
use murmur_core::engine::pack;

use crate::args::ConfigArgs;

pub fn run(args: ConfigArgs) -> Result<()> {
    let mut settings = Settings::load()?;
    let mut changed = false;

    if let Some(url) = args.server_url {
        // Normalize here so a bad URL fails at config time, not at the
        // first recording.
        settings.server_url = validate_base_url(&url)?;
        changed = true;
    }
    if let Some(language) = args.language {
        settings.language = language;
        changed = true;
    }
    if let Some(name) = args.pack {
        if pack::find(&name).is_none() {
            let known: Vec<&str> = pack::PACKS.iter().map(|p| p.name).collect();
            anyhow::bail!("unknown pack '{name}', known packs: {}", known.join(", "));
        }
        settings.pack = name;
        changed = true;
    }
    if let Some(device) = args.device {
        settings.input_device = Some(device);
        changed = true;
    }
    if args.clear_device {
        settings.input_device = None;
        changed = true;
    }

    if changed {
        settings.save()?;
        println!(
            "{} {}",
            style("Saved").green(),
            Settings::path()?.display()
        );
        return Ok(());
    }

    println!("server-url  {}", settings.server_url);
    println!("language    {}", settings.language);
    println!("pack        {}", settings.pack);
    println!(
        "device      {}",
        settings
            .input_device
            .as_deref()
            .unwrap_or("(system default)")
    );
    println!();
    println!(
        "{}",
        style(format!("File: {}", Settings::path()?.display())).dim()
    );

    Ok(())
}

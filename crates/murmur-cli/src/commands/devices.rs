//! List audio input devices.

use anyhow::Result;
use console::style;
use murmur_core::{Settings, list_input_devices};

pub fn run() -> Result<()> {
    let settings = Settings::load()?;
    let devices = list_input_devices()?;

    println!("Input devices:");
    for device in devices {
        let pinned = settings.input_device.as_deref() == Some(device.name.as_str());
        let marker = if pinned { "*" } else { " " };
        let suffix = if device.is_default {
            style(" (system default)").dim().to_string()
        } else {
            String::new()
        };
        println!("{marker} {}{suffix}", device.name);
    }

    if settings.input_device.is_some() {
        println!();
        println!("{}", style("* pinned via `murmur config --device`").dim());
    }

    Ok(())
}

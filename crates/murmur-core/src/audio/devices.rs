//! Audio input device enumeration.

use crate::error::{DictationError, Result};
use cpal::traits::{DeviceTrait, HostTrait};

#[cfg(target_os = "linux")]
mod alsa_suppress {
    use std::os::raw::{c_char, c_int};
    use std::sync::Once;

    // ALSA's handler signature is variadic; ours ignores every argument,
    // so a non-variadic pointer type is compatible at the ABI level.
    type SndLibErrorHandlerT =
        unsafe extern "C" fn(*const c_char, c_int, *const c_char, c_int, *const c_char);

    #[link(name = "asound")]
    unsafe extern "C" {
        fn snd_lib_error_set_handler(handler: Option<SndLibErrorHandlerT>) -> c_int;
    }

    unsafe extern "C" fn silent_error_handler(
        _file: *const c_char,
        _line: c_int,
        _function: *const c_char,
        _err: c_int,
        _fmt: *const c_char,
    ) {
    }

    static INIT: Once = Once::new();

    /// Install a no-op ALSA error handler, silencing the PCM plugin
    /// chatter (pulse, jack, oss) printed during enumeration.
    pub fn init() {
        INIT.call_once(|| {
            // SAFETY: the handler is a valid function for the lifetime of
            // the process and ignores all of its arguments.
            unsafe {
                snd_lib_error_set_handler(Some(silent_error_handler));
            }
        });
    }
}

#[cfg(not(target_os = "linux"))]
mod alsa_suppress {
    pub fn init() {}
}

/// An input device as shown by `murmur devices`.
#[derive(Debug, Clone)]
pub struct InputDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

/// List all input devices, marking the system default.
pub fn list_input_devices() -> Result<Vec<InputDeviceInfo>> {
    alsa_suppress::init();

    let host = cpal::default_host();
    let default_name = host
        .default_input_device()
        .and_then(|d| d.description().ok())
        .map(|d| d.to_string());

    let mut devices = Vec::new();
    let available = host
        .input_devices()
        .map_err(|e| DictationError::DeviceUnavailable(format!("device enumeration: {e}")))?;
    for device in available {
        if let Ok(desc) = device.description() {
            let name = desc.to_string();
            devices.push(InputDeviceInfo {
                is_default: default_name.as_ref() == Some(&name),
                name,
            });
        }
    }

    if devices.is_empty() {
        return Err(DictationError::DeviceUnavailable(
            "no audio input devices found".to_string(),
        ));
    }

    Ok(devices)
}

/// Resolve a device by name, or the system default when `name` is None.
pub(crate) fn resolve_input_device(name: Option<&str>) -> Result<cpal::Device> {
    alsa_suppress::init();

    let host = cpal::default_host();
    match name {
        Some(wanted) => {
            let mut available = host.input_devices().map_err(|e| {
                DictationError::DeviceUnavailable(format!("device enumeration: {e}"))
            })?;
            available
                .find(|d| {
                    d.description()
                        .map(|desc| desc.to_string() == wanted)
                        .unwrap_or(false)
                })
                .ok_or_else(|| {
                    DictationError::DeviceUnavailable(format!("input device '{wanted}' not found"))
                })
        }
        None => host.default_input_device().ok_or_else(|| {
            DictationError::DeviceUnavailable("no default input device".to_string())
        }),
    }
}

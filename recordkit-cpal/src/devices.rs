//! Input device enumeration.

use cpal::traits::{DeviceTrait, HostTrait};

use recordkit_core::models::audio::InputDevice;
use recordkit_core::models::error::RecordError;

/// List the host's input devices. The device name doubles as the id, which
/// is what [`crate::CpalSourceBuilder`] resolves selectors against.
pub fn list_input_devices() -> Result<Vec<InputDevice>, RecordError> {
    let host = cpal::default_host();
    let default_name = host
        .default_input_device()
        .and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    let iter = host
        .input_devices()
        .map_err(|e| RecordError::Device(format!("failed to enumerate input devices: {e}")))?;
    for device in iter {
        let name = match device.name() {
            Ok(name) => name,
            Err(e) => {
                log::debug!("skipping input device with unreadable name: {e}");
                continue;
            }
        };
        devices.push(InputDevice {
            id: name.clone(),
            is_default: default_name.as_deref() == Some(name.as_str()),
            label: name,
        });
    }
    Ok(devices)
}

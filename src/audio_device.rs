// src/audio_device.rs

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

/// The named host, or the platform default when `name` is `None`.
pub fn get_host(name: Option<&str>) -> Result<Host> {
    let Some(name) = name else {
        return Ok(cpal::default_host());
    };
    let host_id = cpal::available_hosts()
        .into_iter()
        .find(|id| id.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| anyhow::anyhow!("Audio host not available: {}", name))?;
    cpal::host_from_id(host_id).map_err(|e| anyhow::anyhow!("Failed to get audio host: {}", e))
}

/// Output devices with a readable name. Devices whose name query fails are skipped.
pub fn get_output_devices(host: &Host) -> Result<Vec<(String, Device)>> {
    Ok(host
        .output_devices()?
        .filter_map(|device| device.name().ok().map(|name| (name, device)))
        .collect())
}

pub fn find_output_device(host: &Host, name: Option<&str>) -> Result<Device> {
    match name {
        Some(name) => host
            .output_devices()?
            .find(|d| d.name().ok().as_deref() == Some(name))
            .ok_or_else(|| anyhow::anyhow!("Output device not found: {}", name)),
        None => host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("No default output device")),
    }
}

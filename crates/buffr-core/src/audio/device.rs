//! Audio device enumeration
//!
//! Lists capture and playback devices from ALL available audio hosts (JACK,
//! ALSA, PulseAudio, etc.) so input and output can be picked independently.
//!
//! On Linux with JACK running, JACK typically shows only one "device" (the
//! JACK server itself) while ALSA shows individual hardware devices.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Host, HostId, SupportedStreamConfigRange};

use super::config::DeviceId;
use super::error::{AudioError, AudioResult};

/// Common sample rates reported for a device
const COMMON_SAMPLE_RATES: [u32; 6] = [44100, 48000, 88200, 96000, 176400, 192000];

/// Stream direction of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// Human-readable name for a host ID
fn host_name(host_id: HostId) -> String {
    let name = format!("{:?}", host_id);
    match name.as_str() {
        "Alsa" => "ALSA".to_string(),
        "Jack" => "JACK".to_string(),
        "Wasapi" => "WASAPI".to_string(),
        _ => name,
    }
}

fn get_host_by_name(name: &str) -> Option<Host> {
    cpal::available_hosts()
        .into_iter()
        .find(|id| host_name(*id) == name)
        .and_then(|id| cpal::host_from_id(id).ok())
}

fn host_devices(host: &Host, direction: Direction) -> AudioResult<Vec<cpal::Device>> {
    let devices: Vec<cpal::Device> = match direction {
        Direction::Input => host
            .input_devices()
            .map_err(|e| AudioError::ConfigError(e.to_string()))?
            .collect(),
        Direction::Output => host
            .output_devices()
            .map_err(|e| AudioError::ConfigError(e.to_string()))?
            .collect(),
    };
    Ok(devices)
}

fn default_device(host: &Host, direction: Direction) -> Option<cpal::Device> {
    match direction {
        Direction::Input => host.default_input_device(),
        Direction::Output => host.default_output_device(),
    }
}

/// Supported stream configurations of a device in one direction
pub(crate) fn supported_configs(
    device: &cpal::Device,
    direction: Direction,
) -> AudioResult<Vec<SupportedStreamConfigRange>> {
    let configs: Vec<SupportedStreamConfigRange> = match direction {
        Direction::Input => device
            .supported_input_configs()
            .map_err(|e| AudioError::ConfigError(e.to_string()))?
            .collect(),
        Direction::Output => device
            .supported_output_configs()
            .map_err(|e| AudioError::ConfigError(e.to_string()))?
            .collect(),
    };
    Ok(configs)
}

/// Information about an audio device
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// Device identifier for configuration (includes host info)
    pub id: DeviceId,
    /// Human-readable device name
    pub name: String,
    /// Host backend name (e.g., "ALSA", "JACK")
    pub host: String,
    pub direction: Direction,
    /// Whether this is the system default device for its host
    pub is_default: bool,
    /// Supported sample rates (common ones)
    pub sample_rates: Vec<u32>,
    pub max_channels: u16,
}

impl std::fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.host, self.name)?;
        if self.is_default {
            write!(f, " (default)")?;
        }
        Ok(())
    }
}

/// Get all devices for a direction from ALL hosts
///
/// Default devices come first, then devices are sorted by host and name.
pub fn get_devices(direction: Direction) -> AudioResult<Vec<AudioDevice>> {
    let mut all_devices: Vec<AudioDevice> = Vec::new();

    for host_id in cpal::available_hosts() {
        let host = match cpal::host_from_id(host_id) {
            Ok(h) => h,
            Err(e) => {
                log::debug!("Could not initialize host {:?}: {}", host_id, e);
                continue;
            }
        };
        let host_name_str = host_name(host_id);
        let default_name = default_device(&host, direction).and_then(|d| d.name().ok());

        let devices = match host_devices(&host, direction) {
            Ok(d) => d,
            Err(e) => {
                log::debug!("Could not enumerate {} devices for {:?}: {}", direction, host_id, e);
                continue;
            }
        };

        for device in devices {
            let Ok(name) = device.name() else {
                continue;
            };
            let configs = match supported_configs(&device, direction) {
                Ok(c) if !c.is_empty() => c,
                _ => continue,
            };

            let mut sample_rates: Vec<u32> = Vec::new();
            let mut max_channels: u16 = 0;
            for config in &configs {
                max_channels = max_channels.max(config.channels());
                for rate in COMMON_SAMPLE_RATES {
                    if rate >= config.min_sample_rate().0
                        && rate <= config.max_sample_rate().0
                        && !sample_rates.contains(&rate)
                    {
                        sample_rates.push(rate);
                    }
                }
            }
            sample_rates.sort();

            all_devices.push(AudioDevice {
                id: DeviceId::with_host(&name, &host_name_str),
                is_default: default_name.as_ref() == Some(&name),
                name,
                host: host_name_str.clone(),
                direction,
                sample_rates,
                max_channels,
            });
        }
    }

    if all_devices.is_empty() {
        return Err(AudioError::NoDevices);
    }

    all_devices.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then_with(|| a.host.cmp(&b.host))
            .then_with(|| a.name.cmp(&b.name))
    });

    log::info!(
        "Enumerated {} {} devices from {} hosts",
        all_devices.len(),
        direction,
        cpal::available_hosts().len()
    );

    Ok(all_devices)
}

pub fn get_input_devices() -> AudioResult<Vec<AudioDevice>> {
    get_devices(Direction::Input)
}

pub fn get_output_devices() -> AudioResult<Vec<AudioDevice>> {
    get_devices(Direction::Output)
}

/// Find a device by its ID
///
/// Uses the host named in the DeviceId if available, otherwise searches
/// all hosts.
pub fn find_device_by_id(id: &DeviceId, direction: Direction) -> AudioResult<cpal::Device> {
    let matches = |d: &cpal::Device| d.name().ok().as_ref() == Some(&id.name);

    if let Some(host) = id.host.as_deref().and_then(get_host_by_name) {
        return host_devices(&host, direction)?
            .into_iter()
            .find(matches)
            .ok_or_else(|| AudioError::DeviceNotFound(id.display_label()));
    }

    for host_id in cpal::available_hosts() {
        let Ok(host) = cpal::host_from_id(host_id) else {
            continue;
        };
        if let Ok(devices) = host_devices(&host, direction) {
            if let Some(device) = devices.into_iter().find(matches) {
                return Ok(device);
            }
        }
    }

    Err(AudioError::DeviceNotFound(id.display_label()))
}

/// Resolve a configured device, or the default host's default device
pub fn resolve_device(id: Option<&DeviceId>, direction: Direction) -> AudioResult<cpal::Device> {
    match id {
        Some(id) => find_device_by_id(id, direction),
        None => default_device(&cpal::default_host(), direction).ok_or_else(|| {
            AudioError::NoDefaultDevice(format!("No default {} device", direction))
        }),
    }
}

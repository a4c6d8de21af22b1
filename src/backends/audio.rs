// SPDX-License-Identifier: MPL-2.0

//! Microphone discovery and access checks

use crate::constants::timing;
use crate::errors::CameraError;
use gstreamer as gst;
use gstreamer::prelude::*;
use tracing::{debug, info, warn};

/// Represents an audio input device
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// Display name reported by the device monitor
    pub name: String,
    /// Backend node name usable as a `device=` property, if known
    pub node_name: String,
}

/// Enumerate available audio input devices via the GStreamer device monitor
pub fn enumerate_audio_devices() -> Vec<AudioDevice> {
    if let Err(e) = gst::init() {
        warn!(error = %e, "GStreamer init failed, no audio devices");
        return Vec::new();
    }

    let monitor = gst::DeviceMonitor::new();
    monitor.add_filter(Some("Audio/Source"), None);
    if let Err(e) = monitor.start() {
        warn!(error = %e, "Failed to start audio device monitor");
        return Vec::new();
    }

    let devices: Vec<AudioDevice> = monitor
        .devices()
        .into_iter()
        .map(|device| {
            let node_name = device
                .properties()
                .and_then(|props| {
                    props
                        .get::<String>("node.name")
                        .or_else(|_| props.get::<String>("device.name"))
                        .ok()
                })
                .unwrap_or_default();
            AudioDevice {
                name: device.display_name().to_string(),
                node_name,
            }
        })
        .collect();
    monitor.stop();

    debug!(count = devices.len(), "Audio devices enumerated");
    devices
}

/// Build the source element description for a microphone
fn source_description(device: Option<&str>) -> String {
    match device {
        Some(node) if !node.is_empty() => format!("pulsesrc device={}", node),
        _ => "autoaudiosrc".to_string(),
    }
}

/// Check that a microphone can actually be opened
///
/// Starts a throwaway `source ! fakesink` pipeline and waits for it to
/// reach PLAYING. Returns the device name to record from (empty for the
/// system default).
pub fn probe_microphone(device: Option<&str>) -> Result<String, CameraError> {
    gst::init()?;

    let description = format!("{} ! fakesink sync=false", source_description(device));
    debug!(pipeline = %description, "Probing microphone");

    let pipeline = gst::parse::launch(&description)
        .map_err(|e| CameraError::AccessDenied(format!("microphone unavailable: {}", e)))?;

    let result = pipeline.set_state(gst::State::Playing).and_then(|_| {
        pipeline
            .state(gst::ClockTime::from_seconds(timing::PROBE_TIMEOUT_SECS))
            .0
    });

    // Surface the element's own message when it refused to start
    let bus_error = pipeline.bus().and_then(|bus| {
        bus.pop_filtered(&[gst::MessageType::Error])
            .and_then(|msg| match msg.view() {
                gst::MessageView::Error(err) => Some(err.error().to_string()),
                _ => None,
            })
    });

    let _ = pipeline.set_state(gst::State::Null);

    match (result, bus_error) {
        (_, Some(message)) => {
            warn!(error = %message, "Microphone probe failed");
            Err(CameraError::AccessDenied(message))
        }
        (Err(e), None) => {
            warn!(error = %e, "Microphone did not start");
            Err(CameraError::AccessDenied(format!("microphone did not start: {}", e)))
        }
        (Ok(_), None) => {
            let name = device.unwrap_or_default().to_string();
            info!(device = %name, "Microphone available");
            Ok(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_microphone_uses_autoaudiosrc() {
        assert_eq!(source_description(None), "autoaudiosrc");
        assert_eq!(source_description(Some("")), "autoaudiosrc");
        assert_eq!(
            source_description(Some("alsa_input.usb")),
            "pulsesrc device=alsa_input.usb"
        );
    }
}

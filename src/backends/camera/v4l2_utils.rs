// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 camera discovery

use super::types::DeviceInfo;
use tracing::{debug, warn};
use v4l::capability::Flags;
use v4l::prelude::*;

/// Query driver and card name for one device node
///
/// Returns `None` when the node cannot be opened or is not a capture device
/// (metadata nodes, output-only devices).
pub fn query_device(path: &str) -> Option<DeviceInfo> {
    let device = match Device::with_path(path) {
        Ok(device) => device,
        Err(e) => {
            debug!(path, error = %e, "Cannot open V4L2 node");
            return None;
        }
    };

    let caps = match device.query_caps() {
        Ok(caps) => caps,
        Err(e) => {
            warn!(path, error = %e, "VIDIOC_QUERYCAP failed");
            return None;
        }
    };

    if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
        debug!(path, card = %caps.card, "Skipping non-capture node");
        return None;
    }

    Some(DeviceInfo {
        card: caps.card,
        driver: caps.driver,
        path: path.to_string(),
    })
}

/// List every V4L2 capture device on the system, ordered by node index
pub fn enumerate_cameras() -> Vec<DeviceInfo> {
    let mut nodes = v4l::context::enum_devices();
    nodes.sort_by_key(|node| node.index());

    let cameras: Vec<DeviceInfo> = nodes
        .iter()
        .filter_map(|node| query_device(&node.path().to_string_lossy()))
        .collect();

    debug!(count = cameras.len(), "V4L2 cameras enumerated");
    cameras
}

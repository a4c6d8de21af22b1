// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Countdown seconds used when the delay input is empty, zero, or not a number
pub const DEFAULT_COUNTDOWN_SECONDS: u32 = 3;

/// Session timing constants
pub mod timing {
    use super::Duration;

    /// One countdown step
    pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

    /// Pause after each capture before the next slot's countdown
    pub const INTER_SLOT_PAUSE: Duration = Duration::from_millis(400);

    /// How long a delivered blob stays registered before it is revoked
    pub const BLOB_REVOKE_DELAY: Duration = Duration::from_millis(1000);

    /// GStreamer state change timeout when probing a source
    pub const PROBE_TIMEOUT_SECS: u64 = 3;

    /// Upper bound on waiting for the recorder's EOS after stop
    pub const RECORDER_EOS_TIMEOUT_SECS: u64 = 5;
}

/// Names of the files handed to the download sink
pub mod downloads {
    /// Composited strip
    pub const STRIP_FILENAME: &str = "photobooth.png";

    /// MIME type of the composited strip
    pub const STRIP_MIME: &str = "image/png";

    /// Recorded clip file stem; the extension follows the negotiated format
    pub const RECORDING_STEM: &str = "photobooth_session";

    /// Default folder name under the user's download directory
    pub const DEFAULT_FOLDER: &str = "Photobooth";
}

/// Recording format negotiation
pub mod recording {
    /// MIME types in order of preference
    pub const FORMAT_PREFERENCE: &[&str] = &[
        "video/webm;codecs=vp9",
        "video/webm;codecs=vp8",
        "video/webm",
        "video/mp4",
    ];

    /// MIME type used when no preferred format is supported
    pub const FALLBACK_MIME: &str = "video/webm";

    /// File extension used when no preferred format is supported
    pub const FALLBACK_EXTENSION: &str = "webm";

    /// Framerate fed into the recorder
    pub const RECORDING_FRAMERATE: u32 = 30;
}

/// GStreamer pipeline constants
pub mod pipeline {
    /// Maximum buffer queue size for the preview appsink
    pub const MAX_BUFFERS: u32 = 2;

    /// Output pixel format for the preview appsink
    pub const OUTPUT_FORMAT: &str = "RGBA";
}

/// Supported file formats for image inputs
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

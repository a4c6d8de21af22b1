// SPDX-License-Identifier: MPL-2.0

//! Photobooth - timed four-frame photo strips with session recording
//!
//! A session counts down before each of the four slots of a strip template,
//! captures the live camera frame into the slot, and records a clip of the
//! whole session when the platform can encode one. The strip and the clip
//! are then exported as files.
//!
//! # Architecture
//!
//! - [`backends`]: Capture devices (GStreamer camera, still image) and microphones
//! - [`binder`]: Acquires a stream and binds the recorder to it
//! - [`session`]: Countdown and capture sequencing
//! - [`pipelines`]: Slot compositing and chunked recording
//! - [`template`]: Strip artwork and frame slots
//! - [`preview`]: Strip overlays and the thumbnail gallery
//! - [`export`]: Strip and clip export
//! - [`storage`]: Download delivery and temporary blobs
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let device = StillImageDevice::test_pattern(1280, 720);
//! let bound = binder::bind(&device, &MediaConstraints::default_strategies(None), None)?;
//! let controller = bound.into_controller(TemplateLayout::classic());
//! controller.start_session().await?;
//! ```

pub mod backends;
pub mod binder;
pub mod config;
pub mod constants;
pub mod errors;
pub mod export;
pub mod pipelines;
pub mod preview;
pub mod session;
pub mod storage;
pub mod template;

// Re-export commonly used types
pub use backends::camera::{CaptureDevice, MediaConstraints, MediaStream};
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use session::{SessionController, SessionEvent, SessionOutcome, SessionPhase};
pub use template::{FrameSlot, StripTemplate, TemplateLayout};

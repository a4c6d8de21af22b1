// SPDX-License-Identifier: MPL-2.0

//! Capture backends
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             Binder / Session                │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                  │
//! │  ┌─────────────┐    ┌──────────────────┐    │
//! │  │    Audio    │    │     Camera       │    │
//! │  │ (probe/list)│    │ (GStreamer/still)│    │
//! │  └─────────────┘    └──────────────────┘    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! - [`audio`]: Microphone enumeration and access checks
//! - [`camera`]: Capture devices, acquisition strategies and live streams

pub mod audio;
pub mod camera;

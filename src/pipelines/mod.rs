// SPDX-License-Identifier: MPL-2.0

//! Processing pipelines for slot captures and session recording
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Camera Frame │ ──▶ │  Photo Pipeline   │ ──▶ │  CaptureSet  │
//! │   (RGBA)     │     │  - Cover fit      │     │  (PNG/slot)  │
//! │              │     │  - Mirror         │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//!
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ MediaStream  │ ──▶ │  Video Pipeline   │ ──▶ │ Recording    │
//! │ (+ mic)      │     │  - GStreamer      │     │ Buffer       │
//! │              │     │  - WebM/MP4 mux   │     │ (chunks)     │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! - [`photo`]: Frame compositing and PNG encoding per slot
//! - [`video`]: Format negotiation and chunked recording

pub mod photo;
pub mod video;

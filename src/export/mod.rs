// SPDX-License-Identifier: GPL-3.0-only

//! Exporting the session: the composited strip and the recorded clip

pub mod recording;
pub mod strip;

pub use recording::RecordingExporter;
pub use strip::StripExporter;

use std::path::PathBuf;

/// A file handed to the download sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub mime: String,
    pub bytes: usize,
}

// SPDX-License-Identifier: MPL-2.0

//! Session recording
//!
//! A [`RecordingCapability`] answers which container formats can be encoded
//! and creates [`Recorder`]s bound to a live stream. Recorders emit muxed
//! chunks through a [`ChunkSink`]; the session keeps them in a
//! [`RecordingBuffer`] until the clip is exported.

pub mod encoder_selection;
pub mod recorder;

pub use recorder::{GstRecorder, GstRecordingCapability};

use crate::backends::camera::MediaStream;
use crate::constants::recording::{FALLBACK_EXTENSION, FORMAT_PREFERENCE};
use crate::errors::RecordingError;
use futures::channel::oneshot;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Whether a recorder is currently capturing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Inactive,
    Recording,
}

/// Resolves once the recorder has flushed its final chunk after `stop`
pub type StopAck = oneshot::Receiver<()>;

/// Receives every chunk a recorder emits, in order
pub type ChunkSink = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

/// A started/stopped media recorder bound to one stream
pub trait Recorder: Send {
    fn state(&self) -> RecorderState;

    /// MIME type the recorder produces
    fn mime_type(&self) -> &str;

    /// Begin recording; chunks start flowing into the sink
    fn start(&mut self) -> Result<(), RecordingError>;

    /// Request stop; the returned acknowledgement fires after the last chunk
    fn stop(&mut self) -> Result<StopAck, RecordingError>;
}

/// Platform recording support
pub trait RecordingCapability: Send + Sync {
    /// Whether `mime` (with optional `codecs=` parameter) can be produced
    fn is_type_supported(&self, mime: &str) -> bool;

    /// Create a recorder for `stream`; `None` lets the platform pick its default format
    fn create_recorder(
        &self,
        stream: &MediaStream,
        format: Option<&RecordingFormat>,
        sink: ChunkSink,
    ) -> Result<Box<dyn Recorder>, RecordingError>;
}

/// Negotiated container format and the file extension it is saved with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingFormat {
    pub mime: String,
    pub extension: String,
}

impl RecordingFormat {
    /// Format for a MIME type; the extension is `mp4` for MP4 types, `webm` otherwise
    pub fn for_mime(mime: &str) -> Self {
        let extension = if mime.contains("mp4") {
            "mp4"
        } else {
            FALLBACK_EXTENSION
        };
        Self {
            mime: mime.to_string(),
            extension: extension.to_string(),
        }
    }
}

/// Pick the most preferred supported format, if any
pub fn negotiate_format(capability: &dyn RecordingCapability) -> Option<RecordingFormat> {
    let chosen = FORMAT_PREFERENCE
        .iter()
        .find(|mime| capability.is_type_supported(mime))
        .map(|mime| RecordingFormat::for_mime(mime));

    match &chosen {
        Some(format) => info!(mime = %format.mime, ext = %format.extension, "Recording format"),
        None => info!("No preferred recording format supported, using platform default"),
    }
    chosen
}

/// Ordered chunks of one recording session
///
/// Cloning shares the same storage, so the sink handed to the recorder and
/// the session/exporter see the same chunks.
#[derive(Debug, Clone, Default)]
pub struct RecordingBuffer {
    chunks: Arc<Mutex<Vec<Arc<[u8]>>>>,
}

impl RecordingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk; empty chunks are ignored
    pub fn push(&self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        let mut chunks = self.lock();
        chunks.push(Arc::from(chunk.into_boxed_slice()));
        debug!(chunks = chunks.len(), "Recording chunk buffered");
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.lock().iter().map(|c| c.len()).sum()
    }

    /// Copy of the current chunk list
    pub fn snapshot(&self) -> Vec<Arc<[u8]>> {
        self.lock().clone()
    }

    /// Sink that appends to this buffer
    pub fn sink(&self) -> ChunkSink {
        let buffer = self.clone();
        Arc::new(move |chunk| buffer.push(chunk))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<[u8]>>> {
        self.chunks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

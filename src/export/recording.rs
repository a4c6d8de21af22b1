// SPDX-License-Identifier: GPL-3.0-only

//! Recorded clip export

use super::ExportedFile;
use crate::constants::{downloads, recording, timing};
use crate::errors::{AppError, AppResult, ExportError};
use crate::pipelines::video::{RecordingBuffer, RecordingFormat};
use crate::storage::{BlobRegistry, DownloadSink};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Packages buffered chunks into `photobooth_session.<ext>`
#[derive(Clone)]
pub struct RecordingExporter {
    sink: Arc<dyn DownloadSink>,
    blobs: BlobRegistry,
    revoke_delay: Duration,
}

impl RecordingExporter {
    pub fn new(sink: Arc<dyn DownloadSink>, blobs: BlobRegistry) -> Self {
        Self {
            sink,
            blobs,
            revoke_delay: timing::BLOB_REVOKE_DELAY,
        }
    }

    /// Registry holding the packaged clip until it is revoked
    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    /// Concatenate the chunks and deliver them as one file
    ///
    /// Without a negotiated format the clip is labelled `video/webm`.
    pub async fn export(
        &self,
        buffer: &RecordingBuffer,
        format: Option<&RecordingFormat>,
    ) -> AppResult<ExportedFile> {
        let chunks = buffer.snapshot();
        if chunks.is_empty() {
            return Err(ExportError::NothingRecorded.into());
        }

        let (mime, extension) = match format {
            Some(format) => (format.mime.clone(), format.extension.clone()),
            None => (
                recording::FALLBACK_MIME.to_string(),
                recording::FALLBACK_EXTENSION.to_string(),
            ),
        };

        let data: Vec<u8> = chunks.iter().flat_map(|chunk| chunk.iter().copied()).collect();
        let bytes = data.len();
        let blob_id = self.blobs.register(mime.clone(), data);
        let blob = self
            .blobs
            .get(blob_id)
            .ok_or_else(|| AppError::Other(format!("{} vanished before delivery", blob_id)))?;

        let filename = format!("{}.{}", downloads::RECORDING_STEM, extension);
        let sink = Arc::clone(&self.sink);
        let delivered = tokio::task::spawn_blocking(move || {
            sink.deliver(&filename, &blob.mime, &blob.data)
        })
        .await
        .map_err(|e| AppError::Other(format!("Delivery task failed: {}", e)));

        // Released shortly after delivery whether or not it succeeded
        self.blobs.revoke_after(blob_id, self.revoke_delay);

        let path = delivered??;
        info!(
            path = %path.display(),
            mime = %mime,
            chunks = chunks.len(),
            bytes,
            "Recording exported"
        );
        Ok(ExportedFile { path, mime, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<(String, String, Vec<u8>)>>);

    impl DownloadSink for Collect {
        fn deliver(
            &self,
            filename: &str,
            mime: &str,
            bytes: &[u8],
        ) -> Result<PathBuf, ExportError> {
            self.0
                .lock()
                .unwrap()
                .push((filename.to_string(), mime.to_string(), bytes.to_vec()));
            Ok(PathBuf::from(filename))
        }
    }

    #[tokio::test]
    async fn empty_buffer_is_refused() {
        let exporter = RecordingExporter::new(Arc::new(Collect::default()), BlobRegistry::new());
        let err = exporter
            .export(&RecordingBuffer::new(), None)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "No recorded video yet. Press START to record a session."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn chunks_are_concatenated_and_blob_revoked() {
        let sink = Arc::new(Collect::default());
        let blobs = BlobRegistry::new();
        let exporter = RecordingExporter::new(sink.clone(), blobs.clone());

        let buffer = RecordingBuffer::new();
        buffer.push(vec![1, 2]);
        buffer.push(vec![3]);

        let format = RecordingFormat::for_mime("video/mp4");
        let file = exporter.export(&buffer, Some(&format)).await.unwrap();
        assert_eq!(file.path, PathBuf::from("photobooth_session.mp4"));
        assert_eq!(file.bytes, 3);

        let delivered = sink.0.lock().unwrap().clone();
        assert_eq!(
            delivered,
            vec![(
                "photobooth_session.mp4".to_string(),
                "video/mp4".to_string(),
                vec![1, 2, 3]
            )]
        );

        assert_eq!(blobs.live_count(), 1);
        tokio::time::sleep(Duration::from_millis(1001)).await;
        assert_eq!(blobs.live_count(), 0);
    }

    #[tokio::test]
    async fn default_format_is_webm() {
        let sink = Arc::new(Collect::default());
        let exporter = RecordingExporter::new(sink.clone(), BlobRegistry::new());
        let buffer = RecordingBuffer::new();
        buffer.push(vec![9]);

        let file = exporter.export(&buffer, None).await.unwrap();
        assert_eq!(file.mime, "video/webm");
        assert_eq!(file.path, PathBuf::from("photobooth_session.webm"));
    }
}

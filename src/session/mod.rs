// SPDX-License-Identifier: GPL-3.0-only

//! Capture session sequencing
//!
//! ```text
//! Idle ─start─▶ Armed ─▶ CountingDown(0) ─▶ Capturing(0) ─▶ … ─▶ Capturing(3)
//!   ▲                                                              │
//!   └──────────────────────── Finalizing ◀─────────────────────────┘
//! ```
//!
//! One session runs at a time. Finalization stops the recorder and releases
//! the session flag exactly once per session, also when a step fails.

pub mod state;

pub use state::{
    SessionEvent, SessionPhase, SessionState, SessionTiming, parse_countdown_delay,
};

use crate::backends::camera::MediaStream;
use crate::constants::DEFAULT_COUNTDOWN_SECONDS;
use crate::errors::{AppResult, CameraError, PhotoError};
use crate::pipelines::photo::capture_slot;
use crate::pipelines::video::{Recorder, RecorderState};
use crate::preview::PreviewBoard;
use crate::template::TemplateLayout;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Shared recorder handle
pub type SharedRecorder = Arc<Mutex<Box<dyn Recorder>>>;

/// Summary of a completed session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub session_id: Uuid,
    /// Slots captured
    pub frames: usize,
    /// Whether the recorder ran during the session
    pub recorded: bool,
    /// Chunks buffered when the session ended
    pub chunks: usize,
    /// Session duration on the tokio clock
    pub elapsed: Duration,
}

/// Result of asking for a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed(SessionReport),
    /// Another session was already running; nothing happened
    Rejected,
}

/// Progress of the running session, read by finalization
#[derive(Debug, Default)]
struct Progress {
    frames: usize,
    recorder_started: bool,
}

/// Runs capture sessions against one stream
pub struct SessionController {
    stream: MediaStream,
    recorder: Option<SharedRecorder>,
    layout: TemplateLayout,
    timing: SessionTiming,
    state: Arc<SessionState>,
    board: Option<Arc<Mutex<PreviewBoard>>>,
    countdown_seconds: AtomicU32,
    mirror: AtomicBool,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    pub fn new(
        stream: MediaStream,
        recorder: Option<SharedRecorder>,
        layout: TemplateLayout,
        state: Arc<SessionState>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            stream,
            recorder,
            layout,
            timing: SessionTiming::default(),
            state,
            board: None,
            countdown_seconds: AtomicU32::new(DEFAULT_COUNTDOWN_SECONDS),
            mirror: AtomicBool::new(false),
            events,
        }
    }

    pub fn with_timing(mut self, timing: SessionTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Preview board whose overlays show captures as they are taken
    pub fn with_board(mut self, board: Arc<Mutex<PreviewBoard>>) -> Self {
        self.board = Some(board);
        self
    }

    pub fn stream(&self) -> &MediaStream {
        &self.stream
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub fn layout(&self) -> &TemplateLayout {
        &self.layout
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Set the countdown from the delay control's raw value
    pub fn set_countdown_input(&self, input: &str) {
        self.set_countdown_seconds(parse_countdown_delay(input));
    }

    pub fn set_countdown_seconds(&self, seconds: u32) {
        self.countdown_seconds.store(seconds, Ordering::SeqCst);
    }

    pub fn countdown_seconds(&self) -> u32 {
        self.countdown_seconds.load(Ordering::SeqCst)
    }

    /// Mirror preview and captures; read at every capture
    pub fn set_mirror(&self, mirror: bool) {
        self.mirror.store(mirror, Ordering::SeqCst);
    }

    pub fn mirror(&self) -> bool {
        self.mirror.load(Ordering::SeqCst)
    }

    /// Run one full session
    ///
    /// Returns [`SessionOutcome::Rejected`] without side effects when a
    /// session is already running. Errors from the capture loop are returned
    /// after finalization has run.
    pub async fn start_session(&self) -> AppResult<SessionOutcome> {
        if !self.state.try_begin() {
            debug!("Session already running, start ignored");
            return Ok(SessionOutcome::Rejected);
        }
        let guard = SessionGuard {
            state: &self.state,
            armed: true,
        };

        let session_id = Uuid::new_v4();
        let started = Instant::now();
        info!(%session_id, countdown = self.countdown_seconds(), "Session started");

        self.state.reset();
        self.set_phase(SessionPhase::Armed);

        let mut progress = Progress::default();
        let result = self.run(&mut progress).await;
        self.finalize(session_id).await;
        guard.disarm();

        let elapsed = started.elapsed();
        match result {
            Ok(()) => {
                let report = SessionReport {
                    session_id,
                    frames: progress.frames,
                    recorded: progress.recorder_started,
                    chunks: self.state.recording.len(),
                    elapsed,
                };
                info!(
                    %session_id,
                    frames = report.frames,
                    chunks = report.chunks,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Session completed"
                );
                Ok(SessionOutcome::Completed(report))
            }
            Err(e) => {
                warn!(%session_id, frames = progress.frames, error = %e, "Session interrupted");
                Err(e)
            }
        }
    }

    async fn run(&self, progress: &mut Progress) -> AppResult<()> {
        self.wait_for_video().await?;
        progress.recorder_started = self.start_recorder().await;

        let countdown = self.countdown_seconds();
        for (index, slot) in self.layout.slots().iter().copied().enumerate() {
            self.set_phase(SessionPhase::CountingDown(index));
            self.run_countdown(countdown).await;

            self.set_phase(SessionPhase::Capturing(index));
            let frame = self
                .stream
                .latest_frame()
                .filter(|frame| frame.has_dimensions())
                .ok_or(PhotoError::NoFrameAvailable)?;
            let captured = capture_slot(frame, index, slot, self.mirror()).await?;

            self.state.captures.store(captured.clone());
            if let Some(board) = &self.board {
                lock(board).show_capture(captured.clone());
            }
            progress.frames += 1;
            self.emit(SessionEvent::FrameCaptured {
                index,
                width: captured.width,
                height: captured.height,
            });

            tokio::time::sleep(self.timing.inter_slot_pause).await;
        }
        Ok(())
    }

    async fn wait_for_video(&self) -> AppResult<()> {
        let (width, height) = match self.timing.metadata_timeout {
            None => self.stream.wait_for_metadata().await?,
            Some(limit) => tokio::time::timeout(limit, self.stream.wait_for_metadata())
                .await
                .map_err(|_| CameraError::MetadataTimeout)??,
        };
        debug!(width, height, "Video ready");
        Ok(())
    }

    /// Start the recorder if it is idle; failures are logged only
    ///
    /// Starting may block on the pipeline, so it runs on the blocking pool.
    async fn start_recorder(&self) -> bool {
        let Some(recorder) = &self.recorder else {
            return false;
        };
        let recorder = Arc::clone(recorder);
        let started = tokio::task::spawn_blocking(move || {
            let mut recorder = lock(&recorder);
            if recorder.state() != RecorderState::Inactive {
                return Ok(false);
            }
            recorder.start().map(|()| true)
        })
        .await;

        match started {
            Ok(Ok(true)) => {
                self.emit(SessionEvent::RecorderStarted);
                true
            }
            Ok(Ok(false)) => false,
            Ok(Err(e)) => {
                warn!(error = %e, "Recorder start failed");
                false
            }
            Err(e) => {
                warn!(error = %e, "Recorder start task failed");
                false
            }
        }
    }

    /// Show N, N-1, ..., 1 one tick apart, then clear
    async fn run_countdown(&self, seconds: u32) {
        if seconds == 0 {
            return;
        }
        self.emit(SessionEvent::Countdown(Some(seconds)));
        for remaining in (0..seconds).rev() {
            tokio::time::sleep(self.timing.tick).await;
            self.emit(SessionEvent::Countdown((remaining > 0).then_some(remaining)));
        }
    }

    async fn finalize(&self, session_id: Uuid) {
        self.set_phase(SessionPhase::Finalizing);

        if let Some(recorder) = &self.recorder {
            let stop = {
                let mut recorder = lock(recorder);
                (recorder.state() == RecorderState::Recording).then(|| recorder.stop())
            };
            match stop {
                Some(Ok(ack)) => {
                    if ack.await.is_err() {
                        warn!("Recorder dropped its stop acknowledgement");
                    }
                    self.emit(SessionEvent::RecorderStopped);
                }
                Some(Err(e)) => warn!(error = %e, "Recorder stop failed"),
                None => {}
            }
        }

        self.emit(SessionEvent::Countdown(None));
        self.state.end();
        self.set_phase(SessionPhase::Idle);
        self.emit(SessionEvent::Finalized { session_id });
        debug!(%session_id, "Session finalized");
    }

    fn set_phase(&self, phase: SessionPhase) {
        debug!(?phase, "Session phase");
        self.emit(SessionEvent::PhaseChanged(phase));
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Releases the session flag if a session future is dropped before finalizing
struct SessionGuard<'a> {
    state: &'a SessionState,
    armed: bool,
}

impl SessionGuard<'_> {
    /// Finalization already released the flag
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("Session dropped before finalizing");
            self.state.end();
        }
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

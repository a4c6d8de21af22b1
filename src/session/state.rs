// SPDX-License-Identifier: GPL-3.0-only

//! Session phases, settings and shared state

use crate::constants::{DEFAULT_COUNTDOWN_SECONDS, timing};
use crate::pipelines::photo::CaptureSet;
use crate::pipelines::video::{RecordingBuffer, RecordingFormat};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// Where a session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    /// Buffers reset, waiting for video metadata and the recorder
    Armed,
    /// Counting down before capturing slot `i`
    CountingDown(usize),
    /// Capturing slot `i`
    Capturing(usize),
    /// Stopping the recorder and releasing the session
    Finalizing,
}

/// Broadcast to front ends as a session progresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PhaseChanged(SessionPhase),
    /// Visible countdown value; `None` clears it
    Countdown(Option<u32>),
    FrameCaptured {
        index: usize,
        width: u32,
        height: u32,
    },
    RecorderStarted,
    RecorderStopped,
    Finalized {
        session_id: Uuid,
    },
}

/// Waits between session steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// One countdown step
    pub tick: Duration,
    /// Pause after each capture
    pub inter_slot_pause: Duration,
    /// Give up waiting for video dimensions after this long; `None` waits forever
    pub metadata_timeout: Option<Duration>,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            tick: timing::COUNTDOWN_TICK,
            inter_slot_pause: timing::INTER_SLOT_PAUSE,
            metadata_timeout: None,
        }
    }
}

/// Parse the countdown delay control's value
///
/// Reads an optional sign and leading digits after any whitespace and
/// ignores the rest (`"5s"` is 5). Empty, unparseable and zero inputs give
/// the default; negative values mean no countdown.
pub fn parse_countdown_delay(input: &str) -> u32 {
    let trimmed = input.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits: &str = &digits[..digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len())];
    if digits.is_empty() {
        return DEFAULT_COUNTDOWN_SECONDS;
    }

    let value = digits.bytes().fold(0u32, |acc, d| {
        acc.saturating_mul(10).saturating_add((d - b'0') as u32)
    });

    match (negative, value) {
        (_, 0) => DEFAULT_COUNTDOWN_SECONDS,
        (true, _) => 0,
        (false, value) => value,
    }
}

/// State shared by one controller's sessions and the exporters
///
/// The capture set and recording buffer are reset at the start of every
/// session; the flag keeps sessions from overlapping.
#[derive(Debug, Default)]
pub struct SessionState {
    pub captures: CaptureSet,
    pub recording: RecordingBuffer,
    /// Negotiated recording format, `None` when the platform default is used
    pub format: Option<RecordingFormat>,
    capturing: AtomicBool,
}

impl SessionState {
    pub fn new(format: Option<RecordingFormat>) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Whether a session is running
    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    /// Claim the session flag; false if a session already holds it
    pub(crate) fn try_begin(&self) -> bool {
        self.capturing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn end(&self) {
        self.capturing.store(false, Ordering::SeqCst);
    }

    pub(crate) fn reset(&self) {
        self.captures.clear();
        self.recording.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_parsing_follows_integer_prefix_rules() {
        assert_eq!(parse_countdown_delay("5"), 5);
        assert_eq!(parse_countdown_delay("  10"), 10);
        assert_eq!(parse_countdown_delay("7 seconds"), 7);
        assert_eq!(parse_countdown_delay("+4"), 4);
        assert_eq!(parse_countdown_delay(""), 3);
        assert_eq!(parse_countdown_delay("abc"), 3);
        assert_eq!(parse_countdown_delay("0"), 3);
        assert_eq!(parse_countdown_delay("-2"), 0);
        assert_eq!(parse_countdown_delay("-"), 3);
    }

    #[test]
    fn flag_is_exclusive() {
        let state = SessionState::default();
        assert!(state.try_begin());
        assert!(!state.try_begin());
        state.end();
        assert!(state.try_begin());
    }
}

//! Buffer-fill evaluation and playability.
//!
//! Each active stream reports a [`StreamCapacity`] snapshot once per tick of
//! the playback-control loop. The [`LoadController`] folds those snapshots
//! into a [`LoadingState`] that tells playback control when presentation may
//! start or resume, throttled so that tight decode loops do not churn state.

use std::time::{Duration, Instant};

use crate::options::PlayerOptions;

/// Minimum wall-clock interval between non-forced evaluations.
///
/// Measured with a monotonic clock; wall-clock adjustments never shrink or
/// stretch the window.
pub const LOADING_THROTTLE: Duration = Duration::from_millis(100);

/// Kind of media carried by a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
    Subtitle,
}

/// Instantaneous queue-depth report for one decoded stream.
///
/// Produced by the decode/queue layer, read-only to the controller.
/// `frame_count` never exceeds `frame_max_count`.
#[derive(Debug, Clone, Copy)]
pub struct StreamCapacity {
    /// Nominal frames per second of the stream.
    pub fps: usize,
    /// Compressed packets queued ahead of the decoder.
    pub packet_count: usize,
    /// Decoded frames queued ahead of presentation.
    pub frame_count: usize,
    /// Capacity of the decoded-frame queue.
    pub frame_max_count: usize,
    /// True once the demuxer has delivered the last packet.
    pub is_end_of_stream: bool,
    /// Media kind of this stream.
    pub kind: MediaKind,
}

/// Result of one buffering evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadingState {
    /// Seconds of media buffered ahead, minimum across streams.
    pub loaded_time: f64,
    /// `loaded_time` as a percentage of the preferred forward buffer.
    pub progress: f64,
    /// Minimum queued packet count across streams.
    pub packet_count: usize,
    /// Minimum queued frame count across streams.
    pub frame_count: usize,
    /// True only when every stream reached end of stream.
    pub is_end_of_stream: bool,
    /// True when every stream can be presented without an immediate stall.
    pub is_playable: bool,
    /// Evaluation ran for the first load of this source.
    pub is_first: bool,
    /// Evaluation ran right after a seek.
    pub is_seek: bool,
}

/// Load state reported upward by the playback-control layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaLoadState {
    Idle,
    Loading,
    Playable,
}

/// Playback state reported upward by the playback-control layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaPlaybackState {
    Idle,
    Playing,
    Paused,
    Seeking,
    Finished,
    Stopped,
}

/// Throttled playability evaluator.
///
/// Owned by the playback-control loop; not shared across threads. The
/// evaluation itself never blocks; when suppressed it returns `None`
/// immediately.
pub struct LoadController {
    options: PlayerOptions,
    throttle: Instant,
}

impl LoadController {
    pub fn new(options: PlayerOptions) -> Self {
        Self {
            options,
            throttle: Instant::now(),
        }
    }

    /// Replaces the configuration. Derived thresholds are recomputed on the
    /// next evaluation; the throttle window itself is fixed.
    pub fn apply_options(&mut self, options: PlayerOptions) {
        self.options = options;
    }

    pub fn options(&self) -> &PlayerOptions {
        &self.options
    }

    /// Evaluates playability across all active streams.
    ///
    /// Returns `None` when suppressed by the throttle window. `is_first` and
    /// `is_seek` always bypass suppression. Every non-suppressed evaluation
    /// resets the throttle timestamp.
    ///
    /// Callers must pass at least one capacity; with zero active streams the
    /// aggregate minima are meaningless.
    pub fn evaluate(
        &mut self,
        capacities: &[StreamCapacity],
        is_first: bool,
        is_seek: bool,
    ) -> Option<LoadingState> {
        debug_assert!(!capacities.is_empty(), "evaluate requires >= 1 stream");
        if !(is_first || is_seek || self.throttle.elapsed() > LOADING_THROTTLE) {
            return None;
        }

        let packet_count = capacities.iter().map(|c| c.packet_count).min().unwrap_or(0);
        let frame_count = capacities.iter().map(|c| c.frame_count).min().unwrap_or(0);
        let is_end_of_stream = capacities.iter().all(|c| c.is_end_of_stream);
        let loaded_time = capacities
            .iter()
            .map(|c| (c.packet_count + c.frame_count) as f64 / c.fps.max(1) as f64)
            .fold(f64::INFINITY, f64::min);
        let progress = loaded_time * 100.0 / self.options.preferred_forward_buffer_duration;
        let is_playable = capacities
            .iter()
            .all(|c| self.stream_playable(c, is_first, is_seek));

        self.throttle = Instant::now();
        let state = LoadingState {
            loaded_time,
            progress,
            packet_count,
            frame_count,
            is_end_of_stream,
            is_playable,
            is_first,
            is_seek,
        };
        tracing::trace!(?state, "buffering evaluation");
        Some(state)
    }

    /// Per-stream playability rule.
    ///
    /// The half-capacity, per-seek packet, and steady-state thresholds are
    /// empirically tuned and load-bearing; do not adjust them.
    fn stream_playable(&self, capacity: &StreamCapacity, is_first: bool, is_seek: bool) -> bool {
        if is_first || is_seek {
            if capacity.frame_count >= capacity.frame_max_count >> 1 {
                // Audio opens faster than video; fast-start extends the same
                // shortcut to video streams.
                if capacity.kind == MediaKind::Audio || self.options.is_second_open {
                    if is_first {
                        return true;
                    }
                    if is_seek && capacity.packet_count >= capacity.fps {
                        return true;
                    }
                }
            } else {
                // A short stream can drain entirely below half capacity.
                return capacity.is_end_of_stream && capacity.packet_count == 0;
            }
        }
        if capacity.is_end_of_stream {
            return true;
        }
        capacity.packet_count + capacity.frame_count
            >= capacity.fps * self.options.preferred_forward_buffer_duration as usize
    }
}

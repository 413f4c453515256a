//! Bitrate ladder adaptation.
//!
//! The adapter consumes the same playability signal the buffering controller
//! produces and proposes at most one ladder step per call. It performs no
//! network I/O; the playback loop owns the [`VideoAdaptationState`] and acts
//! on proposals by requesting a stream switch upstream.

use std::time::Instant;

/// One entry in the bitrate history: the rate in effect since `time`.
#[derive(Debug, Clone, Copy)]
pub struct BitRateState {
    pub bit_rate: i64,
    pub time: Instant,
}

/// Adaptation session state, owned by the playback loop for the lifetime of
/// one source. Mutated after each buffering evaluation.
#[derive(Debug, Clone)]
pub struct VideoAdaptationState {
    /// Candidate bitrates, ascending.
    pub bit_rates: Vec<i64>,
    /// Total media duration in seconds.
    pub duration: f64,
    /// Nominal frames per second of the active video stream.
    pub fps: usize,
    /// Time-ascending history of applied bitrates.
    pub bit_rate_states: Vec<BitRateState>,
    /// Current playback position in seconds.
    pub current_playback_time: f64,
    /// Playability from the most recent buffering evaluation.
    pub is_playable: bool,
    /// Decoded frames currently buffered for the video stream.
    pub loaded_count: usize,
}

impl VideoAdaptationState {
    pub fn new(bit_rates: Vec<i64>, duration: f64, fps: usize) -> Self {
        Self {
            bit_rates,
            duration,
            fps,
            bit_rate_states: Vec::new(),
            current_playback_time: 0.0,
            is_playable: false,
            loaded_count: 0,
        }
    }

    /// Records that `bit_rate` took effect now.
    pub fn push_bit_rate(&mut self, bit_rate: i64) {
        self.bit_rate_states.push(BitRateState {
            bit_rate,
            time: Instant::now(),
        });
    }
}

/// Proposes a `(from, to)` bitrate transition, one ladder step at a time.
///
/// Abstains (`None`) when:
/// - the newest history entry is younger than `max_buffer_duration / 2`
///   (cool-down against oscillation), or its rate is not on the ladder;
/// - the buffering trend disagrees with playability (ambiguous signal);
/// - the current rate is already at the relevant end of the ladder.
pub fn propose_transition(
    state: &VideoAdaptationState,
    max_buffer_duration: f64,
) -> Option<(i64, i64)> {
    let last = state.bit_rate_states.last()?;
    if last.time.elapsed().as_secs_f64() <= max_buffer_duration / 2.0 {
        return None;
    }
    let index = state.bit_rates.iter().position(|&r| r == last.bit_rate)?;

    let is_up = state.loaded_count > (state.fps * max_buffer_duration as usize) / 2;
    if is_up != state.is_playable {
        return None;
    }
    if is_up {
        if index + 1 < state.bit_rates.len() {
            tracing::debug!(from = last.bit_rate, to = state.bit_rates[index + 1], "bitrate up");
            return Some((last.bit_rate, state.bit_rates[index + 1]));
        }
    } else if index > 0 {
        tracing::debug!(from = last.bit_rate, to = state.bit_rates[index - 1], "bitrate down");
        return Some((last.bit_rate, state.bit_rates[index - 1]));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const MAX_BUFFER: f64 = 30.0;

    fn aged_state(bit_rate: i64, age_secs: u64) -> VideoAdaptationState {
        let mut state = VideoAdaptationState::new(vec![500, 1000, 2000], 600.0, 30);
        state.bit_rate_states.push(BitRateState {
            bit_rate,
            time: Instant::now() - Duration::from_secs(age_secs),
        });
        state
    }

    #[test]
    fn test_cooldown_suppresses_fresh_history() {
        let mut state = aged_state(1000, 1);
        state.loaded_count = 1000;
        state.is_playable = true;
        assert_eq!(propose_transition(&state, MAX_BUFFER), None);
    }

    #[test]
    fn test_up_one_step() {
        let mut state = aged_state(1000, 20);
        // loaded_count > (30 * 30) / 2 = 450 -> trending up.
        state.loaded_count = 451;
        state.is_playable = true;
        assert_eq!(propose_transition(&state, MAX_BUFFER), Some((1000, 2000)));
    }

    #[test]
    fn test_down_one_step() {
        let mut state = aged_state(1000, 20);
        state.loaded_count = 10;
        state.is_playable = false;
        assert_eq!(propose_transition(&state, MAX_BUFFER), Some((1000, 500)));
    }

    #[test]
    fn test_abstains_at_ladder_top_and_bottom() {
        let mut state = aged_state(2000, 20);
        state.loaded_count = 1000;
        state.is_playable = true;
        assert_eq!(propose_transition(&state, MAX_BUFFER), None);

        let mut state = aged_state(500, 20);
        state.loaded_count = 0;
        state.is_playable = false;
        assert_eq!(propose_transition(&state, MAX_BUFFER), None);
    }

    #[test]
    fn test_abstains_on_ambiguous_trend() {
        // Buffer trending up while unplayable (or vice versa) is ambiguous.
        let mut state = aged_state(1000, 20);
        state.loaded_count = 1000;
        state.is_playable = false;
        assert_eq!(propose_transition(&state, MAX_BUFFER), None);

        state.loaded_count = 0;
        state.is_playable = true;
        assert_eq!(propose_transition(&state, MAX_BUFFER), None);
    }

    #[test]
    fn test_abstains_when_rate_off_ladder() {
        let mut state = aged_state(1234, 20);
        state.loaded_count = 1000;
        state.is_playable = true;
        assert_eq!(propose_transition(&state, MAX_BUFFER), None);
    }

    #[test]
    fn test_empty_history_abstains() {
        let state = VideoAdaptationState::new(vec![500, 1000], 600.0, 30);
        assert_eq!(propose_transition(&state, MAX_BUFFER), None);
    }

    #[test]
    fn test_proposal_stays_on_ladder() {
        for &rate in &[500i64, 1000, 2000] {
            let mut state = aged_state(rate, 20);
            state.loaded_count = 1000;
            state.is_playable = true;
            if let Some((from, to)) = propose_transition(&state, MAX_BUFFER) {
                assert_eq!(from, rate);
                assert!(state.bit_rates.contains(&to));
                let from_idx = state.bit_rates.iter().position(|&r| r == from).unwrap();
                let to_idx = state.bit_rates.iter().position(|&r| r == to).unwrap();
                assert_eq!(to_idx, from_idx + 1);
            }
        }
    }
}

//! End-to-end buffering-controller scenarios across mixed stream sets.

use prism_video_core::{LoadController, MediaKind, PlayerOptions, StreamCapacity};

fn video(packets: usize, frames: usize, eos: bool) -> StreamCapacity {
    StreamCapacity {
        fps: 30,
        packet_count: packets,
        frame_count: frames,
        frame_max_count: 10,
        is_end_of_stream: eos,
        kind: MediaKind::Video,
    }
}

fn audio(packets: usize, frames: usize) -> StreamCapacity {
    StreamCapacity {
        fps: 30,
        packet_count: packets,
        frame_count: frames,
        frame_max_count: 10,
        is_end_of_stream: false,
        kind: MediaKind::Audio,
    }
}

#[test]
fn first_load_waits_for_slow_video_stream() {
    let mut controller = LoadController::new(PlayerOptions::default());
    // Audio is half-full and opens immediately; video has half its frame
    // queue but without fast-start must reach the steady-state threshold
    // (30 fps * 3 s = 90), and 5 + 5 falls far short.
    let caps = [video(5, 5, false), audio(10, 8)];
    let state = controller.evaluate(&caps, true, false).expect("forced evaluation");
    assert!(!state.is_playable);
    assert!(!state.is_end_of_stream);
    assert_eq!(state.packet_count, 5);
    assert_eq!(state.frame_count, 5);
}

#[test]
fn drained_video_stream_unblocks_first_load() {
    let mut controller = LoadController::new(PlayerOptions::default());
    // Same mix, but the video stream ended with nothing left to decode:
    // the degenerate short-stream rule applies and the set becomes playable.
    let caps = [video(0, 5, true), audio(10, 8)];
    let state = controller.evaluate(&caps, true, false).expect("forced evaluation");
    assert!(state.is_playable);
}

#[test]
fn progress_never_decreases_when_buffers_double() {
    for &(packets, frames) in &[(1usize, 0usize), (10, 5), (40, 8), (100, 10)] {
        let mut controller = LoadController::new(PlayerOptions::default());
        let caps = [StreamCapacity {
            fps: 30,
            packet_count: packets,
            frame_count: frames,
            frame_max_count: 1000,
            is_end_of_stream: false,
            kind: MediaKind::Video,
        }];
        let base = controller.evaluate(&caps, true, false).unwrap();

        let caps = [StreamCapacity {
            packet_count: packets * 2,
            frame_count: frames * 2,
            ..caps[0]
        }];
        let doubled = controller.evaluate(&caps, true, false).unwrap();
        assert!(
            doubled.progress >= base.progress,
            "progress regressed: {} -> {}",
            base.progress,
            doubled.progress
        );
    }
}

#[test]
fn suppression_window_and_seek_bypass() {
    let mut controller = LoadController::new(PlayerOptions::default());
    let caps = [audio(10, 4)];
    assert!(controller.evaluate(&caps, true, false).is_some());
    assert!(controller.evaluate(&caps, false, false).is_none());
    let state = controller.evaluate(&caps, false, true).expect("seek bypasses throttle");
    assert!(state.is_seek);
}

#[test]
fn all_streams_at_end_reports_playable() {
    let mut controller = LoadController::new(PlayerOptions::default());
    let caps = [video(0, 0, true), {
        let mut a = audio(0, 0);
        a.is_end_of_stream = true;
        a
    }];
    let state = controller.evaluate(&caps, true, false).unwrap();
    assert!(state.is_end_of_stream);
    assert!(state.is_playable);
}

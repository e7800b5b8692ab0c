// SPDX-License-Identifier: MIT OR Apache-2.0
//! Frame arithmetic.

/// One unit of project time at the project's fixed frame rate.
///
/// Signed so that an empty clip (`end == start - 1`) is representable.
pub type Frame = i64;

/// Convert seconds to whole frames (`round(seconds * fps)`)
pub fn seconds_to_frames(seconds: f64, fps: f64) -> Frame {
    let frames = (seconds * fps).round();
    if frames.is_finite() {
        frames as Frame
    } else {
        0
    }
}

/// Convert frames to seconds
pub fn frames_to_seconds(frames: Frame, fps: f64) -> f64 {
    if fps > 0.0 {
        frames as f64 / fps
    } else {
        0.0
    }
}

/// Convert a millisecond duration to frames at `fps`
pub fn millis_to_frames(duration_ms: u64, fps: f64) -> Frame {
    seconds_to_frames(duration_ms as f64 / 1000.0, fps).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_round_trip() {
        assert_eq!(seconds_to_frames(2.0, 60.0), 120);
        assert_eq!(seconds_to_frames(0.51 / 60.0, 60.0), 1);
        assert_eq!(frames_to_seconds(90, 30.0), 3.0);
        assert_eq!(frames_to_seconds(90, 0.0), 0.0);
    }

    #[test]
    fn test_millis_to_frames() {
        assert_eq!(millis_to_frames(5000, 60.0), 300);
        assert_eq!(millis_to_frames(5000, 30.0), 150);
        assert_eq!(seconds_to_frames(f64::NAN, 60.0), 0);
    }
}

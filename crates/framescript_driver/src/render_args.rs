// SPDX-License-Identifier: MIT OR Apache-2.0
//! Render trigger arguments: `width:height:fps:totalFrames:workers:codec:preset`.

use crate::error::DriverError;
use std::ops::Range;
use std::str::FromStr;

const FIELD_COUNT: usize = 7;

/// Parsed render request
#[derive(Debug, Clone, PartialEq)]
pub struct RenderArgs {
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Output frame rate
    pub fps: f64,
    /// Frames to export
    pub total_frames: usize,
    /// Requested workers, zero means one.
    ///
    /// Only decides how the frame range is split. The exporter walks the
    /// ranges in order on a single scene, so this adds no parallelism.
    pub workers: usize,
    /// Encoder name
    pub codec: String,
    /// Encoder preset
    pub preset: String,
}

fn parse_field<T: FromStr>(name: &str, raw: &str) -> Result<T, DriverError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| DriverError::InvalidArgs(format!("{name} '{raw}': {e}")))
}

impl FromStr for RenderArgs {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(':').collect();
        if fields.len() != FIELD_COUNT {
            return Err(DriverError::InvalidArgs(format!(
                "expected {FIELD_COUNT} ':'-separated fields, got {}",
                fields.len()
            )));
        }

        let fps: f64 = parse_field("fps", fields[2])?;
        if !fps.is_finite() || fps <= 0.0 {
            return Err(DriverError::InvalidArgs(format!("fps must be positive, got {fps}")));
        }

        Ok(Self {
            width: parse_field("width", fields[0])?,
            height: parse_field("height", fields[1])?,
            fps,
            total_frames: parse_field("totalFrames", fields[3])?,
            workers: parse_field("workers", fields[4])?,
            codec: fields[5].to_string(),
            preset: fields[6].to_string(),
        })
    }
}

impl RenderArgs {
    /// Workers actually used
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }

    /// Frame ranges handed to each worker
    pub fn chunk_ranges(&self) -> Vec<Range<usize>> {
        chunk_ranges(self.total_frames, self.workers)
    }
}

/// Split `[0, total)` into `workers` equal chunks plus a trailing remainder chunk.
///
/// Empty ranges are dropped.
pub fn chunk_ranges(total: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let base = total / workers;
    let remainder = total % workers;

    let mut ranges = Vec::with_capacity(workers + 1);
    if base > 0 {
        for worker in 0..workers {
            let start = worker * base;
            ranges.push(start..start + base);
        }
    }
    if remainder > 0 {
        ranges.push(workers * base..total);
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let args: RenderArgs = "1920:1080:60:7200:4:h264:medium".parse().unwrap();
        assert_eq!(args.width, 1920);
        assert_eq!(args.height, 1080);
        assert_eq!(args.fps, 60.0);
        assert_eq!(args.total_frames, 7200);
        assert_eq!(args.worker_count(), 4);
        assert_eq!(args.codec, "h264");
        assert_eq!(args.preset, "medium");
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        assert!(matches!(
            "1920:1080:60:7200:4:h264".parse::<RenderArgs>(),
            Err(DriverError::InvalidArgs(_))
        ));
        assert!("1920:1080:60:7200:4:h264:fast:extra".parse::<RenderArgs>().is_err());
    }

    #[test]
    fn test_parse_rejects_bad_numbers() {
        assert!("wide:1080:60:7200:4:h264:fast".parse::<RenderArgs>().is_err());
        assert!("1920:1080:0:7200:4:h264:fast".parse::<RenderArgs>().is_err());
        assert!("1920:1080:60:-1:4:h264:fast".parse::<RenderArgs>().is_err());
    }

    #[test]
    fn test_zero_workers_means_one() {
        let args: RenderArgs = "640:360:30:10:0:vp9:slow".parse().unwrap();
        assert_eq!(args.worker_count(), 1);
        assert_eq!(args.chunk_ranges(), vec![0..10]);
    }

    #[test]
    fn test_chunk_ranges() {
        assert_eq!(chunk_ranges(10, 3), vec![0..3, 3..6, 6..9, 9..10]);
        assert_eq!(chunk_ranges(9, 3), vec![0..3, 3..6, 6..9]);
        assert_eq!(chunk_ranges(2, 4), vec![0..2]);
        assert!(chunk_ranges(0, 4).is_empty());
    }
}

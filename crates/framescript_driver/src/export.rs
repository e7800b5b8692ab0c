// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless export loop.
//!
//! Hands the audio plan to the renderer, then steps the scene through every
//! frame of each worker range: set the frame, wait for pending animation work
//! to settle, capture. Progress and the cancel flag are exchanged with the
//! [`RenderHost`] on fixed intervals. Worker ranges are walked in order on one
//! scene, so captures come out sorted by frame.

use crate::backend::BackendClient;
use crate::config::DriverSettings;
use crate::error::{BackendError, DriverError};
use crate::render_args::RenderArgs;
use framescript_scene::Scene;
use framescript_timeline::{AudioPlan, Frame, MediaMetadata, MediaSource};
use futures::future::BoxFuture;
use std::io::Write;
use std::time::Duration;
use tokio::time::Instant;

/// The render collaborator the exporter reports to
pub trait RenderHost: Send + Sync {
    /// Look up media duration; failures resolve to zero duration
    fn media_metadata<'a>(&'a self, source: &'a MediaSource) -> BoxFuture<'a, MediaMetadata>;

    /// Store the audio plan before any frame is produced
    fn submit_audio_plan<'a>(&'a self, plan: &'a AudioPlan) -> BoxFuture<'a, Result<(), BackendError>>;

    /// Report progress
    fn post_progress(&self, completed: usize, total: usize) -> BoxFuture<'_, Result<(), BackendError>>;

    /// Poll the cancel flag
    fn is_canceled(&self) -> BoxFuture<'_, Result<bool, BackendError>>;

    /// Clear render state once the export ends
    fn reset(&self) -> BoxFuture<'_, Result<(), BackendError>>;
}

impl RenderHost for BackendClient {
    fn media_metadata<'a>(&'a self, source: &'a MediaSource) -> BoxFuture<'a, MediaMetadata> {
        Box::pin(self.metadata_or_empty(source))
    }

    fn submit_audio_plan<'a>(&'a self, plan: &'a AudioPlan) -> BoxFuture<'a, Result<(), BackendError>> {
        Box::pin(BackendClient::submit_audio_plan(self, plan))
    }

    fn post_progress(&self, completed: usize, total: usize) -> BoxFuture<'_, Result<(), BackendError>> {
        Box::pin(BackendClient::post_progress(self, completed, total))
    }

    fn is_canceled(&self) -> BoxFuture<'_, Result<bool, BackendError>> {
        Box::pin(BackendClient::is_canceled(self))
    }

    fn reset(&self) -> BoxFuture<'_, Result<(), BackendError>> {
        Box::pin(BackendClient::reset(self))
    }
}

/// Outcome of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportReport {
    /// Frames written
    pub completed: usize,
    /// Frames requested
    pub total: usize,
    /// Whether the export stopped on a cancel request
    pub canceled: bool,
}

/// Drives a scene through an export
pub struct Exporter<'h, H: RenderHost> {
    host: &'h H,
    progress_interval: Duration,
    cancel_interval: Duration,
}

impl<'h, H: RenderHost> Exporter<'h, H> {
    /// Create an exporter using the intervals in `settings`
    pub fn new(host: &'h H, settings: &DriverSettings) -> Self {
        Self {
            host,
            progress_interval: settings.progress_interval(),
            cancel_interval: settings.cancel_poll_interval(),
        }
    }

    /// Fetch metadata for every media node still missing it.
    ///
    /// Each lookup holds a pending guard until its result is applied, so a
    /// concurrent `wait_ready` does not resolve on a half-built timeline.
    pub async fn resolve_media(&self, scene: &mut Scene) -> Result<usize, DriverError> {
        let missing = scene.pending_media();
        for (node, media) in &missing {
            let _pending = scene.context().pending.guard();
            let metadata = self.host.media_metadata(&media.source).await;
            scene.set_media_metadata(*node, metadata)?;
        }
        Ok(missing.len())
    }

    /// Export `args.total_frames` frames of `scene`, one JSON capture per line.
    ///
    /// Scene, audio plan and I/O errors abort the export. Progress and cancel
    /// failures are logged and ignored. Reset is posted however the export ends.
    pub async fn run<W: Write>(
        &self,
        scene: &mut Scene,
        args: &RenderArgs,
        out: &mut W,
    ) -> Result<ExportReport, DriverError> {
        let outcome = self.export_frames(scene, args, out).await;
        if let Err(err) = self.host.reset().await {
            tracing::warn!("Reset failed: {}", err);
        }
        match &outcome {
            Ok(report) => tracing::info!("Export finished: {}/{} frames", report.completed, report.total),
            Err(err) => tracing::warn!("Export aborted: {}", err),
        }
        outcome
    }

    async fn export_frames<W: Write>(
        &self,
        scene: &mut Scene,
        args: &RenderArgs,
        out: &mut W,
    ) -> Result<ExportReport, DriverError> {
        let total = args.total_frames;
        let ranges = args.chunk_ranges();
        tracing::info!(
            "Exporting {} frames at {}x{} {} fps over {} ranges",
            total,
            args.width,
            args.height,
            args.fps,
            ranges.len()
        );

        self.report_progress(0, total).await;
        self.host.submit_audio_plan(&scene.audio_plan()).await?;

        let mut completed = 0;
        let mut canceled = false;
        let mut last_progress = Instant::now();
        let mut last_cancel_poll: Option<Instant> = None;

        'ranges: for range in ranges {
            tracing::debug!("Exporting range {:?}", range);
            for frame in range {
                if last_cancel_poll.map_or(true, |at| at.elapsed() >= self.cancel_interval) {
                    last_cancel_poll = Some(Instant::now());
                    if self.poll_cancel().await {
                        tracing::info!("Export canceled at frame {}", frame);
                        canceled = true;
                        break 'ranges;
                    }
                }

                scene.set_frame(frame as Frame);
                scene.context().pending.wait_ready().await;
                let capture = scene.capture_current();
                serde_json::to_writer(&mut *out, &capture)?;
                out.write_all(b"\n")?;
                completed += 1;

                if last_progress.elapsed() >= self.progress_interval {
                    last_progress = Instant::now();
                    self.report_progress(completed, total).await;
                }
            }
        }

        out.flush()?;
        self.report_progress(completed, total).await;
        Ok(ExportReport {
            completed,
            total,
            canceled,
        })
    }

    async fn report_progress(&self, completed: usize, total: usize) {
        if let Err(err) = self.host.post_progress(completed, total).await {
            tracing::warn!("Progress report failed: {}", err);
        }
    }

    async fn poll_cancel(&self) -> bool {
        match self.host.is_canceled().await {
            Ok(canceled) => canceled,
            Err(err) => {
                tracing::warn!("Cancel poll failed: {}", err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::{mount_bench, BenchConfig};
    use framescript_scene::{ClipProps, MediaProps, NodeKind};
    use framescript_timeline::ProjectContext;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Metadata(String),
        Plan(usize),
        Progress(usize, usize),
        Cancel,
        Reset,
    }

    #[derive(Default)]
    struct MockHost {
        calls: Mutex<Vec<Call>>,
        cancel_after_polls: Option<usize>,
        reject_plan: bool,
    }

    impl RenderHost for MockHost {
        fn media_metadata<'a>(&'a self, source: &'a MediaSource) -> BoxFuture<'a, MediaMetadata> {
            self.calls.lock().push(Call::Metadata(source.path().to_string()));
            Box::pin(async {
                MediaMetadata {
                    duration_ms: 1000,
                    fps: Some(30.0),
                }
            })
        }

        fn submit_audio_plan<'a>(
            &'a self,
            plan: &'a AudioPlan,
        ) -> BoxFuture<'a, Result<(), BackendError>> {
            self.calls.lock().push(Call::Plan(plan.segments.len()));
            let reject = self.reject_plan;
            Box::pin(async move {
                if reject {
                    Err(BackendError::Status {
                        url: "render_audio_plan".to_string(),
                        status: 500,
                    })
                } else {
                    Ok(())
                }
            })
        }

        fn post_progress(
            &self,
            completed: usize,
            total: usize,
        ) -> BoxFuture<'_, Result<(), BackendError>> {
            self.calls.lock().push(Call::Progress(completed, total));
            Box::pin(async { Ok(()) })
        }

        fn is_canceled(&self) -> BoxFuture<'_, Result<bool, BackendError>> {
            let mut calls = self.calls.lock();
            calls.push(Call::Cancel);
            let polls = calls.iter().filter(|call| **call == Call::Cancel).count();
            let canceled = self.cancel_after_polls.is_some_and(|limit| polls > limit);
            Box::pin(async move { Ok(canceled) })
        }

        fn reset(&self) -> BoxFuture<'_, Result<(), BackendError>> {
            self.calls.lock().push(Call::Reset);
            Box::pin(async { Ok(()) })
        }
    }

    #[derive(Clone, Default)]
    struct SharedOut(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedOut {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct BrokenOut;

    impl Write for BrokenOut {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn bench_scene() -> Scene {
        let mut scene = Scene::new(ProjectContext::default());
        let config = BenchConfig {
            cycle_seconds: 0.5,
            cycles: 2,
            peak: 1.0,
        };
        mount_bench(&mut scene, None, config).unwrap();
        scene
    }

    fn settings() -> DriverSettings {
        DriverSettings {
            progress_interval_ms: 60_000,
            cancel_poll_interval_ms: 60_000,
            ..DriverSettings::default()
        }
    }

    #[tokio::test]
    async fn test_export_writes_every_frame() {
        let host = MockHost::default();
        let mut scene = bench_scene();
        let args: RenderArgs = "320:180:60:60:3:h264:fast".parse().unwrap();
        let mut out = Vec::new();

        let report = Exporter::new(&host, &settings())
            .run(&mut scene, &args, &mut out)
            .await
            .unwrap();

        assert_eq!(
            report,
            ExportReport {
                completed: 60,
                total: 60,
                canceled: false
            }
        );
        let lines: Vec<&str> = std::str::from_utf8(&out).unwrap().lines().collect();
        assert_eq!(lines.len(), 60);
        // Worker ranges are walked in order, so frames come out sorted
        for (expected, line) in lines.iter().enumerate() {
            assert!(line.starts_with(&format!("{{\"frame\":{expected},")));
        }
        assert_eq!(scene.frame(), 59);

        let calls = host.calls.lock();
        assert_eq!(calls[0], Call::Progress(0, 60));
        assert_eq!(calls[1], Call::Plan(0));
        assert_eq!(calls[calls.len() - 2], Call::Progress(60, 60));
        assert_eq!(calls[calls.len() - 1], Call::Reset);
    }

    #[tokio::test]
    async fn test_export_stops_on_cancel() {
        let host = MockHost {
            cancel_after_polls: Some(0),
            ..MockHost::default()
        };
        let mut scene = bench_scene();
        let args: RenderArgs = "320:180:60:60:1:h264:fast".parse().unwrap();
        let mut out = Vec::new();

        let report = Exporter::new(&host, &settings())
            .run(&mut scene, &args, &mut out)
            .await
            .unwrap();

        assert!(report.canceled);
        assert_eq!(report.completed, 0);
        assert!(out.is_empty());
        assert_eq!(host.calls.lock().last(), Some(&Call::Reset));
    }

    #[tokio::test]
    async fn test_rejected_plan_still_resets() {
        let host = MockHost {
            reject_plan: true,
            ..MockHost::default()
        };
        let mut scene = bench_scene();
        let args: RenderArgs = "320:180:60:60:1:h264:fast".parse().unwrap();
        let mut out = Vec::new();

        let result = Exporter::new(&host, &settings())
            .run(&mut scene, &args, &mut out)
            .await;

        assert!(matches!(
            result,
            Err(DriverError::Backend(BackendError::Status { status: 500, .. }))
        ));
        assert!(out.is_empty());
        assert_eq!(host.calls.lock().last(), Some(&Call::Reset));
    }

    #[tokio::test]
    async fn test_write_failure_still_resets() {
        let host = MockHost::default();
        let mut scene = bench_scene();
        let args: RenderArgs = "320:180:60:60:1:h264:fast".parse().unwrap();

        let result = Exporter::new(&host, &settings())
            .run(&mut scene, &args, &mut BrokenOut)
            .await;

        assert!(result.is_err());
        assert_eq!(host.calls.lock().last(), Some(&Call::Reset));
    }

    #[tokio::test(start_paused = true)]
    async fn test_export_waits_for_pending_work() {
        let host = MockHost::default();
        let mut scene = bench_scene();
        let args: RenderArgs = "320:180:60:4:1:h264:fast".parse().unwrap();
        let out = SharedOut::default();
        let mut writer = out.clone();
        let settings = settings();
        let exporter = Exporter::new(&host, &settings);

        let pending = scene.context().pending.guard();
        let release = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            // Nothing is captured while work is outstanding
            assert!(out.0.lock().is_empty());
            drop(pending);
        };
        let (report, ()) = tokio::join!(exporter.run(&mut scene, &args, &mut writer), release);

        assert_eq!(report.unwrap().completed, 4);
        let written = out.0.lock();
        assert_eq!(written.iter().filter(|byte| **byte == b'\n').count(), 4);
    }

    #[tokio::test]
    async fn test_resolve_media_applies_metadata() {
        let host = MockHost::default();
        let mut scene = Scene::new(ProjectContext::default());
        let clip = scene
            .mount(None, NodeKind::Clip(ClipProps::fixed(0, 119)))
            .unwrap();
        scene
            .mount(
                Some(clip),
                NodeKind::Media(MediaProps::new(MediaSource::video("intro.mp4"))),
            )
            .unwrap();
        assert!(scene.audio_plan().segments.is_empty());

        let resolved = Exporter::new(&host, &settings())
            .resolve_media(&mut scene)
            .await
            .unwrap();

        assert_eq!(resolved, 1);
        assert!(scene.pending_media().is_empty());
        assert!(scene.context().pending.is_idle());
        let plan = scene.audio_plan();
        assert_eq!(plan.segments.len(), 1);
        assert_eq!(plan.segments[0].duration_frames, 60);
        assert_eq!(host.calls.lock()[0], Call::Metadata("intro.mp4".to_string()));
    }
}

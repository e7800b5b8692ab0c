// SPDX-License-Identifier: MIT OR Apache-2.0
//! HTTP client for the backend collaborator.
//!
//! Covers media metadata lookup, audio plan hand-off, progress reporting,
//! the cancel flag and the final reset.

use crate::config::DriverSettings;
use crate::error::BackendError;
use framescript_timeline::{AudioPlan, MediaKind, MediaMetadata, MediaSource};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Progress report body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPayload {
    /// Frames done
    pub completed: usize,
    /// Frames in the export
    pub total: usize,
}

/// Cancel flag body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CancelResponse {
    /// Whether the export should stop
    pub canceled: bool,
}

/// Metadata per source, kept for the process lifetime
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: RwLock<HashMap<MediaSource, MediaMetadata>>,
}

impl MetadataCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached metadata
    pub fn get(&self, source: &MediaSource) -> Option<MediaMetadata> {
        self.entries.read().get(source).copied()
    }

    /// Store metadata; entries are never invalidated
    pub fn insert(&self, source: MediaSource, metadata: MediaMetadata) {
        self.entries.write().insert(source, metadata);
    }

    /// Number of cached sources
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Backend endpoints bundled with a shared HTTP client
#[derive(Debug)]
pub struct BackendClient {
    http: reqwest::Client,
    video_meta_url: String,
    audio_meta_url: String,
    audio_plan_url: String,
    progress_url: String,
    cancel_url: String,
    reset_url: String,
    cache: MetadataCache,
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(BackendError::Status {
            url: response.url().to_string(),
            status: status.as_u16(),
        })
    }
}

impl BackendClient {
    /// Build a client for the endpoints in `settings`
    pub fn new(settings: &DriverSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            video_meta_url: settings.video_meta_url(),
            audio_meta_url: settings.audio_meta_url(),
            audio_plan_url: settings.audio_plan_url(),
            progress_url: settings.progress_url(),
            cancel_url: settings.cancel_url(),
            reset_url: settings.reset_url(),
            cache: MetadataCache::new(),
        }
    }

    /// Metadata cache
    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Look up duration (and fps for video), cached per source
    pub async fn metadata(&self, source: &MediaSource) -> Result<MediaMetadata, BackendError> {
        if let Some(metadata) = self.cache.get(source) {
            return Ok(metadata);
        }

        let url = match source.kind() {
            MediaKind::Video => &self.video_meta_url,
            MediaKind::Sound => &self.audio_meta_url,
        };
        let response = self
            .http
            .get(url)
            .query(&[("path", source.path())])
            .send()
            .await?;
        let metadata: MediaMetadata = check_status(response)?.json().await?;

        tracing::debug!(
            "Metadata for {}: {} ms, fps {:?}",
            source.path(),
            metadata.duration_ms,
            metadata.fps
        );
        self.cache.insert(source.clone(), metadata);
        Ok(metadata)
    }

    /// Metadata, or zero duration when the lookup fails
    pub async fn metadata_or_empty(&self, source: &MediaSource) -> MediaMetadata {
        match self.metadata(source).await {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!("Metadata lookup failed for {}: {}", source.path(), err);
                MediaMetadata {
                    duration_ms: 0,
                    fps: None,
                }
            }
        }
    }

    /// Hand the audio plan to the renderer
    pub async fn submit_audio_plan(&self, plan: &AudioPlan) -> Result<(), BackendError> {
        let plan = plan.clone().sanitized();
        tracing::info!("Submitting audio plan with {} segments", plan.segments.len());
        let response = self.http.post(&self.audio_plan_url).json(&plan).send().await?;
        check_status(response)?;
        Ok(())
    }

    /// Read back the stored audio plan
    pub async fn fetch_audio_plan(&self) -> Result<AudioPlan, BackendError> {
        let response = self.http.get(&self.audio_plan_url).send().await?;
        Ok(check_status(response)?.json().await?)
    }

    /// Report progress
    pub async fn post_progress(&self, completed: usize, total: usize) -> Result<(), BackendError> {
        let response = self
            .http
            .post(&self.progress_url)
            .json(&ProgressPayload { completed, total })
            .send()
            .await?;
        check_status(response)?;
        Ok(())
    }

    /// Poll the cancel flag
    pub async fn is_canceled(&self) -> Result<bool, BackendError> {
        let response = self.http.get(&self.cancel_url).send().await?;
        let body: CancelResponse = check_status(response)?.json().await?;
        Ok(body.canceled)
    }

    /// Clear backend render state
    pub async fn reset(&self) -> Result<(), BackendError> {
        let response = self.http.post(&self.reset_url).send().await?;
        check_status(response)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_never_invalidates() {
        let cache = MetadataCache::new();
        let source = MediaSource::video("intro.mp4");
        assert!(cache.get(&source).is_none());

        let metadata = MediaMetadata {
            duration_ms: 2000,
            fps: Some(30.0),
        };
        cache.insert(source.clone(), metadata);
        assert_eq!(cache.get(&source), Some(metadata));
        assert!(cache.get(&MediaSource::sound("intro.mp4")).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_metadata_wire_format() {
        let video: MediaMetadata =
            serde_json::from_str(r#"{"duration_ms":2000,"fps":29.97}"#).unwrap();
        assert_eq!(video.fps, Some(29.97));
        assert_eq!(video.frames(60.0), 120);

        let audio: MediaMetadata = serde_json::from_str(r#"{"duration_ms":1500}"#).unwrap();
        assert_eq!(audio.fps, None);
        assert_eq!(audio.frames(60.0), 90);
    }

    #[test]
    fn test_progress_and_cancel_bodies() {
        assert_eq!(
            serde_json::to_string(&ProgressPayload {
                completed: 3,
                total: 10
            })
            .unwrap(),
            r#"{"completed":3,"total":10}"#
        );
        let cancel: CancelResponse = serde_json::from_str(r#"{"canceled":true}"#).unwrap();
        assert!(cancel.canceled);
    }

    #[test]
    fn test_client_endpoints() {
        let mut settings = DriverSettings::default();
        settings.backend_url = "http://render:9000".to_string();
        let client = BackendClient::new(&settings);
        assert_eq!(client.progress_url, "http://render:9000/render_progress");
        assert_eq!(client.audio_meta_url, "http://render:9000/audio/meta");
        assert!(client.cache().is_empty());
    }
}

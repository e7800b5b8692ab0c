// SPDX-License-Identifier: MIT OR Apache-2.0
//! Driver settings, stored as RON and overridable from the environment.

use crate::error::{DriverError, Result};
use framescript_timeline::ProjectSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the settings file
pub const SETTINGS_ENV: &str = "FRAMESCRIPT_SETTINGS";

/// Default backend origin
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:3000";

/// Headless driver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverSettings {
    /// Backend origin, used to derive every endpoint not set explicitly
    pub backend_url: String,
    /// Progress endpoint override
    pub progress_url: Option<String>,
    /// Cancel endpoint override
    pub cancel_url: Option<String>,
    /// Reset endpoint override
    pub reset_url: Option<String>,
    /// Audio plan endpoint override
    pub audio_plan_url: Option<String>,
    /// Where captured frames are written, one JSON line per frame
    pub output_path: PathBuf,
    /// How often progress is posted
    pub progress_interval_ms: u64,
    /// How often the cancel flag is polled
    pub cancel_poll_interval_ms: u64,
    /// Output format
    pub project: ProjectSettings,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            progress_url: None,
            cancel_url: None,
            reset_url: None,
            audio_plan_url: None,
            output_path: PathBuf::from("frames.jsonl"),
            progress_interval_ms: 50,
            cancel_poll_interval_ms: 1000,
            project: ProjectSettings::default(),
        }
    }
}

impl DriverSettings {
    /// Load settings from a RON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        ron::from_str(&content).map_err(|e| DriverError::Settings {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Save settings to a RON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);

        let content = ron::ser::to_string_pretty(self, config).map_err(|e| {
            DriverError::Settings {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load `path` if it exists, otherwise defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                tracing::debug!("No settings at {:?}, using defaults", path);
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("FRAMESCRIPT_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Some(url) = lookup("RENDER_PROGRESS_URL") {
            self.progress_url = Some(url);
        }
        if let Some(url) = lookup("RENDER_CANCEL_URL") {
            self.cancel_url = Some(url);
        }
        if let Some(url) = lookup("RENDER_RESET_URL") {
            self.reset_url = Some(url);
        }
        if let Some(url) = lookup("RENDER_AUDIO_PLAN_URL") {
            self.audio_plan_url = Some(url);
        }
        if let Some(path) = lookup("RENDER_OUTPUT_PATH") {
            self.output_path = PathBuf::from(path);
        }
        self
    }

    fn endpoint(&self, explicit: &Option<String>, route: &str) -> String {
        explicit
            .clone()
            .unwrap_or_else(|| format!("{}/{}", self.backend_url.trim_end_matches('/'), route))
    }

    /// Progress endpoint
    pub fn progress_url(&self) -> String {
        self.endpoint(&self.progress_url, "render_progress")
    }

    /// Cancel flag endpoint
    pub fn cancel_url(&self) -> String {
        self.endpoint(&self.cancel_url, "is_canceled")
    }

    /// Reset endpoint
    pub fn reset_url(&self) -> String {
        self.endpoint(&self.reset_url, "reset")
    }

    /// Audio plan endpoint
    pub fn audio_plan_url(&self) -> String {
        self.endpoint(&self.audio_plan_url, "render_audio_plan")
    }

    /// Video metadata endpoint
    pub fn video_meta_url(&self) -> String {
        self.endpoint(&None, "video/meta")
    }

    /// Audio metadata endpoint
    pub fn audio_meta_url(&self) -> String {
        self.endpoint(&None, "audio/meta")
    }

    /// Progress interval as a duration
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }

    /// Cancel poll interval as a duration
    pub fn cancel_poll_interval(&self) -> Duration {
        Duration::from_millis(self.cancel_poll_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints() {
        let settings = DriverSettings::default();
        assert_eq!(settings.progress_url(), "http://127.0.0.1:3000/render_progress");
        assert_eq!(settings.cancel_url(), "http://127.0.0.1:3000/is_canceled");
        assert_eq!(settings.reset_url(), "http://127.0.0.1:3000/reset");
        assert_eq!(settings.audio_plan_url(), "http://127.0.0.1:3000/render_audio_plan");
        assert_eq!(settings.video_meta_url(), "http://127.0.0.1:3000/video/meta");
    }

    #[test]
    fn test_overrides() {
        let settings = DriverSettings::default().with_overrides(|key| match key {
            "FRAMESCRIPT_BACKEND_URL" => Some("http://render:8080/".to_string()),
            "RENDER_CANCEL_URL" => Some("http://elsewhere/cancel".to_string()),
            "RENDER_OUTPUT_PATH" => Some("out/frames.jsonl".to_string()),
            _ => None,
        });

        assert_eq!(settings.progress_url(), "http://render:8080/render_progress");
        assert_eq!(settings.cancel_url(), "http://elsewhere/cancel");
        assert_eq!(settings.output_path, PathBuf::from("out/frames.jsonl"));
    }

    #[test]
    fn test_settings_serialization() {
        let mut settings = DriverSettings::default();
        settings.cancel_poll_interval_ms = 250;
        settings.project.fps = 30.0;

        let config = ron::ser::PrettyConfig::default().struct_names(true);
        let ron_str = ron::ser::to_string_pretty(&settings, config).unwrap();
        let loaded: DriverSettings = ron::from_str(&ron_str).unwrap();

        assert_eq!(loaded, settings);
        // Frame channel retries are configured on the client, not here
        assert!(!ron_str.contains("reconnect"));
    }

    #[test]
    fn test_partial_settings_use_defaults() {
        let loaded: DriverSettings = ron::from_str("(progress_interval_ms: 200)").unwrap();
        assert_eq!(loaded.progress_interval(), Duration::from_millis(200));
        assert_eq!(loaded.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(loaded.project, ProjectSettings::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("framescript-missing-settings.ron");
        let loaded = DriverSettings::load_or_default(Some(&path)).unwrap();
        assert_eq!(loaded, DriverSettings::default());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "framescript-settings-{}.ron",
            std::process::id()
        ));
        let mut settings = DriverSettings::default();
        settings.backend_url = "http://localhost:4000".to_string();
        settings.save(&path).unwrap();

        let loaded = DriverSettings::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, settings);
    }
}

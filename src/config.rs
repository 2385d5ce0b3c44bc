use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::artifact::ReassemblerConfig;
use crate::capture::CaptureConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    pub reassembler: ReassemblerSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub public_url_prefix: String,
    pub video_file_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ReassemblerSettings {
    pub max_consecutive_decode_failures: usize,
}

impl Config {
    /// Load from an optional file at `path` plus `WEBCAM_BRIDGE__*` overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "webcam-bridge")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8000)?
            .set_default("storage.upload_dir", "uploaded_files")?
            .set_default("storage.public_url_prefix", "/_upload")?
            .set_default("storage.video_file_name", "video.webm")?
            .set_default("reassembler.max_consecutive_decode_failures", 3)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("WEBCAM_BRIDGE").separator("__"))
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }

    pub fn reassembler_config(&self) -> ReassemblerConfig {
        ReassemblerConfig {
            upload_dir: self.storage.upload_dir.clone(),
            public_url_prefix: self.storage.public_url_prefix.clone(),
            video_file_name: self.storage.video_file_name.clone(),
            max_consecutive_decode_failures: self.reassembler.max_consecutive_decode_failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_defaults_without_file() {
        let config = Config::load("does/not/exist/webcam-bridge").unwrap();

        assert_eq!(config.service.name, "webcam-bridge");
        assert_eq!(config.service.http.port, 8000);
        assert_eq!(config.storage.video_file_name, "video.webm");
        assert_eq!(config.capture, CaptureConfig::default());
        assert_eq!(config.reassembler_config().max_consecutive_decode_failures, 3);
    }

    #[test]
    fn test_load_sample_config_file() {
        let config = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config/webcam-bridge")).unwrap();

        assert_eq!(config.service.http.bind, "127.0.0.1");
        assert_eq!(config.capture.timeslice_ms, Some(1000));
        assert_eq!(config.capture.screenshot_format, "image/jpeg");
        assert_eq!(config.capture.mime_type, "video/webm");
        assert_eq!(config.reassembler_config().public_url_prefix, "/_upload");
    }

    #[test]
    fn test_capture_config_defaults() {
        let capture = CaptureConfig::default();

        assert!(!capture.audio);
        assert!(!capture.mirrored);
        assert_eq!(capture.screenshot_format, "image/jpeg");
        assert!(capture.video_constraints.is_empty());
        assert_eq!(capture.timeslice(), None);
        assert_eq!(capture.mime_type, "video/webm");
    }
}

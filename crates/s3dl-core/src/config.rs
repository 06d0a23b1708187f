//! Engine configuration: bucket/region/endpoint, credentials, and download layout.
//!
//! Loaded from an optional TOML file and overridable by explicit setters, the
//! same `serde` + `toml` pattern the rest of this crate uses for on-disk state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Opaque access credentials passed through to the transport untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub session_token: Option<String>,
}

/// Engine-wide configuration for a single object download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bucket to fetch the object from.
    pub bucket: String,
    /// Region passed to the transport (endpoint construction, signing).
    #[serde(default = "default_region")]
    pub region: String,
    /// Optional endpoint override (e.g. a non-AWS S3-compatible host).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Access credentials. Left as defaults when the transport sources them
    /// some other way (instance profile, environment).
    #[serde(default)]
    pub credentials: Credentials,
    /// Number of concurrent segment workers.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Directory the final file and scratch files are written under.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Object key. May carry a `bucket/` prefix, which is stripped on load.
    pub object_key: String,
    /// Log file name override. Defaults to `download_log_<timestamp>.txt`.
    #[serde(default)]
    pub log_file_name: Option<String>,
}

fn default_region() -> String {
    "ap-east-1".to_string()
}

fn default_concurrency() -> usize {
    10
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("files")
}

impl Config {
    /// Parses a TOML document into a `Config`, stripping a `bucket/` prefix
    /// from `object_key` if the bucket name matches.
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let mut cfg: Config = toml::from_str(s)?;
        cfg.normalize_object_key();
        Ok(cfg)
    }

    /// Strips a leading `"<bucket>/"` from `object_key`, if present.
    pub fn normalize_object_key(&mut self) {
        let prefix = format!("{}/", self.bucket);
        if let Some(stripped) = self.object_key.strip_prefix(prefix.as_str()) {
            self.object_key = stripped.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_missing_fields() {
        let toml = r#"
            bucket = "my-bucket"
            object_key = "path/to/object.bin"
        "#;
        let cfg = Config::from_toml_str(toml).unwrap();
        assert_eq!(cfg.region, "ap-east-1");
        assert_eq!(cfg.concurrency, 10);
        assert_eq!(cfg.download_dir, PathBuf::from("files"));
        assert_eq!(cfg.object_key, "path/to/object.bin");
    }

    #[test]
    fn strips_bucket_prefix_from_object_key() {
        let toml = r#"
            bucket = "my-bucket"
            object_key = "my-bucket/path/to/object.bin"
        "#;
        let cfg = Config::from_toml_str(toml).unwrap();
        assert_eq!(cfg.object_key, "path/to/object.bin");
    }

    #[test]
    fn explicit_overrides_are_respected() {
        let toml = r#"
            bucket = "my-bucket"
            object_key = "object.bin"
            concurrency = 4
            region = "us-west-2"
            download_dir = "/tmp/downloads"
        "#;
        let cfg = Config::from_toml_str(toml).unwrap();
        assert_eq!(cfg.concurrency, 4);
        assert_eq!(cfg.region, "us-west-2");
        assert_eq!(cfg.download_dir, PathBuf::from("/tmp/downloads"));
    }
}

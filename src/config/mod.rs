//! ETL configuration.
//!
//! Source locations and the access-role credential are supplied by a TOML
//! file and interpolated into statement text as-is. The values are trusted;
//! no escaping or validation happens downstream. For local SQLite runs the
//! `[s3]` locations may point at filesystem paths instead of S3 URIs.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub s3: S3Config,
    pub iam_role: IamRoleConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct S3Config {
    /// Event-log source location (directory of newline-delimited JSON).
    pub log_data: String,
    /// JSONPaths field-mapping specification for the events load.
    pub log_jsonpath: String,
    /// Song-catalog source location (nested directories of JSON records).
    pub song_data: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IamRoleConfig {
    pub arn: String,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[s3]
log_data = "s3://udacity-dend/log_data"
log_jsonpath = "s3://udacity-dend/log_json_path.json"
song_data = "s3://udacity-dend/song_data"

[iam_role]
arn = "arn:aws:iam::123456789012:role/dwhRole"
"#;

    #[test]
    fn test_load_valid_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.s3.log_data, "s3://udacity-dend/log_data");
        assert_eq!(config.s3.song_data, "s3://udacity-dend/song_data");
        assert_eq!(config.iam_role.arn, "arn:aws:iam::123456789012:role/dwhRole");
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = Config::load(Path::new("/nonexistent/dwh.toml")).unwrap_err();
        assert!(err.to_string().contains("dwh.toml"));
    }

    #[test]
    fn test_missing_section_fails_parse() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[s3]\nlog_data = \"x\"\n").unwrap();
        assert!(Config::load(file.path()).is_err());
    }
}

//! Bulk-load COPY statements for the staging tables.
//!
//! Redshift-dialect only: the SQLite translation of this step is the
//! [`StagingLoader`](crate::loader::StagingLoader). Config values are
//! interpolated verbatim into the statement text; the configuration source is
//! trusted (no escaping happens here).

use super::Statement;
use crate::config::Config;

/// Events load with an explicit JSONPaths field-mapping specification.
pub fn staging_events_copy(config: &Config) -> String {
    format!(
        "COPY staging_events FROM '{}'\nIAM_ROLE '{}'\nJSON '{}'",
        config.s3.log_data, config.iam_role.arn, config.s3.log_jsonpath
    )
}

/// Songs load with auto-inferred field mapping.
pub fn staging_songs_copy(config: &Config) -> String {
    format!(
        "COPY staging_songs FROM '{}'\nIAM_ROLE '{}'\nJSON 'auto'",
        config.s3.song_data, config.iam_role.arn
    )
}

/// The two staging loads, events first.
pub fn copy_statements(config: &Config) -> Vec<Statement> {
    vec![
        Statement {
            name: "copy staging_events".to_string(),
            sql: staging_events_copy(config),
        },
        Statement {
            name: "copy staging_songs".to_string(),
            sql: staging_songs_copy(config),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, IamRoleConfig, S3Config};

    fn test_config() -> Config {
        Config {
            s3: S3Config {
                log_data: "s3://udacity-dend/log_data".to_string(),
                log_jsonpath: "s3://udacity-dend/log_json_path.json".to_string(),
                song_data: "s3://udacity-dend/song_data".to_string(),
            },
            iam_role: IamRoleConfig {
                arn: "arn:aws:iam::123456789012:role/dwhRole".to_string(),
            },
        }
    }

    #[test]
    fn test_events_copy_uses_jsonpaths_mapping() {
        let sql = staging_events_copy(&test_config());
        assert!(sql.starts_with("COPY staging_events FROM 's3://udacity-dend/log_data'"));
        assert!(sql.contains("IAM_ROLE 'arn:aws:iam::123456789012:role/dwhRole'"));
        assert!(sql.contains("JSON 's3://udacity-dend/log_json_path.json'"));
    }

    #[test]
    fn test_songs_copy_uses_auto_mapping() {
        let sql = staging_songs_copy(&test_config());
        assert!(sql.starts_with("COPY staging_songs FROM 's3://udacity-dend/song_data'"));
        assert!(sql.contains("JSON 'auto'"));
    }

    #[test]
    fn test_copy_statement_order_is_events_then_songs() {
        let names: Vec<String> = copy_statements(&test_config())
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, ["copy staging_events", "copy staging_songs"]);
    }
}

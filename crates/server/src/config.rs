//! Command line and environment configuration.
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use roster::MetaRuleSet;
use roster::filter::DEFAULT_PER_PAGE;
use roster::validation::RuleParseError;
use thiserror::Error;

/// Default listen address.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:5800";
/// Default request body limit, 16 KiB.
pub const DEFAULT_MAX_BODY_SIZE: u64 = 16 * 1024;

/// Log output format.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Roster server - staff member administration API.
///
/// Every option can also be set through its `ROSTER_*` environment variable,
/// or in a `.env` file in the working directory.
#[derive(Parser, Clone, Debug, PartialEq, Eq)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address to bind the server to.
    #[arg(short, long, env = "ROSTER_LISTEN", default_value = DEFAULT_LISTEN)]
    pub listen: String,

    /// Page size of listings when the request does not ask for one.
    #[arg(long, env = "ROSTER_PER_PAGE", default_value_t = DEFAULT_PER_PAGE)]
    pub per_page: u64,

    /// Largest accepted request body, in bytes.
    #[arg(long, env = "ROSTER_MAX_BODY_SIZE", default_value_t = DEFAULT_MAX_BODY_SIZE)]
    pub max_body_size: u64,

    /// Log filter, in `tracing_subscriber::EnvFilter` syntax.
    #[arg(long, env = "ROSTER_LOG", default_value = "info")]
    pub log: String,

    /// Log output format.
    #[arg(long, env = "ROSTER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// JSON file with the media records known to the library.
    #[arg(long, env = "ROSTER_MEDIA")]
    pub media: Option<PathBuf>,

    /// Extra metadata rule, as `key=rules` (for example `subtitle=required|max:80`).
    /// Repeat the flag or separate entries with `;` in the environment variable.
    #[arg(long = "meta-rule", env = "ROSTER_META_RULES", value_delimiter = ';')]
    pub meta_rules: Vec<String>,

    /// Seconds to wait for in-flight requests on shutdown.
    #[arg(long, env = "ROSTER_SHUTDOWN_TIMEOUT", default_value_t = 10)]
    pub shutdown_timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_owned(),
            per_page: DEFAULT_PER_PAGE,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            log: "info".to_owned(),
            log_format: LogFormat::Pretty,
            media: None,
            meta_rules: Vec::new(),
            shutdown_timeout: 10,
        }
    }
}

/// Errors raised while turning configuration into a running service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A `--meta-rule` entry could not be parsed.
    #[error("invalid metadata rule `{definition}`: {source}")]
    MetaRule {
        /// The offending entry.
        definition: String,
        /// Parse failure.
        source: RuleParseError,
    },
    /// The media file could not be read.
    #[error("failed to read media file {path}: {source}")]
    MediaRead {
        /// Media file path.
        path: PathBuf,
        /// I/O failure.
        source: std::io::Error,
    },
    /// The media file is not a JSON list of media records.
    #[error("failed to parse media file {path}: {source}")]
    MediaParse {
        /// Media file path.
        path: PathBuf,
        /// JSON failure.
        source: serde_json::Error,
    },
}

impl Config {
    /// SEO metadata rules extended with the configured `--meta-rule` entries.
    pub fn meta_rule_set(&self) -> Result<MetaRuleSet, ConfigError> {
        let mut rules = MetaRuleSet::seo();
        for definition in self.meta_rules.iter().filter(|d| !d.trim().is_empty()) {
            rules
                .push_definition(definition)
                .map_err(|source| ConfigError::MetaRule {
                    definition: definition.clone(),
                    source,
                })?;
        }
        Ok(rules)
    }

    /// Grace period for in-flight requests on shutdown.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

#[cfg(test)]
mod tests {
    use roster::MetaRules;

    use super::*;

    #[test]
    fn test_parse_flags() {
        let config = Config::try_parse_from([
            "roster-server",
            "--listen",
            "0.0.0.0:8080",
            "--per-page",
            "30",
            "--log-format",
            "json",
            "--meta-rule",
            "subtitle=max:80",
            "--meta-rule",
            "title=required|max:120",
        ])
        .unwrap();
        assert_eq!(config.listen, "0.0.0.0:8080");
        assert_eq!(config.per_page, 30);
        assert_eq!(config.log_format, LogFormat::Json);

        let rules = config.meta_rule_set().unwrap();
        assert!(rules.rules()["title"].is_required());
        assert!(rules.rules().contains_key("subtitle"));
        assert!(rules.rules().contains_key("description"));
    }

    #[test]
    fn test_bad_meta_rule() {
        let config = Config {
            meta_rules: vec!["title=unique".to_owned()],
            ..Config::default()
        };
        let err = config.meta_rule_set().unwrap_err();
        assert!(err.to_string().contains("title=unique"));
    }
}

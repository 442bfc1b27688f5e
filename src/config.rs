//! Settings from the config file and the command line

use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use ktail_logs::StreamConfig;

use crate::cli::Args;

/// Optional settings read from `config.toml`
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub tail_lines: Option<i64>,
    pub no_color: Option<bool>,
    pub watch: Option<bool>,
    pub ready_poll_interval_secs: Option<u64>,
    pub ready_max_attempts: Option<u32>,
    pub queue_capacity: Option<usize>,
    pub shutdown_grace_ms: Option<u64>,
}

impl FileConfig {
    /// `~/.config/ktail/config.toml` (platform config dir)
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join("ktail").join("config.toml"))
    }

    /// Load the config file
    ///
    /// A missing file at the default location means "no overrides"; a
    /// missing explicit path is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = fs::read_to_string(&path)
            .context(format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content).context(format!("Invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Resolved settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub stream: StreamConfig,
    pub namespace: Option<String>,
    pub pods: Vec<String>,
    pub container: Option<String>,
    pub context: Option<String>,
    pub color: bool,
    pub watch: bool,
}

impl Settings {
    /// Merge flags over the config file over built-in defaults
    pub fn resolve(args: Args, file: FileConfig) -> Result<Self> {
        let defaults = StreamConfig::default();

        let tail_lines = args
            .tail
            .or(file.tail_lines)
            .unwrap_or(defaults.tail_lines);
        if tail_lines < 1 {
            bail!("tail_lines must be a positive number, got {}", tail_lines);
        }

        let ready_max_attempts = file
            .ready_max_attempts
            .unwrap_or(defaults.ready_max_attempts);
        if ready_max_attempts < 1 {
            bail!("ready_max_attempts must be at least 1");
        }

        let queue_capacity = file.queue_capacity.unwrap_or(defaults.queue_capacity);
        if queue_capacity < 1 {
            bail!("queue_capacity must be at least 1");
        }

        let stream = StreamConfig {
            tail_lines,
            ready_poll_interval: file
                .ready_poll_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.ready_poll_interval),
            ready_max_attempts,
            queue_capacity,
            shutdown_grace: file
                .shutdown_grace_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.shutdown_grace),
        };

        let no_color = args.no_color || file.no_color.unwrap_or(false);

        Ok(Self {
            stream,
            namespace: args.namespace,
            pods: args.pods,
            container: args.container,
            context: args.context,
            color: !no_color && std::io::stdout().is_terminal(),
            watch: !args.no_watch && file.watch.unwrap_or(true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let file = FileConfig::parse(
            r#"
            tail_lines = 200
            no_color = true
            watch = false
            ready_poll_interval_secs = 5
            ready_max_attempts = 12
            queue_capacity = 500
            shutdown_grace_ms = 1500
            "#,
        )
        .unwrap();

        assert_eq!(file.tail_lines, Some(200));
        assert_eq!(file.watch, Some(false));
        assert_eq!(file.ready_max_attempts, Some(12));
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        assert_eq!(FileConfig::parse("").unwrap(), FileConfig::default());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(FileConfig::parse("tail = 5").is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = FileConfig::load(Some(Path::new("/nonexistent/ktail.toml"))).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/ktail.toml"));
    }

    #[test]
    fn test_flags_override_file() {
        let args = Args {
            tail: Some(50),
            no_watch: true,
            ..Default::default()
        };
        let file = FileConfig {
            tail_lines: Some(200),
            ready_poll_interval_secs: Some(2),
            ..Default::default()
        };

        let settings = Settings::resolve(args, file).unwrap();
        assert_eq!(settings.stream.tail_lines, 50);
        assert_eq!(settings.stream.ready_poll_interval, Duration::from_secs(2));
        assert_eq!(
            settings.stream.ready_max_attempts,
            StreamConfig::default().ready_max_attempts
        );
        assert!(!settings.watch);
    }

    #[test]
    fn test_file_fills_unset_flags() {
        let file = FileConfig {
            tail_lines: Some(200),
            watch: Some(false),
            ..Default::default()
        };

        let settings = Settings::resolve(Args::default(), file).unwrap();
        assert_eq!(settings.stream.tail_lines, 200);
        assert!(!settings.watch);
    }

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::resolve(Args::default(), FileConfig::default()).unwrap();
        assert_eq!(settings.stream, StreamConfig::default());
        assert!(settings.watch);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let zero_tail = FileConfig {
            tail_lines: Some(0),
            ..Default::default()
        };
        assert!(Settings::resolve(Args::default(), zero_tail).is_err());

        let zero_queue = FileConfig {
            queue_capacity: Some(0),
            ..Default::default()
        };
        assert!(Settings::resolve(Args::default(), zero_queue).is_err());

        let zero_attempts = FileConfig {
            ready_max_attempts: Some(0),
            ..Default::default()
        };
        assert!(Settings::resolve(Args::default(), zero_attempts).is_err());
    }
}

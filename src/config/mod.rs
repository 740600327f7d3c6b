mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    expand_paths(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./streamforge.toml",
        "~/.config/streamforge/config.toml",
        "/etc/streamforge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    Ok(Config::default())
}

fn expand_tilde(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

fn expand_paths(config: &mut Config) {
    if let Some(dir) = config.streaming.cache_dir.as_mut() {
        *dir = expand_tilde(dir);
    }
    for path in config.library.paths.iter_mut() {
        *path = expand_tilde(path);
    }
    for path in [&mut config.tools.ffmpeg_path, &mut config.tools.ffprobe_path]
        .into_iter()
        .flatten()
    {
        *path = expand_tilde(path);
    }
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    let streaming = &config.streaming;
    if streaming.monitor_interval_ms == 0 {
        anyhow::bail!("streaming.monitor_interval_ms must be greater than 0");
    }
    if streaming.max_segment_gap == 0 {
        anyhow::bail!("streaming.max_segment_gap must be greater than 0");
    }
    if streaming.max_segment_buffer == 0 {
        anyhow::bail!("streaming.max_segment_buffer must be greater than 0");
    }

    if streaming.cache_dir.is_none() {
        tracing::warn!("streaming.cache_dir is not set, live transcoding is disabled");
    }

    // Validate library paths exist
    for path in &config.library.paths {
        if !path.exists() {
            tracing::warn!("Library path does not exist: {:?}", path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::StreamingResolution;

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert!(config.streaming.cache_dir.is_none());
        assert_eq!(
            config.streaming.max_transcode_size,
            StreamingResolution::Original
        );
        assert_eq!(config.streaming.monitor_interval_ms, 200);
        assert_eq!(config.streaming.max_segment_wait_secs, 15);
        assert_eq!(config.streaming.max_segment_gap, 5);
        assert_eq!(config.streaming.max_segment_buffer, 15);
        assert_eq!(config.streaming.max_idle_secs, 30);
    }

    #[test]
    fn test_load_streaming_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9000

[streaming]
cache_dir = "/var/cache/streamforge"
max_transcode_size = "FULL_HD"
max_idle_secs = 60
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.streaming.cache_dir.as_deref(),
            Some(Path::new("/var/cache/streamforge"))
        );
        assert_eq!(
            config.streaming.max_transcode_size,
            StreamingResolution::FullHd
        );
        assert_eq!(config.streaming.max_idle_secs, 60);
        assert_eq!(config.streaming.max_segment_gap, 5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "[server]\nport = 0\n").unwrap();
        assert!(load_config(&path).is_err());

        std::fs::write(&path, "[streaming]\nmax_segment_buffer = 0\n").unwrap();
        assert!(load_config(&path).is_err());

        std::fs::write(&path, "[streaming]\nmax_transcode_size = \"HUGE\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}

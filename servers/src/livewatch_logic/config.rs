use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};

use lib_livewatch::retrieve::RetryConfig;
use lib_livewatch::sources::{TwitchConfig, YoutubeConfig};

const DEFAULT_CONFIG_FILE: &str = "server_livewatch.conf";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Twitch / YouTube live-status broadcaster", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "LIVEWATCH_PORT", help = "Port for HTTP and WebSocket clients.")]
    pub port: Option<u16>,

    #[clap(long, env = "LIVEWATCH_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "LIVEWATCH_ROSTER", help = "JSON file listing the tracked creators.")]
    pub roster_path: Option<PathBuf>,

    #[clap(long, env = "LIVEWATCH_PUBLIC_DIR", help = "Directory of static files served at /.")]
    pub public_dir: Option<PathBuf>,

    #[clap(long, env = "LIVEWATCH_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "LIVEWATCH_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "LIVEWATCH_CRON", help = "Six-field cron expression for scheduled refreshes.")]
    pub cron_schedule: Option<String>,

    #[clap(long, env = "TWITCH_CLIENT_ID", help = "Twitch application client id.")]
    pub twitch_client_id: Option<String>,

    #[clap(long, env = "TWITCH_TOKEN", hide_env_values = true, help = "Twitch app access token.")]
    pub twitch_token: Option<String>,

    #[clap(long, env = "LIVEWATCH_TWITCH_API_BASE", help = "Twitch Helix API root.")]
    pub twitch_api_base: Option<String>,

    #[clap(long, env = "LIVEWATCH_YOUTUBE_BASE", help = "YouTube site root.")]
    pub youtube_base: Option<String>,

    #[clap(long, env = "LIVEWATCH_TWITCH_TIMEOUT_MS", help = "Timeout per Twitch request.")]
    pub twitch_timeout_ms: Option<u64>,

    #[clap(long, env = "LIVEWATCH_TWITCH_MAX_ATTEMPTS", help = "Attempts per Twitch call, first one included.")]
    pub twitch_max_attempts: Option<u32>,

    #[clap(long, env = "LIVEWATCH_TWITCH_RETRY_DELAY_MS", help = "Pause between Twitch attempts.")]
    pub twitch_retry_delay_ms: Option<u64>,

    #[clap(long, env = "LIVEWATCH_YOUTUBE_FEED_TIMEOUT_MS", help = "Timeout for the YouTube video feed.")]
    pub youtube_feed_timeout_ms: Option<u64>,

    #[clap(long, env = "LIVEWATCH_YOUTUBE_LIVE_TIMEOUT_MS", help = "Timeout for the YouTube live page.")]
    pub youtube_live_timeout_ms: Option<u64>,

    #[clap(long, env = "LIVEWATCH_MAX_CONCURRENCY", help = "Max roster entries polled at once (0 = no cap).")]
    pub max_concurrency: Option<usize>,
}

impl Config {
    fn defaults() -> Config {
        Config {
            port: Some(3000),
            roster_path: Some(PathBuf::from("streamers.json")),
            public_dir: Some(PathBuf::from("public")),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            cron_schedule: Some("0 * * * * *".to_string()),
            twitch_api_base: Some("https://api.twitch.tv/helix/".to_string()),
            youtube_base: Some("https://www.youtube.com/".to_string()),
            twitch_timeout_ms: Some(7000),
            twitch_max_attempts: Some(3),
            twitch_retry_delay_ms: Some(500),
            youtube_feed_timeout_ms: Some(10_000),
            youtube_live_timeout_ms: Some(10_000),
            ..Default::default()
        }
    }

    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            roster_path: other.roster_path.or(self.roster_path),
            public_dir: other.public_dir.or(self.public_dir),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            cron_schedule: other.cron_schedule.or(self.cron_schedule),
            twitch_client_id: other.twitch_client_id.or(self.twitch_client_id),
            twitch_token: other.twitch_token.or(self.twitch_token),
            twitch_api_base: other.twitch_api_base.or(self.twitch_api_base),
            youtube_base: other.youtube_base.or(self.youtube_base),
            twitch_timeout_ms: other.twitch_timeout_ms.or(self.twitch_timeout_ms),
            twitch_max_attempts: other.twitch_max_attempts.or(self.twitch_max_attempts),
            twitch_retry_delay_ms: other.twitch_retry_delay_ms.or(self.twitch_retry_delay_ms),
            youtube_feed_timeout_ms: other.youtube_feed_timeout_ms.or(self.youtube_feed_timeout_ms),
            youtube_live_timeout_ms: other.youtube_live_timeout_ms.or(self.youtube_live_timeout_ms),
            max_concurrency: other.max_concurrency.or(self.max_concurrency),
        }
    }
}

/// Fully resolved settings; every option has a value.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub roster_path: PathBuf,
    pub public_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub cron_schedule: String,
    pub twitch: TwitchConfig,
    pub youtube: YoutubeConfig,
    pub max_concurrency: Option<NonZeroUsize>,
    /// The config file that was merged in, if any.
    pub config_file: Option<PathBuf>,
}

impl Settings {
    /// `config` must already be merged over [`Config::defaults`].
    fn from_config(config: Config, config_file: Option<PathBuf>) -> Settings {
        let ms = |v: Option<u64>| Duration::from_millis(v.unwrap_or_default());
        Settings {
            port: config.port.unwrap_or_default(),
            roster_path: config.roster_path.unwrap_or_default(),
            public_dir: config.public_dir.unwrap_or_default(),
            log_dir: config.log_dir.unwrap_or_default(),
            log_level: config.log_level.unwrap_or_default(),
            cron_schedule: config.cron_schedule.unwrap_or_default(),
            twitch: TwitchConfig {
                api_base: config.twitch_api_base.unwrap_or_default(),
                client_id: config.twitch_client_id.filter(|s| !s.trim().is_empty()),
                token: config.twitch_token.filter(|s| !s.trim().is_empty()),
                timeout: ms(config.twitch_timeout_ms),
                retry: RetryConfig {
                    max_attempts: config.twitch_max_attempts.unwrap_or_default().max(1),
                    delay: ms(config.twitch_retry_delay_ms),
                },
            },
            youtube: YoutubeConfig {
                base: config.youtube_base.unwrap_or_default(),
                feed_timeout: ms(config.youtube_feed_timeout_ms),
                live_timeout: ms(config.youtube_live_timeout_ms),
            },
            max_concurrency: config.max_concurrency.and_then(NonZeroUsize::new),
            config_file,
        }
    }
}

/// Resolves settings from the process arguments and environment.
pub fn load_config() -> Result<Settings> {
    resolve_config(Config::parse())
}

/// Precedence: defaults < config file < environment / CLI (`cli`).
///
/// A missing config file is fine; one that exists but cannot be read or
/// parsed is a startup error.
pub fn resolve_config(cli: Config) -> Result<Settings> {
    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current_config = Config::defaults();
    let mut used_file = None;

    if config_file_path.exists() {
        current_config = current_config.merge(read_config_file(&config_file_path)?);
        used_file = Some(config_file_path);
    }

    current_config = current_config.merge(cli);
    reject_zero_durations(&current_config)?;
    Ok(Settings::from_config(current_config, used_file))
}

/// A zero timeout fails every request before it is sent.
fn reject_zero_durations(config: &Config) -> Result<()> {
    let durations = [
        ("twitchTimeoutMs", config.twitch_timeout_ms),
        ("twitchRetryDelayMs", config.twitch_retry_delay_ms),
        ("youtubeFeedTimeoutMs", config.youtube_feed_timeout_ms),
        ("youtubeLiveTimeoutMs", config.youtube_live_timeout_ms),
    ];
    if let Some((name, _)) = durations.iter().find(|(_, v)| *v == Some(0)) {
        anyhow::bail!("{} must be greater than zero", name);
    }
    Ok(())
}

fn read_config_file(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse config file: {}", path.display()))
}

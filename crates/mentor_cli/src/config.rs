//! Configuration file support for mentor.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `MENTOR_`, sections split by `__`,
//!    e.g. `MENTOR_API__TOKEN`)
//! 3. Config file (./mentor.toml, then ~/.config/mentor/config.toml)
//! 4. The Exercism CLI's own `user.json` (API token) and Pushover's
//!    `user.json` (app token and user key)
//! 5. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [api]
//! token = "..."          # defaults to the token stored by `exercism configure`
//! base_url = "https://exercism.org/api/v2"
//! timeout_secs = 30
//! get_pacing_ms = 200
//! mutation_pacing_ms = 500
//!
//! [retry]
//! max_attempts = 3
//! min_delay_secs = 15
//! max_delay_secs = 60
//!
//! [watch]
//! interval_secs = 900
//! pipe = "/run/user/1000/ii/localhost/#notifications/in"
//!
//! [pushover]
//! token = "..."
//! user = "..."
//!
//! [discussions]
//! age_days = 30
//! nudge_message = "Still working on this?"
//!
//! [dashboard]
//! output = "/var/www/mentoring.html"
//! tracks = ["awk", "jq", "bash", "python"]
//! refresh_secs = 180
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::{BaseDirs, ProjectDirs};
use mentor::{ClientConfig, DEFAULT_API_BASE, RetryPolicy};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub retry: RetryConfig,
    pub watch: WatchConfig,
    pub pushover: PushoverConfig,
    pub discussions: DiscussionsConfig,
    pub dashboard: DashboardConfig,
}

/// Mentoring API connection settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bearer token. Defaults to the one saved by the Exercism CLI.
    pub token: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Pause after every GET.
    pub get_pacing_ms: u64,
    /// Pause after every POST or PATCH.
    pub mutation_pacing_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: DEFAULT_API_BASE.to_string(),
            timeout_secs: 30,
            get_pacing_ms: 200,
            mutation_pacing_ms: 500,
        }
    }
}

/// Backoff for transient failures on reads.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub min_delay_secs: u64,
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay_secs: 15,
            max_delay_secs: 60,
        }
    }
}

/// Notification watcher settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub interval_secs: u64,
    /// File or FIFO that receives one line per new notification.
    pub pipe: Option<PathBuf>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: mentor::DEFAULT_POLL_INTERVAL.as_secs(),
            pipe: None,
        }
    }
}

/// Pushover credentials. Pushes are sent only when both are set.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PushoverConfig {
    pub token: Option<String>,
    pub user: Option<String>,
    pub device: Option<String>,
}

impl PushoverConfig {
    pub fn is_configured(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiscussionsConfig {
    /// Days of inactivity before a discussion counts as stale.
    pub age_days: u32,
    /// Replaces the stock reminder text.
    pub nudge_message: Option<String>,
}

impl Default for DiscussionsConfig {
    fn default() -> Self {
        Self {
            age_days: 30,
            nudge_message: None,
        }
    }
}

/// Mentor-request HTML dashboard settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub output: Option<PathBuf>,
    pub tracks: Vec<String>,
    pub refresh_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            output: None,
            tracks: ["awk", "jq", "bash", "python"]
                .into_iter()
                .map(String::from)
                .collect(),
            refresh_secs: 180,
        }
    }
}

/// The parts of a third-party `user.json` we read.
#[derive(Debug, Default, Deserialize)]
struct UserFile {
    token: Option<String>,
    user: Option<String>,
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. Exercism and Pushover `user.json` files
    /// 3. XDG config file (~/.config/mentor/config.toml)
    /// 4. Local config file (./mentor.toml)
    /// 5. Environment variables with MENTOR_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = Self::exercism_user_file()
            && let Some(token) = read_user_file(&path).and_then(|f| f.token)
        {
            tracing::debug!("Using API token from {:?}", path);
            builder = set_default(builder, "api.token", token);
        }

        if let Some(path) = Self::pushover_user_file()
            && let Some(file) = read_user_file(&path)
        {
            tracing::debug!("Using Pushover credentials from {:?}", path);
            if let Some(token) = file.token {
                builder = set_default(builder, "pushover.token", token);
            }
            if let Some(user) = file.user {
                builder = set_default(builder, "pushover.user", user);
            }
        }

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("mentor.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./mentor.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("MENTOR")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("dashboard.tracks")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Client settings for the mentoring API.
    ///
    /// Fails when no token is configured anywhere.
    pub fn client_config(&self) -> Result<ClientConfig, String> {
        let token = self
            .api
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                "No API token found. Run `exercism configure --token=...` \
                 or set MENTOR_API__TOKEN."
                    .to_string()
            })?;

        let retry = RetryPolicy::new(
            self.retry.max_attempts.max(1),
            Duration::from_secs(self.retry.min_delay_secs),
            Duration::from_secs(self.retry.max_delay_secs),
        );

        Ok(ClientConfig::new(token)
            .with_base_url(self.api.base_url.clone())
            .with_timeout(Duration::from_secs(self.api.timeout_secs))
            .with_retry(retry)
            .with_pacing(
                Duration::from_millis(self.api.get_pacing_ms),
                Duration::from_millis(self.api.mutation_pacing_ms),
            ))
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch.interval_secs)
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "mentor").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// `$XDG_CONFIG_HOME/exercism/user.json`, as written by the Exercism CLI.
    pub fn exercism_user_file() -> Option<PathBuf> {
        BaseDirs::new().map(|dirs| dirs.config_dir().join("exercism").join("user.json"))
    }

    /// `$XDG_CONFIG_HOME/pushover/user.json`.
    pub fn pushover_user_file() -> Option<PathBuf> {
        BaseDirs::new().map(|dirs| dirs.config_dir().join("pushover").join("user.json"))
    }
}

fn read_user_file(path: &Path) -> Option<UserFile> {
    if !path.exists() {
        return None;
    }
    let parsed = ConfigBuilder::builder()
        .add_source(File::from(path).format(FileFormat::Json))
        .build()
        .and_then(|settings| settings.try_deserialize::<UserFile>());
    match parsed {
        Ok(file) => Some(file),
        Err(e) => {
            tracing::warn!("Ignoring unreadable {:?}: {}", path, e);
            None
        }
    }
}

fn set_default(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    key: &str,
    value: String,
) -> config::ConfigBuilder<config::builder::DefaultState> {
    match builder.clone().set_default(key, value) {
        Ok(updated) => updated,
        Err(e) => {
            tracing::warn!("Ignoring default for {}: {}", key, e);
            builder
        }
    }
}

//! Notification sinks for `mentor watch`.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use console::Term;
use mentor::{MentorClient, Notification, NotificationHandler, NotificationWatcher};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, PushoverConfig};

const PUSHOVER_URL: &str = "https://api.pushover.net/1/messages.json";
const PUSHOVER_TIMEOUT: Duration = Duration::from_secs(10);

/// Prints each notification to the terminal, or logs it when not a TTY.
pub(crate) struct ConsoleSink;

#[async_trait]
impl NotificationHandler for ConsoleSink {
    async fn handle(&self, notification: &Notification) {
        if Term::stdout().is_term() {
            println!(
                "{} {}",
                console::style(&notification.text).bold(),
                console::style(&notification.url).dim()
            );
        } else {
            tracing::info!(url = %notification.url, "{}", notification.text);
        }
    }
}

/// Appends one line per notification to a file or FIFO.
pub(crate) struct PipeSink {
    path: PathBuf,
}

impl PipeSink {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{line}\n").as_bytes()).await?;
        file.flush().await
    }
}

#[async_trait]
impl NotificationHandler for PipeSink {
    async fn handle(&self, notification: &Notification) {
        if let Err(e) = self.append(&notification.text).await {
            tracing::warn!(path = ?self.path, "Failed to write notification: {}", e);
        }
    }
}

/// Pushes each notification through the Pushover messages API.
pub(crate) struct PushoverSink {
    http: reqwest::Client,
    token: String,
    user: String,
    device: Option<String>,
}

impl PushoverSink {
    /// `None` unless both the app token and the user key are configured.
    pub(crate) fn from_config(config: &PushoverConfig) -> Result<Option<Self>, reqwest::Error> {
        let (Some(token), Some(user)) = (config.token.clone(), config.user.clone()) else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .timeout(PUSHOVER_TIMEOUT)
            .build()?;
        Ok(Some(Self {
            http,
            token,
            user,
            device: config.device.clone(),
        }))
    }

    fn form<'a>(&'a self, notification: &'a Notification) -> Vec<(&'static str, &'a str)> {
        let mut form = vec![
            ("token", self.token.as_str()),
            ("user", self.user.as_str()),
            ("message", notification.text.as_str()),
            ("url", notification.url.as_str()),
        ];
        if let Some(device) = &self.device {
            form.push(("device", device.as_str()));
        }
        form
    }
}

#[async_trait]
impl NotificationHandler for PushoverSink {
    async fn handle(&self, notification: &Notification) {
        let result = self
            .http
            .post(PUSHOVER_URL)
            .form(&self.form(notification))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);
        if let Err(e) = result {
            tracing::warn!("Pushover delivery failed: {}", e);
        }
    }
}

/// Hands every notification to each sink in turn.
pub(crate) struct Fanout {
    sinks: Vec<Box<dyn NotificationHandler>>,
}

impl Fanout {
    pub(crate) fn new(sinks: Vec<Box<dyn NotificationHandler>>) -> Self {
        Self { sinks }
    }

    pub(crate) fn len(&self) -> usize {
        self.sinks.len()
    }
}

#[async_trait]
impl NotificationHandler for Fanout {
    async fn handle(&self, notification: &Notification) {
        for sink in &self.sinks {
            sink.handle(notification).await;
        }
    }
}

/// Watch for new notifications until Ctrl+C.
pub(crate) async fn handle_watch(
    client: MentorClient,
    config: &Config,
    interval_secs: Option<u64>,
    pipe: Option<PathBuf>,
    no_pushover: bool,
    cancel: &CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let interval = interval_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.watch_interval());

    let mut sinks: Vec<Box<dyn NotificationHandler>> = vec![Box::new(ConsoleSink)];
    if let Some(path) = pipe.or_else(|| config.watch.pipe.clone()) {
        tracing::info!(path = ?path, "Appending notifications to pipe");
        sinks.push(Box::new(PipeSink::new(path)));
    }
    if !no_pushover && let Some(pushover) = PushoverSink::from_config(&config.pushover)? {
        tracing::info!("Pushing notifications via Pushover");
        sinks.push(Box::new(pushover));
    }
    let fanout = Fanout::new(sinks);

    if Term::stdout().is_term() {
        println!(
            "Watching for notifications every {}s ({} sinks). Press Ctrl+C to stop.",
            interval.as_secs(),
            fanout.len()
        );
    }

    let mut watcher = NotificationWatcher::new(client).with_interval(interval);
    watcher.run(&fanout, cancel).await?;
    Ok(())
}

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

pub const CLIENT_EMAIL_ENV: &str = "GOOGLE_CLIENT_EMAIL";
pub const PRIVATE_KEY_ENV: &str = "GOOGLE_PRIVATE_KEY";
pub const FOLDER_ID_ENV: &str = "GOOGLE_DRIVE_FOLDER_ID";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub gallery: GalleryConfig,
    #[serde(default)]
    pub page: PageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Service-account credentials and the folder holding the event photos.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DriveConfig {
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Upper bound on one Drive request, body included.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

/// Cadences and caps of the wall session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GalleryConfig {
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(default = "default_float_interval", with = "humantime_serde")]
    pub float_interval: Duration,
    #[serde(default = "default_highlight_interval", with = "humantime_serde")]
    pub highlight_interval: Duration,
    #[serde(default = "default_rotate_interval", with = "humantime_serde")]
    pub rotate_interval: Duration,
    /// A listing still pending after this long counts as a failed poll.
    #[serde(default = "default_fetch_timeout", with = "humantime_serde")]
    pub fetch_timeout: Duration,
    #[serde(default = "default_arrival_dwell", with = "humantime_serde")]
    pub arrival_dwell: Duration,
    #[serde(default = "default_highlight_dwell", with = "humantime_serde")]
    pub highlight_dwell: Duration,
    #[serde(default = "default_float_chance")]
    pub float_chance: f64,
    #[serde(default = "default_highlight_chance")]
    pub highlight_chance: f64,
    #[serde(default = "default_max_overlays")]
    pub max_overlays: usize,
    #[serde(default = "default_seed_overlays")]
    pub seed_overlays: usize,
    #[serde(default = "default_particle_count")]
    pub particle_count: usize,
    #[serde(default = "default_thumbnail_count")]
    pub thumbnail_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PageConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_heading")]
    pub heading: String,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub event_year: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let cfg: Config = serde_yaml::from_slice(&data)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        Ok(cfg)
    }

    /// Applies `GOOGLE_*` environment variables on top of the file values.
    pub fn with_env_overrides(mut self) -> Self {
        self.drive
            .apply_overrides(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.gallery.validate().context("invalid gallery settings")?;
        ensure!(
            (1..=1000).contains(&self.drive.page_size),
            "drive.page-size must be between 1 and 1000"
        );
        ensure!(
            !self.drive.request_timeout.is_zero(),
            "drive.request-timeout must be greater than zero"
        );
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip = self
            .server
            .bind_address
            .parse()
            .with_context(|| format!("invalid bind address {}", self.server.bind_address))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }
}

impl DriveConfig {
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(email) = lookup(CLIENT_EMAIL_ENV) {
            self.client_email = Some(email);
        }
        if let Some(key) = lookup(PRIVATE_KEY_ENV) {
            self.private_key = Some(key);
        }
        if let Some(folder) = lookup(FOLDER_ID_ENV) {
            self.folder_id = Some(folder);
        }
    }

    /// Private key with escaped `\n` sequences expanded, as env files store it.
    pub fn private_key_pem(&self) -> Option<String> {
        self.private_key.as_ref().map(|key| key.replace("\\n", "\n"))
    }

    pub fn folder_id(&self) -> Option<&str> {
        self.folder_id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

impl GalleryConfig {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("poll-interval", self.poll_interval),
            ("float-interval", self.float_interval),
            ("highlight-interval", self.highlight_interval),
            ("rotate-interval", self.rotate_interval),
            ("fetch-timeout", self.fetch_timeout),
        ] {
            ensure!(!value.is_zero(), "{name} must be greater than zero");
        }
        for (name, value) in [
            ("float-chance", self.float_chance),
            ("highlight-chance", self.highlight_chance),
        ] {
            ensure!(
                (0.0..=1.0).contains(&value),
                "{name} must be between 0 and 1"
            );
        }
        ensure!(self.max_overlays > 0, "max-overlays must be greater than zero");
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            client_email: None,
            private_key: None,
            folder_id: None,
            page_size: default_page_size(),
            api_base: default_api_base(),
            token_url: default_token_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            float_interval: default_float_interval(),
            highlight_interval: default_highlight_interval(),
            rotate_interval: default_rotate_interval(),
            fetch_timeout: default_fetch_timeout(),
            arrival_dwell: default_arrival_dwell(),
            highlight_dwell: default_highlight_dwell(),
            float_chance: default_float_chance(),
            highlight_chance: default_highlight_chance(),
            max_overlays: default_max_overlays(),
            seed_overlays: default_seed_overlays(),
            particle_count: default_particle_count(),
            thumbnail_count: default_thumbnail_count(),
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            heading: default_heading(),
            event_name: None,
            event_year: None,
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_page_size() -> u32 {
    100
}

fn default_api_base() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_float_interval() -> Duration {
    Duration::from_secs(3)
}

fn default_highlight_interval() -> Duration {
    Duration::from_secs(4)
}

fn default_rotate_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_arrival_dwell() -> Duration {
    Duration::from_secs(3)
}

fn default_highlight_dwell() -> Duration {
    Duration::from_secs(2)
}

fn default_float_chance() -> f64 {
    0.3
}

fn default_highlight_chance() -> f64 {
    0.2
}

fn default_max_overlays() -> usize {
    30
}

fn default_seed_overlays() -> usize {
    15
}

fn default_particle_count() -> usize {
    50
}

fn default_thumbnail_count() -> usize {
    15
}

fn default_title() -> String {
    "Live Photo Gallery".to_string()
}

fn default_heading() -> String {
    "Live Photo Gallery".to_string()
}

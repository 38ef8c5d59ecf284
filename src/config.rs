use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use url::Url;

use crate::impose::LayoutConfig;

pub const DEFAULT_API_BASE: &str = "https://boardgamegeek.com/xmlapi2";
pub const DEFAULT_SITE_BASE: &str = "https://boardgamegeek.com";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Connection settings shared by the inventory, detail and scrape requests.
#[derive(Debug, Clone)]
pub struct BggConfig {
    pub api_base: Url,
    pub site_base: Url,
    pub token: Option<String>,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for BggConfig {
    fn default() -> Self {
        Self {
            api_base: Url::parse(DEFAULT_API_BASE).expect("default api base is a valid url"),
            site_base: Url::parse(DEFAULT_SITE_BASE).expect("default site base is a valid url"),
            token: None,
            user_agent: default_user_agent(),
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl BggConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = env_non_empty("BGGDECK_API_BASE") {
            config.api_base = Url::parse(&raw)
                .with_context(|| format!("invalid BGGDECK_API_BASE={raw:?}"))?;
        }
        if let Some(raw) = env_non_empty("BGGDECK_SITE_BASE") {
            config.site_base = Url::parse(&raw)
                .with_context(|| format!("invalid BGGDECK_SITE_BASE={raw:?}"))?;
        }
        config.token = env_non_empty("BGG_API_TOKEN");
        if let Some(raw) = env_non_empty("BGGDECK_HTTP_TIMEOUT_SECS") {
            let secs = raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .with_context(|| format!("invalid BGGDECK_HTTP_TIMEOUT_SECS={raw:?}"))?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Applies `--api-base` / `--site-base` style overrides on top of the environment.
    pub fn with_overrides(
        mut self,
        api_base: Option<&str>,
        site_base: Option<&str>,
    ) -> anyhow::Result<Self> {
        if let Some(raw) = api_base {
            self.api_base = Url::parse(raw).context("parse --api-base")?;
        }
        if let Some(raw) = site_base {
            self.site_base = Url::parse(raw).context("parse --site-base")?;
        }
        Ok(self)
    }

    pub fn http_client(&self) -> anyhow::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(self.user_agent.clone())
            .build()
            .context("build http client")
    }
}

fn default_user_agent() -> String {
    format!("bggdeck/{}", env!("CARGO_PKG_VERSION"))
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

pub const DEFAULT_CACHE_CAPACITY: usize = 500;
pub const DEFAULT_CACHE_TTL_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl: chrono::Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            ttl: chrono::Duration::days(DEFAULT_CACHE_TTL_DAYS),
        }
    }
}

impl CacheConfig {
    pub fn new(capacity: usize, ttl_days: i64) -> anyhow::Result<Self> {
        if capacity == 0 {
            anyhow::bail!("cache capacity must be > 0");
        }
        if ttl_days <= 0 {
            anyhow::bail!("cache ttl must be > 0 days");
        }
        let ttl = chrono::TimeDelta::try_days(ttl_days).context("cache ttl out of range")?;
        Ok(Self { capacity, ttl })
    }
}

/// Reads a layout YAML file. Missing keys keep their defaults.
pub fn load_layout_config(path: &Path) -> anyhow::Result<LayoutConfig> {
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("read layout config: {}", path.display()))?;
    let config: LayoutConfig = serde_yaml::from_str(&yaml)
        .with_context(|| format!("parse layout config: {}", path.display()))?;
    Ok(config)
}

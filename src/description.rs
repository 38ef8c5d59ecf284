use std::num::NonZeroUsize;
use std::sync::{Arc, LazyLock};

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use lru::LruCache;
use reqwest::header::ACCEPT;
use scraper::{Html, Selector};
use tokio::sync::Mutex;
use url::Url;

use crate::config::CacheConfig;
use crate::formats::GameRecord;

/// Meta fields tried in order for a short description.
static DESCRIPTION_SELECTORS: LazyLock<[Selector; 2]> = LazyLock::new(|| {
    [
        Selector::parse(r#"meta[name="description"]"#).expect("meta description selector"),
        Selector::parse(r#"meta[property="og:description"]"#).expect("og description selector"),
    ]
});

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: String,
    pub inserted_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

/// Short descriptions scraped from each item's public page, kept in a
/// bounded LRU with a fixed time-to-live counted from insertion.
///
/// Only found descriptions are stored; a miss or a failed fetch leaves the
/// cache untouched so the next lookup for that id fetches again.
pub struct DescriptionCache {
    client: reqwest::Client,
    site_base: Url,
    ttl: chrono::Duration,
    entries: Mutex<LruCache<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl DescriptionCache {
    pub fn new(client: reqwest::Client, site_base: Url, config: CacheConfig) -> anyhow::Result<Self> {
        Self::with_clock(client, site_base, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        client: reqwest::Client,
        site_base: Url,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let capacity = NonZeroUsize::new(config.capacity)
            .ok_or_else(|| anyhow::anyhow!("description cache capacity must be > 0"))?;
        if site_base.cannot_be_a_base() {
            anyhow::bail!("site base url cannot carry a path: {site_base}");
        }
        Ok(Self {
            client,
            site_base,
            ttl: config.ttl,
            entries: Mutex::new(LruCache::new(capacity)),
            clock,
        })
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Cached description for `id`, or one scraped now. `None` on a miss.
    pub async fn get_or_fetch(&self, id: &str) -> Option<String> {
        if let Some(hit) = self.lookup(id).await {
            tracing::debug!(id, "description cache hit");
            return Some(hit);
        }
        tracing::debug!(id, "description cache miss; fetching");

        let description = match self.fetch(id).await {
            Ok(Some(description)) => description,
            Ok(None) => {
                tracing::warn!(id, "no description found");
                return None;
            }
            Err(err) => {
                tracing::warn!(id, err = %format!("{err:#}"), "description fetch failed");
                return None;
            }
        };

        let now = self.clock.now();
        self.entries.lock().await.put(
            id.to_owned(),
            CacheEntry {
                value: description.clone(),
                inserted_at: now,
                last_accessed_at: now,
            },
        );
        Some(description)
    }

    async fn lookup(&self, id: &str) -> Option<String> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        match entries.get_mut(id) {
            Some(entry) if now.signed_duration_since(entry.inserted_at) < self.ttl => {
                entry.last_accessed_at = now;
                return Some(entry.value.clone());
            }
            Some(_) => {}
            None => return None,
        }
        entries.pop(id);
        tracing::debug!(id, "description cache entry expired");
        None
    }

    fn page_url(&self, id: &str) -> anyhow::Result<Url> {
        let mut url = self.site_base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("site base url cannot carry a path: {}", self.site_base))?
            .pop_if_empty()
            .push("boardgame")
            .push(id);
        Ok(url)
    }

    async fn fetch(&self, id: &str) -> anyhow::Result<Option<String>> {
        let url = self.page_url(id)?;
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("GET {url}: {status}");
        }

        let html = response.text().await.context("read page body")?;
        Ok(extract_short_description(&html))
    }
}

/// `<meta name="description">`, falling back to `<meta property="og:description">`.
pub fn extract_short_description(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    DESCRIPTION_SELECTORS.iter().find_map(|selector| {
        document
            .select(selector)
            .filter_map(|element| element.value().attr("content"))
            .map(str::trim)
            .find(|content| !content.is_empty())
            .map(str::to_owned)
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichSummary {
    pub found: usize,
    pub missing: usize,
}

/// Looks up descriptions for every record still lacking one, at most
/// `concurrency` lookups in flight. Records keep their positions; a miss or a
/// failed task only affects its own record.
pub async fn enrich(
    records: &mut [GameRecord],
    cache: Arc<DescriptionCache>,
    concurrency: usize,
) -> EnrichSummary {
    let pending = records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.description.is_none())
        .map(|(index, record)| (index, record.id.clone()))
        .collect::<Vec<_>>();

    let mut summary = EnrichSummary::default();
    if pending.is_empty() {
        return summary;
    }

    let concurrency = concurrency.max(1).min(pending.len());
    tracing::info!(records = pending.len(), concurrency, "enrich descriptions");

    let mut join_set = tokio::task::JoinSet::new();
    let mut next = 0usize;

    while next < pending.len() || !join_set.is_empty() {
        while next < pending.len() && join_set.len() < concurrency {
            let (index, id) = pending[next].clone();
            let cache = Arc::clone(&cache);
            join_set.spawn(async move {
                let description = cache.get_or_fetch(&id).await;
                (index, description)
            });
            next += 1;
        }

        let Some(joined) = join_set.join_next().await else {
            break;
        };
        match joined {
            Ok((index, Some(description))) => {
                if records[index].attach_description(description) {
                    summary.found += 1;
                }
            }
            Ok((_, None)) => summary.missing += 1,
            Err(err) => {
                tracing::warn!(?err, "description task failed");
                summary.missing += 1;
            }
        }
    }

    tracing::info!(
        found = summary.found,
        missing = summary.missing,
        "enrich descriptions done"
    );
    summary
}

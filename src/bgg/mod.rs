pub mod collection;
pub mod schema;
pub mod thing;

use reqwest::header::{ACCEPT, CACHE_CONTROL, PRAGMA};
use url::Url;

use crate::config::BggConfig;
use crate::error::FetchError;

pub use collection::CollectionOutcome;

/// Client for the catalog's XML API (inventory + item detail).
#[derive(Debug, Clone)]
pub struct BggClient {
    client: reqwest::Client,
    config: BggConfig,
}

/// Body and status of a completed request. Non-success statuses other than
/// those the caller asked to keep are already turned into errors.
struct XmlResponse {
    status: reqwest::StatusCode,
    body: String,
}

impl BggClient {
    pub fn new(config: BggConfig) -> anyhow::Result<Self> {
        let client = config.http_client()?;
        Ok(Self { client, config })
    }

    pub fn with_client(client: reqwest::Client, config: BggConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &BggConfig {
        &self.config
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    fn endpoint(&self, name: &str) -> Url {
        let mut url = self.config.api_base.clone();
        let path = format!("{}/{name}", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url
    }

    pub fn collection_url(&self, username: &str) -> Url {
        let mut url = self.endpoint("collection");
        url.query_pairs_mut()
            .append_pair("username", username)
            .append_pair("own", "1")
            .append_pair("excludesubtype", "boardgameexpansion");
        url
    }

    pub fn thing_url(&self, ids: &[String]) -> Url {
        let mut url = self.endpoint("thing");
        url.query_pairs_mut()
            .append_pair("id", &ids.join(","))
            .append_pair("stats", "1");
        url
    }

    async fn get_xml(
        &self,
        endpoint: &'static str,
        url: Url,
        bypass_cache: bool,
    ) -> Result<XmlResponse, FetchError> {
        let mut request = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/xml,text/xml;q=0.9,*/*;q=0.8");
        if let Some(token) = self.config.token.as_deref() {
            request = request.bearer_auth(token);
        }
        if bypass_cache {
            request = request
                .header(CACHE_CONTROL, "no-cache")
                .header(PRAGMA, "no-cache");
        }

        tracing::debug!(endpoint, %url, bypass_cache, "GET");
        let response = request
            .send()
            .await
            .map_err(|err| FetchError::transport(endpoint, &err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::network_status(endpoint, status));
        }

        let body = response
            .text()
            .await
            .map_err(|err| FetchError::transport(endpoint, &err))?;
        Ok(XmlResponse { status, body })
    }
}

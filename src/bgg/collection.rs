use serde::Serialize;

use crate::bgg::BggClient;
use crate::bgg::schema::{self, CollectionDocument, CollectionItem, MessageDocument};
use crate::error::FetchError;
use crate::formats::{OwnershipFlags, RawCollectionEntry};

const ENDPOINT: &str = "collection";

pub const PENDING_HINT: &str = "Your request has been queued. Please try again later.";

/// Result of one inventory request.
///
/// `Pending` is a normal outcome: the service is still building the
/// inventory and the caller decides when to ask again.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CollectionOutcome {
    Ready {
        total_items: usize,
        items: Vec<RawCollectionEntry>,
    },
    Pending {
        message: String,
    },
}

impl CollectionOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

impl BggClient {
    /// Fetches the owned, non-expansion inventory of `username`.
    ///
    /// `force` asks intermediaries not to serve a cached copy; parsing is the
    /// same either way. A queued response is returned as
    /// [`CollectionOutcome::Pending`] and never retried here.
    pub async fn fetch_collection(
        &self,
        username: &str,
        force: bool,
    ) -> Result<CollectionOutcome, FetchError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(FetchError::validation(ENDPOINT, "username is empty"));
        }

        let url = self.collection_url(username);
        let response = self.get_xml(ENDPOINT, url, force).await?;

        if response.status == reqwest::StatusCode::ACCEPTED {
            tracing::info!(username, "collection queued (202)");
            return Ok(CollectionOutcome::Pending {
                message: PENDING_HINT.to_owned(),
            });
        }

        let outcome = parse_collection(&response.body)?;
        match &outcome {
            CollectionOutcome::Ready { items, .. } => {
                tracing::info!(username, items = items.len(), "collection ready");
            }
            CollectionOutcome::Pending { .. } => {
                tracing::info!(username, "collection queued (message body)");
            }
        }
        Ok(outcome)
    }
}

/// Interprets an inventory body. A queued marker wins before any item is
/// looked at; otherwise every item must validate or the whole document fails.
pub fn parse_collection(xml: &str) -> Result<CollectionOutcome, FetchError> {
    let root = schema::root_element(xml)
        .map_err(|err| FetchError::validation(ENDPOINT, format!("malformed xml: {err}")))?;

    match root.as_deref() {
        Some("message") => {
            let message: MessageDocument = quick_xml::de::from_str(xml)
                .map_err(|err| FetchError::validation(ENDPOINT, format!("decode message: {err}")))?;
            let text = message.text.unwrap_or_default();
            if is_queued_marker(&text) {
                return Ok(CollectionOutcome::Pending {
                    message: PENDING_HINT.to_owned(),
                });
            }
            Err(FetchError::validation(
                ENDPOINT,
                format!("unexpected message: {}", text.trim()),
            ))
        }
        Some(root @ ("errors" | "error")) => {
            let message = schema::service_error_message(xml, root)
                .map_err(|err| FetchError::validation(ENDPOINT, format!("decode {root}: {err}")))?;
            Err(FetchError::validation(ENDPOINT, message))
        }
        Some("items") => {
            let document: CollectionDocument = quick_xml::de::from_str(xml)
                .map_err(|err| FetchError::validation(ENDPOINT, format!("decode items: {err}")))?;
            let total_items = schema::coerce_u32(document.total_items.as_deref())
                .map(|n| n as usize)
                .unwrap_or(document.items.len());
            let items = document
                .items
                .into_iter()
                .enumerate()
                .map(|(index, item)| collection_entry(index, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(CollectionOutcome::Ready { total_items, items })
        }
        Some(other) => Err(FetchError::validation(
            ENDPOINT,
            format!("unexpected root element <{other}>"),
        )),
        None => Err(FetchError::validation(ENDPOINT, "empty document")),
    }
}

fn is_queued_marker(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains("queued") || lower.contains("try again later")
}

fn collection_entry(index: usize, item: CollectionItem) -> Result<RawCollectionEntry, FetchError> {
    let external_id = schema::non_empty(item.object_id)
        .ok_or_else(|| FetchError::validation(ENDPOINT, format!("item {index}: missing objectid")))?;
    let raw_name = item
        .names
        .iter()
        .find_map(|n| n.content())
        .map(str::to_owned)
        .ok_or_else(|| {
            FetchError::validation(ENDPOINT, format!("item {external_id}: missing name"))
        })?;
    let status = item.status.ok_or_else(|| {
        FetchError::validation(ENDPOINT, format!("item {external_id}: missing status"))
    })?;

    let ownership = OwnershipFlags {
        own: schema::coerce_flag(status.own.as_deref()),
        prev_owned: schema::coerce_flag(status.prevowned.as_deref()),
        for_trade: schema::coerce_flag(status.fortrade.as_deref()),
        want: schema::coerce_flag(status.want.as_deref()),
        want_to_play: schema::coerce_flag(status.wanttoplay.as_deref()),
        want_to_buy: schema::coerce_flag(status.wanttobuy.as_deref()),
        wishlist: schema::coerce_flag(status.wishlist.as_deref()),
        preordered: schema::coerce_flag(status.preordered.as_deref()),
        last_modified: schema::non_empty(status.lastmodified),
    };

    Ok(RawCollectionEntry {
        external_id,
        raw_name,
        year: schema::coerce_u32(item.yearpublished.as_deref()),
        image: schema::non_empty(item.image),
        thumbnail: schema::non_empty(item.thumbnail),
        ownership,
    })
}

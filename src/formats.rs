use serde::{Deserialize, Serialize};

/// One owned item from a user's inventory, as returned by the collection endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCollectionEntry {
    pub external_id: String,
    pub raw_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub ownership: OwnershipFlags,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipFlags {
    pub own: bool,
    pub prev_owned: bool,
    pub for_trade: bool,
    pub want: bool,
    pub want_to_play: bool,
    pub want_to_buy: bool,
    pub wishlist: bool,
    pub preordered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameRole {
    Primary,
    Alternate,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameEntry {
    pub role: NameRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<u32>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditRole {
    Designer,
    Artist,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditLink {
    pub role: CreditRole,
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerCounts {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Playtime {
    pub playing: Option<u32>,
    pub min: Option<u32>,
    pub max: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rank {
    pub kind: String,
    pub name: String,
    pub friendly_name: String,
    /// `None` when the catalog reports "Not Ranked".
    pub value: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingStats {
    pub average_weight: Option<f64>,
    pub average: Option<f64>,
    pub bayes_average: Option<f64>,
    pub users_rated: Option<u32>,
    pub ranks: Vec<Rank>,
}

/// Catalog detail for one id after boundary normalization: lists are always
/// lists and every numeric field is already coerced (absent on failure).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetailRecord {
    pub id: String,
    pub kind: Option<String>,
    pub names: Vec<NameEntry>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub thumbnail: Option<String>,
    pub year_published: Option<u32>,
    pub player_counts: PlayerCounts,
    pub playtime: Playtime,
    pub min_age: Option<u32>,
    pub credit_links: Vec<CreditLink>,
    pub rating_stats: RatingStats,
}

/// Canonical card record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_published: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_players: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_players: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playing_time_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub designers: Vec<String>,
    #[serde(default)]
    pub artists: Vec<String>,
}

impl GameRecord {
    /// Attaches a description unless one is already present.
    pub fn attach_description(&mut self, description: String) -> bool {
        if self.description.is_some() {
            return false;
        }
        self.description = Some(description);
        true
    }
}

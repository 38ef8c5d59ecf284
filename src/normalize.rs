use crate::formats::{
    CreditLink, CreditRole, GameRecord, NameEntry, NameRole, RawCollectionEntry, RawDetailRecord,
};

/// Credits shown per role on a card.
pub const MAX_CREDITS_PER_ROLE: usize = 2;

/// Maps a detail record (and, when known, its inventory entry) to a card record.
///
/// Pure. The inventory entry only fills gaps: image and year when the detail
/// record has none, and the name when no detail name survived validation.
/// `description` is always left unset; enrichment owns it.
pub fn normalize_record(detail: &RawDetailRecord, entry: Option<&RawCollectionEntry>) -> GameRecord {
    let name = select_name(&detail.names)
        .map(str::to_owned)
        .or_else(|| entry.map(|e| e.raw_name.clone()))
        .unwrap_or_else(|| detail.id.clone());

    GameRecord {
        id: detail.id.clone(),
        name,
        image: detail
            .image
            .clone()
            .or_else(|| entry.and_then(|e| e.image.clone())),
        year_published: detail.year_published.or_else(|| entry.and_then(|e| e.year)),
        min_players: detail.player_counts.min,
        max_players: detail.player_counts.max,
        playing_time_minutes: detail.playtime.playing,
        complexity_weight: detail.rating_stats.average_weight,
        description: None,
        designers: credits_for_role(&detail.credit_links, &CreditRole::Designer),
        artists: credits_for_role(&detail.credit_links, &CreditRole::Artist),
    }
}

/// The entry tagged primary, else the first one in document order.
pub fn select_name(names: &[NameEntry]) -> Option<&str> {
    names
        .iter()
        .find(|n| n.role == NameRole::Primary)
        .or_else(|| names.first())
        .map(|n| n.text.as_str())
}

/// Names linked under `role`, in document order, capped at [`MAX_CREDITS_PER_ROLE`].
pub fn credits_for_role(links: &[CreditLink], role: &CreditRole) -> Vec<String> {
    links
        .iter()
        .filter(|link| &link.role == role)
        .take(MAX_CREDITS_PER_ROLE)
        .map(|link| link.name.clone())
        .collect()
}

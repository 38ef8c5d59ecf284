use crate::bgg::BggClient;
use crate::bgg::schema::{self, ThingDocument, ThingItem, ValueAttr, WireName};
use crate::error::FetchError;
use crate::formats::{
    CreditLink, CreditRole, NameEntry, NameRole, PlayerCounts, Playtime, Rank, RatingStats,
    RawDetailRecord,
};

const ENDPOINT: &str = "thing";

impl BggClient {
    /// Fetches detail for every id in one request (`id=a,b,c&stats=1`).
    ///
    /// The response may hold fewer records than ids asked for; callers match
    /// by [`RawDetailRecord::id`].
    pub async fn fetch_details(&self, ids: &[String]) -> Result<Vec<RawDetailRecord>, FetchError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.thing_url(ids);
        let response = self.get_xml(ENDPOINT, url, false).await?;
        let records = parse_details(&response.body)?;
        tracing::info!(
            requested = ids.len(),
            returned = records.len(),
            "details fetched"
        );
        Ok(records)
    }
}

pub fn parse_details(xml: &str) -> Result<Vec<RawDetailRecord>, FetchError> {
    let root = schema::root_element(xml)
        .map_err(|err| FetchError::validation(ENDPOINT, format!("malformed xml: {err}")))?;

    match root.as_deref() {
        Some("items") => {
            let document: ThingDocument = quick_xml::de::from_str(xml)
                .map_err(|err| FetchError::validation(ENDPOINT, format!("decode items: {err}")))?;
            document
                .items
                .into_iter()
                .enumerate()
                .map(|(index, item)| detail_record(index, item))
                .collect()
        }
        Some(root @ ("errors" | "error")) => {
            let message = schema::service_error_message(xml, root)
                .map_err(|err| FetchError::validation(ENDPOINT, format!("decode {root}: {err}")))?;
            Err(FetchError::validation(ENDPOINT, message))
        }
        Some(other) => Err(FetchError::validation(
            ENDPOINT,
            format!("unexpected root element <{other}>"),
        )),
        None => Err(FetchError::validation(ENDPOINT, "empty document")),
    }
}

fn detail_record(index: usize, item: ThingItem) -> Result<RawDetailRecord, FetchError> {
    let id = schema::non_empty(item.id)
        .ok_or_else(|| FetchError::validation(ENDPOINT, format!("item {index}: missing id")))?;

    let names = item.names.iter().filter_map(name_entry).collect::<Vec<_>>();
    if names.is_empty() {
        return Err(FetchError::validation(
            ENDPOINT,
            format!("item {id}: missing name"),
        ));
    }

    let credit_links = item
        .links
        .into_iter()
        .filter_map(|link| {
            let name = schema::non_empty(link.value)?;
            Some(CreditLink {
                role: credit_role(link.kind.as_deref().unwrap_or_default()),
                id: link.id.unwrap_or_default(),
                name,
            })
        })
        .collect();

    let rating_stats = item
        .statistics
        .and_then(|s| s.ratings)
        .map(|ratings| RatingStats {
            average_weight: schema::coerce_f64(ValueAttr::raw(&ratings.averageweight)),
            average: schema::coerce_f64(ValueAttr::raw(&ratings.average)),
            bayes_average: schema::coerce_f64(ValueAttr::raw(&ratings.bayesaverage)),
            users_rated: schema::coerce_u32(ValueAttr::raw(&ratings.usersrated)),
            ranks: ratings
                .ranks
                .map(|r| r.ranks)
                .unwrap_or_default()
                .into_iter()
                .map(|rank| Rank {
                    kind: rank.kind.unwrap_or_default(),
                    name: rank.name.unwrap_or_default(),
                    friendly_name: rank.friendly_name.unwrap_or_default(),
                    value: schema::coerce_u32(rank.value.as_deref()),
                })
                .collect(),
        })
        .unwrap_or_default();

    Ok(RawDetailRecord {
        id,
        kind: schema::non_empty(item.kind),
        names,
        description: schema::non_empty(item.description),
        image: schema::non_empty(item.image),
        thumbnail: schema::non_empty(item.thumbnail),
        year_published: schema::coerce_u32(ValueAttr::raw(&item.yearpublished)),
        player_counts: PlayerCounts {
            min: schema::coerce_u32(ValueAttr::raw(&item.minplayers)),
            max: schema::coerce_u32(ValueAttr::raw(&item.maxplayers)),
        },
        playtime: Playtime {
            playing: schema::coerce_u32(ValueAttr::raw(&item.playingtime)),
            min: schema::coerce_u32(ValueAttr::raw(&item.minplaytime)),
            max: schema::coerce_u32(ValueAttr::raw(&item.maxplaytime)),
        },
        min_age: schema::coerce_u32(ValueAttr::raw(&item.minage)),
        credit_links,
        rating_stats,
    })
}

fn name_entry(name: &WireName) -> Option<NameEntry> {
    let text = name.content()?.to_owned();
    let role = match name.kind.as_deref().map(str::trim) {
        Some("primary") => NameRole::Primary,
        Some("alternate") => NameRole::Alternate,
        _ => NameRole::Other,
    };
    Some(NameEntry {
        role,
        sort_key: schema::coerce_u32(name.sort_index.as_deref()),
        text,
    })
}

/// `boardgamedesigner` → designer, `boardgameartist` → artist.
fn credit_role(kind: &str) -> CreditRole {
    let kind = kind.trim();
    let short = kind.strip_prefix("boardgame").unwrap_or(kind);
    match short {
        "designer" => CreditRole::Designer,
        "artist" => CreditRole::Artist,
        _ => CreditRole::Other(kind.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bgg::stub::{StubReply, StubServer};
    use crate::config::BggConfig;

    const THING_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<items termsofuse="https://boardgamegeek.com/xmlapi/termsofuse">
  <item type="boardgame" id="13">
    <thumbnail>https://cf.geekdo-images.com/catan_t.jpg</thumbnail>
    <image>https://cf.geekdo-images.com/catan.jpg</image>
    <name type="alternate" sortindex="1" value="Die Siedler von Catan"/>
    <name type="primary" sortindex="1" value="CATAN"/>
    <description>In CATAN, players try to be the dominant force on the island.</description>
    <yearpublished value="1995"/>
    <minplayers value="3"/>
    <maxplayers value="4"/>
    <poll name="suggested_numplayers" title="User Suggested Number of Players" totalvotes="10">
      <results numplayers="3"><result value="Best" numvotes="5"/></results>
    </poll>
    <playingtime value="120"/>
    <minplaytime value="60"/>
    <maxplaytime value="120"/>
    <minage value="10"/>
    <link type="boardgamecategory" id="1021" value="Economic"/>
    <link type="boardgamedesigner" id="11" value="Klaus Teuber"/>
    <link type="boardgameartist" id="12" value="Volkan Baga"/>
    <link type="boardgameartist" id="13" value="Tanja Donner"/>
    <link type="boardgameartist" id="14" value="Pete Fenlon"/>
    <statistics page="1">
      <ratings>
        <usersrated value="120000"/>
        <average value="7.1"/>
        <bayesaverage value="6.9"/>
        <ranks>
          <rank type="subtype" id="1" name="boardgame" friendlyname="Board Game Rank" value="500" bayesaverage="6.9"/>
          <rank type="family" id="5497" name="strategygames" friendlyname="Strategy Game Rank" value="Not Ranked" bayesaverage="Not Ranked"/>
        </ranks>
        <averageweight value="2.2875"/>
      </ratings>
    </statistics>
  </item>
  <item type="boardgame" id="822">
    <name type="primary" sortindex="1" value="Carcassonne"/>
    <yearpublished value="not-a-year"/>
    <minplayers value="2"/>
    <maxplayers value="5"/>
    <playingtime value=""/>
    <link type="boardgamedesigner" id="398" value="Klaus-Jürgen Wrede"/>
  </item>
</items>
"#;

    #[test]
    fn extracts_and_coerces_fields() {
        let records = parse_details(THING_XML).unwrap();
        assert_eq!(records.len(), 2);

        let catan = &records[0];
        assert_eq!(catan.id, "13");
        assert_eq!(catan.kind.as_deref(), Some("boardgame"));
        assert_eq!(catan.names.len(), 2);
        assert_eq!(catan.names[0].role, NameRole::Alternate);
        assert_eq!(catan.names[1].role, NameRole::Primary);
        assert_eq!(catan.year_published, Some(1995));
        assert_eq!(catan.player_counts, PlayerCounts { min: Some(3), max: Some(4) });
        assert_eq!(catan.playtime.playing, Some(120));
        assert_eq!(catan.min_age, Some(10));
        assert_eq!(catan.rating_stats.average_weight, Some(2.2875));
        assert_eq!(catan.rating_stats.users_rated, Some(120000));
        assert_eq!(catan.rating_stats.ranks.len(), 2);
        assert_eq!(catan.rating_stats.ranks[0].value, Some(500));
        assert_eq!(catan.rating_stats.ranks[1].value, None);

        let roles = catan
            .credit_links
            .iter()
            .map(|l| l.role.clone())
            .collect::<Vec<_>>();
        assert_eq!(
            roles,
            vec![
                CreditRole::Other("boardgamecategory".to_owned()),
                CreditRole::Designer,
                CreditRole::Artist,
                CreditRole::Artist,
                CreditRole::Artist,
            ]
        );
    }

    #[test]
    fn malformed_numbers_become_absent() {
        let records = parse_details(THING_XML).unwrap();
        let carcassonne = &records[1];
        assert_eq!(carcassonne.year_published, None);
        assert_eq!(carcassonne.playtime.playing, None);
        assert_eq!(carcassonne.player_counts.max, Some(5));
        assert_eq!(carcassonne.rating_stats, RatingStats::default());
        assert_eq!(carcassonne.description, None);
    }

    #[test]
    fn item_without_id_fails_validation() {
        let xml = r#"<items><item type="boardgame"><name type="primary" value="X"/></item></items>"#;
        let err = parse_details(xml).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("missing id"));
    }

    #[test]
    fn wrong_root_fails_validation() {
        assert!(parse_details("<html/>").unwrap_err().is_validation());
        assert!(parse_details("").unwrap_err().is_validation());
    }

    #[test]
    fn single_error_root_keeps_the_service_message() {
        let err = parse_details("<error><message>Rate limit exceeded</message></error>")
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("Rate limit exceeded"), "{err}");

        let err = parse_details("<error/>").unwrap_err();
        assert!(err.to_string().contains("service reported an error"), "{err}");
    }

    #[tokio::test]
    async fn batches_ids_into_one_request() {
        let stub = StubServer::spawn(|_| StubReply::ok(THING_XML));
        let config = BggConfig::default()
            .with_overrides(Some(&format!("{}/xmlapi2", stub.base_url)), None)
            .unwrap();
        let client = BggClient::new(config).unwrap();

        let records = client
            .fetch_details(&["13".to_owned(), "822".to_owned()])
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(stub.hits(), 1);

        let (url, headers) = stub.last_request();
        assert_eq!(url, "/xmlapi2/thing?id=13%2C822&stats=1");
        assert!(!headers.iter().any(|(k, _)| k == "authorization"));
    }

    #[tokio::test]
    async fn empty_id_list_skips_the_request() {
        let stub = StubServer::spawn(|_| StubReply::ok(THING_XML));
        let config = BggConfig::default()
            .with_overrides(Some(&stub.base_url), None)
            .unwrap();
        let client = BggClient::new(config).unwrap();

        assert!(client.fetch_details(&[]).await.unwrap().is_empty());
        assert_eq!(stub.hits(), 0);
    }

    #[tokio::test]
    async fn server_error_is_network_error() {
        let stub = StubServer::spawn(|_| StubReply::status(500, "oops"));
        let config = BggConfig::default()
            .with_overrides(Some(&stub.base_url), None)
            .unwrap();
        let client = BggClient::new(config).unwrap();

        let err = client.fetch_details(&["1".to_owned()]).await.unwrap_err();
        assert!(err.is_network());
    }
}

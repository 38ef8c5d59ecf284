//! XML wire shapes of the catalog service.
//!
//! Repeated elements (`item`, `name`, `link`, `rank`) are always decoded into a
//! `Vec`, whether the document carries one occurrence or many, so nothing past
//! this module ever sees the singleton-or-list ambiguity. Scalars stay as raw
//! strings here; coercion happens in [`coerce_u32`] / [`coerce_f64`].

use quick_xml::events::Event;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct CollectionDocument {
    #[serde(rename = "@totalitems", default)]
    pub total_items: Option<String>,
    #[serde(rename = "item", default)]
    pub items: Vec<CollectionItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CollectionItem {
    #[serde(rename = "@objectid", default)]
    pub object_id: Option<String>,
    #[serde(rename = "@subtype", default)]
    pub subtype: Option<String>,
    #[serde(rename = "name", default)]
    pub names: Vec<WireName>,
    #[serde(default)]
    pub yearpublished: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub status: Option<WireStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireStatus {
    #[serde(rename = "@own", default)]
    pub own: Option<String>,
    #[serde(rename = "@prevowned", default)]
    pub prevowned: Option<String>,
    #[serde(rename = "@fortrade", default)]
    pub fortrade: Option<String>,
    #[serde(rename = "@want", default)]
    pub want: Option<String>,
    #[serde(rename = "@wanttoplay", default)]
    pub wanttoplay: Option<String>,
    #[serde(rename = "@wanttobuy", default)]
    pub wanttobuy: Option<String>,
    #[serde(rename = "@wishlist", default)]
    pub wishlist: Option<String>,
    #[serde(rename = "@preordered", default)]
    pub preordered: Option<String>,
    #[serde(rename = "@lastmodified", default)]
    pub lastmodified: Option<String>,
}

/// `<name>` in both documents: the inventory puts the text in the element
/// body, the detail document in a `value` attribute next to a `type` tag.
#[derive(Debug, Default, Deserialize)]
pub struct WireName {
    #[serde(rename = "@type", default)]
    pub kind: Option<String>,
    #[serde(rename = "@sortindex", default)]
    pub sort_index: Option<String>,
    #[serde(rename = "@value", default)]
    pub value: Option<String>,
    #[serde(rename = "$text", default)]
    pub text: Option<String>,
}

impl WireName {
    pub fn content(&self) -> Option<&str> {
        self.value
            .as_deref()
            .or(self.text.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ThingDocument {
    #[serde(rename = "item", default)]
    pub items: Vec<ThingItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ThingItem {
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(rename = "@type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(rename = "name", default)]
    pub names: Vec<WireName>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub yearpublished: Option<ValueAttr>,
    #[serde(default)]
    pub minplayers: Option<ValueAttr>,
    #[serde(default)]
    pub maxplayers: Option<ValueAttr>,
    #[serde(default)]
    pub playingtime: Option<ValueAttr>,
    #[serde(default)]
    pub minplaytime: Option<ValueAttr>,
    #[serde(default)]
    pub maxplaytime: Option<ValueAttr>,
    #[serde(default)]
    pub minage: Option<ValueAttr>,
    #[serde(rename = "link", default)]
    pub links: Vec<WireLink>,
    #[serde(default)]
    pub statistics: Option<WireStatistics>,
}

/// `<field value="..."/>`
#[derive(Debug, Default, Deserialize)]
pub struct ValueAttr {
    #[serde(rename = "@value", default)]
    pub value: Option<String>,
}

impl ValueAttr {
    pub fn raw(attr: &Option<ValueAttr>) -> Option<&str> {
        attr.as_ref().and_then(|a| a.value.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WireLink {
    #[serde(rename = "@type", default)]
    pub kind: Option<String>,
    #[serde(rename = "@id", default)]
    pub id: Option<String>,
    #[serde(rename = "@value", default)]
    pub value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireStatistics {
    #[serde(default)]
    pub ratings: Option<WireRatings>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireRatings {
    #[serde(default)]
    pub usersrated: Option<ValueAttr>,
    #[serde(default)]
    pub average: Option<ValueAttr>,
    #[serde(default)]
    pub bayesaverage: Option<ValueAttr>,
    #[serde(default)]
    pub ranks: Option<WireRanks>,
    #[serde(default)]
    pub averageweight: Option<ValueAttr>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireRanks {
    #[serde(rename = "rank", default)]
    pub ranks: Vec<WireRank>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireRank {
    #[serde(rename = "@type", default)]
    pub kind: Option<String>,
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
    #[serde(rename = "@friendlyname", default)]
    pub friendly_name: Option<String>,
    #[serde(rename = "@value", default)]
    pub value: Option<String>,
}

/// `<message>` body the inventory endpoint sends while a request is queued.
#[derive(Debug, Default, Deserialize)]
pub struct MessageDocument {
    #[serde(rename = "$text", default)]
    pub text: Option<String>,
}

/// `<errors><error><message>..</message></error></errors>`
#[derive(Debug, Default, Deserialize)]
pub struct ErrorsDocument {
    #[serde(rename = "error", default)]
    pub errors: Vec<WireError>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireError {
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorsDocument {
    pub fn joined_messages(&self) -> String {
        let messages = self
            .errors
            .iter()
            .filter_map(WireError::text)
            .collect::<Vec<_>>();
        if messages.is_empty() {
            GENERIC_SERVICE_ERROR.to_owned()
        } else {
            messages.join("; ")
        }
    }
}

const GENERIC_SERVICE_ERROR: &str = "service reported an error";

impl WireError {
    fn text(&self) -> Option<&str> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

/// Message carried by an `<errors>` list or a bare `<error>` root.
pub fn service_error_message(xml: &str, root: &str) -> Result<String, quick_xml::de::DeError> {
    if root == "error" {
        let error: WireError = quick_xml::de::from_str(xml)?;
        return Ok(error
            .text()
            .unwrap_or(GENERIC_SERVICE_ERROR)
            .to_owned());
    }
    let errors: ErrorsDocument = quick_xml::de::from_str(xml)?;
    Ok(errors.joined_messages())
}

/// Name of the document element, skipping the declaration, comments and whitespace.
pub fn root_element(xml: &str) -> Result<Option<String>, quick_xml::Error> {
    let mut reader = quick_xml::Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element) => {
                let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
                return Ok(Some(name));
            }
            Event::Eof => return Ok(None),
            _ => continue,
        }
    }
}

/// Non-negative integer, or `None` for anything else (empty, text, negative).
pub fn coerce_u32(raw: Option<&str>) -> Option<u32> {
    let raw = raw?.trim();
    if let Ok(value) = raw.parse::<u32>() {
        return Some(value);
    }
    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() && value >= 0.0 && value <= f64::from(u32::MAX) {
        Some(value.round() as u32)
    } else {
        None
    }
}

/// Finite non-negative float, or `None`.
pub fn coerce_f64(raw: Option<&str>) -> Option<f64> {
    let value = raw?.trim().parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Ownership flags arrive as `"0"` / `"1"`.
pub fn coerce_flag(raw: Option<&str>) -> bool {
    coerce_u32(raw).is_some_and(|v| v > 0)
}

pub fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_element_skips_prolog() {
        let xml = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!-- hi -->\n<items totalitems=\"0\"/>";
        assert_eq!(root_element(xml).unwrap().as_deref(), Some("items"));
        assert_eq!(root_element("   ").unwrap(), None);
    }

    #[test]
    fn coerce_u32_rejects_garbage_and_negatives() {
        assert_eq!(coerce_u32(Some("1995")), Some(1995));
        assert_eq!(coerce_u32(Some(" 42 ")), Some(42));
        assert_eq!(coerce_u32(Some("2.0")), Some(2));
        assert_eq!(coerce_u32(Some("abc")), None);
        assert_eq!(coerce_u32(Some("")), None);
        assert_eq!(coerce_u32(Some("-500")), None);
        assert_eq!(coerce_u32(Some("Not Ranked")), None);
        assert_eq!(coerce_u32(None), None);
    }

    #[test]
    fn coerce_f64_rejects_nan_and_negatives() {
        assert_eq!(coerce_f64(Some("2.3478")), Some(2.3478));
        assert_eq!(coerce_f64(Some("NaN")), None);
        assert_eq!(coerce_f64(Some("-1")), None);
        assert_eq!(coerce_f64(Some("inf")), None);
    }

    #[test]
    fn single_name_decodes_as_one_element_list() {
        let xml = r#"<items><item id="1"><name type="primary" sortindex="1" value="Solo"/></item></items>"#;
        let doc: ThingDocument = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.items[0].names.len(), 1);
        assert_eq!(doc.items[0].names[0].content(), Some("Solo"));
    }

    #[test]
    fn inventory_name_reads_element_text() {
        let xml = r#"<items totalitems="1"><item objectid="13"><name sortindex="1">Catan</name></item></items>"#;
        let doc: CollectionDocument = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(doc.total_items.as_deref(), Some("1"));
        assert_eq!(doc.items[0].names[0].content(), Some("Catan"));
    }
}

// src/feed/profiles/rss.rs
use quick_xml::de::from_str;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::error::ParseError;
use crate::feed::clean_text;
use crate::feed::profiles::{require_root, scrub_html_entities_for_xml};
use crate::feed::record::{Field, NormalizedRecord, NO_BULLETINS_MESSAGE, UNKNOWN};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// RFC 2822 `pubDate` as RFC 3339; unparseable dates are kept verbatim.
fn normalize_pub_date(ts: &str) -> String {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| ts.trim().to_string())
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(clean_text).filter(|t| !t.is_empty())
}

pub fn normalize(source_id: &str, body: &str) -> Result<NormalizedRecord, ParseError> {
    let xml = scrub_html_entities_for_xml(body);
    require_root(&xml, "rss")?;
    let rss: Rss = from_str(&xml)?;

    let Some(first) = rss.channel.item.into_iter().next() else {
        return Ok(NormalizedRecord::empty(source_id, NO_BULLETINS_MESSAGE));
    };

    let mut rec = NormalizedRecord::report(source_id);
    if let Some(t) = non_empty(rss.channel.title.as_deref()) {
        rec.set(Field::Title, t);
    }
    rec.set(
        Field::Headline,
        non_empty(first.title.as_deref()).unwrap_or_else(|| UNKNOWN.into()),
    );
    if let Some(d) = non_empty(first.description.as_deref()) {
        rec.set(Field::Comment, d);
    }
    if let Some(ts) = first.pub_date.as_deref() {
        rec.set(Field::Issued, normalize_pub_date(ts));
    }
    Ok(rec)
}

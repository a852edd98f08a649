// src/feed/profiles/flash_news.rs
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::ParseError;
use crate::feed::clean_text;
use crate::feed::profiles::{require_root, scrub_html_entities_for_xml};
use crate::feed::record::{Field, NormalizedRecord, NO_BULLETINS_MESSAGE, UNKNOWN};

/// `<flashNews flag="1"><report date="…"><line>…</line></report></flashNews>`
#[derive(Debug, Deserialize)]
struct FlashNews {
    #[serde(rename = "@flag", default)]
    flag: Option<String>,
    #[serde(rename = "report", default)]
    reports: Vec<Report>,
}

#[derive(Debug, Deserialize)]
struct Report {
    #[serde(rename = "@date", default)]
    date: Option<String>,
    #[serde(rename = "line", default)]
    lines: Vec<String>,
}

pub fn normalize(source_id: &str, body: &str) -> Result<NormalizedRecord, ParseError> {
    let xml = scrub_html_entities_for_xml(body);
    require_root(&xml, "flashNews")?;
    let doc: FlashNews = from_str(&xml)?;

    let active = doc.flag.as_deref().map(str::trim) == Some("1");
    let latest = match doc.reports.into_iter().next() {
        Some(r) if active => r,
        _ => return Ok(NormalizedRecord::empty(source_id, NO_BULLETINS_MESSAGE)),
    };

    let line = latest
        .lines
        .iter()
        .map(|l| clean_text(l))
        .find(|l| !l.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string());
    let date = latest
        .date
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string());

    let mut rec = NormalizedRecord::report(source_id);
    rec.set(Field::Headline, line);
    rec.set(Field::Issued, date);
    Ok(rec)
}

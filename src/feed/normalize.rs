// src/feed/normalize.rs
use metrics::counter;

use crate::error::ParseError;
use crate::feed::profiles::{eew, fields, flash_news, rss, Profile};
use crate::feed::record::NormalizedRecord;
use crate::feed::types::{RawPayload, Source};

/// Parse `raw` with the source's profile.
pub fn try_normalize(source: &Source, raw: &RawPayload) -> Result<NormalizedRecord, ParseError> {
    if raw.format != source.profile.format() {
        return Err(ParseError::Shape(format!(
            "profile `{}` cannot read {:?} payloads",
            source.profile.name(),
            raw.format
        )));
    }
    match &source.profile {
        Profile::Eew => eew::normalize(&source.id, &raw.body),
        Profile::Fields(p) => fields::normalize(&source.id, p, &raw.body),
        Profile::FlashNews => flash_news::normalize(&source.id, &raw.body),
        Profile::Rss => rss::normalize(&source.id, &raw.body),
    }
}

/// Never fails: a parse error becomes the `unparseable` sentinel record.
pub fn normalize(source: &Source, raw: &RawPayload) -> NormalizedRecord {
    match try_normalize(source, raw) {
        Ok(rec) => rec,
        Err(e) => {
            tracing::warn!(source = %source.id, error = %e, "payload parse failed");
            counter!("feed_parse_errors_total", "source" => source.id.clone()).increment(1);
            NormalizedRecord::unparseable(&source.id, e.to_string())
        }
    }
}

// src/feed/profiles/eew.rs
use serde_json::Value;

use crate::error::ParseError;
use crate::feed::profiles::{leaf_text, parse_json_object, truthy};
use crate::feed::record::{
    AlertCondition, Field, NormalizedRecord, EEW_CANCELLED_MESSAGE, UNKNOWN,
};

pub const STATUS_WARNING: &str = "緊急地震速報警報";
pub const STATUS_FORECAST: &str = "緊急地震速報予報";
pub const TITLE_FINAL: &str = "最終報";

// Upstream spells magnitude "Magunitude".
const FIELD_KEYS: [(Field, &str); 5] = [
    (Field::MaxIntensity, "MaxIntensity"),
    (Field::Magnitude, "Magunitude"),
    (Field::Depth, "Depth"),
    (Field::Hypocenter, "Hypocenter"),
    (Field::Issued, "AnnouncedTime"),
];

pub fn normalize(source_id: &str, body: &str) -> Result<NormalizedRecord, ParseError> {
    let v = parse_json_object(body)?;

    if truthy(v.get("isCancel")) {
        return Ok(NormalizedRecord::cancelled(source_id, EEW_CANCELLED_MESSAGE));
    }

    let warn = truthy(v.get("isWarn"));
    let mut rec = NormalizedRecord::report(source_id);
    rec.warning = warn;
    rec.alert = AlertCondition::Raised;
    rec.set(
        Field::Status,
        if warn { STATUS_WARNING } else { STATUS_FORECAST },
    );
    rec.set(Field::Title, title(&v));

    for (field, key) in FIELD_KEYS {
        let text = v.get(key).and_then(leaf_text);
        match (field, text) {
            // Only shown when the feed carries it.
            (Field::Issued, None) => {}
            (_, t) => rec.set(field, t.unwrap_or_else(|| UNKNOWN.to_string())),
        }
    }

    Ok(rec)
}

fn title(v: &Value) -> String {
    if truthy(v.get("isFinal")) {
        return TITLE_FINAL.to_string();
    }
    let serial = v
        .get("Serial")
        .and_then(leaf_text)
        .unwrap_or_else(|| UNKNOWN.to_string());
    format!("第{serial}報")
}

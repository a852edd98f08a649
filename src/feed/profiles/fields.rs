// src/feed/profiles/fields.rs
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::feed::profiles::{collect, leaf_text, lookup, parse_json_object};
use crate::feed::record::{
    AlertCondition, Entry, Field, NormalizedRecord, NO_INFORMATION_MESSAGE, UNKNOWN,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldsProfile {
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub entries: Option<EntrySpec>,
    /// Raise the source's alert whenever a report is present.
    #[serde(default)]
    pub alert_on_report: bool,
    /// Notice for a payload where nothing resolved.
    #[serde(default)]
    pub empty_notice: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub field: Field,
    pub path: String,
    /// Shown instead of `不明` when the path is missing.
    #[serde(default)]
    pub default: Option<String>,
    /// Unit appended to numeric values, e.g. `" km"`.
    #[serde(default)]
    pub suffix: Option<String>,
}

impl FieldSpec {
    fn display(&self, text: String) -> String {
        match &self.suffix {
            Some(unit) if text.trim().parse::<f64>().is_ok() => format!("{text}{unit}"),
            _ => text,
        }
    }
}

/// A list of `label: value` lines, e.g. observation areas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySpec {
    /// Path to the items; `[]` flattens arrays.
    pub path: String,
    /// Path of the label inside one item.
    pub label: String,
    /// Path of the value inside one item.
    pub value: String,
    #[serde(default)]
    pub caption: Option<String>,
}

pub fn normalize(
    source_id: &str,
    profile: &FieldsProfile,
    body: &str,
) -> Result<NormalizedRecord, ParseError> {
    let root = parse_json_object(body)?;

    let mut rec = NormalizedRecord::report(source_id);
    let mut resolved = 0usize;

    for spec in &profile.fields {
        match lookup(&root, &spec.path).and_then(leaf_text) {
            Some(text) => {
                resolved += 1;
                rec.set(spec.field, spec.display(text));
            }
            None => rec.set(
                spec.field,
                spec.default.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            ),
        }
    }

    if let Some(es) = &profile.entries {
        rec.entries = collect(&root, &es.path)
            .into_iter()
            .map(|item| Entry {
                label: text_at(item, &es.label),
                value: text_at(item, &es.value),
            })
            .collect();
        rec.entry_caption = es.caption.clone();
    }

    if resolved == 0 && rec.entries.is_empty() {
        let notice = profile
            .empty_notice
            .clone()
            .unwrap_or_else(|| NO_INFORMATION_MESSAGE.to_string());
        return Ok(NormalizedRecord::empty(source_id, notice));
    }

    if profile.alert_on_report {
        rec.alert = AlertCondition::Raised;
    }
    Ok(rec)
}

fn text_at(item: &serde_json::Value, path: &str) -> String {
    lookup(item, path)
        .and_then(leaf_text)
        .unwrap_or_else(|| UNKNOWN.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::record::RecordState;

    fn hypocenter_profile() -> FieldsProfile {
        FieldsProfile {
            fields: vec![
                FieldSpec {
                    field: Field::Title,
                    path: "Head.Title".into(),
                    default: Some("震源に関する情報".into()),
                    suffix: None,
                },
                FieldSpec {
                    field: Field::Depth,
                    path: "Body.Earthquake.Hypocenter.Depth".into(),
                    default: None,
                    suffix: Some(" km".into()),
                },
                FieldSpec {
                    field: Field::Comment,
                    path: "Body.Comments.Observation".into(),
                    default: Some("コメントはありません".into()),
                    suffix: None,
                },
            ],
            ..FieldsProfile::default()
        }
    }

    #[test]
    fn defaults_fill_missing_chain() {
        let body = r#"{"Head": {"Title": "震源に関する情報"}, "Body": {}}"#;
        let r = normalize("hypocenter", &hypocenter_profile(), body).unwrap();
        assert_eq!(r.state, RecordState::Report);
        assert_eq!(r.get(Field::Depth), UNKNOWN);
        assert_eq!(r.get(Field::Comment), "コメントはありません");
    }

    #[test]
    fn unit_follows_numeric_values_only() {
        let depth = |body: &str| {
            normalize("hypocenter", &hypocenter_profile(), body)
                .unwrap()
                .get(Field::Depth)
                .to_string()
        };
        let with = |d: &str| {
            format!(r#"{{"Head": {{"Title": "x"}}, "Body": {{"Earthquake": {{"Hypocenter": {{"Depth": {d}}}}}}}}}"#)
        };
        assert_eq!(depth(&with("10")), "10 km");
        assert_eq!(depth(&with(r#""30""#)), "30 km");
        assert_eq!(depth(&with(r#""ごく浅い""#)), "ごく浅い");
        assert_eq!(depth(&with(r#""700km以上""#)), "700km以上");
        assert_eq!(depth(r#"{"Head": {"Title": "x"}}"#), UNKNOWN);
    }

    #[test]
    fn nothing_resolved_is_empty() {
        let r = normalize("hypocenter", &hypocenter_profile(), "{}").unwrap();
        assert_eq!(r.state, RecordState::Empty);
        assert_eq!(r.notice.as_deref(), Some(NO_INFORMATION_MESSAGE));
        assert_eq!(r.alert, AlertCondition::None);
    }

    #[test]
    fn entries_use_unknown_for_missing_leaves() {
        let profile = FieldsProfile {
            entries: Some(EntrySpec {
                path: "Pref[].Area[]".into(),
                label: "Name".into(),
                value: "MaxInt".into(),
                caption: Some("最大震度".into()),
            }),
            alert_on_report: true,
            ..FieldsProfile::default()
        };
        let body = r#"{"Pref": [{"Area": [{"Name": "東京都23区", "MaxInt": "3"}, {"Name": "多摩"}]}]}"#;
        let r = normalize("intensity", &profile, body).unwrap();
        assert_eq!(r.entries.len(), 2);
        assert_eq!(r.entries[1].value, UNKNOWN);
        assert_eq!(r.entry_caption.as_deref(), Some("最大震度"));
        assert_eq!(r.alert, AlertCondition::Raised);
    }
}

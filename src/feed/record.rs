// src/feed/record.rs
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Value shown for any field the payload did not carry.
pub const UNKNOWN: &str = "不明";

pub const UNAVAILABLE_MESSAGE: &str = "データを取得中にエラーが発生しました。";
pub const EEW_CANCELLED_MESSAGE: &str = "緊急地震速報はキャンセルされました。";
pub const NO_BULLETINS_MESSAGE: &str = "最新のニュース速報はありません。";
pub const NO_INFORMATION_MESSAGE: &str = "情報がありません";

/// Fixed set of semantic field names a record can carry.
/// Declaration order is the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Field {
    Status,
    Title,
    InfoKind,
    Headline,
    MaxIntensity,
    Magnitude,
    Depth,
    Hypocenter,
    Comment,
    Issued,
}

impl Field {
    /// Caption used when the field is shown as `caption: value`.
    /// `None` means the value is shown on its own.
    pub fn caption(self) -> Option<&'static str> {
        match self {
            Field::MaxIntensity => Some("最大震度"),
            Field::Magnitude => Some("マグニチュード"),
            Field::Depth => Some("深さ"),
            Field::Hypocenter => Some("震源"),
            Field::Issued => Some("発表日時"),
            Field::Status | Field::Title | Field::InfoKind | Field::Headline | Field::Comment => {
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    /// A live bulletin.
    Report,
    /// The source withdrew its alert.
    Cancelled,
    /// Parsed fine, nothing to show right now.
    Empty,
    /// Body could not be parsed.
    Unparseable,
    /// Fetch or parse failed; drives the fallback render.
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    None,
    Raised,
    Withdrawn,
}

/// `label: value` line, e.g. one observation area and its intensity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub source_id: String,
    pub state: RecordState,
    pub fields: BTreeMap<Field, String>,
    #[serde(default)]
    pub entries: Vec<Entry>,
    /// Caption for `entries` values, e.g. `最大震度`.
    #[serde(default)]
    pub entry_caption: Option<String>,
    /// Human message for non-report states.
    #[serde(default)]
    pub notice: Option<String>,
    /// Warning-grade bulletin (EEW 警報 rather than 予報).
    #[serde(default)]
    pub warning: bool,
    pub alert: AlertCondition,
}

impl NormalizedRecord {
    pub fn report(source_id: impl Into<String>) -> Self {
        Self::with_state(source_id, RecordState::Report, None)
    }

    pub fn empty(source_id: impl Into<String>, notice: impl Into<String>) -> Self {
        Self::with_state(source_id, RecordState::Empty, Some(notice.into()))
    }

    pub fn cancelled(source_id: impl Into<String>, notice: impl Into<String>) -> Self {
        let mut r = Self::with_state(source_id, RecordState::Cancelled, Some(notice.into()));
        r.alert = AlertCondition::Withdrawn;
        r
    }

    pub fn unparseable(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::with_state(source_id, RecordState::Unparseable, Some(reason.into()))
    }

    /// The fixed "data unavailable" record used by the fallback render.
    pub fn unavailable(source_id: impl Into<String>) -> Self {
        Self::with_state(
            source_id,
            RecordState::Unavailable,
            Some(UNAVAILABLE_MESSAGE.to_string()),
        )
    }

    fn with_state(source_id: impl Into<String>, state: RecordState, notice: Option<String>) -> Self {
        Self {
            source_id: source_id.into(),
            state,
            fields: BTreeMap::new(),
            entries: Vec::new(),
            entry_caption: None,
            notice,
            warning: false,
            alert: AlertCondition::None,
        }
    }

    /// Field value, or [`UNKNOWN`] when absent.
    pub fn get(&self, field: Field) -> &str {
        self.fields.get(&field).map(String::as_str).unwrap_or(UNKNOWN)
    }

    pub fn has(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }
}

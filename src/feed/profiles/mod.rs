// src/feed/profiles/mod.rs
//! Per-source payload shapes.
//!
//! A profile is data attached to a [`Source`](crate::feed::types::Source):
//! it says which parser runs and, for generic JSON, which paths map to which
//! [`Field`](crate::feed::record::Field).

pub mod eew;
pub mod fields;
pub mod flash_news;
pub mod rss;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParseError;
use crate::feed::types::Format;

pub use fields::{EntrySpec, FieldSpec, FieldsProfile};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Profile {
    /// wolfx `jma_eew.json`.
    Eew,
    /// Generic JSON with configured field paths (narikakun JMA reports).
    Fields(FieldsProfile),
    /// NHK `sokuho_news.xml`.
    FlashNews,
    /// RSS 2.0 channel; first item wins.
    Rss,
}

impl Profile {
    pub fn format(&self) -> Format {
        match self {
            Profile::Eew | Profile::Fields(_) => Format::Json,
            Profile::FlashNews | Profile::Rss => Format::Xml,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Profile::Eew => "eew",
            Profile::Fields(_) => "fields",
            Profile::FlashNews => "flash-news",
            Profile::Rss => "rss",
        }
    }
}

pub(crate) fn parse_json_object(body: &str) -> Result<Value, ParseError> {
    let v: Value = serde_json::from_str(body)?;
    if !v.is_object() {
        return Err(ParseError::Shape("expected a JSON object at the root".into()));
    }
    Ok(v)
}

/// Walk a dotted path (`Body.Earthquake.Hypocenter`). Any missing link yields `None`.
/// Numeric segments index into arrays.
pub(crate) fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|s| !s.is_empty())
        .try_fold(root, |cur, seg| step(cur, seg))
}

/// Like [`lookup`], but a segment ending in `[]` flattens the array it names:
/// `Body.Intensity.Observation.Pref[].Area[]` yields every area of every pref.
pub(crate) fn collect<'a>(root: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![root];
    for seg in path.split('.').filter(|s| !s.is_empty()) {
        let (name, flatten) = match seg.strip_suffix("[]") {
            Some(n) => (n, true),
            None => (seg, false),
        };
        let mut next = Vec::new();
        for v in current {
            let child = if name.is_empty() { Some(v) } else { step(v, name) };
            match child {
                Some(Value::Array(items)) if flatten => next.extend(items.iter()),
                Some(c) if !flatten => next.push(c),
                _ => {}
            }
        }
        current = next;
    }
    current
}

fn step<'a>(v: &'a Value, seg: &str) -> Option<&'a Value> {
    match v {
        Value::Object(map) => map.get(seg),
        Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Displayable text of a leaf. Empty strings, null, objects and arrays have none.
pub(crate) fn leaf_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => {
            let t = crate::feed::clean_text(s);
            (!t.is_empty()).then_some(t)
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Loose truthiness for upstream flags that arrive as bools, 0/1 or strings.
pub(crate) fn truthy(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|x| x != 0.0),
        Some(Value::String(s)) => !s.is_empty() && s != "false" && s != "0",
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// NHK and some RSS feeds use HTML entities that are not valid XML.
pub(crate) fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

/// The document's first element must be `<expected>`. quick-xml ignores the
/// root name and unknown children, so an HTML error page would otherwise
/// deserialize into an empty feed.
pub(crate) fn require_root(xml: &str, expected: &str) -> Result<(), ParseError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = e.local_name();
                if name.as_ref() == expected.as_bytes() {
                    return Ok(());
                }
                return Err(ParseError::Shape(format!(
                    "expected <{expected}> root, found <{}>",
                    String::from_utf8_lossy(name.as_ref())
                )));
            }
            Ok(Event::Eof) => {
                return Err(ParseError::Shape(format!(
                    "expected <{expected}> root, found no element"
                )))
            }
            Ok(_) => {}
            Err(e) => return Err(ParseError::Shape(format!("invalid XML: {e}"))),
        }
    }
}

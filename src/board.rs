// src/board.rs
//! Latest HTML fragment per section, shared with the HTTP surface.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use html_escape::encode_text;
use serde::Serialize;

use crate::feed::record::{NormalizedRecord, RecordState};
use crate::feed::types::Source;
use crate::render::{record_html, Renderer};

const LOADING_MESSAGE: &str = "読み込み中…";

#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub id: String,
    pub title: String,
    pub html: String,
    pub state: Option<RecordState>,
    pub alert_triggered: bool,
    pub updated_at: Option<DateTime<Utc>>,
    pub renders: u64,
}

impl SectionView {
    fn placeholder(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            html: format!(
                "<div class=\"loading\">\n  <h3>{}</h3>\n  <p>{}</p>\n</div>",
                encode_text(title),
                LOADING_MESSAGE
            ),
            state: None,
            alert_triggered: false,
            updated_at: None,
            renders: 0,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    order: Vec<String>,
    sections: HashMap<String, SectionView>,
    clock: String,
}

/// In-memory display. Last write wins per section.
#[derive(Debug, Default)]
pub struct Board {
    inner: RwLock<Inner>,
}

impl Board {
    /// Sections in display order as `(id, title)`.
    pub fn new<I, S, T>(sections: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let mut inner = Inner::default();
        for (id, title) in sections {
            let (id, title) = (id.into(), title.into());
            if inner.sections.contains_key(&id) {
                continue;
            }
            inner
                .sections
                .insert(id.clone(), SectionView::placeholder(&id, &title));
            inner.order.push(id);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    pub fn from_sources(sources: &[Source]) -> Self {
        Self::new(sources.iter().map(|s| (s.id.clone(), s.title().to_string())))
    }

    pub fn section(&self, id: &str) -> Option<SectionView> {
        let inner = self.inner.read().unwrap_or_else(|p| p.into_inner());
        inner.sections.get(id).cloned()
    }

    pub fn sections(&self) -> Vec<SectionView> {
        let inner = self.inner.read().unwrap_or_else(|p| p.into_inner());
        inner
            .order
            .iter()
            .filter_map(|id| inner.sections.get(id).cloned())
            .collect()
    }

    pub fn clock(&self) -> String {
        self.inner
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clock
            .clone()
    }

    /// Full page: clock plus every section in order.
    pub fn page_html(&self) -> String {
        let clock = self.clock();
        let mut body = String::new();
        for s in self.sections() {
            body.push_str(&format!(
                "<section id=\"{}\">\n{}\n</section>\n",
                encode_text(&s.id),
                s.html
            ));
        }
        PAGE_TEMPLATE
            .replace("{{clock}}", &encode_text(&clock))
            .replace("{{sections}}", &body)
    }
}

impl Renderer for Board {
    fn render(&self, source_id: &str, record: &NormalizedRecord, alert_triggered: bool) {
        let mut inner = self.inner.write().unwrap_or_else(|p| p.into_inner());
        if !inner.sections.contains_key(source_id) {
            inner.order.push(source_id.to_string());
        }
        let view = inner
            .sections
            .entry(source_id.to_string())
            .or_insert_with(|| SectionView::placeholder(source_id, source_id));
        view.html = record_html(&view.title, record);
        view.state = Some(record.state);
        view.alert_triggered = alert_triggered;
        view.updated_at = Some(Utc::now());
        view.renders += 1;
    }

    fn render_clock(&self, time: &str) {
        let mut inner = self.inner.write().unwrap_or_else(|p| p.into_inner());
        inner.clock = time.to_string();
    }
}

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="ja">
<head>
<meta charset="utf-8">
<title>quake-watch</title>
<style>
  body { font-family: sans-serif; margin: 1rem; }
  section { border: 1px solid #ccc; margin: .5rem 0; padding: .5rem; }
  .warn { color: #b00; font-weight: bold; }
  .forecast { color: #b60; }
  .unavailable, .loading { color: #777; }
</style>
</head>
<body>
<div id="current-time">{{clock}}</div>
{{sections}}<script>
async function refresh() {
  try {
    const res = await fetch('/sections');
    for (const s of await res.json()) {
      const el = document.getElementById(s.id);
      if (el) el.innerHTML = s.html;
    }
    const t = await fetch('/clock');
    document.getElementById('current-time').textContent = await t.text();
  } catch (e) {}
}
setInterval(refresh, 1000);
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::record::{Field, UNAVAILABLE_MESSAGE};

    #[test]
    fn sections_keep_configured_order() {
        let board = Board::new([("b", "B"), ("a", "A")]);
        let ids: Vec<_> = board.sections().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(board.section("a").unwrap().html.contains(LOADING_MESSAGE));
    }

    #[test]
    fn last_write_wins() {
        let board = Board::new([("eew", "緊急地震速報")]);
        let mut r = NormalizedRecord::report("eew");
        r.set(Field::Headline, "first");
        board.render("eew", &r, true);
        board.render("eew", &NormalizedRecord::unavailable("eew"), false);

        let s = board.section("eew").unwrap();
        assert_eq!(s.renders, 2);
        assert_eq!(s.state, Some(RecordState::Unavailable));
        assert!(!s.alert_triggered);
        assert!(s.html.contains(UNAVAILABLE_MESSAGE));
        assert!(s.html.contains("緊急地震速報"));
    }

    #[test]
    fn unknown_section_is_appended() {
        let board = Board::new([("a", "A")]);
        board.render("z", &NormalizedRecord::report("z"), false);
        assert_eq!(board.sections().len(), 2);
    }

    #[test]
    fn page_contains_clock_and_sections() {
        let board = Board::new([("news", "ニュース速報")]);
        board.render_clock("12:34:56");
        let page = board.page_html();
        assert!(page.contains("12:34:56"));
        assert!(page.contains("<section id=\"news\">"));
    }
}

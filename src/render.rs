// src/render.rs
//! Renderer seam and the HTML templates used by the board.

use html_escape::encode_text;

use crate::feed::record::{Field, NormalizedRecord, RecordState};

/// Display side of a tick. Gets every record, including fallbacks.
pub trait Renderer: Send + Sync {
    fn render(&self, source_id: &str, record: &NormalizedRecord, alert_triggered: bool);

    /// 1 s clock tick; formatted `HH:MM:SS`.
    fn render_clock(&self, _time: &str) {}
}

/// HTML fragment for one section.
pub fn record_html(section_title: &str, record: &NormalizedRecord) -> String {
    match record.state {
        RecordState::Report => report_html(section_title, record),
        RecordState::Cancelled
        | RecordState::Empty
        | RecordState::Unparseable
        | RecordState::Unavailable => notice_html(section_title, record),
    }
}

fn notice_html(section_title: &str, record: &NormalizedRecord) -> String {
    let notice = match record.state {
        // The parse reason goes to the log, not the page.
        RecordState::Unparseable => crate::feed::record::UNAVAILABLE_MESSAGE,
        _ => record
            .notice
            .as_deref()
            .unwrap_or(crate::feed::record::UNAVAILABLE_MESSAGE),
    };
    format!(
        "<div class=\"{}\">\n  <h3>{}</h3>\n  <p>{}</p>\n</div>",
        css_class(record),
        encode_text(section_title),
        encode_text(notice)
    )
}

fn report_html(section_title: &str, record: &NormalizedRecord) -> String {
    let (heading, used) = heading(section_title, record);

    let mut out = format!(
        "<div class=\"{}\">\n  <h3>{}</h3>\n",
        css_class(record),
        encode_text(&heading)
    );
    for (field, value) in &record.fields {
        if used.contains(field) {
            continue;
        }
        match field.caption() {
            Some(caption) => out.push_str(&format!(
                "  <p>{}: {}</p>\n",
                encode_text(caption),
                encode_text(value)
            )),
            None => out.push_str(&format!("  <p>{}</p>\n", encode_text(value))),
        }
    }
    if !record.entries.is_empty() {
        out.push_str("  <ul>\n");
        for e in &record.entries {
            let line = match record.entry_caption.as_deref() {
                Some(c) => format!("{}, {}: {}", e.label, c, e.value),
                None => format!("{}: {}", e.label, e.value),
            };
            out.push_str(&format!("    <li>{}</li>\n", encode_text(&line)));
        }
        out.push_str("  </ul>\n");
    }
    out.push_str("</div>");
    out
}

/// `status title` for EEW, else the record's own title / info kind, else the
/// section title. Returns the fields consumed by the heading.
fn heading(section_title: &str, record: &NormalizedRecord) -> (String, Vec<Field>) {
    if record.has(Field::Status) {
        let text = if record.has(Field::Title) {
            format!("{} {}", record.get(Field::Status), record.get(Field::Title))
        } else {
            record.get(Field::Status).to_string()
        };
        return (text, vec![Field::Status, Field::Title]);
    }
    if record.has(Field::Title) {
        return (record.get(Field::Title).to_string(), vec![Field::Title]);
    }
    if record.has(Field::InfoKind) {
        return (record.get(Field::InfoKind).to_string(), vec![Field::InfoKind]);
    }
    (section_title.to_string(), Vec::new())
}

fn css_class(record: &NormalizedRecord) -> &'static str {
    match record.state {
        RecordState::Report if record.warning => "warn",
        RecordState::Report if record.has(Field::Status) => "forecast",
        RecordState::Report => "report",
        RecordState::Cancelled => "cancelled",
        RecordState::Empty => "empty",
        RecordState::Unparseable | RecordState::Unavailable => "unavailable",
    }
}

// src/feed/mod.rs
pub mod config;
pub mod fetch;
pub mod normalize;
pub mod profiles;
pub mod record;
pub mod scheduler;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

pub use normalize::{normalize, try_normalize};
pub use record::{AlertCondition, Field, NormalizedRecord, RecordState, UNKNOWN};
pub use types::{Fetcher, Format, RawPayload, Source};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_ticks_total", "Refresh ticks run per source.");
        describe_counter!(
            "feed_fallback_total",
            "Ticks that ended in the data-unavailable render."
        );
        describe_counter!("feed_fetch_errors_total", "Transport/status failures.");
        describe_counter!("feed_parse_errors_total", "Payloads that failed to parse.");
        describe_histogram!("feed_fetch_ms", "Fetch time in milliseconds.");
        describe_gauge!(
            "feed_last_success_ts",
            "Unix ts of the last successful render per source."
        );
        describe_counter!("alert_triggered_total", "Alert latches activated.");
        describe_counter!(
            "alert_suppressed_total",
            "Triggers dropped because the sound was still playing."
        );
        describe_counter!("alert_cancelled_total", "Alerts withdrawn by source data.");
    });
}

/// Clean feed text: decode entities, strip tags, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Collapse whitespace (includes NBSP and ideographic space)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_ws_and_strips_tags() {
        let s = "  <p>震度&nbsp;&nbsp;３</p>\n\t以上  ";
        assert_eq!(clean_text(s), "震度 ３ 以上");
    }

    #[test]
    fn clean_text_keeps_sentence_punctuation() {
        assert_eq!(clean_text("キャンセルされました。"), "キャンセルされました。");
    }

    #[test]
    fn clean_text_keeps_long_comments_whole() {
        let long = format!("{}以上です。", "震度".repeat(1_000));
        let cleaned = clean_text(&long);
        assert_eq!(cleaned.chars().count(), 2_005);
        assert!(cleaned.ends_with("以上です。"));
    }
}

// src/bin/feed_probe.rs
//! Fetches every configured source once and prints the normalized records as JSON.
//! Optional args: source ids to probe (default: all).

use quake_watch::feed::fetch::HttpFetcher;
use quake_watch::feed::{normalize, Fetcher, NormalizedRecord};
use quake_watch::load_config_default;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let config = load_config_default()?;
    let wanted: Vec<String> = std::env::args().skip(1).collect();
    let fetcher = HttpFetcher::new();

    for source in &config.sources {
        if !wanted.is_empty() && !wanted.contains(&source.id) {
            continue;
        }
        let record = match fetcher.fetch(source).await {
            Ok(raw) => normalize(source, &raw),
            Err(e) => {
                tracing::warn!(source = %source.id, error = %e, "probe fetch failed");
                NormalizedRecord::unavailable(&source.id)
            }
        };
        println!("{}", serde_json::to_string_pretty(&record)?);
    }

    println!("feed-probe done");
    Ok(())
}

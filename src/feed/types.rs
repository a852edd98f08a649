// src/feed/types.rs
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::AlertKind;
use crate::error::FetchError;
use crate::feed::profiles::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Xml,
}

/// One external feed. Fixed at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    /// Section heading on the board; defaults to the id.
    #[serde(default)]
    pub title: Option<String>,
    pub url: String,
    pub format: Format,
    pub interval_secs: u64,
    #[serde(default)]
    pub alert: Option<AlertKind>,
    /// Overrides the alert kind's default sound.
    #[serde(default)]
    pub sound: Option<PathBuf>,
    pub profile: Profile,
}

impl Source {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }

    pub fn sound_for(&self, kind: AlertKind) -> PathBuf {
        self.sound
            .clone()
            .unwrap_or_else(|| PathBuf::from(kind.default_sound()))
    }
}

/// Response body as fetched, tagged with the declared format.
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub source_id: String,
    pub format: Format,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, source: &Source) -> Result<RawPayload, FetchError>;
}

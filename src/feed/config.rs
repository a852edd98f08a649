// src/feed/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::alert::{CommandPlayer, Player, SilentPlayer};
use crate::feed::scheduler::{CoalescedGroup, SchedulePlan, SlowMember};
use crate::feed::types::Source;

pub const ENV_CONFIG_PATH: &str = "QUAKE_WATCH_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/sources.toml";

const BUILTIN_CONFIG: &str = include_str!("../../config/sources.toml");

fn default_clock_interval_ms() -> u64 {
    1_000
}
fn default_silent_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_clock_interval_ms")]
    pub clock_interval_ms: u64,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// External player; when absent alerts are logged and held for `silent_secs`.
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_silent_secs")]
    pub silent_secs: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            silent_secs: default_silent_secs(),
        }
    }
}

impl PlaybackConfig {
    pub fn build_player(&self) -> Arc<dyn Player> {
        match self.program.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => Arc::new(CommandPlayer::new(p, self.args.clone())),
            _ => Arc::new(SilentPlayer::new(Duration::from_secs(self.silent_secs))),
        }
    }
}

/// Several sources fetched on one shared tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub id: String,
    pub interval_secs: u64,
    #[serde(default)]
    pub members: Vec<String>,
    /// Members refreshed only when their last refresh is old enough.
    #[serde(default)]
    pub slow: Vec<SlowMemberConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlowMemberConfig {
    pub source: String,
    pub refresh_every_secs: u64,
}

impl FeedConfig {
    /// The configuration compiled into the binary.
    pub fn builtin() -> Result<Self> {
        let cfg = parse_config(BUILTIN_CONFIG, "toml").context("parsing built-in config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.clock_interval_ms == 0 {
            bail!("clock_interval_ms must be > 0");
        }

        let mut ids = HashSet::new();
        for s in &self.sources {
            if s.id.trim().is_empty() {
                bail!("source with empty id");
            }
            if !ids.insert(s.id.as_str()) {
                bail!("duplicate source id `{}`", s.id);
            }
            if s.interval_secs == 0 {
                bail!("source `{}`: interval_secs must be > 0", s.id);
            }
            if s.format != s.profile.format() {
                bail!(
                    "source `{}`: profile `{}` does not read {:?}",
                    s.id,
                    s.profile.name(),
                    s.format
                );
            }
        }

        let mut grouped = HashSet::new();
        for g in &self.groups {
            if g.interval_secs == 0 {
                bail!("group `{}`: interval_secs must be > 0", g.id);
            }
            if g.members.is_empty() && g.slow.is_empty() {
                bail!("group `{}` has no members", g.id);
            }
            let slow_ids = g.slow.iter().map(|s| (s.source.as_str(), s.refresh_every_secs));
            for (id, every) in g.members.iter().map(|m| (m.as_str(), 1)).chain(slow_ids) {
                if !ids.contains(id) {
                    bail!("group `{}` references unknown source `{id}`", g.id);
                }
                if !grouped.insert(id) {
                    bail!("source `{id}` is scheduled by more than one group entry");
                }
                if every == 0 {
                    bail!("group `{}`: refresh_every_secs for `{id}` must be > 0", g.id);
                }
            }
        }
        Ok(())
    }

    pub fn source(&self, id: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Split sources into independent timers and coalesced groups.
    pub fn plan(&self) -> Result<SchedulePlan> {
        self.validate()?;

        let lookup = |id: &str| {
            self.source(id)
                .cloned()
                .ok_or_else(|| anyhow!("unknown source `{id}`"))
        };

        let mut grouped = HashSet::new();
        let mut groups = Vec::with_capacity(self.groups.len());
        for g in &self.groups {
            let members = g
                .members
                .iter()
                .map(|m| lookup(m.as_str()))
                .collect::<Result<Vec<_>>>()?;
            let slow = g
                .slow
                .iter()
                .map(|s| {
                    Ok(SlowMember {
                        source: lookup(s.source.as_str())?,
                        refresh_every: Duration::from_secs(s.refresh_every_secs),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            grouped.extend(g.members.iter().cloned());
            grouped.extend(g.slow.iter().map(|s| s.source.clone()));
            groups.push(CoalescedGroup {
                id: g.id.clone(),
                interval: Duration::from_secs(g.interval_secs),
                members,
                slow,
            });
        }

        let independent = self
            .sources
            .iter()
            .filter(|s| !grouped.contains(&s.id))
            .cloned()
            .collect();

        Ok(SchedulePlan {
            independent,
            groups,
            clock_interval: Duration::from_millis(self.clock_interval_ms),
        })
    }
}

/// Load from an explicit path. TOML or JSON, chosen by extension.
pub fn load_config_from(path: &Path) -> Result<FeedConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading feed config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let cfg = parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing feed config {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validating feed config {}", path.display()))?;
    Ok(cfg)
}

/// Load using env var + fallbacks:
/// 1) $QUAKE_WATCH_CONFIG
/// 2) config/sources.toml
/// 3) built-in copy of config/sources.toml
pub fn load_config_default() -> Result<FeedConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default_p.exists() {
        return load_config_from(&default_p);
    }
    FeedConfig::builtin()
}

fn parse_config(s: &str, hint_ext: &str) -> Result<FeedConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("invalid JSON feed config");
    }
    match toml::from_str(s) {
        Ok(cfg) => Ok(cfg),
        Err(toml_err) => {
            // Extension-less files may still be JSON.
            if hint_ext != "toml" {
                if let Ok(cfg) = serde_json::from_str(s) {
                    return Ok(cfg);
                }
            }
            Err(anyhow!(toml_err).context("invalid TOML feed config"))
        }
    }
}

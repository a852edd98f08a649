// src/alert/mod.rs
pub mod playback;

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

pub use playback::{
    CommandPlayer, PlaybackEvent, PlaybackOutcome, PlaybackRequest, PlaybackSignal,
    PlaybackTickets, Player, SilentPlayer,
};

/// Which alert sound a source is allowed to raise. One latch per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    SeismicIntensity,
    Eew,
}

impl AlertKind {
    pub const ALL: [AlertKind; 2] = [AlertKind::SeismicIntensity, AlertKind::Eew];

    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::SeismicIntensity => "seismic-intensity",
            AlertKind::Eew => "eew",
        }
    }

    /// Sound played when a source does not configure its own.
    pub fn default_sound(self) -> &'static str {
        match self {
            AlertKind::SeismicIntensity => "music/sindsokuhou.mp3",
            AlertKind::Eew => "music/eew.mp3",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatchState {
    Idle,
    Active,
}

/// Process-wide playback latch, one per [`AlertKind`].
///
/// - Every kind starts `Idle`.
/// - `try_trigger` flips `Idle -> Active` and reports whether it did.
/// - `release` (playback finished) and `cancel` (alert withdrawn in data)
///   both force `Idle`, whatever the current state.
///
/// A trigger while `Active` is dropped, not queued.
#[derive(Debug)]
pub struct AlertGate {
    latches: Mutex<BTreeMap<AlertKind, LatchState>>,
}

impl Default for AlertGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertGate {
    pub fn new() -> Self {
        let latches = AlertKind::ALL
            .iter()
            .map(|k| (*k, LatchState::Idle))
            .collect();
        Self {
            latches: Mutex::new(latches),
        }
    }

    /// Returns true and activates the latch if it was idle.
    pub fn try_trigger(&self, kind: AlertKind) -> bool {
        let mut latches = self.latches.lock().unwrap_or_else(|p| p.into_inner());
        let slot = latches.entry(kind).or_insert(LatchState::Idle);
        if *slot == LatchState::Active {
            counter!("alert_suppressed_total", "kind" => kind.as_str()).increment(1);
            tracing::debug!(kind = %kind, "alert already playing, trigger dropped");
            return false;
        }
        *slot = LatchState::Active;
        counter!("alert_triggered_total", "kind" => kind.as_str()).increment(1);
        true
    }

    /// Playback completion.
    pub fn release(&self, kind: AlertKind) {
        self.set_idle(kind);
    }

    /// Alert withdrawn by the source data; applies even mid-playback.
    pub fn cancel(&self, kind: AlertKind) {
        counter!("alert_cancelled_total", "kind" => kind.as_str()).increment(1);
        self.set_idle(kind);
    }

    pub fn state(&self, kind: AlertKind) -> LatchState {
        let latches = self.latches.lock().unwrap_or_else(|p| p.into_inner());
        latches.get(&kind).copied().unwrap_or(LatchState::Idle)
    }

    pub fn is_active(&self, kind: AlertKind) -> bool {
        self.state(kind) == LatchState::Active
    }

    pub fn snapshot(&self) -> BTreeMap<AlertKind, LatchState> {
        self.latches
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn set_idle(&self, kind: AlertKind) {
        let mut latches = self.latches.lock().unwrap_or_else(|p| p.into_inner());
        latches.insert(kind, LatchState::Idle);
    }
}

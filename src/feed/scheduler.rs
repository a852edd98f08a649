// src/feed/scheduler.rs
//! Refresh scheduling.
//!
//! - Independent sources get one repeating timer each.
//! - Coalesced groups share a timer: members are fetched concurrently and
//!   joined before anything is rendered; slow members ride on the same tick
//!   and are refreshed only when their stored last-refresh timestamp is old
//!   enough.
//! - A tick never fails: fetch and parse errors end in the fallback render.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use metrics::{counter, gauge};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::alert::{
    AlertGate, PlaybackEvent, PlaybackOutcome, PlaybackRequest, PlaybackSignal, PlaybackTickets,
    Player,
};
use crate::error::TickError;
use crate::feed::normalize;
use crate::feed::record::{AlertCondition, NormalizedRecord, RecordState};
use crate::feed::types::{Fetcher, Source};
use crate::render::Renderer;

/// Everything the scheduler runs, resolved from config.
#[derive(Debug, Clone)]
pub struct SchedulePlan {
    pub independent: Vec<Source>,
    pub groups: Vec<CoalescedGroup>,
    pub clock_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct CoalescedGroup {
    pub id: String,
    pub interval: Duration,
    pub members: Vec<Source>,
    pub slow: Vec<SlowMember>,
}

#[derive(Debug, Clone)]
pub struct SlowMember {
    pub source: Source,
    pub refresh_every: Duration,
}

/// Last-refreshed timestamp of one slow member.
#[derive(Debug, Clone)]
pub struct SlowRefresh {
    threshold: Duration,
    last_refreshed: Option<DateTime<Utc>>,
}

impl SlowRefresh {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            last_refreshed: None,
        }
    }

    /// Never refreshed, or at least `threshold` old. A clock that went
    /// backwards is not due.
    pub fn due(&self, now: DateTime<Utc>) -> bool {
        match self.last_refreshed {
            None => true,
            Some(last) => (now - last)
                .to_std()
                .map(|age| age >= self.threshold)
                .unwrap_or(false),
        }
    }

    pub fn mark(&mut self, now: DateTime<Utc>) {
        self.last_refreshed = Some(now);
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed
    }
}

/// A coalesced group plus the slow-member timestamps that survive across ticks.
#[derive(Debug)]
pub struct GroupTicker {
    group: CoalescedGroup,
    slow: Mutex<Vec<SlowRefresh>>,
}

impl GroupTicker {
    pub fn new(group: CoalescedGroup) -> Self {
        let slow = group
            .slow
            .iter()
            .map(|m| SlowRefresh::new(m.refresh_every))
            .collect();
        Self {
            group,
            slow: Mutex::new(slow),
        }
    }

    pub fn group(&self) -> &CoalescedGroup {
        &self.group
    }

    pub fn last_refreshed(&self, source_id: &str) -> Option<DateTime<Utc>> {
        let slow = self.slow.lock().unwrap_or_else(|p| p.into_inner());
        self.group
            .slow
            .iter()
            .zip(slow.iter())
            .find(|(m, _)| m.source.id == source_id)
            .and_then(|(_, st)| st.last_refreshed())
    }

    /// For restoring state or tests.
    pub fn set_last_refreshed(&self, source_id: &str, at: DateTime<Utc>) {
        let mut slow = self.slow.lock().unwrap_or_else(|p| p.into_inner());
        for (m, st) in self.group.slow.iter().zip(slow.iter_mut()) {
            if m.source.id == source_id {
                st.mark(at);
            }
        }
    }

    /// Slow members due at `now`; their timestamps move to `now`.
    fn take_due(&self, now: DateTime<Utc>) -> Vec<&SlowMember> {
        let mut slow = self.slow.lock().unwrap_or_else(|p| p.into_inner());
        self.group
            .slow
            .iter()
            .zip(slow.iter_mut())
            .filter_map(|(m, st)| {
                if st.due(now) {
                    st.mark(now);
                    Some(m)
                } else {
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered { alert_triggered: bool },
    Fallback,
}

/// Runs ticks: fetch → normalize → alert gate → render.
pub struct Coordinator {
    fetcher: Arc<dyn Fetcher>,
    renderer: Arc<dyn Renderer>,
    player: Arc<dyn Player>,
    gate: Arc<AlertGate>,
    tickets: Arc<PlaybackTickets>,
    playback_tx: mpsc::UnboundedSender<PlaybackEvent>,
    playback_rx: Mutex<Option<mpsc::UnboundedReceiver<PlaybackEvent>>>,
}

impl Coordinator {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        renderer: Arc<dyn Renderer>,
        player: Arc<dyn Player>,
    ) -> Self {
        crate::feed::ensure_metrics_described();
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            fetcher,
            renderer,
            player,
            gate: Arc::new(AlertGate::new()),
            tickets: Arc::new(PlaybackTickets::new()),
            playback_tx: tx,
            playback_rx: Mutex::new(Some(rx)),
        }
    }

    /// Share an existing gate (e.g. with the HTTP surface).
    pub fn with_gate(mut self, gate: Arc<AlertGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn gate(&self) -> &Arc<AlertGate> {
        &self.gate
    }

    /// One tick for one independent source.
    pub async fn run_tick(&self, source: &Source) -> TickOutcome {
        let loaded = self.load(source).await;
        self.apply(source, loaded)
    }

    /// One tick for a coalesced group at `now`.
    /// Returns `(source_id, outcome)` in member order, slow members last.
    pub async fn run_group_tick(
        &self,
        ticker: &GroupTicker,
        now: DateTime<Utc>,
    ) -> Vec<(String, TickOutcome)> {
        let group = ticker.group();

        // Fan-out, then join before any side effect.
        let loaded = join_all(group.members.iter().map(|s| self.load(s))).await;
        let mut outcomes: Vec<(String, TickOutcome)> = group
            .members
            .iter()
            .zip(loaded)
            .map(|(s, r)| (s.id.clone(), self.apply(s, r)))
            .collect();

        let due = ticker.take_due(now);
        if !due.is_empty() {
            let loaded = join_all(due.iter().map(|m| self.load(&m.source))).await;
            for (m, r) in due.iter().zip(loaded) {
                outcomes.push((m.source.id.clone(), self.apply(&m.source, r)));
            }
        }

        tracing::debug!(
            target: "feed",
            group = %group.id,
            members = group.members.len(),
            slow_refreshed = due.len(),
            "coalesced tick"
        );
        outcomes
    }

    async fn load(&self, source: &Source) -> Result<NormalizedRecord, TickError> {
        let raw = self.fetcher.fetch(source).await?;
        let mut record = normalize(source, &raw);
        if record.state == RecordState::Unparseable {
            return Err(TickError::Parse {
                source_id: source.id.clone(),
                reason: record.notice.take().unwrap_or_default(),
            });
        }
        Ok(record)
    }

    fn apply(&self, source: &Source, loaded: Result<NormalizedRecord, TickError>) -> TickOutcome {
        counter!("feed_ticks_total", "source" => source.id.clone()).increment(1);
        match loaded {
            Ok(record) => {
                let alert_triggered = self.apply_alert(source, &record);
                self.renderer.render(&source.id, &record, alert_triggered);
                gauge!("feed_last_success_ts", "source" => source.id.clone())
                    .set(Utc::now().timestamp() as f64);
                TickOutcome::Rendered { alert_triggered }
            }
            Err(e) => {
                tracing::warn!(source = %source.id, error = %e, "tick failed, rendering fallback");
                counter!("feed_fallback_total", "source" => source.id.clone()).increment(1);
                let fallback = NormalizedRecord::unavailable(&source.id);
                self.renderer.render(&source.id, &fallback, false);
                TickOutcome::Fallback
            }
        }
    }

    /// Trigger or cancel the source's latch. Rendering does not depend on
    /// the order of the two.
    fn apply_alert(&self, source: &Source, record: &NormalizedRecord) -> bool {
        let Some(kind) = source.alert else {
            return false;
        };
        match record.alert {
            AlertCondition::Raised => {
                let Some(ticket) = self.tickets.trigger(&self.gate, kind) else {
                    return false;
                };
                tracing::info!(source = %source.id, kind = %kind, ticket, "alert triggered");
                self.player.play(
                    PlaybackRequest {
                        kind,
                        sound: source.sound_for(kind),
                    },
                    PlaybackSignal::new(kind, ticket, self.playback_tx.clone()),
                );
                true
            }
            AlertCondition::Withdrawn => {
                tracing::info!(source = %source.id, kind = %kind, "alert withdrawn");
                self.tickets.cancel(&self.gate, kind);
                false
            }
            AlertCondition::None => false,
        }
    }

    /// Route completion of the current playback to `AlertGate::release`.
    /// Returns `None` if the listener was already started.
    pub fn spawn_playback_listener(&self) -> Option<JoinHandle<()>> {
        let mut rx = self
            .playback_rx
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()?;
        let gate = Arc::clone(&self.gate);
        let tickets = Arc::clone(&self.tickets);
        Some(tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                if ev.outcome == PlaybackOutcome::Failed {
                    tracing::warn!(kind = %ev.kind, "alert sound failed to play");
                }
                if !tickets.release(&gate, &ev) {
                    tracing::debug!(kind = %ev.kind, ticket = ev.ticket, "superseded playback finished");
                }
            }
        }))
    }

    /// Repeating timer for one source. The first tick fires immediately.
    /// Every tick runs in its own task so a slow response cannot hold up
    /// the next one.
    pub fn spawn_source(self: &Arc<Self>, source: Source) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let source = Arc::new(source);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(source.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let this = Arc::clone(&this);
                let source = Arc::clone(&source);
                tokio::spawn(async move {
                    let outcome = this.run_tick(&source).await;
                    tracing::debug!(target: "feed", source = %source.id, ?outcome, "tick");
                });
            }
        })
    }

    pub fn spawn_group(self: &Arc<Self>, group: CoalescedGroup) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let ticker_state = Arc::new(GroupTicker::new(group));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(ticker_state.group().interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let this = Arc::clone(&this);
                let state = Arc::clone(&ticker_state);
                tokio::spawn(async move {
                    this.run_group_tick(&state, Utc::now()).await;
                });
            }
        })
    }

    pub fn spawn_clock(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let renderer = Arc::clone(&self.renderer);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let now = chrono::Local::now().format("%H:%M:%S").to_string();
                renderer.render_clock(&now);
            }
        })
    }

    /// Start the playback listener, every timer in `plan`, and the clock.
    pub fn start(self: &Arc<Self>, plan: SchedulePlan) -> Vec<JoinHandle<()>> {
        tracing::info!(
            independent = plan.independent.len(),
            groups = plan.groups.len(),
            "starting feed scheduler"
        );
        let mut handles = Vec::new();
        handles.extend(self.spawn_playback_listener());
        for source in plan.independent {
            handles.push(self.spawn_source(source));
        }
        for group in plan.groups {
            handles.push(self.spawn_group(group));
        }
        handles.push(self.spawn_clock(plan.clock_interval));
        handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn slow_refresh_threshold() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut st = SlowRefresh::new(Duration::from_secs(60));
        assert!(st.due(t0));
        st.mark(t0);
        assert!(!st.due(t0 + chrono::Duration::seconds(59)));
        assert!(st.due(t0 + chrono::Duration::seconds(60)));
        assert!(st.due(t0 + chrono::Duration::seconds(61)));
        assert!(!st.due(t0 - chrono::Duration::seconds(5)));
    }
}

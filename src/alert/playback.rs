// src/alert/playback.rs
//! Playback collaborator.
//!
//! A [`Player`] receives a sound and an [`AlertKind`] and must eventually
//! report back through the [`PlaybackSignal`]. The coordinator turns the
//! completion of the current playback into `AlertGate::release`; completions
//! of playbacks superseded by a cancel and a new trigger are dropped.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;

use super::{AlertGate, AlertKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackRequest {
    pub kind: AlertKind,
    pub sound: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Finished,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackEvent {
    pub kind: AlertKind,
    /// Issued by [`PlaybackTickets::trigger`] for this playback.
    pub ticket: u64,
    pub outcome: PlaybackOutcome,
}

/// One-shot completion handle handed to a player with each request.
#[derive(Debug)]
pub struct PlaybackSignal {
    kind: AlertKind,
    ticket: u64,
    tx: mpsc::UnboundedSender<PlaybackEvent>,
}

impl PlaybackSignal {
    pub fn new(kind: AlertKind, ticket: u64, tx: mpsc::UnboundedSender<PlaybackEvent>) -> Self {
        Self { kind, ticket, tx }
    }

    pub fn finished(self) {
        self.send(PlaybackOutcome::Finished);
    }

    pub fn failed(self) {
        self.send(PlaybackOutcome::Failed);
    }

    fn send(self, outcome: PlaybackOutcome) {
        // Receiver gone means the coordinator shut down; nothing left to release.
        let _ = self.tx.send(PlaybackEvent {
            kind: self.kind,
            ticket: self.ticket,
            outcome,
        });
    }
}

/// Which playback owns each latch.
///
/// Every latch transition the coordinator makes goes through here, under one
/// lock, so a completion can only release the latch its own trigger set.
#[derive(Debug, Default)]
pub struct PlaybackTickets {
    next: AtomicU64,
    current: Mutex<BTreeMap<AlertKind, u64>>,
}

impl PlaybackTickets {
    pub fn new() -> Self {
        Self::default()
    }

    /// `try_trigger` on the gate; on success the new playback's ticket.
    pub fn trigger(&self, gate: &AlertGate, kind: AlertKind) -> Option<u64> {
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        if !gate.try_trigger(kind) {
            return None;
        }
        let ticket = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        current.insert(kind, ticket);
        Some(ticket)
    }

    /// Withdrawal: the latch goes Idle and the playing sound no longer owns it.
    pub fn cancel(&self, gate: &AlertGate, kind: AlertKind) {
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        current.remove(&kind);
        gate.cancel(kind);
    }

    /// Release the latch if `ev` is the completion of the current playback.
    /// Returns false for stale completions, which leave the gate untouched.
    pub fn release(&self, gate: &AlertGate, ev: &PlaybackEvent) -> bool {
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        if current.get(&ev.kind) != Some(&ev.ticket) {
            return false;
        }
        current.remove(&ev.kind);
        gate.release(ev.kind);
        true
    }

    pub fn current(&self, kind: AlertKind) -> Option<u64> {
        self.current
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&kind)
            .copied()
    }
}

pub trait Player: Send + Sync {
    /// Start playback and return immediately; report through `done`.
    fn play(&self, request: PlaybackRequest, done: PlaybackSignal);
}

/// Plays through an external program, e.g. `mpv --no-video` or `afplay`.
/// The sound path is appended as the last argument.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Player for CommandPlayer {
    fn play(&self, request: PlaybackRequest, done: PlaybackSignal) {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .arg(&request.sound)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());

        let program = self.program.clone();
        tokio::spawn(async move {
            let status = match cmd.spawn() {
                Ok(mut child) => child.wait().await,
                Err(e) => Err(e),
            };
            match status {
                Ok(s) if s.success() => {
                    tracing::debug!(kind = %request.kind, "playback finished");
                    done.finished();
                }
                Ok(s) => {
                    tracing::warn!(kind = %request.kind, program = %program, status = ?s, "player exited with failure");
                    done.failed();
                }
                Err(e) => {
                    tracing::warn!(kind = %request.kind, program = %program, error = ?e, "could not run player");
                    done.failed();
                }
            }
        });
    }
}

/// Headless player: logs the sound and completes after a fixed duration.
#[derive(Debug, Clone)]
pub struct SilentPlayer {
    duration: Duration,
}

impl SilentPlayer {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Player for SilentPlayer {
    fn play(&self, request: PlaybackRequest, done: PlaybackSignal) {
        let duration = self.duration;
        tracing::info!(kind = %request.kind, sound = %request.sound.display(), "alert sound (silent)");
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            done.finished();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn silent_player_reports_completion() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let player = SilentPlayer::new(Duration::from_millis(5));
        player.play(
            PlaybackRequest {
                kind: AlertKind::Eew,
                sound: PathBuf::from("music/eew.mp3"),
            },
            PlaybackSignal::new(AlertKind::Eew, 1, tx),
        );
        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, AlertKind::Eew);
        assert_eq!(ev.ticket, 1);
        assert_eq!(ev.outcome, PlaybackOutcome::Finished);
    }

    #[tokio::test]
    async fn missing_program_reports_failure() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let player = CommandPlayer::new("/nonexistent/quake-watch-player", vec![]);
        player.play(
            PlaybackRequest {
                kind: AlertKind::SeismicIntensity,
                sound: PathBuf::from("music/sindsokuhou.mp3"),
            },
            PlaybackSignal::new(AlertKind::SeismicIntensity, 7, tx),
        );
        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.outcome, PlaybackOutcome::Failed);
    }

    fn finished(kind: AlertKind, ticket: u64) -> PlaybackEvent {
        PlaybackEvent {
            kind,
            ticket,
            outcome: PlaybackOutcome::Finished,
        }
    }

    #[test]
    fn superseded_completion_keeps_latch() {
        let gate = AlertGate::new();
        let tickets = PlaybackTickets::new();

        let first = tickets.trigger(&gate, AlertKind::Eew).expect("idle gate");
        assert!(tickets.trigger(&gate, AlertKind::Eew).is_none());
        tickets.cancel(&gate, AlertKind::Eew);
        let second = tickets.trigger(&gate, AlertKind::Eew).expect("cancelled gate");
        assert_ne!(first, second);

        assert!(!tickets.release(&gate, &finished(AlertKind::Eew, first)));
        assert!(gate.is_active(AlertKind::Eew));
        assert_eq!(tickets.current(AlertKind::Eew), Some(second));

        assert!(tickets.release(&gate, &finished(AlertKind::Eew, second)));
        assert!(!gate.is_active(AlertKind::Eew));
        assert_eq!(tickets.current(AlertKind::Eew), None);
    }

    #[test]
    fn tickets_are_per_kind() {
        let gate = AlertGate::new();
        let tickets = PlaybackTickets::new();
        let eew = tickets.trigger(&gate, AlertKind::Eew).unwrap();
        let seismic = tickets.trigger(&gate, AlertKind::SeismicIntensity).unwrap();

        // A ticket from another kind never releases.
        assert!(!tickets.release(&gate, &finished(AlertKind::Eew, seismic)));
        assert!(tickets.release(&gate, &finished(AlertKind::Eew, eew)));
        assert!(gate.is_active(AlertKind::SeismicIntensity));
    }
}

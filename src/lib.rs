// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod alert;
pub mod api;
pub mod board;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod render;

use std::sync::Arc;

use tokio::task::JoinHandle;

pub use crate::alert::{AlertGate, AlertKind};
pub use crate::api::{router, AppState};
pub use crate::board::Board;
pub use crate::feed::config::{load_config_default, FeedConfig};
pub use crate::feed::scheduler::Coordinator;

/// A running watch: the board it renders into, the shared alert gate, and
/// the timer tasks.
pub struct Watch {
    pub board: Arc<Board>,
    pub gate: Arc<AlertGate>,
    pub coordinator: Arc<Coordinator>,
    pub tasks: Vec<JoinHandle<()>>,
}

impl Watch {
    pub fn app_state(&self) -> AppState {
        AppState::new(Arc::clone(&self.board), Arc::clone(&self.gate))
    }

    pub fn shutdown(self) {
        for t in self.tasks {
            t.abort();
        }
    }
}

/// Wire fetcher → coordinator → board for `config` and start every timer.
/// Must be called inside a tokio runtime.
pub fn spawn_watch(config: &FeedConfig, fetcher: Arc<dyn feed::Fetcher>) -> anyhow::Result<Watch> {
    let plan = config.plan()?;
    let board = Arc::new(Board::from_sources(&config.sources));
    let player = config.playback.build_player();
    let coordinator = Arc::new(Coordinator::new(
        fetcher,
        Arc::clone(&board) as Arc<dyn render::Renderer>,
        player,
    ));
    let gate = Arc::clone(coordinator.gate());
    let tasks = coordinator.start(plan);
    tracing::info!(sources = config.sources.len(), "quake watch started");
    Ok(Watch {
        board,
        gate,
        coordinator,
        tasks,
    })
}

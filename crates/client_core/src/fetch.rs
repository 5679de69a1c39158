use std::sync::Arc;

use shared::{
    domain::{StackingIndex, ViewParams},
    error::ProtocolError,
    protocol::{classify_body, ContinuationStyle, NavigationIntent, TileResponse},
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    surface::{DisplaySurface, TileFragment},
    transport::{TileSource, TransportError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeState {
    Idle,
    InFlight,
    Completed,
    Failed,
    SilentEnd,
}

#[derive(Debug, Error)]
pub enum EpisodeError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[derive(Debug)]
pub enum EpisodeOutcome {
    Completed(ViewParams),
    Failed(EpisodeError),
    SilentEnd,
}

impl EpisodeOutcome {
    pub fn state(&self) -> EpisodeState {
        match self {
            EpisodeOutcome::Completed(_) => EpisodeState::Completed,
            EpisodeOutcome::Failed(_) => EpisodeState::Failed,
            EpisodeOutcome::SilentEnd => EpisodeState::SilentEnd,
        }
    }

    pub fn view(&self) -> Option<&ViewParams> {
        match self {
            EpisodeOutcome::Completed(view) => Some(view),
            _ => None,
        }
    }
}

/// One navigation unit of work. Never reused once it reaches a terminal state.
#[derive(Debug)]
pub struct Episode {
    id: u64,
    intent: NavigationIntent,
    state: EpisodeState,
    next_index: StackingIndex,
    tiles_rendered: usize,
    requests_sent: usize,
}

impl Episode {
    pub fn new(id: u64, intent: NavigationIntent) -> Self {
        Self {
            id,
            intent,
            state: EpisodeState::Idle,
            next_index: StackingIndex::FIRST,
            tiles_rendered: 0,
            requests_sent: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn intent(&self) -> &NavigationIntent {
        &self.intent
    }

    pub fn state(&self) -> EpisodeState {
        self.state
    }

    pub fn tiles_rendered(&self) -> usize {
        self.tiles_rendered
    }

    pub fn requests_sent(&self) -> usize {
        self.requests_sent
    }

    fn advance_index(&mut self) -> StackingIndex {
        let current = self.next_index;
        self.next_index = current.next();
        current
    }
}

pub struct FetchLoop {
    source: Arc<dyn TileSource>,
    continuation: ContinuationStyle,
}

impl FetchLoop {
    pub fn new(source: Arc<dyn TileSource>, continuation: ContinuationStyle) -> Self {
        Self {
            source,
            continuation,
        }
    }

    /// Pulls tiles until a sentinel, an empty body or a failure.
    ///
    /// Only the first request carries the episode intent; the server has consumed
    /// it by the time the first tile arrives.
    pub async fn run(
        &self,
        episode: &mut Episode,
        surface: &dyn DisplaySurface,
    ) -> EpisodeOutcome {
        let mut query = episode.intent.query_pairs(self.continuation);
        episode.state = EpisodeState::InFlight;

        loop {
            episode.requests_sent += 1;
            let body = match self.source.fetch(&query).await {
                Ok(body) => body,
                Err(err) => return Self::fail(episode, surface, err.into()),
            };

            match classify_body(&body) {
                Ok(TileResponse::Tile(payload)) => {
                    let tile = TileFragment {
                        payload,
                        render_order: episode.advance_index(),
                    };
                    debug!(
                        episode = episode.id,
                        order = tile.render_order.0,
                        len = tile.payload.len(),
                        "tile received"
                    );
                    surface.render_tile(&tile);
                    episode.tiles_rendered += 1;
                    query = NavigationIntent::Continue.query_pairs(self.continuation);
                }
                Ok(TileResponse::Sentinel(view)) => {
                    episode.state = EpisodeState::Completed;
                    info!(
                        episode = episode.id,
                        tiles = episode.tiles_rendered,
                        x = %view.x,
                        y = %view.y,
                        width = %view.width,
                        "episode complete"
                    );
                    return EpisodeOutcome::Completed(view);
                }
                Ok(TileResponse::End) => {
                    episode.state = EpisodeState::SilentEnd;
                    info!(
                        episode = episode.id,
                        tiles = episode.tiles_rendered,
                        "no more data"
                    );
                    surface.report_diagnostic("no more data");
                    return EpisodeOutcome::SilentEnd;
                }
                Err(err) => return Self::fail(episode, surface, err.into()),
            }
        }
    }

    fn fail(
        episode: &mut Episode,
        surface: &dyn DisplaySurface,
        err: EpisodeError,
    ) -> EpisodeOutcome {
        episode.state = EpisodeState::Failed;
        warn!(episode = episode.id, error = %err, "episode failed");
        surface.report_diagnostic(&format!("episode {} failed: {err}", episode.id));
        EpisodeOutcome::Failed(err)
    }
}

#[cfg(test)]
#[path = "tests/fetch_tests.rs"]
mod tests;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};

use serde::Serialize;
use shared::{
    domain::{FormField, SurfacePoint, ViewParams},
    protocol::NavigationIntent,
};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{
    config::{ClientConfig, StartupMode},
    fetch::{Episode, EpisodeOutcome, FetchLoop},
    surface::DisplaySurface,
    transport::{HttpTileSource, TileSource, TransportError},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub accepted: u64,
    pub rejected: u64,
    pub completed: u64,
    pub failed: u64,
    pub silent_ends: u64,
    pub tiles_rendered: u64,
}

#[derive(Default)]
struct SessionState {
    next_episode_id: u64,
    pending_pan: Option<SurfacePoint>,
    last_view: Option<ViewParams>,
    stats: SessionStats,
}

/// Clears the busy flag when dropped, so an abandoned or aborted episode
/// never wedges the controller.
struct BusyRelease(Arc<AtomicBool>);

impl Drop for BusyRelease {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Proof that the busy flag was taken for one episode.
#[must_use = "dropping a ticket releases the controller without fetching"]
pub struct EpisodeTicket {
    episode: Episode,
    release: BusyRelease,
}

impl EpisodeTicket {
    pub fn episode(&self) -> &Episode {
        &self.episode
    }
}

/// Serialises user input into episodes, one at a time.
pub struct InteractionController {
    fetch: FetchLoop,
    surface: Arc<dyn DisplaySurface>,
    startup: StartupMode,
    busy: Arc<AtomicBool>,
    session: Mutex<SessionState>,
}

impl InteractionController {
    pub fn new(
        config: &ClientConfig,
        source: Arc<dyn TileSource>,
        surface: Arc<dyn DisplaySurface>,
    ) -> Arc<Self> {
        Arc::new(Self {
            fetch: FetchLoop::new(source, config.continuation),
            surface,
            startup: config.startup,
            busy: Arc::new(AtomicBool::new(false)),
            session: Mutex::new(SessionState::default()),
        })
    }

    pub fn over_http(
        config: &ClientConfig,
        surface: Arc<dyn DisplaySurface>,
    ) -> Result<Arc<Self>, TransportError> {
        let source = HttpTileSource::new(config)?;
        Ok(Self::new(config, Arc::new(source), surface))
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn last_view(&self) -> Option<ViewParams> {
        self.session().last_view.clone()
    }

    pub fn pending_pan(&self) -> Option<SurfacePoint> {
        self.session().pending_pan
    }

    pub fn stats(&self) -> SessionStats {
        self.session().stats
    }

    fn session(&self) -> MutexGuard<'_, SessionState> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Takes the busy flag, clears the surface and opens an episode.
    ///
    /// Returns `None` without side effects on the surface while another episode
    /// is in flight.
    pub fn begin(&self, intent: NavigationIntent) -> Option<EpisodeTicket> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.session().stats.rejected += 1;
            debug!(intent = intent.name(), "episode in flight; intent ignored");
            return None;
        }
        let release = BusyRelease(Arc::clone(&self.busy));

        self.surface.clear_tiles();

        let id = {
            let mut session = self.session();
            session.next_episode_id += 1;
            session.stats.accepted += 1;
            if let NavigationIntent::Pan(point) = &intent {
                session.pending_pan = Some(*point);
            }
            session.next_episode_id
        };
        info!(episode = id, intent = intent.name(), "episode started");

        Some(EpisodeTicket {
            episode: Episode::new(id, intent),
            release,
        })
    }

    pub async fn run(&self, ticket: EpisodeTicket) -> EpisodeOutcome {
        let EpisodeTicket {
            mut episode,
            release,
        } = ticket;

        // The pan point goes out with the first request and is never resent.
        self.session().pending_pan = None;
        let outcome = self.fetch.run(&mut episode, self.surface.as_ref()).await;
        self.finish(&episode, &outcome);

        drop(release);
        outcome
    }

    fn finish(&self, episode: &Episode, outcome: &EpisodeOutcome) {
        if let EpisodeOutcome::Completed(view) = outcome {
            for field in FormField::ALL {
                self.surface.set_form_field(field, view.get(field));
            }
        }

        let mut session = self.session();
        session.stats.tiles_rendered += episode.tiles_rendered() as u64;
        match outcome {
            EpisodeOutcome::Completed(view) => {
                session.stats.completed += 1;
                session.last_view = Some(view.clone());
            }
            EpisodeOutcome::Failed(_) => session.stats.failed += 1,
            EpisodeOutcome::SilentEnd => session.stats.silent_ends += 1,
        }
    }

    /// Begins an episode and drives it on the current tokio runtime.
    pub fn dispatch(
        self: &Arc<Self>,
        intent: NavigationIntent,
    ) -> Option<JoinHandle<EpisodeOutcome>> {
        let ticket = self.begin(intent)?;
        let controller = Arc::clone(self);
        Some(tokio::spawn(async move { controller.run(ticket).await }))
    }

    pub fn startup(self: &Arc<Self>) -> Option<JoinHandle<EpisodeOutcome>> {
        self.dispatch(self.startup.intent())
    }

    /// Unbound keys are ignored.
    pub fn key_pressed(self: &Arc<Self>, key: char) -> Option<JoinHandle<EpisodeOutcome>> {
        let intent = NavigationIntent::for_key(key)?;
        self.dispatch(intent)
    }

    pub fn surface_clicked(
        self: &Arc<Self>,
        point: SurfacePoint,
    ) -> Option<JoinHandle<EpisodeOutcome>> {
        self.dispatch(NavigationIntent::Pan(point))
    }

    /// Submits serialised form fields verbatim.
    pub fn submit_form(
        self: &Arc<Self>,
        fields: Vec<(String, String)>,
    ) -> Option<JoinHandle<EpisodeOutcome>> {
        self.dispatch(NavigationIntent::Form(fields))
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;

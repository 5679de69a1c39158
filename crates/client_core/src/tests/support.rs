use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use shared::domain::FormField;
use tokio::{net::TcpListener, sync::Semaphore};

use crate::{
    surface::{DisplaySurface, TileFragment},
    transport::{TileSource, TransportError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    Clear,
    Tile(TileFragment),
    Field(FormField, String),
    Diagnostic(String),
}

#[derive(Default)]
pub struct RecordingSurface {
    events: Mutex<Vec<SurfaceEvent>>,
}

impl RecordingSurface {
    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.events.lock().expect("events").clone()
    }

    pub fn clears(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, SurfaceEvent::Clear))
            .count()
    }

    pub fn tiles(&self) -> Vec<TileFragment> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SurfaceEvent::Tile(tile) => Some(tile),
                _ => None,
            })
            .collect()
    }

    pub fn fields(&self) -> HashMap<FormField, String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SurfaceEvent::Field(field, value) => Some((field, value)),
                _ => None,
            })
            .collect()
    }

    pub fn diagnostics(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SurfaceEvent::Diagnostic(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: SurfaceEvent) {
        self.events.lock().expect("events").push(event);
    }
}

impl DisplaySurface for RecordingSurface {
    fn render_tile(&self, tile: &TileFragment) {
        self.push(SurfaceEvent::Tile(tile.clone()));
    }

    fn clear_tiles(&self) {
        self.push(SurfaceEvent::Clear);
    }

    fn set_form_field(&self, field: FormField, value: &str) {
        self.push(SurfaceEvent::Field(field, value.to_string()));
    }

    fn report_diagnostic(&self, message: &str) {
        self.push(SurfaceEvent::Diagnostic(message.to_string()));
    }
}

/// Plays back canned bodies in order; an exhausted script answers with an empty body.
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<String, String>>>,
    queries: Mutex<Vec<Vec<(String, String)>>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedSource {
    pub fn new(responses: Vec<Result<&str, &str>>) -> Self {
        Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            queries: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Every fetch waits for one permit on the returned semaphore.
    pub fn gated(responses: Vec<Result<&str, &str>>) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let mut source = Self::new(responses);
        source.gate = Some(Arc::clone(&gate));
        (source, gate)
    }

    pub fn queries(&self) -> Vec<Vec<(String, String)>> {
        self.queries.lock().expect("queries").clone()
    }
}

#[async_trait]
impl TileSource for ScriptedSource {
    async fn fetch(&self, query: &[(String, String)]) -> Result<String, TransportError> {
        self.queries.lock().expect("queries").push(query.to_vec());
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate open").forget();
        }
        let next = self.responses.lock().expect("responses").pop_front();
        match next {
            Some(Ok(body)) => Ok(body),
            Some(Err(message)) => Err(TransportError::Unavailable(message)),
            None => Ok(String::new()),
        }
    }
}

pub fn pair(key: &str, value: &str) -> (String, String) {
    (key.to_string(), value.to_string())
}

#[derive(Clone)]
struct TileServerState {
    bodies: Arc<tokio::sync::Mutex<VecDeque<(StatusCode, String)>>>,
    queries: Arc<tokio::sync::Mutex<Vec<HashMap<String, String>>>>,
}

async fn serve_piece(
    State(state): State<TileServerState>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    state.queries.lock().await.push(query);
    state
        .bodies
        .lock()
        .await
        .pop_front()
        .unwrap_or((StatusCode::OK, String::new()))
}

pub type RecordedQueries = Arc<tokio::sync::Mutex<Vec<HashMap<String, String>>>>;

/// Serves `bodies` from `/image/` one per request and records every query.
pub async fn spawn_tile_server(bodies: Vec<(StatusCode, &str)>) -> Result<(String, RecordedQueries)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = TileServerState {
        bodies: Arc::new(tokio::sync::Mutex::new(
            bodies
                .into_iter()
                .map(|(status, body)| (status, body.to_string()))
                .collect(),
        )),
        queries: Arc::new(tokio::sync::Mutex::new(Vec::new())),
    };
    let queries = Arc::clone(&state.queries);
    let app = Router::new()
        .route("/image/", get(serve_piece))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/image/"), queries))
}

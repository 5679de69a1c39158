use serde::{Deserialize, Serialize};

use crate::{
    domain::{FormField, SurfacePoint, ViewParams},
    error::ProtocolError,
};

/// First character of a terminal response; also the field delimiter.
pub const SENTINEL_MARKER: char = '_';
/// Marker slot plus the seven view parameters.
pub const SENTINEL_FIELD_COUNT: usize = 8;

/// Key code 43.
pub const ZOOM_IN_KEY: char = '+';
/// Key code 95 (shift + minus).
pub const ZOOM_OUT_KEY: char = '_';

/// What follow-up requests inside an episode carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinuationStyle {
    /// No query parameters at all.
    #[default]
    Bare,
    /// A no-op `ctd=1`.
    Marker,
}

/// The single navigation intent an episode starts with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationIntent {
    Reset,
    ZoomIn,
    ZoomOut,
    Pan(SurfacePoint),
    Continue,
    Form(Vec<(String, String)>),
}

impl NavigationIntent {
    /// Collapses independent pan/zoom flags into one intent.
    ///
    /// Pan wins over zoom, zoom-in wins over zoom-out.
    pub fn from_flags(pan: Option<SurfacePoint>, zoom_in: bool, zoom_out: bool) -> Option<Self> {
        if let Some(point) = pan {
            return Some(NavigationIntent::Pan(point));
        }
        if zoom_in {
            return Some(NavigationIntent::ZoomIn);
        }
        if zoom_out {
            return Some(NavigationIntent::ZoomOut);
        }
        None
    }

    pub fn for_key(key: char) -> Option<Self> {
        match key {
            ZOOM_IN_KEY => Some(NavigationIntent::ZoomIn),
            ZOOM_OUT_KEY => Some(NavigationIntent::ZoomOut),
            _ => None,
        }
    }

    /// Form submission built from the current view with selected fields overridden.
    pub fn form_from_view(view: &ViewParams, overrides: &[(FormField, String)]) -> Self {
        let mut view = view.clone();
        for (field, value) in overrides {
            view.set(*field, value.clone());
        }
        NavigationIntent::Form(view.form_pairs())
    }

    pub fn name(&self) -> &'static str {
        match self {
            NavigationIntent::Reset => "reset",
            NavigationIntent::ZoomIn => "zoom_in",
            NavigationIntent::ZoomOut => "zoom_out",
            NavigationIntent::Pan(_) => "pan",
            NavigationIntent::Continue => "continue",
            NavigationIntent::Form(_) => "form",
        }
    }

    pub fn query_pairs(&self, continuation: ContinuationStyle) -> Vec<(String, String)> {
        let flag = |key: &str| vec![(key.to_string(), "1".to_string())];
        match self {
            NavigationIntent::Reset => flag("reset"),
            NavigationIntent::ZoomIn => flag("in"),
            NavigationIntent::ZoomOut => flag("out"),
            NavigationIntent::Pan(point) => {
                vec![("newpt".to_string(), format!("{}|{}", point.x, point.y))]
            }
            NavigationIntent::Continue => match continuation {
                ContinuationStyle::Bare => Vec::new(),
                ContinuationStyle::Marker => flag("ctd"),
            },
            NavigationIntent::Form(pairs) => pairs.clone(),
        }
    }
}

/// Shape of one response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileResponse {
    Sentinel(ViewParams),
    Tile(String),
    End,
}

pub fn classify_body(body: &str) -> Result<TileResponse, ProtocolError> {
    if body.starts_with(SENTINEL_MARKER) {
        return parse_sentinel(body).map(TileResponse::Sentinel);
    }
    if body.is_empty() {
        return Ok(TileResponse::End);
    }
    Ok(TileResponse::Tile(body.to_string()))
}

/// Parses `_x_y_w_num_r_m_col`. Fields past the eighth are ignored.
pub fn parse_sentinel(raw: &str) -> Result<ViewParams, ProtocolError> {
    let trimmed = raw.trim_end_matches(['\r', '\n']);
    let fields: Vec<&str> = trimmed.split(SENTINEL_MARKER).collect();
    if !trimmed.starts_with(SENTINEL_MARKER) || fields.len() < SENTINEL_FIELD_COUNT {
        return Err(ProtocolError::MalformedSentinel {
            expected: SENTINEL_FIELD_COUNT,
            actual: fields.len(),
            raw: raw.to_string(),
        });
    }

    let mut view = ViewParams::default();
    for (field, value) in FormField::ALL.iter().zip(&fields[1..SENTINEL_FIELD_COUNT]) {
        view.set(*field, *value);
    }
    Ok(view)
}

pub fn format_sentinel(view: &ViewParams) -> String {
    FormField::ALL.iter().fold(String::new(), |mut out, field| {
        out.push(SENTINEL_MARKER);
        out.push_str(view.get(*field));
        out
    })
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;

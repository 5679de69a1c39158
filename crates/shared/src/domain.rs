use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Canonical view parameters as reported by the server when an image is complete.
///
/// Values are kept as the server sent them so the navigation form shows them
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewParams {
    pub x: String,
    pub y: String,
    pub width: String,
    pub iterations: String,
    pub escape_radius: String,
    pub bailout: String,
    pub palette: String,
}

impl ViewParams {
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::X => &self.x,
            FormField::Y => &self.y,
            FormField::Width => &self.width,
            FormField::Iterations => &self.iterations,
            FormField::EscapeRadius => &self.escape_radius,
            FormField::Bailout => &self.bailout,
            FormField::Palette => &self.palette,
        }
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let slot = match field {
            FormField::X => &mut self.x,
            FormField::Y => &mut self.y,
            FormField::Width => &mut self.width,
            FormField::Iterations => &mut self.iterations,
            FormField::EscapeRadius => &mut self.escape_radius,
            FormField::Bailout => &mut self.bailout,
            FormField::Palette => &mut self.palette,
        };
        *slot = value.into();
    }

    /// Serialises the form the way a browser does: every field, in form order.
    pub fn form_pairs(&self) -> Vec<(String, String)> {
        FormField::ALL
            .iter()
            .map(|field| (field.wire_name().to_string(), self.get(*field).to_string()))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    X,
    Y,
    Width,
    Iterations,
    EscapeRadius,
    Bailout,
    Palette,
}

impl FormField {
    /// Form order, which is also the sentinel field order.
    pub const ALL: [FormField; 7] = [
        FormField::X,
        FormField::Y,
        FormField::Width,
        FormField::Iterations,
        FormField::EscapeRadius,
        FormField::Bailout,
        FormField::Palette,
    ];

    /// Query parameter name understood by the tile server.
    pub fn wire_name(self) -> &'static str {
        match self {
            FormField::X => "x",
            FormField::Y => "y",
            FormField::Width => "w",
            FormField::Iterations => "num",
            FormField::EscapeRadius => "r",
            FormField::Bailout => "m",
            FormField::Palette => "col",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FormField::X => "x",
            FormField::Y => "y",
            FormField::Width => "width",
            FormField::Iterations => "iterations",
            FormField::EscapeRadius => "escape-radius",
            FormField::Bailout => "bailout",
            FormField::Palette => "palette",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FormField {
    type Err = ProtocolError;

    /// Accepts either the wire name or the display label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormField::ALL
            .into_iter()
            .find(|field| field.wire_name() == s || field.label() == s)
            .ok_or_else(|| ProtocolError::UnknownFormField(s.to_string()))
    }
}

/// Stacking order of a rendered tile. Later tiles occlude earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StackingIndex(pub u32);

impl StackingIndex {
    pub const FIRST: StackingIndex = StackingIndex(1);
    const STEP: u32 = 2;

    pub fn next(self) -> Self {
        StackingIndex(self.0.saturating_add(Self::STEP))
    }
}

impl Default for StackingIndex {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for StackingIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pixel offset of a click relative to the surface's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfacePoint {
    pub x: u32,
    pub y: u32,
}

impl SurfacePoint {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Offsets are rounded up; anything left of or above the origin clamps to 0.
    pub fn from_offsets(pointer_x: f64, pointer_y: f64, origin_x: f64, origin_y: f64) -> Self {
        Self {
            x: ceil_offset(pointer_x - origin_x),
            y: ceil_offset(pointer_y - origin_y),
        }
    }
}

fn ceil_offset(delta: f64) -> u32 {
    if delta.is_nan() || delta <= 0.0 {
        return 0;
    }
    delta.ceil().min(u32::MAX as f64) as u32
}

use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::domain::{FormField, StackingIndex};

/// One chunk of base64 raster data and the order it stacks in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileFragment {
    pub payload: String,
    pub render_order: StackingIndex,
}

impl TileFragment {
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.payload.trim())
    }
}

/// Side effects the controller and fetch loop drive but do not implement.
///
/// Tiles are overlays anchored at the surface origin; a higher
/// `render_order` occludes a lower one.
pub trait DisplaySurface: Send + Sync {
    fn render_tile(&self, tile: &TileFragment);
    fn clear_tiles(&self);
    fn set_form_field(&self, field: FormField, value: &str);
    fn report_diagnostic(&self, message: &str);
}

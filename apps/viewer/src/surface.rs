//! Headless display surface: tiles land on disk, the form lives in memory.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use anyhow::{Context, Result};
use client_core::{DisplaySurface, TileFragment};
use shared::domain::{FormField, StackingIndex, ViewParams};
use tracing::{debug, info, warn};

pub struct DirectorySurface {
    dir: PathBuf,
    written: Mutex<Vec<PathBuf>>,
    form: Mutex<ViewParams>,
    diagnostics: Mutex<Vec<String>>,
}

impl DirectorySurface {
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory '{}'", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: Mutex::new(Vec::new()),
            form: Mutex::new(ViewParams::default()),
            diagnostics: Mutex::new(Vec::new()),
        })
    }

    pub fn tile_path(&self, order: StackingIndex) -> PathBuf {
        self.dir.join(format!("tile-{:05}.png", order.0))
    }

    /// Files currently on screen, bottom of the stack first.
    pub fn written_tiles(&self) -> Vec<PathBuf> {
        lock(&self.written).clone()
    }

    pub fn form(&self) -> ViewParams {
        lock(&self.form).clone()
    }

    /// User edits to the form, as opposed to updates pushed by the controller.
    pub fn edit_form(&self, edits: &[(FormField, String)]) {
        let mut form = lock(&self.form);
        for (field, value) in edits {
            form.set(*field, value.clone());
        }
    }

    pub fn last_diagnostic(&self) -> Option<String> {
        lock(&self.diagnostics).last().cloned()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DisplaySurface for DirectorySurface {
    fn render_tile(&self, tile: &TileFragment) {
        let bytes = match tile.decode() {
            Ok(bytes) => bytes,
            Err(error) => {
                self.report_diagnostic(&format!(
                    "tile {} is not valid base64: {error}",
                    tile.render_order
                ));
                return;
            }
        };

        let path = self.tile_path(tile.render_order);
        if let Err(error) = fs::write(&path, &bytes) {
            self.report_diagnostic(&format!("failed to write {}: {error}", path.display()));
            return;
        }
        debug!(path = %path.display(), len = bytes.len(), "tile written");
        lock(&self.written).push(path);
    }

    fn clear_tiles(&self) {
        let written = std::mem::take(&mut *lock(&self.written));
        for path in written {
            if let Err(error) = fs::remove_file(&path) {
                warn!(path = %path.display(), %error, "failed to remove tile");
            }
        }
    }

    fn set_form_field(&self, field: FormField, value: &str) {
        info!(%field, value, "form field updated");
        lock(&self.form).set(field, value);
    }

    fn report_diagnostic(&self, message: &str) {
        warn!("{message}");
        lock(&self.diagnostics).push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(payload: &str, order: u32) -> TileFragment {
        TileFragment {
            payload: payload.to_string(),
            render_order: StackingIndex(order),
        }
    }

    #[test]
    fn writes_decoded_tiles_in_stacking_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let surface = DirectorySurface::create(dir.path()).expect("surface");

        surface.render_tile(&tile("aGVsbG8=", 1));
        surface.render_tile(&tile("d29ybGQ=", 3));

        let written = surface.written_tiles();
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with("tile-00001.png"));
        assert_eq!(fs::read(&written[1]).expect("read"), b"world");
    }

    #[test]
    fn clear_removes_every_written_tile() {
        let dir = tempfile::tempdir().expect("tempdir");
        let surface = DirectorySurface::create(dir.path()).expect("surface");
        surface.render_tile(&tile("aGVsbG8=", 1));
        let path = surface.tile_path(StackingIndex(1));
        assert!(path.exists());

        surface.clear_tiles();

        assert!(!path.exists());
        assert!(surface.written_tiles().is_empty());
    }

    #[test]
    fn undecodable_tile_is_reported_not_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        let surface = DirectorySurface::create(dir.path()).expect("surface");

        surface.render_tile(&tile("***", 1));

        assert!(surface.written_tiles().is_empty());
        assert!(surface
            .last_diagnostic()
            .expect("diagnostic")
            .contains("not valid base64"));
    }

    #[test]
    fn form_tracks_controller_updates_and_user_edits() {
        let dir = tempfile::tempdir().expect("tempdir");
        let surface = DirectorySurface::create(dir.path()).expect("surface");

        surface.set_form_field(FormField::X, "0.5");
        surface.edit_form(&[(FormField::Palette, "fire".to_string())]);

        let form = surface.form();
        assert_eq!(form.x, "0.5");
        assert_eq!(form.palette, "fire");
    }
}

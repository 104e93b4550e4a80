use crate::cache::LocalCache;
use crate::data::{Dataset, DatasetKind, DatasetSource};
use crate::error::LoadError;
use crate::features::to_feature_collection;
use crate::filter::filter_visible;
use crate::loader::{self, Origin, RefreshEvent};
use crate::map::{RailLine, RailRenderer, Viewport};
use crate::status::{StatusLine, LOAD_ERROR_DISMISS, REFRESH_DISMISS};
use geojson::FeatureCollection;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Click distance, in Braille pixels, within which a line is selected
const PICK_TOLERANCE: i32 = 4;

/// Rows taken by the map border, popup line and status bar
const CHROME_ROWS: usize = 4;
/// Columns taken by the map border
const CHROME_COLS: usize = 2;

/// One dataset, its currently visible features and nothing else
#[derive(Default)]
struct Layer {
    dataset: Option<Dataset>,
    visible: Option<FeatureCollection>,
}

impl Layer {
    fn total(&self) -> usize {
        self.dataset.as_ref().map_or(0, Dataset::len)
    }

    fn visible(&self) -> usize {
        self.visible.as_ref().map_or(0, |fc| fc.features.len())
    }
}

/// Application state. Everything the map needs lives here and is passed
/// explicitly to filtering and rendering.
pub struct App {
    pub viewport: Viewport,
    pub renderer: RailRenderer,
    pub status: StatusLine,
    pub should_quit: bool,
    /// True while the synchronous initial load runs
    pub loading: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Where the left button went down; a release on the same cell is a click
    drag_start: Option<(u16, u16)>,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    /// Feature whose label is shown in the popup line
    pub selected: Option<RailLine>,
    lgv: Layer,
    tunnels: Layer,
    refresh: Option<Receiver<RefreshEvent>>,
}

impl App {
    pub fn new(width: usize, height: usize) -> Self {
        let (pixel_width, pixel_height) = canvas_pixels(width, height);
        Self {
            viewport: Viewport::france(pixel_width, pixel_height),
            renderer: RailRenderer::new(),
            status: StatusLine::new(),
            should_quit: false,
            loading: false,
            last_mouse: None,
            drag_start: None,
            mouse_pos: None,
            selected: None,
            lgv: Layer::default(),
            tunnels: Layer::default(),
            refresh: None,
        }
    }

    fn layer(&self, kind: DatasetKind) -> &Layer {
        match kind {
            DatasetKind::Lgv => &self.lgv,
            DatasetKind::Tunnels => &self.tunnels,
        }
    }

    fn layer_mut(&mut self, kind: DatasetKind) -> &mut Layer {
        match kind {
            DatasetKind::Lgv => &mut self.lgv,
            DatasetKind::Tunnels => &mut self.tunnels,
        }
    }

    pub fn dataset(&self, kind: DatasetKind) -> Option<&Dataset> {
        self.layer(kind).dataset.as_ref()
    }

    /// Features of `kind` currently in the viewport
    pub fn visible_features(&self, kind: DatasetKind) -> Option<&FeatureCollection> {
        self.layer(kind).visible.as_ref()
    }

    /// (visible, total) element counts for the status bar
    pub fn counts(&self, kind: DatasetKind) -> (usize, usize) {
        let layer = self.layer(kind);
        (layer.visible(), layer.total())
    }

    /// Swap in a new dataset wholesale and redraw its layer.
    /// The selection refers to old geometry, so it is dropped.
    pub fn set_dataset(&mut self, kind: DatasetKind, dataset: Dataset) {
        debug!(%kind, elements = dataset.len(), "dataset replaced");
        self.selected = None;
        self.layer_mut(kind).dataset = Some(dataset);
        self.rebuild_layer(kind);
    }

    /// Filter both datasets to the current viewport and hand them to the renderer
    pub fn refresh_layers(&mut self) {
        for kind in DatasetKind::ALL {
            self.rebuild_layer(kind);
        }
    }

    fn rebuild_layer(&mut self, kind: DatasetKind) {
        let bounds = self.viewport.bounds();
        let layer = match kind {
            DatasetKind::Lgv => &mut self.lgv,
            DatasetKind::Tunnels => &mut self.tunnels,
        };
        let Some(dataset) = layer.dataset.as_ref() else {
            return;
        };

        let visible = filter_visible(&dataset.elements, &bounds);
        let collection = to_feature_collection(kind, &visible);
        self.renderer.set_layer(kind, &collection);
        layer.visible = Some(collection);
    }

    /// Open the cache directory. A failure is reported like any other load
    /// error and the app runs without data.
    pub fn open_cache(&mut self, dir: &Path, now: Instant) -> Option<LocalCache> {
        match LocalCache::open(dir) {
            Ok(cache) => Some(cache),
            Err(e) => {
                self.load_failed(&e.into(), now);
                None
            }
        }
    }

    /// Startup load: cache first, synchronous fetch when the cache is incomplete.
    /// Errors end up in the status line; datasets already shown are kept.
    pub fn load<S>(&mut self, cache: &LocalCache, source: &S, now: Instant) -> Option<Origin>
    where
        S: DatasetSource + ?Sized,
    {
        self.loading = true;
        let result = loader::load(cache, source, |kind, dataset| {
            self.set_dataset(kind, dataset)
        });
        self.loading = false;

        match result {
            Ok(origin) => {
                self.status.clear();
                Some(origin)
            }
            Err(e) => {
                self.load_failed(&e, now);
                None
            }
        }
    }

    pub fn load_failed(&mut self, error: &LoadError, now: Instant) {
        warn!(error = %error, "initial load failed");
        self.status
            .error("Load failed", error.to_string(), now, LOAD_ERROR_DISMISS);
    }

    /// Start a background refresh unless one is already running
    pub fn start_refresh(
        &mut self,
        cache: &LocalCache,
        source: Arc<dyn DatasetSource + Send + Sync>,
    ) -> bool {
        if self.refresh.is_some() {
            return false;
        }
        self.status.progress("Refreshing data in background", "in progress");
        self.refresh = Some(loader::spawn_refresh(cache.clone(), source));
        true
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_some()
    }

    /// Apply whatever the refresh worker has sent so far
    pub fn poll_refresh(&mut self, now: Instant) {
        let Some(rx) = self.refresh.take() else {
            return;
        };

        loop {
            match rx.try_recv() {
                Ok(RefreshEvent::Dataset(kind, dataset)) => self.set_dataset(kind, dataset),
                Ok(RefreshEvent::Finished) => {
                    self.status.success("Data updated", now, REFRESH_DISMISS);
                    return;
                }
                Ok(RefreshEvent::Failed(message)) => {
                    self.status.error("Refresh failed", message, now, REFRESH_DISMISS);
                    return;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.status
                        .error("Refresh failed", "worker stopped", now, REFRESH_DISMISS);
                    return;
                }
            }
        }

        self.refresh = Some(rx);
    }

    /// Per-frame housekeeping
    pub fn tick(&mut self, now: Instant) {
        self.poll_refresh(now);
        self.status.tick(now);
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        let (pixel_width, pixel_height) = canvas_pixels(width, height);
        self.viewport.width = pixel_width;
        self.viewport.height = pixel_height;
        self.refresh_layers();
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
        self.refresh_layers();
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
        self.refresh_layers();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
        self.refresh_layers();
    }

    /// Zoom in towards a terminal cell
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        let (px, py) = cell_to_pixel(col, row);
        self.viewport.zoom_in_at(px, py);
        self.refresh_layers();
    }

    /// Zoom out from a terminal cell
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        let (px, py) = cell_to_pixel(col, row);
        self.viewport.zoom_out_at(px, py);
        self.refresh_layers();
    }

    /// Back to the France-wide view
    pub fn reset_view(&mut self) {
        self.viewport = Viewport::france(self.viewport.width, self.viewport.height);
        self.selected = None;
        self.refresh_layers();
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Pan by the mouse movement since the last drag event
    pub fn handle_drag(&mut self, col: u16, row: u16) {
        if let Some((last_col, last_row)) = self.last_mouse {
            let dx = (last_col as i32 - col as i32) * 2;
            let dy = (last_row as i32 - row as i32) * 4;
            if dx != 0 || dy != 0 {
                self.pan(dx, dy);
            }
        }
        self.last_mouse = Some((col, row));
    }

    pub fn begin_drag(&mut self, col: u16, row: u16) {
        self.last_mouse = Some((col, row));
        self.drag_start = Some((col, row));
    }

    /// Release of the left button: select when the mouse did not move
    pub fn end_drag(&mut self, col: u16, row: u16) {
        if self.drag_start == Some((col, row)) {
            self.select_at(col, row);
        }
        self.last_mouse = None;
        self.drag_start = None;
    }

    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    /// Mouse position in Braille pixel coordinates
    pub fn mouse_pixel_pos(&self) -> Option<(i32, i32)> {
        self.mouse_pos.map(|(col, row)| cell_to_pixel(col, row))
    }

    /// Select the feature under a terminal cell, or clear the selection
    pub fn select_at(&mut self, col: u16, row: u16) {
        let (px, py) = cell_to_pixel(col, row);
        // Aim at the middle of the 2x4 cell
        let picked = self
            .renderer
            .pick(&self.viewport, px + 1, py + 2, PICK_TOLERANCE);
        self.selected = picked.and_then(|f| self.renderer.feature(f)).cloned();
    }

    /// Popup text of the selected feature
    pub fn selected_label(&self) -> Option<&str> {
        self.selected.as_ref().map(|line| line.label.as_str())
    }

    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport.zoom)
    }

    pub fn center_coords(&self) -> String {
        format!(
            "{:.2}°{}, {:.2}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }
}

/// Braille pixel size of the map area for a terminal of `width` x `height` cells
fn canvas_pixels(width: usize, height: usize) -> (usize, usize) {
    (
        width.saturating_sub(CHROME_COLS) * 2,
        height.saturating_sub(CHROME_ROWS) * 4,
    )
}

/// Terminal cell to Braille pixel, accounting for the one-cell border
fn cell_to_pixel(col: u16, row: u16) -> (i32, i32) {
    (
        col.saturating_sub(1) as i32 * 2,
        row.saturating_sub(1) as i32 * 4,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parse_dataset;
    use crate::error::FetchError;
    use crate::loader::tests::{dataset_for, FakeSource};
    use crate::status::StatusKind;
    use std::time::Duration;

    /// Answers every request with a body that is not JSON
    struct MalformedSource;

    impl DatasetSource for MalformedSource {
        fn fetch(&self, _kind: DatasetKind) -> Result<Dataset, FetchError> {
            let mut body = b"<html>502 Bad Gateway</html>".to_vec();
            Ok(parse_dataset(&mut body)?)
        }
    }

    fn app() -> App {
        App::new(102, 54)
    }

    #[test]
    fn test_layers_follow_viewport() {
        let mut app = app();
        app.set_dataset(DatasetKind::Lgv, dataset_for(DatasetKind::Lgv));
        assert_eq!(app.counts(DatasetKind::Lgv), (1, 1));

        // Pan far out into the Atlantic
        for _ in 0..5 {
            app.pan(-200, 0);
        }
        assert_eq!(app.counts(DatasetKind::Lgv), (0, 1));

        app.reset_view();
        assert_eq!(app.counts(DatasetKind::Lgv), (1, 1));
        let fc = app.visible_features(DatasetKind::Lgv).unwrap();
        assert_eq!(fc.features.len(), 1);
    }

    #[test]
    fn test_set_dataset_swaps_whole_dataset() {
        let mut app = app();
        app.set_dataset(DatasetKind::Tunnels, dataset_for(DatasetKind::Tunnels));
        app.set_dataset(DatasetKind::Tunnels, Dataset::default());
        assert_eq!(app.counts(DatasetKind::Tunnels), (0, 0));
        assert!(app.dataset(DatasetKind::Tunnels).unwrap().is_empty());
    }

    #[test]
    fn test_load_populates_from_remote_then_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::open(dir.path()).unwrap();
        let source = FakeSource::new();

        let mut first = app();
        assert_eq!(first.load(&cache, &source, Instant::now()), Some(Origin::Remote));
        assert_eq!(first.counts(DatasetKind::Lgv).1, 1);
        assert_eq!(first.counts(DatasetKind::Tunnels).1, 1);

        let mut second = app();
        assert_eq!(second.load(&cache, &source, Instant::now()), Some(Origin::Cache));
        assert_eq!(second.counts(DatasetKind::Tunnels).1, 1);
        assert_eq!(source.calls(), 2);
        assert!(!second.loading);
    }

    #[test]
    fn test_malformed_response_keeps_dataset_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::open(dir.path()).unwrap();
        let mut app = app();
        let before = dataset_for(DatasetKind::Lgv);
        app.set_dataset(DatasetKind::Lgv, before.clone());

        let now = Instant::now();
        assert_eq!(app.load(&cache, &MalformedSource, now), None);

        let msg = app.status.current().unwrap();
        assert_eq!(msg.kind, StatusKind::Error);
        assert_eq!(msg.text, "Load failed");
        assert_eq!(app.dataset(DatasetKind::Lgv), Some(&before));
        assert!(app.dataset(DatasetKind::Tunnels).is_none());

        app.tick(now + LOAD_ERROR_DISMISS + Duration::from_millis(1));
        assert!(app.status.current().is_none());
    }

    #[test]
    fn test_background_refresh_swaps_datasets() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::open(dir.path()).unwrap();
        let mut app = app();

        assert!(app.start_refresh(&cache, Arc::new(FakeSource::new())));
        assert!(!app.start_refresh(&cache, Arc::new(FakeSource::new())));

        let deadline = Instant::now() + Duration::from_secs(5);
        while app.is_refreshing() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
            app.poll_refresh(Instant::now());
        }

        assert!(!app.is_refreshing());
        assert_eq!(app.status.current().unwrap().text, "Data updated");
        assert_eq!(app.counts(DatasetKind::Lgv).1, 1);
        assert_eq!(app.counts(DatasetKind::Tunnels).1, 1);
    }

    #[test]
    fn test_failed_refresh_reports_and_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::open(dir.path()).unwrap();
        let mut app = app();
        app.set_dataset(DatasetKind::Lgv, dataset_for(DatasetKind::Lgv));

        let source = Arc::new(FakeSource::failing_on(DatasetKind::Lgv));
        app.start_refresh(&cache, source);
        let deadline = Instant::now() + Duration::from_secs(5);
        while app.is_refreshing() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
            app.poll_refresh(Instant::now());
        }

        let msg = app.status.current().unwrap();
        assert_eq!(msg.text, "Refresh failed");
        assert!(msg.detail.contains("HTTP 504"));
        assert_eq!(app.counts(DatasetKind::Lgv).1, 1);
    }

    #[test]
    fn test_click_selects_line_under_cursor() {
        let mut app = app();
        app.set_dataset(DatasetKind::Lgv, dataset_for(DatasetKind::Lgv));

        let node = &dataset_for(DatasetKind::Lgv).elements[0].geometry[0];
        let (px, py) = app.viewport.project(node.lon, node.lat);
        let col = (px / 2 + 1) as u16;
        let row = (py / 4 + 1) as u16;

        app.select_at(col, row);
        assert_eq!(app.selected_label(), Some("LGV Est"));

        app.begin_drag(1, 1);
        app.end_drag(1, 1);
        assert_eq!(app.selected_label(), None);

        app.begin_drag(col, row);
        app.end_drag(col, row);
        assert_eq!(app.selected_label(), Some("LGV Est"));
    }

    #[test]
    fn test_new_dataset_clears_selection() {
        let mut app = app();
        app.set_dataset(DatasetKind::Lgv, dataset_for(DatasetKind::Lgv));

        let node = &dataset_for(DatasetKind::Lgv).elements[0].geometry[0];
        let (px, py) = app.viewport.project(node.lon, node.lat);
        app.select_at((px / 2 + 1) as u16, (py / 4 + 1) as u16);
        assert_eq!(app.selected_label(), Some("LGV Est"));

        app.set_dataset(DatasetKind::Lgv, Dataset::default());
        assert_eq!(app.selected_label(), None);
        let layers = app.renderer.render(100, 50, &app.viewport, app.selected.as_ref());
        assert!(layers.highlight.is_blank());
    }

    #[test]
    fn test_unopenable_cache_reports_load_failed() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the cache directory should be
        let blocker = dir.path().join("lgv-map");
        std::fs::write(&blocker, b"").unwrap();

        let mut app = app();
        let now = Instant::now();
        assert!(app.open_cache(&blocker.join("cache"), now).is_none());

        let msg = app.status.current().unwrap();
        assert_eq!(msg.kind, StatusKind::Error);
        assert_eq!(msg.text, "Load failed");
        assert!(msg.detail.contains("cache I/O error"));

        app.tick(now + LOAD_ERROR_DISMISS + Duration::from_millis(1));
        assert!(app.status.current().is_none());
    }
}

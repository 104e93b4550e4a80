use crate::braille::BrailleCanvas;
use crate::data::DatasetKind;
use crate::features::{feature_label, feature_lines};
use crate::map::geometry::{draw_line, draw_thick_line, segment_distance_sq};
use crate::map::projection::Viewport;
use geojson::FeatureCollection;

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Zoom from which tunnels are drawn two pixels wide
const THICK_TUNNEL_ZOOM: f64 = 200.0;

/// A drawable feature: its lines and the label shown when selected
#[derive(Clone, Debug)]
pub struct RailLine {
    pub lines: Vec<LineString>,
    pub label: String,
}

/// Reference to one drawn feature
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureRef {
    pub kind: DatasetKind,
    pub index: usize,
}

/// Layer toggles
#[derive(Clone)]
pub struct DisplaySettings {
    pub show_outline: bool,
    pub show_lgv: bool,
    pub show_tunnels: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_outline: true,
            show_lgv: true,
            show_tunnels: true,
        }
    }
}

/// One canvas per color, composed back to front by the UI
pub struct MapLayers {
    pub outline: BrailleCanvas,
    pub lgv: BrailleCanvas,
    pub tunnels: BrailleCanvas,
    pub highlight: BrailleCanvas,
}

/// Draws the visible rail features over a coarse outline of France
pub struct RailRenderer {
    outline: Vec<LineString>,
    lgv: Vec<RailLine>,
    tunnels: Vec<RailLine>,
    pub settings: DisplaySettings,
}

impl RailRenderer {
    pub fn new() -> Self {
        Self {
            outline: france_outline(),
            lgv: Vec::new(),
            tunnels: Vec::new(),
            settings: DisplaySettings::default(),
        }
    }

    /// Replace a layer with the features of a freshly filtered collection
    pub fn set_layer(&mut self, kind: DatasetKind, collection: &FeatureCollection) {
        let lines = collection
            .features
            .iter()
            .map(|f| RailLine {
                lines: feature_lines(f),
                label: feature_label(f).unwrap_or(kind.default_name()).to_string(),
            })
            .collect();
        *self.layer_mut(kind) = lines;
    }

    pub fn layer(&self, kind: DatasetKind) -> &[RailLine] {
        match kind {
            DatasetKind::Lgv => &self.lgv,
            DatasetKind::Tunnels => &self.tunnels,
        }
    }

    fn layer_mut(&mut self, kind: DatasetKind) -> &mut Vec<RailLine> {
        match kind {
            DatasetKind::Lgv => &mut self.lgv,
            DatasetKind::Tunnels => &mut self.tunnels,
        }
    }

    fn is_shown(&self, kind: DatasetKind) -> bool {
        match kind {
            DatasetKind::Lgv => self.settings.show_lgv,
            DatasetKind::Tunnels => self.settings.show_tunnels,
        }
    }

    pub fn feature(&self, feature: FeatureRef) -> Option<&RailLine> {
        self.layer(feature.kind).get(feature.index)
    }

    /// Render every layer onto canvases of `width` x `height` characters
    pub fn render(
        &self,
        width: usize,
        height: usize,
        viewport: &Viewport,
        highlight: Option<&RailLine>,
    ) -> MapLayers {
        let mut layers = MapLayers {
            outline: BrailleCanvas::new(width, height),
            lgv: BrailleCanvas::new(width, height),
            tunnels: BrailleCanvas::new(width, height),
            highlight: BrailleCanvas::new(width, height),
        };

        if self.settings.show_outline {
            for line in &self.outline {
                draw_linestring(&mut layers.outline, line, viewport, false);
            }
        }

        if self.settings.show_lgv {
            for rail in &self.lgv {
                for line in &rail.lines {
                    draw_linestring(&mut layers.lgv, line, viewport, false);
                }
            }
        }

        if self.settings.show_tunnels {
            let thick = viewport.zoom >= THICK_TUNNEL_ZOOM;
            for rail in &self.tunnels {
                for line in &rail.lines {
                    draw_linestring(&mut layers.tunnels, line, viewport, thick);
                }
            }
        }

        if let Some(rail) = highlight {
            for line in &rail.lines {
                draw_linestring(&mut layers.highlight, line, viewport, true);
            }
        }

        layers
    }

    /// Nearest shown feature within `tolerance` pixels of (px, py).
    /// Tunnels are drawn on top, so they win ties.
    pub fn pick(
        &self,
        viewport: &Viewport,
        px: i32,
        py: i32,
        tolerance: i32,
    ) -> Option<FeatureRef> {
        let max_sq = (tolerance * tolerance) as f64;
        let mut best: Option<(f64, FeatureRef)> = None;

        for kind in [DatasetKind::Tunnels, DatasetKind::Lgv] {
            if !self.is_shown(kind) {
                continue;
            }
            for (index, rail) in self.layer(kind).iter().enumerate() {
                for line in &rail.lines {
                    let projected: Vec<(i32, i32)> =
                        line.iter().map(|&(lon, lat)| viewport.project(lon, lat)).collect();
                    let d = match projected.as_slice() {
                        [] => continue,
                        [only] => segment_distance_sq((px, py), *only, *only),
                        points => points
                            .windows(2)
                            .map(|w| segment_distance_sq((px, py), w[0], w[1]))
                            .fold(f64::INFINITY, f64::min),
                    };
                    if d <= max_sq && best.map_or(true, |(b, _)| d < b) {
                        best = Some((d, FeatureRef { kind, index }));
                    }
                }
            }
        }

        best.map(|(_, feature)| feature)
    }
}

impl Default for RailRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Draw a linestring, skipping segments that cannot touch the canvas
fn draw_linestring(
    canvas: &mut BrailleCanvas,
    line: &[(f64, f64)],
    viewport: &Viewport,
    thick: bool,
) {
    let mut prev: Option<(i32, i32)> = None;

    for &(lon, lat) in line {
        let p = viewport.project(lon, lat);
        if let Some(q) = prev {
            if viewport.line_might_be_visible(q, p) {
                if thick {
                    draw_thick_line(canvas, q.0, q.1, p.0, p.1);
                } else {
                    draw_line(canvas, q.0, q.1, p.0, p.1);
                }
            }
        }
        prev = Some(p);
    }
}

/// Coarse coastline and land border of metropolitan France and Corsica
#[rustfmt::skip]
fn france_outline() -> Vec<LineString> {
    vec![
        vec![
            (2.55, 51.09), (4.20, 49.95), (4.85, 50.15), (5.80, 49.55),
            (6.40, 49.47), (8.20, 48.97), (7.60, 47.58), (6.95, 47.45),
            (6.10, 46.45), (6.80, 46.10), (7.00, 45.30), (6.65, 44.90),
            (7.00, 44.20), (7.55, 43.78), (6.70, 43.20), (5.40, 43.20),
            (4.60, 43.40), (3.20, 43.05), (3.10, 42.45), (1.70, 42.50),
            (0.60, 42.70), (-0.70, 42.90), (-1.80, 43.38), (-1.45, 44.40),
            (-1.25, 45.60), (-2.15, 46.85), (-2.50, 47.30), (-4.40, 47.80),
            (-4.75, 48.35), (-3.50, 48.83), (-1.60, 48.65), (-1.94, 49.72),
            (-1.25, 49.65), (0.10, 49.45), (1.40, 50.10), (1.60, 50.90),
            (2.55, 51.09),
        ],
        vec![
            (9.45, 43.00), (9.55, 42.10), (9.20, 41.37), (8.60, 41.75),
            (8.55, 42.40), (9.30, 42.70), (9.45, 43.00),
        ],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Element, Node, Tags};
    use crate::features::to_feature_collection;

    fn paris_lyon() -> Element {
        Element {
            geometry: vec![Node { lat: 48.84, lon: 2.37 }, Node { lat: 45.76, lon: 4.86 }],
            tags: Tags {
                name: Some("LGV Sud-Est".into()),
                reference: None,
            },
        }
    }

    fn renderer_with_line() -> RailRenderer {
        let mut renderer = RailRenderer::new();
        let element = paris_lyon();
        renderer.set_layer(DatasetKind::Lgv, &to_feature_collection(DatasetKind::Lgv, &[&element]));
        renderer
    }

    #[test]
    fn test_render_draws_visible_line() {
        let renderer = renderer_with_line();
        let viewport = Viewport::france(200, 200);
        let layers = renderer.render(100, 50, &viewport, None);
        assert!(!layers.lgv.is_blank());
        assert!(!layers.outline.is_blank());
        assert!(layers.tunnels.is_blank());
        assert!(layers.highlight.is_blank());
    }

    #[test]
    fn test_hidden_layer_not_drawn() {
        let mut renderer = renderer_with_line();
        renderer.settings.show_lgv = false;
        let layers = renderer.render(100, 50, &Viewport::france(200, 200), None);
        assert!(layers.lgv.is_blank());
    }

    #[test]
    fn test_pick_nearest_feature() {
        let renderer = renderer_with_line();
        let viewport = Viewport::france(200, 200);
        let (px, py) = viewport.project(3.6, 47.3); // on the Paris - Lyon chord

        let picked = renderer.pick(&viewport, px, py, 3).unwrap();
        assert_eq!(picked, FeatureRef { kind: DatasetKind::Lgv, index: 0 });
        assert_eq!(renderer.feature(picked).unwrap().label, "LGV Sud-Est");

        let (fx, fy) = viewport.project(-1.5, 43.5); // Biarritz
        assert_eq!(renderer.pick(&viewport, fx, fy, 3), None);
    }

    #[test]
    fn test_selected_feature_highlighted() {
        let renderer = renderer_with_line();
        let selected = renderer.feature(FeatureRef { kind: DatasetKind::Lgv, index: 0 });
        let layers = renderer.render(100, 50, &Viewport::france(200, 200), selected);
        assert!(!layers.highlight.is_blank());
    }
}

mod geometry;
mod projection;
mod renderer;

pub use projection::{Viewport, MAX_ZOOM, MIN_ZOOM};
pub use renderer::{DisplaySettings, FeatureRef, LineString, MapLayers, RailLine, RailRenderer};

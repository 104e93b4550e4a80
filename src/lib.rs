//! Terminal map of French high-speed rail lines (LGV) and rail tunnels.
//!
//! Geometry is fetched from the Overpass API, cached on disk, filtered to the
//! visible viewport and drawn with Braille characters.

pub mod app;
pub mod braille;
pub mod cache;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod filter;
pub mod geo;
pub mod loader;
pub mod map;
pub mod status;
pub mod ui;

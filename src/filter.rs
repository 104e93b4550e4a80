//! Viewport filtering of dataset elements.

use crate::data::Element;
use rayon::prelude::*;

/// Below this many elements the parallel iterator costs more than it saves
const PARALLEL_THRESHOLD: usize = 4096;

/// Geographic rectangle in degrees, edges inclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Build from two corners in any order
    pub fn new(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Self {
        Self {
            south: lat1.min(lat2),
            west: lon1.min(lon2),
            north: lat1.max(lat2),
            east: lon1.max(lon2),
        }
    }

    #[inline(always)]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.south && lat <= self.north && lon >= self.west && lon <= self.east
    }
}

/// Elements with at least one geometry point inside `bounds`, in input order.
///
/// Lines crossing the edge are kept whole; nothing is clipped.
pub fn filter_visible<'a>(elements: &'a [Element], bounds: &Bounds) -> Vec<&'a Element> {
    let visible = |e: &&Element| e.geometry.iter().any(|n| bounds.contains(n.lat, n.lon));

    if elements.len() < PARALLEL_THRESHOLD {
        elements.iter().filter(visible).collect()
    } else {
        elements.par_iter().filter(visible).collect()
    }
}

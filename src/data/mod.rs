mod overpass;

pub use overpass::{DatasetSource, OfflineSource, OverpassClient};

use serde::{Deserialize, Serialize};

/// Overpass area id of metropolitan France (relation 2202162 + 3600000000)
pub const FRANCE_AREA_ID: u64 = 3_602_202_162;

/// The two datasets shown on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    Lgv,
    Tunnels,
}

impl DatasetKind {
    /// Both kinds in fetch order
    pub const ALL: [DatasetKind; 2] = [DatasetKind::Lgv, DatasetKind::Tunnels];

    /// Key used for the cache entry
    pub fn label(self) -> &'static str {
        match self {
            DatasetKind::Lgv => "lgv",
            DatasetKind::Tunnels => "tunnels",
        }
    }

    /// Name given to features without a `name` tag
    pub fn default_name(self) -> &'static str {
        match self {
            DatasetKind::Lgv => "Unnamed line",
            DatasetKind::Tunnels => "Unnamed tunnel",
        }
    }

    /// Overpass QL query selecting main-line rail ways inside `area_id`.
    ///
    /// Yards, sidings and crossovers are excluded. LGV ways exclude tunnels,
    /// tunnel ways are exactly the tunnels.
    pub fn query(self, area_id: u64) -> String {
        let tunnel = match self {
            DatasetKind::Lgv => r#"["tunnel"!="yes"]"#,
            DatasetKind::Tunnels => r#"["tunnel"="yes"]"#,
        };
        format!(
            r#"[out:json];way["railway"="rail"]["usage"="main"]["service"!="yard"]["service"!="siding"]["service"!="crossover"]{tunnel}(area:{area_id});out geom;"#
        )
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A geometry node as returned by `out geom`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub lat: f64,
    pub lon: f64,
}

/// OSM tags the map cares about; everything else is dropped on decode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// One rail way: an ordered polyline plus its tags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(default)]
    pub geometry: Vec<Node>,
    #[serde(default)]
    pub tags: Tags,
}

impl Element {
    /// Geometry as (lon, lat) pairs, the order GeoJSON and the renderer use
    pub fn lon_lat(&self) -> Vec<(f64, f64)> {
        self.geometry.iter().map(|n| (n.lon, n.lat)).collect()
    }
}

/// A whole Overpass response. Replaced wholesale, never patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Decode an Overpass JSON body. The buffer is used as scratch space by simd-json.
pub fn parse_dataset(bytes: &mut [u8]) -> Result<Dataset, simd_json::Error> {
    simd_json::serde::from_slice(bytes)
}

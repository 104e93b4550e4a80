use crate::data::FRANCE_AREA_ID;
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

#[derive(Parser, Debug)]
#[command(name = "lgv-map")]
#[command(about = "Terminal map of French high-speed rail lines and tunnels")]
pub struct Args {
    /// Directory holding cached datasets and the log file
    #[arg(long, env = "LGV_MAP_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Overpass interpreter URL
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Overpass area id to query (default: metropolitan France)
    #[arg(long, default_value_t = FRANCE_AREA_ID)]
    pub area: u64,

    /// Never touch the network; show cached data only
    #[arg(long)]
    pub offline: bool,

    /// Skip the background refresh after a cache hit
    #[arg(long)]
    pub no_refresh: bool,

    /// Log level (RUST_LOG overrides)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Resolved runtime settings
#[derive(Debug, Clone)]
pub struct Config {
    pub cache_dir: PathBuf,
    pub endpoint: String,
    pub area_id: u64,
    pub offline: bool,
    pub refresh_on_start: bool,
    pub log_level: String,
}

impl Config {
    pub fn from_args(args: Args) -> Self {
        let cache_dir = args.cache_dir.unwrap_or_else(default_cache_dir);
        Self {
            cache_dir,
            endpoint: args.endpoint,
            area_id: args.area,
            offline: args.offline,
            refresh_on_start: !args.offline && !args.no_refresh,
            log_level: args.log_level,
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.cache_dir.join("lgv-map.log")
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("lgv-map")
}

//! Initial load and refresh of the two datasets.
//!
//! Fetches run one after another (LGV, then tunnels). Each dataset is stored
//! in the cache before it is handed to the caller, so the cache is never
//! older than what is on screen.

use crate::cache::LocalCache;
use crate::data::{Dataset, DatasetKind, DatasetSource};
use crate::error::LoadError;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

/// Where the datasets of a successful load came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Remote,
}

/// Progress of a background refresh
#[derive(Debug)]
pub enum RefreshEvent {
    Dataset(DatasetKind, Dataset),
    Finished,
    Failed(String),
}

/// Startup load.
///
/// Cached datasets are delivered first. If both are cached nothing is fetched;
/// otherwise both are fetched, stored and delivered. On error, datasets already
/// delivered stay delivered and the rest are left untouched.
pub fn load<S, F>(cache: &LocalCache, source: &S, mut on_dataset: F) -> Result<Origin, LoadError>
where
    S: DatasetSource + ?Sized,
    F: FnMut(DatasetKind, Dataset),
{
    let mut cached = 0;
    for kind in DatasetKind::ALL {
        if let Some(entry) = cache.get(kind)? {
            info!(
                %kind,
                elements = entry.payload.len(),
                timestamp = entry.timestamp,
                "loaded from cache"
            );
            on_dataset(kind, entry.payload);
            cached += 1;
        }
    }

    if cached == DatasetKind::ALL.len() {
        return Ok(Origin::Cache);
    }

    info!("cache incomplete, fetching from remote");
    refresh(cache, source, on_dataset)?;
    Ok(Origin::Remote)
}

/// Fetch, store and deliver every dataset in order. Stops at the first error.
pub fn refresh<S, F>(cache: &LocalCache, source: &S, mut on_dataset: F) -> Result<(), LoadError>
where
    S: DatasetSource + ?Sized,
    F: FnMut(DatasetKind, Dataset),
{
    for kind in DatasetKind::ALL {
        let dataset = source.fetch(kind)?;
        cache.put(kind, &dataset)?;
        on_dataset(kind, dataset);
    }
    Ok(())
}

/// Run [`refresh`] on a worker thread, reporting over a channel.
///
/// The receiver yields zero or more `Dataset` events followed by exactly one
/// `Finished` or `Failed`.
pub fn spawn_refresh(
    cache: LocalCache,
    source: Arc<dyn DatasetSource + Send + Sync>,
) -> Receiver<RefreshEvent> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let result = refresh(&cache, source.as_ref(), |kind, dataset| {
            // Receiver gone means the app quit; nothing left to do
            let _ = tx.send(RefreshEvent::Dataset(kind, dataset));
        });
        let last = match result {
            Ok(()) => {
                info!("background refresh finished");
                RefreshEvent::Finished
            }
            Err(e) => {
                warn!(error = %e, "background refresh failed");
                RefreshEvent::Failed(e.to_string())
            }
        };
        let _ = tx.send(last);
    });

    rx
}

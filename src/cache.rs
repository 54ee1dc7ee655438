//! Process-lifetime memoization of the prepared table.
//!
//! The first caller runs the loader; callers arriving while it runs block on
//! the same initialization and reuse its result. A failed load leaves the
//! cache empty so no partial table is ever exposed.

use crate::error::Result;
use crate::loader::{self, PreparedTable};
use log::debug;
use once_cell::sync::OnceCell;
use std::fmt;
use std::path::PathBuf;

type Loader = Box<dyn Fn() -> Result<PreparedTable> + Send + Sync>;

pub struct PreparedCache {
    key: String,
    loader: Loader,
    cell: OnceCell<PreparedTable>,
}

impl PreparedCache {
    /// Cache backed by [`loader::load_prepared`] on `path`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let key = path.display().to_string();
        Self::with_loader(key, move || loader::load_prepared(&path))
    }

    /// Cache backed by an arbitrary loader; `key` names the loader in logs.
    pub fn with_loader<F>(key: impl Into<String>, load: F) -> Self
    where
        F: Fn() -> Result<PreparedTable> + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            loader: Box::new(load),
            cell: OnceCell::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Return the prepared table, loading it on first use.
    pub fn get(&self) -> Result<&PreparedTable> {
        self.cell.get_or_try_init(|| {
            debug!("Preparing table for '{}'", self.key);
            (self.loader)()
        })
    }

    /// The table if a load has already completed.
    pub fn loaded(&self) -> Option<&PreparedTable> {
        self.cell.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl fmt::Debug for PreparedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedCache")
            .field("key", &self.key)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HotelError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn failed_load_leaves_cache_empty() {
        let cache = PreparedCache::with_loader("broken", || {
            Err(HotelError::MissingColumns(vec!["adr".into()]))
        });
        assert!(cache.get().is_err());
        assert!(!cache.is_loaded());
        assert!(cache.loaded().is_none());
    }

    #[test]
    fn second_get_reuses_first_result() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache = PreparedCache::with_loader("empty", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(PreparedTable::from_bookings(Vec::new()))
        });
        let first = cache.get().unwrap() as *const PreparedTable;
        let second = cache.get().unwrap() as *const PreparedTable;
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

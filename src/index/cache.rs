//! Reader-scoped caches.
//!
//! Bit vectors computed by filters and field indexes built for sorting are
//! expensive to produce but immutable for a given reader snapshot, so each
//! reader owns a [`ReaderCache`]. Entries are keyed by structural identity and
//! dropped when the reader is closed.

use std::sync::Arc;

use ahash::AHashMap;
use log::debug;
use parking_lot::Mutex;

use crate::error::Result;
use crate::search::filter::Filter;
use crate::search::sort::{FieldIndex, SortType};
use crate::util::bit_vector::BitVector;

/// Key of a cached field index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldIndexKey {
    /// Field the index was built from.
    pub field: String,
    /// Type the term values were parsed as.
    pub sort_type: SortType,
}

/// Cache owned by one reader.
///
/// Lookups and inserts are serialized by a mutex, but the mutex is not held
/// while a value is computed: computing a filter may itself consult the cache
/// (a query filter over a filtered query, for example). When two searches miss
/// on the same key concurrently both compute, and the first insert wins.
#[derive(Debug, Default)]
pub struct ReaderCache {
    filters: Mutex<AHashMap<Arc<dyn Filter>, Arc<BitVector>>>,
    field_indexes: Mutex<AHashMap<FieldIndexKey, Arc<FieldIndex>>>,
}

impl ReaderCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached bit vector for `filter`, computing it with `compute` on a miss.
    pub fn filter_bitvector<F>(&self, filter: &Arc<dyn Filter>, compute: F) -> Result<Arc<BitVector>>
    where
        F: FnOnce() -> Result<BitVector>,
    {
        if let Some(bits) = self.filters.lock().get(filter) {
            return Ok(Arc::clone(bits));
        }
        debug!("filter cache miss for {}", filter.to_s());
        let bits = Arc::new(compute()?);
        let mut filters = self.filters.lock();
        let entry = filters.entry(Arc::clone(filter)).or_insert(bits);
        Ok(Arc::clone(entry))
    }

    /// Cached field index for `key`, building it with `build` on a miss.
    pub fn field_index<F>(&self, key: FieldIndexKey, build: F) -> Result<Arc<FieldIndex>>
    where
        F: FnOnce() -> Result<FieldIndex>,
    {
        if let Some(index) = self.field_indexes.lock().get(&key) {
            return Ok(Arc::clone(index));
        }
        debug!("building field index for {}", key.field);
        let index = Arc::new(build()?);
        let mut field_indexes = self.field_indexes.lock();
        let entry = field_indexes.entry(key).or_insert(index);
        Ok(Arc::clone(entry))
    }

    /// Number of cached filter bit vectors.
    pub fn filter_count(&self) -> usize {
        self.filters.lock().len()
    }

    /// Number of cached field indexes.
    pub fn field_index_count(&self) -> usize {
        self.field_indexes.lock().len()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.filters.lock().clear();
        self.field_indexes.lock().clear();
    }
}

//! Code cache for JIT-compiled functions
//!
//! Owns the `NativeExecutable` for each compiled function, indexed by
//! function id, with support for invalidation (when a function is
//! recompiled or deoptimized) and a total code size budget. Dropping the
//! last reference to an evicted executable is what releases its code
//! memory.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::executable::NativeExecutable;

struct CacheEntry {
    executable: Arc<NativeExecutable>,
    /// Whether this entry has been invalidated (e.g., function recompiled)
    invalidated: AtomicBool,
}

/// Thread-safe cache of compiled functions
pub struct CodeCache {
    /// Function index → compiled function
    entries: RwLock<FxHashMap<u32, CacheEntry>>,
    /// Total size of all cached code
    total_code_size: AtomicUsize,
    /// Maximum allowed total code size
    max_size: usize,
}

impl CodeCache {
    /// Create a new code cache with a maximum size limit (in bytes)
    pub fn new(max_size: usize) -> Self {
        CodeCache {
            entries: RwLock::new(FxHashMap::default()),
            total_code_size: AtomicUsize::new(0),
            max_size,
        }
    }

    /// Insert a compiled function.
    ///
    /// Returns false if the cache is full and the entry was not inserted.
    pub fn insert(&self, func_index: u32, executable: NativeExecutable) -> bool {
        let code_size = executable.code().len();
        let current = self.total_code_size.load(Ordering::Relaxed);
        if current + code_size > self.max_size {
            return false;
        }

        let mut entries = self.entries.write();
        // Remove old entry size if replacing
        if let Some(old) = entries.remove(&func_index) {
            self.total_code_size
                .fetch_sub(old.executable.code().len(), Ordering::Relaxed);
        }

        self.total_code_size.fetch_add(code_size, Ordering::Relaxed);
        entries.insert(
            func_index,
            CacheEntry {
                executable: Arc::new(executable),
                invalidated: AtomicBool::new(false),
            },
        );
        true
    }

    /// Look up the compiled function for a function index.
    ///
    /// Returns None if the function isn't compiled or has been invalidated.
    pub fn get(&self, func_index: u32) -> Option<Arc<NativeExecutable>> {
        let entries = self.entries.read();
        let entry = entries.get(&func_index)?;
        if entry.invalidated.load(Ordering::Acquire) {
            return None;
        }
        Some(Arc::clone(&entry.executable))
    }

    /// Invalidate a cached function (e.g., when deoptimizing)
    pub fn invalidate(&self, func_index: u32) {
        let entries = self.entries.read();
        if let Some(entry) = entries.get(&func_index) {
            entry.invalidated.store(true, Ordering::Release);
        }
    }

    /// Check if a function has been compiled and is valid
    pub fn contains(&self, func_index: u32) -> bool {
        let entries = self.entries.read();
        entries
            .get(&func_index)
            .map(|e| !e.invalidated.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    /// Total size of cached code
    pub fn total_size(&self) -> usize {
        self.total_code_size.load(Ordering::Relaxed)
    }

    /// Number of cached functions (including invalidated)
    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::CodeBuffer;
    use crate::mapping::MappingTable;

    fn make_dummy_executable(size: usize) -> NativeExecutable {
        // Safety: this is test code — we never execute these pointers,
        // and a null base skips the unmap at drop.
        let code = unsafe { CodeBuffer::from_raw_parts(std::ptr::null(), size) };
        NativeExecutable::new(code, MappingTable::new(vec![]))
    }

    #[test]
    fn test_insert_and_contains() {
        let cache = CodeCache::new(1024);
        assert!(!cache.contains(0));

        let inserted = cache.insert(0, make_dummy_executable(100));
        assert!(inserted);
        assert!(cache.contains(0));
        assert_eq!(cache.total_size(), 100);
        assert_eq!(cache.entry_count(), 1);
    }

    #[test]
    fn test_get_returns_shared_handle() {
        let cache = CodeCache::new(1024);
        cache.insert(7, make_dummy_executable(64));

        let executable = cache.get(7).unwrap();
        assert_eq!(executable.code().len(), 64);
        assert!(cache.get(8).is_none());
    }

    #[test]
    fn test_invalidate() {
        let cache = CodeCache::new(1024);
        cache.insert(0, make_dummy_executable(100));
        assert!(cache.contains(0));

        cache.invalidate(0);
        assert!(!cache.contains(0));
        assert!(cache.get(0).is_none());
        // Entry still exists (just invalidated)
        assert_eq!(cache.entry_count(), 1);
    }

    #[test]
    fn test_cache_full() {
        let cache = CodeCache::new(200);
        assert!(cache.insert(0, make_dummy_executable(100)));
        assert!(cache.insert(1, make_dummy_executable(100)));
        // Cache is now full (200/200)
        assert!(!cache.insert(2, make_dummy_executable(100)));
        assert_eq!(cache.entry_count(), 2);
    }

    #[test]
    fn test_replace_entry() {
        let cache = CodeCache::new(1024);
        cache.insert(0, make_dummy_executable(100));
        assert_eq!(cache.total_size(), 100);

        // Replace with larger code
        cache.insert(0, make_dummy_executable(200));
        assert_eq!(cache.total_size(), 200);
        assert_eq!(cache.entry_count(), 1);
    }
}

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use crate::render::OutputFormat;

/// Thread-safe LRU cache for rendered diagrams
///
/// Keyed by output format and the exact Mermaid source, so a regenerated but
/// byte-identical diagram is not sent to the renderer twice.
pub struct RenderCache {
    cache: Mutex<LruCache<(OutputFormat, String), Vec<u8>>>,
}

impl RenderCache {
    /// Create a new render cache; a capacity of 0 is raised to 1
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);

        Self {
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Get cached image bytes for a diagram source
    pub fn get(&self, format: OutputFormat, source: &str) -> Option<Vec<u8>> {
        self.lock().get(&(format, source.to_string())).cloned()
    }

    /// Store rendered image bytes
    pub fn put(&self, format: OutputFormat, source: String, bytes: Vec<u8>) {
        self.lock().put((format, source), bytes);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // Poisoning is ignored: entries are plain bytes.
    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<(OutputFormat, String), Vec<u8>>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

//! Per-surface page cache for rendered bitmaps

use std::collections::HashMap;
use std::sync::Arc;

use super::types::{Bitmap, SurfaceId, SurfaceState, Variant};
use super::variant::VariantResolver;

/// Cache key for rendered pages.
///
/// Carries the full render configuration so an entry rendered for an old
/// size or variant can never be addressed with the surface's current key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Surface the bitmap was rendered for
    pub surface: SurfaceId,
    /// Page number (0-indexed)
    pub page: usize,
    /// Surface width in pixels
    pub width: u32,
    /// Surface height in pixels
    pub height: u32,
    /// Resolved variant
    pub variant: Variant,
}

impl CacheKey {
    /// Create a cache key from a surface's current state
    #[must_use]
    pub fn for_surface(
        surface: SurfaceId,
        page: usize,
        state: &SurfaceState,
        resolver: &VariantResolver,
    ) -> Self {
        Self {
            surface,
            page,
            width: state.width,
            height: state.height,
            variant: resolver.variant_for(state),
        }
    }

    /// Same configuration, different page
    #[must_use]
    pub fn with_page(self, page: usize) -> Self {
        Self { page, ..self }
    }
}

/// An immutable rendered page
#[derive(Debug)]
pub struct CacheEntry {
    key: CacheKey,
    bitmap: Bitmap,
}

impl CacheEntry {
    #[must_use]
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    #[must_use]
    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }
}

/// Rendered page store, grouped by surface.
///
/// Entries are never patched in place: a put replaces the whole entry.
#[derive(Debug, Default)]
pub struct PageCache {
    surfaces: HashMap<SurfaceId, HashMap<CacheKey, Arc<CacheEntry>>>,
}

impl PageCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached page
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.surfaces.get(&key.surface)?.get(key).cloned()
    }

    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.surfaces
            .get(&key.surface)
            .is_some_and(|entries| entries.contains_key(key))
    }

    /// Insert a page into the cache, returning an Arc to the entry
    pub fn insert(&mut self, key: CacheKey, bitmap: Bitmap) -> Arc<CacheEntry> {
        let entry = Arc::new(CacheEntry { key, bitmap });
        self.surfaces
            .entry(key.surface)
            .or_default()
            .insert(key, entry.clone());
        entry
    }

    /// Drop every entry of a surface, returning how many were removed
    pub fn invalidate_surface(&mut self, surface: SurfaceId) -> usize {
        self.surfaces
            .remove(&surface)
            .map_or(0, |entries| entries.len())
    }

    /// Keep only the entries `keep` accepts, returning how many were dropped
    pub fn retain(&mut self, mut keep: impl FnMut(&CacheKey) -> bool) -> usize {
        let mut dropped = 0;
        for entries in self.surfaces.values_mut() {
            let before = entries.len();
            entries.retain(|key, _| keep(key));
            dropped += before - entries.len();
        }
        self.surfaces.retain(|_, entries| !entries.is_empty());
        dropped
    }

    /// Clear all cached pages
    pub fn invalidate_all(&mut self) {
        self.surfaces.clear();
    }

    /// Number of cached pages
    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.values().all(HashMap::is_empty)
    }

    /// Number of cached pages for one surface
    #[must_use]
    pub fn surface_len(&self, surface: SurfaceId) -> usize {
        self.surfaces.get(&surface).map_or(0, HashMap::len)
    }

    /// All keys currently stored
    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> + '_ {
        self.surfaces.values().flat_map(HashMap::keys)
    }

    /// Approximate pixel memory held by the cache
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.surfaces
            .values()
            .flat_map(HashMap::values)
            .map(|entry| entry.bitmap.byte_len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key(surface: usize, page: usize) -> CacheKey {
        CacheKey {
            surface: SurfaceId(surface),
            page,
            width: 100,
            height: 50,
            variant: Variant::Plain,
        }
    }

    fn test_bitmap(shade: u8) -> Bitmap {
        Bitmap::filled(10, 10, [shade, shade, shade])
    }

    #[test]
    fn cache_insert_and_get() {
        let mut cache = PageCache::new();
        let key = test_key(0, 0);

        cache.insert(key, test_bitmap(1));

        assert!(cache.contains(&key));
        let entry = cache.get(&key).unwrap();
        assert_eq!(entry.bitmap(), &test_bitmap(1));
        assert_eq!(entry.key(), &key);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn insert_replaces_same_key() {
        let mut cache = PageCache::new();
        let key = test_key(0, 3);

        let first = cache.insert(key, test_bitmap(1));
        cache.insert(key, test_bitmap(2));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key).unwrap().bitmap(), &test_bitmap(2));
        // Handed-out entries are never mutated
        assert_eq!(first.bitmap(), &test_bitmap(1));
    }

    #[test]
    fn different_size_is_a_different_key() {
        let mut cache = PageCache::new();
        let key = test_key(0, 0);
        cache.insert(key, test_bitmap(1));

        let resized = CacheKey { width: 200, ..key };
        assert!(!cache.contains(&resized));
        let other_variant = CacheKey {
            variant: Variant::NotesHalf,
            ..key
        };
        assert!(cache.get(&other_variant).is_none());
    }

    #[test]
    fn cache_invalidate_surface() {
        let mut cache = PageCache::new();
        for page in 0..3 {
            cache.insert(test_key(0, page), test_bitmap(0));
            cache.insert(test_key(1, page), test_bitmap(1));
        }

        assert_eq!(cache.invalidate_surface(SurfaceId(0)), 3);

        assert_eq!(cache.surface_len(SurfaceId(0)), 0);
        assert_eq!(cache.surface_len(SurfaceId(1)), 3);
        assert!(cache.contains(&test_key(1, 2)));
        assert_eq!(cache.invalidate_surface(SurfaceId(0)), 0);
    }

    #[test]
    fn cache_retain_drops_rejected_pages() {
        let mut cache = PageCache::new();
        for page in 0..6 {
            cache.insert(test_key(0, page), test_bitmap(0));
        }
        cache.insert(test_key(1, 5), test_bitmap(1));

        assert_eq!(cache.retain(|key| key.page >= 4), 4);

        assert_eq!(cache.len(), 3);
        assert!(cache.contains(&test_key(0, 4)));
        assert!(!cache.contains(&test_key(0, 0)));
        assert_eq!(cache.surface_len(SurfaceId(1)), 1);
        assert_eq!(cache.retain(|_| false), 3);
        assert!(cache.is_empty());
    }

    #[test]
    fn cache_invalidate_all() {
        let mut cache = PageCache::new();
        for page in 0..5 {
            cache.insert(test_key(page % 2, page), test_bitmap(0));
        }

        assert_eq!(cache.len(), 5);
        assert_eq!(cache.byte_len(), 5 * 10 * 10 * 3);
        cache.invalidate_all();
        assert!(cache.is_empty());
        assert_eq!(cache.keys().count(), 0);
    }

    #[test]
    fn key_from_surface_state_uses_resolved_variant() {
        let state = SurfaceState {
            variant: Variant::NotesHalf,
            width: 640,
            height: 480,
        };
        let without_notes = CacheKey::for_surface(SurfaceId(2), 4, &state, &VariantResolver::new(false));
        assert_eq!(without_notes.variant, Variant::Plain);
        assert_eq!((without_notes.width, without_notes.height), (640, 480));

        let with_notes = CacheKey::for_surface(SurfaceId(2), 4, &state, &VariantResolver::new(true));
        assert_eq!(with_notes.variant, Variant::NotesHalf);
        assert_eq!(with_notes.with_page(5).page, 5);
    }
}

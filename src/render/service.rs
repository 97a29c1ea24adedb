//! Render service - owns the document, surfaces, cache and prerender sweep
//!
//! Everything runs on the caller's thread. Interactive fetches render
//! synchronously on a miss; prerendering is split into page-sized units the
//! host runs from idle callbacks via [`RenderService::run_idle`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use super::cache::{CacheEntry, CacheKey, PageCache};
use super::document::PageSource;
use super::error::{CacheError, RenderFailure};
use super::registry::{Command, Effect, SurfaceRegistry};
use super::scheduler::{PrerenderScheduler, PrerenderWindow};
use super::types::{Bitmap, SurfaceId, SurfaceRole, SurfaceState, Variant};
use super::variant::VariantResolver;
use super::{DEFAULT_RENDER_RETRIES, MAX_RENDER_RETRIES};

/// Counters for cache behaviour
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Interactive fetches served from the cache
    pub hits: u64,
    /// Interactive fetches that had to render
    pub misses: u64,
    /// Successful rasterizations, interactive and prerender
    pub renders: u64,
    /// Rasterizations that failed after retrying
    pub render_failures: u64,
    /// Entries stored by prerender sweeps
    pub prerendered: u64,
    /// Surface or document invalidations that dropped entries
    pub invalidations: u64,
    /// Entries dropped because their page left the prerender window
    pub released: u64,
}

impl CacheStats {
    /// Fraction of interactive fetches served from the cache
    #[must_use]
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Page rendering with a per-surface cache
pub struct RenderService<D: PageSource> {
    document: D,
    resolver: VariantResolver,
    registry: SurfaceRegistry,
    cache: PageCache,
    scheduler: PrerenderScheduler,
    /// Last page each surface fetched for display
    displayed: HashMap<SurfaceId, usize>,
    render_retries: u32,
    notes_mode: bool,
    stats: CacheStats,
}

impl<D: PageSource> RenderService<D> {
    /// Create a render service with default configuration.
    ///
    /// Notes mode starts on when the document has notes.
    #[must_use]
    pub fn new(document: D) -> Self {
        let notes_mode = document.has_secondary_content();
        Self::with_config(
            document,
            PrerenderWindow::default(),
            DEFAULT_RENDER_RETRIES,
            notes_mode,
        )
    }

    /// Create a render service with custom configuration
    #[must_use]
    pub fn with_config(
        document: D,
        window: PrerenderWindow,
        render_retries: u32,
        notes_mode: bool,
    ) -> Self {
        if window.forward < window.backward {
            warn!(
                "Prerender window looks backwards: {} forward, {} backward",
                window.forward, window.backward
            );
        }

        let resolver = VariantResolver::new(document.has_secondary_content());
        info!(
            "Render service for {} ({} pages, notes: {})",
            document.title().unwrap_or_else(|| "untitled document".to_string()),
            document.page_count(),
            resolver.has_secondary_content()
        );

        Self {
            document,
            resolver,
            registry: SurfaceRegistry::new(),
            cache: PageCache::new(),
            scheduler: PrerenderScheduler::new(window),
            displayed: HashMap::new(),
            render_retries: render_retries.min(MAX_RENDER_RETRIES),
            notes_mode,
            stats: CacheStats::default(),
        }
    }

    #[must_use]
    pub fn document(&self) -> &D {
        &self.document
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.document.page_count()
    }

    #[must_use]
    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    #[must_use]
    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    #[must_use]
    pub fn scheduler(&self) -> &PrerenderScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    #[must_use]
    pub fn notes_mode(&self) -> bool {
        self.notes_mode
    }

    /// Register a named surface
    pub fn register_surface(
        &mut self,
        name: impl Into<String>,
        initial_variant: Variant,
    ) -> Result<SurfaceId, CacheError> {
        self.registry.register(name, initial_variant)
    }

    /// Register the canonical surface for a presentation role
    pub fn register_role(&mut self, role: SurfaceRole) -> Result<SurfaceId, CacheError> {
        self.registry.register_role(role, self.notes_mode)
    }

    /// Look up a surface by name
    pub fn surface_id(&self, name: &str) -> Result<SurfaceId, CacheError> {
        self.registry.id_of(name)
    }

    /// Current requested variant and size of a surface
    pub fn current(&self, surface: SurfaceId) -> Result<SurfaceState, CacheError> {
        self.registry.current(surface)
    }

    /// Variant the surface actually renders with
    pub fn variant_for(&self, surface: SurfaceId) -> Result<Variant, CacheError> {
        self.registry
            .current(surface)
            .map(|state| self.resolver.variant_for(&state))
    }

    /// Apply a surface command and execute its effects
    pub fn apply_command(&mut self, cmd: Command) -> Result<(), CacheError> {
        let effects = self.registry.apply(cmd)?;
        self.execute_effects(effects);
        Ok(())
    }

    fn execute_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::InvalidateSurface(surface) => {
                    let dropped = self.cache.invalidate_surface(surface);
                    if dropped > 0 {
                        debug!("Dropped {dropped} cached pages of surface {surface}");
                        self.stats.invalidations += 1;
                    }
                }
            }
        }
    }

    /// The window layer changed a surface's size.
    ///
    /// Returns whether the size actually changed; unchanged sizes keep the
    /// cache intact.
    pub fn on_surface_resized(
        &mut self,
        surface: SurfaceId,
        width: u32,
        height: u32,
    ) -> Result<bool, CacheError> {
        let effects = self.registry.apply(Command::Resize {
            surface,
            width,
            height,
        })?;
        let changed = !effects.is_empty();
        self.execute_effects(effects);
        Ok(changed)
    }

    /// Assign a variant to a surface. Always drops that surface's entries.
    pub fn set_variant(&mut self, surface: SurfaceId, variant: Variant) -> Result<(), CacheError> {
        self.apply_command(Command::SetVariant { surface, variant })
    }

    /// Notes mode toggled: remap every role surface
    pub fn on_variant_mode_changed(&mut self, notes_mode: bool) -> Result<(), CacheError> {
        info!("Notes mode {}", if notes_mode { "on" } else { "off" });
        self.notes_mode = notes_mode;
        self.apply_command(Command::SetNotesMode(notes_mode))
    }

    /// Key a surface would use for `page` right now
    pub fn current_key(&self, surface: SurfaceId, page: usize) -> Result<CacheKey, CacheError> {
        self.check_page(page)?;
        let state = self.registry.current(surface)?;
        Ok(CacheKey::for_surface(surface, page, &state, &self.resolver))
    }

    /// Cached page for a surface at its current size and variant
    pub fn get(
        &self,
        surface: SurfaceId,
        page: usize,
    ) -> Result<Option<Arc<CacheEntry>>, CacheError> {
        let key = self.current_key(surface, page)?;
        Ok(self.cache.get(&key))
    }

    /// Store a bitmap under the surface's current key
    pub fn put(
        &mut self,
        surface: SurfaceId,
        page: usize,
        bitmap: Bitmap,
    ) -> Result<Arc<CacheEntry>, CacheError> {
        let key = self.current_key(surface, page)?;
        if bitmap.width != key.width || bitmap.height != key.height {
            return Err(CacheError::SizeMismatch {
                surface: self.registry.name(surface)?.to_string(),
                width: key.width,
                height: key.height,
                actual_width: bitmap.width,
                actual_height: bitmap.height,
            });
        }
        Ok(self.cache.insert(key, bitmap))
    }

    /// Drop every cached page of a surface
    pub fn invalidate_surface(&mut self, surface: SurfaceId) -> Result<usize, CacheError> {
        self.registry.current(surface)?;
        let dropped = self.cache.invalidate_surface(surface);
        if dropped > 0 {
            self.stats.invalidations += 1;
        }
        Ok(dropped)
    }

    /// Drop everything; the document changed
    pub fn invalidate_document(&mut self) {
        if !self.cache.is_empty() {
            self.stats.invalidations += 1;
        }
        self.cache.invalidate_all();
    }

    /// Swap in a new document and start over
    pub fn replace_document(&mut self, document: D) {
        info!(
            "Replacing document with {} ({} pages)",
            document.title().unwrap_or_else(|| "untitled document".to_string()),
            document.page_count()
        );
        self.scheduler.cancel();
        self.displayed.clear();
        self.document = document;
        self.resolver = VariantResolver::new(self.document.has_secondary_content());
        self.invalidate_document();
    }

    /// Get-or-render a page for display.
    ///
    /// A miss renders synchronously, retrying once, and stores the result.
    pub fn fetch_for_display(
        &mut self,
        surface: SurfaceId,
        page: usize,
    ) -> Result<Arc<CacheEntry>, CacheError> {
        let key = self.current_key(surface, page)?;
        if key.width == 0 || key.height == 0 {
            return Err(CacheError::ZeroSizedSurface(
                self.registry.name(surface)?.to_string(),
            ));
        }
        self.displayed.insert(surface, page);

        if let Some(entry) = self.cache.get(&key) {
            self.stats.hits += 1;
            return Ok(entry);
        }
        self.stats.misses += 1;

        match self.render_with_retry(&key) {
            Ok(bitmap) => Ok(self.cache.insert(key, bitmap)),
            Err(e) => {
                error!(
                    "Failed to render page {page} for {:?}: {e}",
                    self.registry.name(surface)?
                );
                Err(CacheError::Render { page, source: e })
            }
        }
    }

    /// Navigation happened: prerender around `page`
    pub fn on_navigate(&mut self, page: usize) {
        self.schedule(page);
    }

    /// Replace the running sweep with one centred on `page`.
    ///
    /// Entries outside the new window are released, except the page each
    /// surface last displayed.
    pub fn schedule(&mut self, page: usize) {
        let page_count = self.document.page_count();
        if self.scheduler.schedule(page, page_count) {
            debug!("Navigation to page {page} superseded the previous sweep");
        }
        self.release_outside_window(page, page_count);
    }

    fn release_outside_window(&mut self, center: usize, page_count: usize) {
        let window: HashSet<usize> = self
            .scheduler
            .window()
            .pages(center, page_count)
            .into_iter()
            .collect();
        let displayed = &self.displayed;
        let released = self.cache.retain(|key| {
            window.contains(&key.page) || displayed.get(&key.surface) == Some(&key.page)
        });
        if released > 0 {
            debug!("Released {released} cached pages outside the window around {center}");
            self.stats.released += released as u64;
        }
    }

    /// Whether prerender work is waiting
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        !self.scheduler.is_idle()
    }

    /// Run up to `max_units` prerender units, returning how many ran
    pub fn run_idle(&mut self, max_units: usize) -> usize {
        let mut units = 0;
        while units < max_units && self.run_unit() {
            units += 1;
        }
        units
    }

    /// Run prerender units until `budget` is spent or the sweep is done.
    ///
    /// The budget is checked between units; one slow page can overrun it.
    pub fn run_idle_for(&mut self, budget: Duration) -> usize {
        let start = Instant::now();
        let mut units = 0;
        while start.elapsed() < budget && self.run_unit() {
            units += 1;
        }
        units
    }

    /// Finish the running sweep
    pub fn run_until_idle(&mut self) -> usize {
        let mut units = 0;
        while self.run_unit() {
            units += 1;
        }
        units
    }

    fn run_unit(&mut self) -> bool {
        let Some(page) = self.scheduler.next_page() else {
            return false;
        };
        self.prerender_page(page);
        true
    }

    fn prerender_page(&mut self, page: usize) {
        if page >= self.document.page_count() {
            return;
        }

        let surfaces: Vec<SurfaceId> = self.registry.ids().collect();
        for surface in surfaces {
            let Ok(state) = self.registry.current(surface) else {
                continue;
            };
            if state.is_zero_sized() {
                continue;
            }

            let key = CacheKey::for_surface(surface, page, &state, &self.resolver);
            if self.cache.contains(&key) {
                continue;
            }

            match self.render_with_retry(&key) {
                Ok(bitmap) => {
                    self.cache.insert(key, bitmap);
                    self.stats.prerendered += 1;
                }
                Err(e) => {
                    warn!("Prerender of page {page} for surface {surface} failed, skipping: {e}");
                }
            }
        }
    }

    fn render_with_retry(&mut self, key: &CacheKey) -> Result<Bitmap, RenderFailure> {
        let mut attempt = 0;
        loop {
            match self.rasterize(key) {
                Ok(bitmap) => {
                    self.stats.renders += 1;
                    return Ok(bitmap);
                }
                Err(e) if attempt < self.render_retries => {
                    debug!("Render of page {} failed, retrying: {e}", key.page);
                    attempt += 1;
                }
                Err(e) => {
                    self.stats.render_failures += 1;
                    return Err(e);
                }
            }
        }
    }

    fn rasterize(&self, key: &CacheKey) -> Result<Bitmap, RenderFailure> {
        let bitmap = self
            .document
            .rasterize(key.page, key.width, key.height, key.variant)?;
        if bitmap.width != key.width
            || bitmap.height != key.height
            || bitmap.byte_len() != key.width as usize * key.height as usize * 3
        {
            return Err(RenderFailure::generic(format!(
                "rasterizer returned {}x{} ({} bytes) for a {}x{} surface",
                bitmap.width,
                bitmap.height,
                bitmap.byte_len(),
                key.width,
                key.height
            )));
        }
        Ok(bitmap)
    }

    fn check_page(&self, page: usize) -> Result<(), CacheError> {
        let page_count = self.document.page_count();
        if page >= page_count {
            return Err(CacheError::PageOutOfRange { page, page_count });
        }
        Ok(())
    }
}

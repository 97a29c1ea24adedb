//! Surface registry
//!
//! Tracks every on-screen rendering target with its variant and pixel size.
//! State changes are expressed as [`Command`]s which return the cache
//! [`Effect`]s the caller must execute.

use std::collections::HashMap;

use log::{debug, info};

use super::error::CacheError;
use super::types::{SurfaceId, SurfaceRole, SurfaceState, Variant};
use super::variant::VariantResolver;

#[derive(Clone, Debug)]
struct Surface {
    name: String,
    role: Option<SurfaceRole>,
    state: SurfaceState,
}

/// Registered surfaces, indexed by [`SurfaceId`]
#[derive(Clone, Debug, Default)]
pub struct SurfaceRegistry {
    surfaces: Vec<Surface>,
    by_name: HashMap<String, SurfaceId>,
}

impl SurfaceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a surface. Its size stays 0x0 until the first resize.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        initial_variant: Variant,
    ) -> Result<SurfaceId, CacheError> {
        self.insert(name.into(), None, initial_variant)
    }

    /// Add the canonical surface for a presentation role
    pub fn register_role(
        &mut self,
        role: SurfaceRole,
        notes_mode: bool,
    ) -> Result<SurfaceId, CacheError> {
        let variant = VariantResolver::variant_for_role(role, notes_mode);
        self.insert(role.name().to_string(), Some(role), variant)
    }

    fn insert(
        &mut self,
        name: String,
        role: Option<SurfaceRole>,
        variant: Variant,
    ) -> Result<SurfaceId, CacheError> {
        if self.by_name.contains_key(&name) {
            return Err(CacheError::DuplicateSurface(name));
        }

        let id = SurfaceId(self.surfaces.len());
        info!("Registered surface {name:?} as {id} ({variant})");
        self.by_name.insert(name.clone(), id);
        self.surfaces.push(Surface {
            name,
            role,
            state: SurfaceState {
                variant,
                width: 0,
                height: 0,
            },
        });
        Ok(id)
    }

    /// Update stored dimensions, returning whether they changed
    pub fn resize(&mut self, id: SurfaceId, width: u32, height: u32) -> Result<bool, CacheError> {
        let surface = self.surface_mut(id)?;
        if surface.state.width == width && surface.state.height == height {
            return Ok(false);
        }

        debug!(
            "Surface {:?} resized {}x{} -> {width}x{height}",
            surface.name, surface.state.width, surface.state.height
        );
        surface.state.width = width;
        surface.state.height = height;
        Ok(true)
    }

    /// Update the variant. Always counts as a change.
    pub fn set_variant(&mut self, id: SurfaceId, variant: Variant) -> Result<(), CacheError> {
        let surface = self.surface_mut(id)?;
        debug!(
            "Surface {:?} variant {} -> {variant}",
            surface.name, surface.state.variant
        );
        surface.state.variant = variant;
        Ok(())
    }

    /// Current variant and size of a surface
    pub fn current(&self, id: SurfaceId) -> Result<SurfaceState, CacheError> {
        self.surface(id).map(|s| s.state)
    }

    /// Look up a surface by name
    pub fn id_of(&self, name: &str) -> Result<SurfaceId, CacheError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| CacheError::UnknownSurfaceName(name.to_string()))
    }

    pub fn name(&self, id: SurfaceId) -> Result<&str, CacheError> {
        self.surface(id).map(|s| s.name.as_str())
    }

    /// Surface registered for a role, if any
    #[must_use]
    pub fn id_for_role(&self, role: SurfaceRole) -> Option<SurfaceId> {
        self.surfaces
            .iter()
            .position(|s| s.role == Some(role))
            .map(SurfaceId)
    }

    /// All registered surfaces in registration order
    pub fn ids(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        (0..self.surfaces.len()).map(SurfaceId)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Apply a command and return resulting effects
    pub fn apply(&mut self, cmd: Command) -> Result<Vec<Effect>, CacheError> {
        match cmd {
            Command::Resize {
                surface,
                width,
                height,
            } => {
                if self.resize(surface, width, height)? {
                    Ok(vec![Effect::InvalidateSurface(surface)])
                } else {
                    Ok(vec![])
                }
            }

            Command::SetVariant { surface, variant } => {
                self.set_variant(surface, variant)?;
                Ok(vec![Effect::InvalidateSurface(surface)])
            }

            Command::SetNotesMode(notes_mode) => {
                let mut effects = vec![];
                for index in 0..self.surfaces.len() {
                    let id = SurfaceId(index);
                    if let Some(role) = self.surfaces[index].role {
                        let variant = VariantResolver::variant_for_role(role, notes_mode);
                        self.set_variant(id, variant)?;
                        effects.push(Effect::InvalidateSurface(id));
                    }
                }
                Ok(effects)
            }
        }
    }

    fn surface(&self, id: SurfaceId) -> Result<&Surface, CacheError> {
        self.surfaces
            .get(id.0)
            .ok_or(CacheError::UnknownSurface(id))
    }

    fn surface_mut(&mut self, id: SurfaceId) -> Result<&mut Surface, CacheError> {
        self.surfaces
            .get_mut(id.0)
            .ok_or(CacheError::UnknownSurface(id))
    }
}

/// Commands that modify surface state
#[derive(Clone, Debug)]
pub enum Command {
    /// The hosting window changed the surface size
    Resize {
        surface: SurfaceId,
        width: u32,
        height: u32,
    },
    /// Assign a variant to one surface
    SetVariant { surface: SurfaceId, variant: Variant },
    /// Toggle notes mode for every role surface
    SetNotesMode(bool),
}

/// Effects produced by surface changes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Drop every cache entry of a surface
    InvalidateSurface(SurfaceId),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_main() -> (SurfaceRegistry, SurfaceId) {
        let mut registry = SurfaceRegistry::new();
        let id = registry.register("main", Variant::Plain).unwrap();
        registry.resize(id, 800, 600).unwrap();
        (registry, id)
    }

    #[test]
    fn register_rejects_duplicate_name() {
        let (mut registry, _) = registry_with_main();
        let err = registry.register("main", Variant::NotesHalf).unwrap_err();
        assert!(matches!(err, CacheError::DuplicateSurface(name) if name == "main"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn new_surface_starts_unsized() {
        let mut registry = SurfaceRegistry::new();
        let id = registry.register("preview", Variant::NotesHalf).unwrap();
        let state = registry.current(id).unwrap();
        assert_eq!(state.variant, Variant::NotesHalf);
        assert!(state.is_zero_sized());
    }

    #[test]
    fn resize_reports_real_changes_only() {
        let (mut registry, id) = registry_with_main();
        assert!(!registry.resize(id, 800, 600).unwrap());
        assert!(registry.resize(id, 1024, 768).unwrap());
        let state = registry.current(id).unwrap();
        assert_eq!((state.width, state.height), (1024, 768));
    }

    #[test]
    fn resize_command_without_change_returns_empty() {
        let (mut registry, id) = registry_with_main();
        let effects = registry
            .apply(Command::Resize {
                surface: id,
                width: 800,
                height: 600,
            })
            .unwrap();
        assert!(effects.is_empty());
    }

    #[test]
    fn resize_command_with_change_invalidates() {
        let (mut registry, id) = registry_with_main();
        let effects = registry
            .apply(Command::Resize {
                surface: id,
                width: 400,
                height: 300,
            })
            .unwrap();
        assert_eq!(effects, vec![Effect::InvalidateSurface(id)]);
    }

    #[test]
    fn same_variant_still_invalidates() {
        let (mut registry, id) = registry_with_main();
        let effects = registry
            .apply(Command::SetVariant {
                surface: id,
                variant: Variant::Plain,
            })
            .unwrap();
        assert_eq!(effects, vec![Effect::InvalidateSurface(id)]);
    }

    #[test]
    fn unknown_surface_is_an_error() {
        let registry = SurfaceRegistry::new();
        assert!(matches!(
            registry.current(SurfaceId(3)),
            Err(CacheError::UnknownSurface(SurfaceId(3)))
        ));
        assert!(matches!(
            registry.id_of("nope"),
            Err(CacheError::UnknownSurfaceName(_))
        ));
    }

    #[test]
    fn notes_mode_fans_out_to_role_surfaces() {
        let mut registry = SurfaceRegistry::new();
        let content = registry.register_role(SurfaceRole::Content, false).unwrap();
        let current = registry
            .register_role(SurfaceRole::PresenterCurrent, false)
            .unwrap();
        let next = registry.register_role(SurfaceRole::PresenterNext, false).unwrap();
        let extra = registry.register("thumbnail", Variant::Plain).unwrap();

        let effects = registry.apply(Command::SetNotesMode(true)).unwrap();
        assert_eq!(
            effects,
            vec![
                Effect::InvalidateSurface(content),
                Effect::InvalidateSurface(current),
                Effect::InvalidateSurface(next),
            ]
        );
        assert_eq!(registry.current(content).unwrap().variant, Variant::ContentHalf);
        assert_eq!(registry.current(current).unwrap().variant, Variant::NotesHalf);
        assert_eq!(registry.current(next).unwrap().variant, Variant::ContentHalf);
        assert_eq!(registry.current(extra).unwrap().variant, Variant::Plain);
        assert_eq!(registry.id_for_role(SurfaceRole::PresenterNext), Some(next));
        assert_eq!(registry.id_of("presenter-current").unwrap(), current);
    }
}

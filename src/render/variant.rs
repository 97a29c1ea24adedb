//! Variant resolution
//!
//! Maps a surface's requested variant to the one actually rendered. A
//! document without notes has nothing to split, so every surface falls back
//! to [`Variant::Plain`] silently.

use serde::{Deserialize, Serialize};

use super::types::{SurfaceRole, SurfaceState, Variant};

/// User preference for notes mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotesMode {
    /// On when the document has notes
    #[default]
    Auto,
    On,
    Off,
}

impl NotesMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotesMode::Auto => "auto",
            NotesMode::On => "on",
            NotesMode::Off => "off",
        }
    }

    /// Resolve the preference against a document
    #[must_use]
    pub fn enabled_for(self, has_secondary_content: bool) -> bool {
        match self {
            NotesMode::Auto => has_secondary_content,
            NotesMode::On => true,
            NotesMode::Off => false,
        }
    }
}

impl std::str::FromStr for NotesMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(NotesMode::Auto),
            "on" | "true" => Ok(NotesMode::On),
            "off" | "false" => Ok(NotesMode::Off),
            other => Err(format!("invalid notes mode {other:?} (expected auto, on or off)")),
        }
    }
}

/// Resolves the variant each surface renders with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VariantResolver {
    has_secondary_content: bool,
}

impl VariantResolver {
    #[must_use]
    pub const fn new(has_secondary_content: bool) -> Self {
        Self {
            has_secondary_content,
        }
    }

    #[must_use]
    pub const fn has_secondary_content(&self) -> bool {
        self.has_secondary_content
    }

    /// Variant to render for a surface in the given state
    #[must_use]
    pub const fn variant_for(&self, state: &SurfaceState) -> Variant {
        self.effective(state.variant)
    }

    /// Apply the no-notes fallback to a requested variant
    #[must_use]
    pub const fn effective(&self, requested: Variant) -> Variant {
        if requested.needs_notes() && !self.has_secondary_content {
            Variant::Plain
        } else {
            requested
        }
    }

    /// Fixed notes-mode mapping for the presentation surfaces
    #[must_use]
    pub const fn variant_for_role(role: SurfaceRole, notes_mode: bool) -> Variant {
        if !notes_mode {
            return Variant::Plain;
        }
        match role {
            SurfaceRole::Content | SurfaceRole::PresenterNext => Variant::ContentHalf,
            SurfaceRole::PresenterCurrent => Variant::NotesHalf,
        }
    }
}

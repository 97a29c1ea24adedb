use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::render::{
    DEFAULT_IDLE_UNITS_PER_TICK, DEFAULT_PRERENDER_BACKWARD, DEFAULT_PRERENDER_FORWARD,
    DEFAULT_RENDER_RETRIES, MAX_RENDER_RETRIES, NotesMode, PrerenderWindow, SurfaceRole,
};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "podium";

/// Pixel size of a surface, written as "WxH"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl std::str::FromStr for SurfaceSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("invalid size {s:?} (expected WIDTHxHEIGHT)"))?;
        let width = w
            .trim()
            .parse()
            .map_err(|e| format!("invalid width in {s:?}: {e}"))?;
        let height = h
            .trim()
            .parse()
            .map_err(|e| format!("invalid height in {s:?}: {e}"))?;
        Ok(Self { width, height })
    }
}

impl TryFrom<String> for SurfaceSize {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SurfaceSize> for String {
    fn from(size: SurfaceSize) -> Self {
        size.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_prerender_forward")]
    pub prerender_forward: usize,

    #[serde(default = "default_prerender_backward")]
    pub prerender_backward: usize,

    #[serde(default)]
    pub notes_mode: NotesMode,

    #[serde(default = "default_idle_units_per_tick")]
    pub idle_units_per_tick: usize,

    #[serde(default = "default_render_retries")]
    pub render_retries: u32,

    #[serde(default = "default_content_size")]
    pub content_size: SurfaceSize,

    #[serde(default = "default_presenter_current_size")]
    pub presenter_current_size: SurfaceSize,

    #[serde(default = "default_presenter_next_size")]
    pub presenter_next_size: SurfaceSize,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_prerender_forward() -> usize {
    DEFAULT_PRERENDER_FORWARD
}

fn default_prerender_backward() -> usize {
    DEFAULT_PRERENDER_BACKWARD
}

fn default_idle_units_per_tick() -> usize {
    DEFAULT_IDLE_UNITS_PER_TICK
}

fn default_render_retries() -> u32 {
    DEFAULT_RENDER_RETRIES
}

fn default_content_size() -> SurfaceSize {
    SurfaceSize::new(1920, 1080)
}

fn default_presenter_current_size() -> SurfaceSize {
    SurfaceSize::new(800, 600)
}

fn default_presenter_next_size() -> SurfaceSize {
    SurfaceSize::new(640, 480)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            prerender_forward: default_prerender_forward(),
            prerender_backward: default_prerender_backward(),
            notes_mode: NotesMode::default(),
            idle_units_per_tick: default_idle_units_per_tick(),
            render_retries: default_render_retries(),
            content_size: default_content_size(),
            presenter_current_size: default_presenter_current_size(),
            presenter_next_size: default_presenter_next_size(),
        }
    }
}

impl Settings {
    #[must_use]
    pub fn prerender_window(&self) -> PrerenderWindow {
        PrerenderWindow::new(self.prerender_forward, self.prerender_backward)
    }

    /// Retries actually used; at most one
    #[must_use]
    pub fn effective_render_retries(&self) -> u32 {
        self.render_retries.min(MAX_RENDER_RETRIES)
    }

    /// Configured size of a role surface
    #[must_use]
    pub fn size_for(&self, role: SurfaceRole) -> SurfaceSize {
        match role {
            SurfaceRole::Content => self.content_size,
            SurfaceRole::PresenterCurrent => self.presenter_current_size,
            SurfaceRole::PresenterNext => self.presenter_next_size,
        }
    }
}

pub fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load settings from `path`, or from the default location.
///
/// A missing file is created with defaults; an unreadable one is logged and
/// replaced by defaults in memory only.
#[must_use]
pub fn load_settings(path: Option<&Path>) -> Settings {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match preferred_config_path() {
            Some(p) => p,
            None => {
                warn!("Could not determine config directory, using default settings");
                return Settings::default();
            }
        },
    };

    if path.exists() {
        load_settings_from_path(&path)
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        let settings = Settings::default();
        save_settings_to_file(&settings, &path);
        settings
    }
}

fn load_settings_from_path(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }
                if settings.render_retries > MAX_RENDER_RETRIES {
                    warn!(
                        "render_retries {} exceeds {MAX_RENDER_RETRIES}, clamping",
                        settings.render_retries
                    );
                }
                settings
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
                Settings::default()
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
            Settings::default()
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );

    settings.version = CURRENT_VERSION;
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let content = generate_settings_yaml(settings);

    match fs::write(path, content) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let mut content = String::new();

    content.push_str(SETTINGS_HEADER);
    content.push_str(&format!("version: {}\n", settings.version));
    content.push_str("\n# Pages rendered ahead of / behind the current page\n");
    content.push_str(&format!(
        "prerender_forward: {}\n",
        settings.prerender_forward
    ));
    content.push_str(&format!(
        "prerender_backward: {}\n",
        settings.prerender_backward
    ));
    content.push_str("\n# auto | on | off\n");
    content.push_str(&format!("notes_mode: {}\n", settings.notes_mode.as_str()));
    content.push_str(&format!(
        "idle_units_per_tick: {}\n",
        settings.idle_units_per_tick
    ));
    content.push_str(&format!("render_retries: {}\n", settings.render_retries));
    content.push_str("\n# Surface sizes in pixels\n");
    content.push_str(&format!("content_size: \"{}\"\n", settings.content_size));
    content.push_str(&format!(
        "presenter_current_size: \"{}\"\n",
        settings.presenter_current_size
    ));
    content.push_str(&format!(
        "presenter_next_size: \"{}\"\n",
        settings.presenter_next_size
    ));

    content
}

const SETTINGS_HEADER: &str = r#"# ============================================================================
# podium configuration
# ============================================================================
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_size_parsing() {
        assert_eq!("800x600".parse::<SurfaceSize>(), Ok(SurfaceSize::new(800, 600)));
        assert_eq!(" 1920 X 1080 ".parse::<SurfaceSize>(), Ok(SurfaceSize::new(1920, 1080)));
        assert!("800".parse::<SurfaceSize>().is_err());
        assert!("axb".parse::<SurfaceSize>().is_err());
    }

    #[test]
    fn generated_yaml_round_trips() {
        let settings = Settings {
            prerender_forward: 6,
            notes_mode: NotesMode::Off,
            presenter_next_size: SurfaceSize::new(320, 240),
            ..Settings::default()
        };
        let parsed: Settings = serde_yaml::from_str(&generate_settings_yaml(&settings)).unwrap();
        assert_eq!(parsed.prerender_forward, 6);
        assert_eq!(parsed.prerender_backward, DEFAULT_PRERENDER_BACKWARD);
        assert_eq!(parsed.notes_mode, NotesMode::Off);
        assert_eq!(parsed.presenter_next_size, SurfaceSize::new(320, 240));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let parsed: Settings = serde_yaml::from_str("prerender_backward: 1\n").unwrap();
        assert_eq!(parsed.version, CURRENT_VERSION);
        assert_eq!(parsed.prerender_window(), PrerenderWindow::new(4, 1));
        assert_eq!(parsed.content_size, SurfaceSize::new(1920, 1080));
    }

    #[test]
    fn retries_are_capped() {
        let settings = Settings {
            render_retries: 5,
            ..Settings::default()
        };
        assert_eq!(settings.effective_render_retries(), 1);
    }

    #[test]
    fn load_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let settings = load_settings(Some(&path));
        assert_eq!(settings.prerender_forward, DEFAULT_PRERENDER_FORWARD);
        assert!(path.exists());

        fs::write(&path, "prerender_forward: 8\nnotes_mode: on\n").unwrap();
        let reloaded = load_settings(Some(&path));
        assert_eq!(reloaded.prerender_forward, 8);
        assert_eq!(reloaded.notes_mode, NotesMode::On);
    }

    #[test]
    fn unparsable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "prerender_forward: [not a number]\n").unwrap();

        let settings = load_settings(Some(&path));
        assert_eq!(settings.prerender_forward, DEFAULT_PRERENDER_FORWARD);
    }
}

//! Settings for webplus-rs.
//!
//! [`Settings`] holds the application configuration and [`TemplateSettings`]
//! the configuration of one template engine. Every data-file path is taken
//! from here and resolved against [`Settings::base_dir`], so nothing depends
//! on the process working directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Options understood by the Mustache template backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MustacheOptions {
    /// Subdirectory of every template directory that holds partials.
    /// An empty string disables the extra partial directories.
    pub partial_dir: String,
    /// Extension assumed for template files, without the leading dot.
    pub file_extension: String,
}

impl Default for MustacheOptions {
    fn default() -> Self {
        Self {
            partial_dir: "partials".to_string(),
            file_extension: "html".to_string(),
        }
    }
}

/// Template engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
    /// The template backend identifier.
    pub backend: String,
    /// Directories to search for template files.
    pub dirs: Vec<PathBuf>,
    /// Whether to look for templates inside installed application directories.
    pub app_dirs: bool,
    /// Backend-specific options.
    pub options: MustacheOptions,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            backend: "webplus.template.backends.mustache".to_string(),
            dirs: vec![PathBuf::from("templates")],
            app_dirs: false,
            options: MustacheOptions::default(),
        }
    }
}

/// The complete set of application settings.
///
/// # Examples
///
/// ```
/// use webplus_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.language_code, "en");
/// assert_eq!(settings.templates[0].options.file_extension, "html");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled.
    pub debug: bool,
    /// Address the development server binds to.
    pub bind_address: String,
    /// Directory that relative data-file paths are resolved against.
    pub base_dir: PathBuf,
    /// Application directories; searched for `mustache/` template
    /// directories when a template engine has `app_dirs` enabled.
    pub installed_apps: Vec<PathBuf>,

    // ── Templates ────────────────────────────────────────────────────

    /// Template engine configurations.
    pub templates: Vec<TemplateSettings>,

    // ── Internationalization ─────────────────────────────────────────

    /// The default language code, used when a render selects no language
    /// or selects one without a locale file.
    pub language_code: String,
    /// Directory holding `<code>.properties` locale files.
    pub locale_dir: PathBuf,

    // ── Site ─────────────────────────────────────────────────────────

    /// JSON file with the demo site configuration.
    pub site_config: PathBuf,

    // ── Logging ──────────────────────────────────────────────────────

    /// The log level (e.g. "info", "debug", "warn").
    pub log_level: String,

    // ── Escape hatch ─────────────────────────────────────────────────

    /// Custom settings that don't fit into the above categories.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            bind_address: "127.0.0.1:8000".to_string(),
            base_dir: PathBuf::from("."),
            installed_apps: Vec::new(),

            templates: vec![TemplateSettings::default()],

            language_code: "en".to_string(),
            locale_dir: PathBuf::from("locales"),

            site_config: PathBuf::from("config.json"),

            log_level: "info".to_string(),

            extra: HashMap::new(),
        }
    }
}

impl Settings {
    /// Resolves a configured path against [`base_dir`](Self::base_dir).
    ///
    /// Absolute paths are returned unchanged.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Returns the resolved locale directory.
    pub fn locale_path(&self) -> PathBuf {
        self.resolve(&self.locale_dir)
    }

    /// Returns the resolved site configuration file.
    pub fn site_config_path(&self) -> PathBuf {
        self.resolve(&self.site_config)
    }
}

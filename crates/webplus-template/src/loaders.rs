//! Template loaders.
//!
//! A [`TemplateLoader`] turns a template base name (`index`, not
//! `index.html`) into source text. [`FileSystemLoader`] searches an ordered
//! list of directories for `<name>.<extension>`; [`StringLoader`] serves
//! templates registered in memory.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use webplus_core::error::WebplusError;

/// Loads template source text by base name.
pub trait TemplateLoader: Send + Sync {
    /// Loads the template source with the given name.
    ///
    /// # Errors
    ///
    /// Returns `TemplateDoesNotExist` if the template cannot be found, or
    /// `EncodingError` if the file is not valid UTF-8.
    fn load(&self, name: &str) -> Result<String, WebplusError>;
}

/// Loads templates from one or more directories on the filesystem.
///
/// Searches each configured directory in order and returns the first match.
pub struct FileSystemLoader {
    dirs: Vec<PathBuf>,
    extension: String,
}

impl FileSystemLoader {
    /// Creates a loader over `dirs` for files ending in `.<extension>`.
    pub fn new(dirs: Vec<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dirs,
            extension: extension.into(),
        }
    }
}

impl TemplateLoader for FileSystemLoader {
    fn load(&self, name: &str) -> Result<String, WebplusError> {
        let file_name = format!("{name}.{}", self.extension);
        for dir in &self.dirs {
            let path = dir.join(&file_name);
            if path.is_file() {
                let bytes = std::fs::read(&path)?;
                return String::from_utf8(bytes).map_err(|e| {
                    WebplusError::EncodingError(format!(
                        "Template '{}' is not valid utf-8: {e}",
                        path.display()
                    ))
                });
            }
        }

        Err(WebplusError::TemplateDoesNotExist(name.to_string()))
    }
}

/// Loads templates from an in-memory map of name to source strings.
pub struct StringLoader {
    templates: RwLock<HashMap<String, String>>,
}

impl StringLoader {
    /// Creates a new empty `StringLoader`.
    pub fn new() -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
        }
    }

    /// Adds or replaces a template.
    pub fn add(&self, name: impl Into<String>, source: impl Into<String>) {
        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), source.into());
    }
}

impl Default for StringLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateLoader for StringLoader {
    fn load(&self, name: &str) -> Result<String, WebplusError> {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| WebplusError::TemplateDoesNotExist(name.to_string()))
    }
}

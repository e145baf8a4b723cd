//! Locale tables.
//!
//! A locale directory holds one `<code>.properties` file per language, each
//! a list of `key=value` lines:
//!
//! ```text
//! # comment
//! welcome=Welcome to {0}!
//! docs.link=See the <a href="{0}">docs</a>
//! ```
//!
//! [`load_locales`] reads every such file into a [`LocaleTable`], keyed by
//! the part of the file name before the first `.`.

use std::collections::HashMap;
use std::path::Path;

use webplus_core::error::WebplusError;

/// File extension of locale files, without the dot.
pub const LOCALE_EXTENSION: &str = "properties";

/// Message key to message template, for one language.
pub type MessageMap = HashMap<String, String>;

/// Language code to [`MessageMap`].
#[derive(Debug, Clone, Default)]
pub struct LocaleTable {
    languages: HashMap<String, MessageMap>,
}

impl LocaleTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the messages for a language.
    pub fn insert(&mut self, code: impl Into<String>, messages: MessageMap) {
        self.languages.insert(code.into(), messages);
    }

    /// Returns the messages for a language.
    pub fn get(&self, code: &str) -> Option<&MessageMap> {
        self.languages.get(code)
    }

    /// Looks up one message.
    pub fn lookup(&self, code: &str, key: &str) -> Option<&str> {
        self.get(code)?.get(key).map(String::as_str)
    }

    /// Returns the loaded language codes, sorted.
    pub fn languages(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.languages.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }

    /// Returns the number of languages.
    pub fn len(&self) -> usize {
        self.languages.len()
    }

    /// Returns `true` if no language is loaded.
    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

impl FromIterator<(String, MessageMap)> for LocaleTable {
    fn from_iter<I: IntoIterator<Item = (String, MessageMap)>>(iter: I) -> Self {
        Self {
            languages: iter.into_iter().collect(),
        }
    }
}

/// Loads every `*.properties` file in `dir`.
///
/// Files are read in name order; other files are skipped.
///
/// # Errors
///
/// Returns `IoError` if the directory cannot be read, and the errors of
/// [`load_locale_file`] for any locale file.
pub fn load_locales(dir: &Path) -> Result<LocaleTable, WebplusError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == LOCALE_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut table = LocaleTable::new();
    for path in paths {
        let Some(code) = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.split('.').next())
        else {
            continue;
        };
        let code = code.to_string();
        let messages = load_locale_file(&path)?;
        tracing::debug!(language = %code, entries = messages.len(), "Loaded locale");
        table.insert(code, messages);
    }
    Ok(table)
}

/// Reads and parses one locale file.
///
/// # Errors
///
/// Returns `EncodingError` if the file is not UTF-8, or
/// `LocaleFileMalformed` for a line without `=`.
pub fn load_locale_file(path: &Path) -> Result<MessageMap, WebplusError> {
    let bytes = std::fs::read(path)?;
    let source = String::from_utf8(bytes).map_err(|e| {
        WebplusError::EncodingError(format!(
            "Locale file '{}' is not valid utf-8: {e}",
            path.display()
        ))
    })?;
    parse_locale(&source, &path.display().to_string())
}

/// Parses `key=value` lines. Each line is trimmed and split on its first `=`.
/// Blank lines are skipped, as are lines starting with `#` or `!` that hold
/// no `=`. A `#` or `!` line with an `=` is an ordinary entry.
///
/// # Errors
///
/// Returns `LocaleFileMalformed`, naming `file` and the one-based line
/// number, for any other line without `=`.
pub fn parse_locale(source: &str, file: &str) -> Result<MessageMap, WebplusError> {
    let mut messages = MessageMap::new();
    for (index, line) in source.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            if line.starts_with(['#', '!']) {
                continue;
            }
            return Err(WebplusError::LocaleFileMalformed {
                file: file.to_string(),
                line: index + 1,
                content: line.to_string(),
            });
        };
        messages.insert(key.to_string(), value.to_string());
    }
    Ok(messages)
}

//! The site configuration file.
//!
//! A JSON document of nested objects, addressed here by dotted key paths
//! such as `quickstart.repo.url`. The index view reads it on every request.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use webplus_core::error::{WebplusError, WebplusResult};

/// A parsed site configuration.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    root: Value,
}

impl SiteConfig {
    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `IoError` if the file cannot be read and
    /// `ConfigurationError` if it is not valid JSON.
    pub fn load(path: &Path) -> WebplusResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json_str(&source).map_err(|e| match e {
            WebplusError::ConfigurationError(msg) => {
                WebplusError::ConfigurationError(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if `source` is not valid JSON.
    pub fn from_json_str(source: &str) -> WebplusResult<Self> {
        serde_json::from_str(source)
            .map(|root| Self { root })
            .map_err(|e| WebplusError::ConfigurationError(format!("Invalid site config: {e}")))
    }

    /// Returns the value at a dotted key path.
    ///
    /// # Errors
    ///
    /// Returns `ConfigKeyMissing` naming the full path if any segment is absent.
    pub fn get(&self, path: &str) -> WebplusResult<&Value> {
        path.split('.')
            .try_fold(&self.root, |value, key| value.get(key))
            .ok_or_else(|| WebplusError::ConfigKeyMissing(path.to_string()))
    }

    /// Returns the value at a dotted key path as a string. Numbers and
    /// booleans are rendered as text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigKeyMissing` if the path is absent and
    /// `ConfigurationError` if the value is an object, array or null.
    pub fn get_str(&self, path: &str) -> WebplusResult<String> {
        match self.get(path)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(WebplusError::ConfigurationError(format!(
                "Config key '{path}' is not a scalar: {other}"
            ))),
        }
    }
}

/// Expands `%(NAME)s` references against `vars`. `%%` is a literal `%`.
///
/// # Errors
///
/// Returns `EnvVarMissing` for a name absent from `vars`, and
/// `ConfigurationError` for any other use of `%`.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use webplus_demo::config::interpolate_env;
///
/// let mut vars = HashMap::new();
/// vars.insert("WP_APP_ID".to_string(), "app-1".to_string());
/// assert_eq!(
///     interpolate_env("https://console/apps/%(WP_APP_ID)s", &vars).unwrap(),
///     "https://console/apps/app-1"
/// );
/// ```
pub fn interpolate_env(template: &str, vars: &HashMap<String, String>) -> WebplusResult<String> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('%') {
        output.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];

        if let Some(after) = tail.strip_prefix('%') {
            output.push('%');
            rest = after;
            continue;
        }

        let name_and_rest = tail.strip_prefix('(').and_then(|t| {
            let close = t.find(')')?;
            let after = t[close + 1..].strip_prefix('s')?;
            Some((&t[..close], after))
        });
        let Some((name, after)) = name_and_rest else {
            return Err(WebplusError::ConfigurationError(format!(
                "Unsupported format in '{template}': only %(NAME)s and %% are allowed"
            )));
        };

        let value = vars
            .get(name)
            .ok_or_else(|| WebplusError::EnvVarMissing(name.to_string()))?;
        output.push_str(value);
        rest = after;
    }

    output.push_str(rest);
    Ok(output)
}

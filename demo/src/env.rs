//! The application environment.
//!
//! The hosting platform describes the deployed application through `WP_*`
//! environment variables. [`AppEnvironment`] is a snapshot of those
//! variables; [`EnvironmentSource`] decides whether each request reads the
//! live process environment or a fixed snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use webplus_core::error::{WebplusError, WebplusResult};

/// Region the application is deployed in.
pub const WP_APP_REGION_ID: &str = "WP_APP_REGION_ID";
/// Application identifier.
pub const WP_APP_ID: &str = "WP_APP_ID";
/// Application display name.
pub const WP_APP_NAME: &str = "WP_APP_NAME";
/// Environment identifier.
pub const WP_ENV_ID: &str = "WP_ENV_ID";
/// Environment display name.
pub const WP_ENV_NAME: &str = "WP_ENV_NAME";
/// What triggered the last deployment: `CLI` or `Console`.
pub const WP_CHANGE_TRIGGER_FROM: &str = "WP_CHANGE_TRIGGER_FROM";

/// A snapshot of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppEnvironment {
    vars: HashMap<String, String>,
}

impl AppEnvironment {
    /// Captures the current process environment. Variables whose name or
    /// value is not valid Unicode are skipped.
    pub fn from_process() -> Self {
        Self::from_vars(std::env::vars_os().filter_map(|(k, v)| {
            Some((k.into_string().ok()?, v.into_string().ok()?))
        }))
    }

    /// Builds an environment from name/value pairs.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Returns the value of a required variable.
    ///
    /// # Errors
    ///
    /// Returns `EnvVarMissing` if the variable is not set.
    pub fn get(&self, name: &str) -> WebplusResult<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| WebplusError::EnvVarMissing(name.to_string()))
    }

    /// Returns every variable.
    pub const fn vars(&self) -> &HashMap<String, String> {
        &self.vars
    }
}

/// Where a request reads its environment from.
#[derive(Debug, Clone)]
pub enum EnvironmentSource {
    /// The live process environment, captured per request.
    Process,
    /// A fixed snapshot shared by every request.
    Fixed(Arc<AppEnvironment>),
}

impl EnvironmentSource {
    /// Returns the environment to use for one request.
    pub fn load(&self) -> Arc<AppEnvironment> {
        match self {
            Self::Process => Arc::new(AppEnvironment::from_process()),
            Self::Fixed(env) => Arc::clone(env),
        }
    }
}

impl Default for EnvironmentSource {
    fn default() -> Self {
        Self::Process
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get() {
        let env = AppEnvironment::from_vars([(WP_APP_ID, "app-1")]);
        assert_eq!(env.get(WP_APP_ID).unwrap(), "app-1");
        assert_eq!(env.vars().len(), 1);
    }

    #[test]
    fn test_get_missing() {
        let env = AppEnvironment::default();
        let err = env.get(WP_ENV_NAME).unwrap_err();
        assert!(matches!(&err, WebplusError::EnvVarMissing(name) if name == "WP_ENV_NAME"));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_from_process_sees_path() {
        // PATH is set in any environment that can run the test binary.
        let env = AppEnvironment::from_process();
        assert_eq!(env.get("PATH").ok(), std::env::var("PATH").ok().as_deref());
    }

    #[test]
    fn test_fixed_source_is_shared() {
        let env = Arc::new(AppEnvironment::from_vars([("A", "1")]));
        let source = EnvironmentSource::Fixed(Arc::clone(&env));
        assert!(Arc::ptr_eq(&source.load(), &env));
    }

    #[test]
    fn test_default_source_is_process() {
        assert!(matches!(EnvironmentSource::default(), EnvironmentSource::Process));
    }
}

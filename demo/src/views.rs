//! The index view.
//!
//! Builds the page context from the site configuration and the application
//! environment, picks a language from the request, and renders `index`.

use std::collections::HashMap;

use webplus_core::error::WebplusResult;
use webplus_http::{HttpRequest, HttpResponse};
use webplus_template::backend::LANGUAGE_KEY;
use webplus_template::ContextValue;

use crate::config::{interpolate_env, SiteConfig};
use crate::env::{
    AppEnvironment, WP_APP_ID, WP_APP_NAME, WP_APP_REGION_ID, WP_CHANGE_TRIGGER_FROM, WP_ENV_ID,
    WP_ENV_NAME,
};
use crate::server::AppState;

/// The template the index view renders.
pub const INDEX_TEMPLATE: &str = "index";

/// Returns `"zh"` if the request's `Accept-Language` starts with `zh`,
/// otherwise `"en"`.
pub fn get_lang(request: &HttpRequest) -> &'static str {
    if request
        .accept_language()
        .is_some_and(|value| value.starts_with("zh"))
    {
        "zh"
    } else {
        "en"
    }
}

/// Builds the index page context.
///
/// # Errors
///
/// Returns `ConfigKeyMissing` for an absent configuration key,
/// `EnvVarMissing` for an unset variable, and `ConfigurationError` for a
/// malformed URL format string.
pub fn index_context(
    config: &SiteConfig,
    env: &AppEnvironment,
    lang: &str,
) -> WebplusResult<HashMap<String, ContextValue>> {
    let trigger = env.get(WP_CHANGE_TRIGGER_FROM)?;
    let envs: HashMap<String, ContextValue> = [
        ("appRegionId", ContextValue::from(env.get(WP_APP_REGION_ID)?)),
        ("appId", ContextValue::from(env.get(WP_APP_ID)?)),
        ("appName", ContextValue::from(env.get(WP_APP_NAME)?)),
        ("envId", ContextValue::from(env.get(WP_ENV_ID)?)),
        ("envName", ContextValue::from(env.get(WP_ENV_NAME)?)),
        ("fromCLI", ContextValue::Bool(trigger == "CLI")),
        ("fromConsole", ContextValue::Bool(trigger == "Console")),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let ctx: HashMap<String, ContextValue> = [
        (LANGUAGE_KEY, ContextValue::from(lang)),
        ("siteId", ContextValue::from(config.get_str("site.id")?)),
        ("quickstartDocUrl", ContextValue::from(config.get_str("quickstart.doc.url")?)),
        ("quickstartRepoName", ContextValue::from(config.get_str("quickstart.repo.name")?)),
        ("quickstartRepoUrl", ContextValue::from(config.get_str("quickstart.repo.url")?)),
        (
            "appUrl",
            ContextValue::from(interpolate_env(&config.get_str("app.url")?, env.vars())?),
        ),
        (
            "envUrl",
            ContextValue::from(interpolate_env(&config.get_str("env.url")?, env.vars())?),
        ),
        ("nextStep", ContextValue::from(config.get("next.step.show")?.clone())),
        (
            "nextStepPackageUrl",
            ContextValue::from(config.get_str("next.step.package.url")?),
        ),
        ("consoleUrl", ContextValue::from(config.get_str("webplus.console.url")?)),
        ("envs", ContextValue::Dict(envs)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    Ok(ctx)
}

/// Renders the index page.
///
/// The site configuration is read from disk on every call.
///
/// # Errors
///
/// Propagates configuration, environment, and template errors.
pub fn index(state: &AppState, request: &HttpRequest) -> WebplusResult<HttpResponse> {
    let config = SiteConfig::load(&state.settings.site_config_path())?;
    let env = state.environment.load();
    let lang = get_lang(request);
    tracing::debug!(lang, "Rendering index");

    let ctx = index_context(&config, &env, lang)?;
    let body = state
        .backend
        .get_template(INDEX_TEMPLATE)?
        .render(Some(&ctx), Some(request))?;
    Ok(HttpResponse::ok(body))
}

//! The Mustache template backend.
//!
//! [`MustacheBackend`] is the Django-shaped entry point: it is configured
//! from [`Settings`] and a [`TemplateSettings`] block, loads the locale
//! table once, and hands out [`Template`]s whose
//! [`render`](Template::render) runs the context-processor chain, picks the
//! language for that call, and renders.
//!
//! # Examples
//!
//! ```
//! use std::collections::HashMap;
//! use webplus_core::settings::{Settings, TemplateSettings};
//! use webplus_template::backend::MustacheBackend;
//! use webplus_template::context::ContextValue;
//! use webplus_template::locale::{LocaleTable, MessageMap};
//!
//! let mut en = MessageMap::new();
//! en.insert("hello".into(), "Hello {0}!".into());
//! let mut locales = LocaleTable::new();
//! locales.insert("en", en);
//!
//! let settings = Settings::default();
//! let backend = MustacheBackend::with_locales(
//!     &settings,
//!     &TemplateSettings::default(),
//!     locales,
//!     Vec::new(),
//! );
//! let template = backend.from_string("{{#i18n}}hello [{{who}}]{{/i18n}}").unwrap();
//!
//! let mut ctx = HashMap::new();
//! ctx.insert("who".to_string(), ContextValue::from("Ann"));
//! assert_eq!(template.render(Some(&ctx), None).unwrap(), "Hello Ann!");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use webplus_core::error::{WebplusError, WebplusResult};
use webplus_core::settings::{MustacheOptions, Settings, TemplateSettings};
use webplus_http::HttpRequest;

use crate::context::{Context, ContextValue};
use crate::context_processors::{builtin_context_processors, ContextProcessor};
use crate::engine::Engine;
use crate::i18n::{Translator, I18N_KEY};
use crate::locale::{load_locales, LocaleTable};
use crate::parser::CompiledTemplate;

/// Subdirectory of each installed app searched when `app_dirs` is enabled.
pub const APP_DIRNAME: &str = "mustache";

/// Context key selecting the language of one render.
pub const LANGUAGE_KEY: &str = "_lang";

/// Context key a request may be passed under.
pub const REQUEST_KEY: &str = "request";

/// Encoding of template and locale files.
pub const FILE_ENCODING: &str = "utf-8";

/// A Mustache template engine with locale-based translations.
///
/// Cloning is cheap; clones share the template cache and locale table.
#[derive(Clone)]
pub struct MustacheBackend {
    inner: Arc<BackendInner>,
}

struct BackendInner {
    engine: Engine,
    locales: Arc<LocaleTable>,
    processors: Vec<Box<dyn ContextProcessor>>,
    options: MustacheOptions,
    default_language: String,
}

impl MustacheBackend {
    /// Creates a backend and loads the locale table from
    /// [`Settings::locale_path`].
    ///
    /// `processors` run after the builtin ones, in the given order.
    ///
    /// # Errors
    ///
    /// Returns the locale loading errors of [`load_locales`].
    pub fn new(
        settings: &Settings,
        template_settings: &TemplateSettings,
        processors: Vec<Box<dyn ContextProcessor>>,
    ) -> WebplusResult<Self> {
        let locale_path = settings.locale_path();
        let locales = load_locales(&locale_path)?;
        tracing::info!(
            path = %locale_path.display(),
            languages = ?locales.languages(),
            "Loaded locales"
        );
        Ok(Self::with_locales(settings, template_settings, locales, processors))
    }

    /// Creates a backend from the first entry of [`Settings::templates`].
    ///
    /// # Errors
    ///
    /// Returns `ImproperlyConfigured` if no template engine is configured,
    /// or the errors of [`MustacheBackend::new`].
    pub fn from_settings(
        settings: &Settings,
        processors: Vec<Box<dyn ContextProcessor>>,
    ) -> WebplusResult<Self> {
        let template_settings = settings.templates.first().ok_or_else(|| {
            WebplusError::ImproperlyConfigured("No template engine configured".to_string())
        })?;
        Self::new(settings, template_settings, processors)
    }

    /// Creates a backend around an already loaded locale table.
    pub fn with_locales(
        settings: &Settings,
        template_settings: &TemplateSettings,
        locales: LocaleTable,
        processors: Vec<Box<dyn ContextProcessor>>,
    ) -> Self {
        let options = template_settings.options.clone();
        let dirs = template_search_dirs(settings, template_settings);
        tracing::debug!(dirs = ?dirs, extension = %options.file_extension, "Template search path");

        let mut chain = builtin_context_processors();
        chain.extend(processors);

        Self {
            inner: Arc::new(BackendInner {
                engine: Engine::new(dirs, options.file_extension.clone()),
                locales: Arc::new(locales),
                processors: chain,
                options,
                default_language: settings.language_code.clone(),
            }),
        }
    }

    /// Returns the template search path, in order.
    pub fn search_dirs(&self) -> &[PathBuf] {
        self.inner.engine.dirs()
    }

    /// Returns the backend options.
    pub fn options(&self) -> &MustacheOptions {
        &self.inner.options
    }

    /// Returns the locale table.
    pub fn locales(&self) -> &LocaleTable {
        &self.inner.locales
    }

    /// Returns the language used when a render names none.
    pub fn default_language(&self) -> &str {
        &self.inner.default_language
    }

    /// Returns the context processor chain, builtin ones first.
    pub fn context_processors(&self) -> &[Box<dyn ContextProcessor>] {
        &self.inner.processors
    }

    /// Returns the underlying engine.
    pub fn engine(&self) -> &Engine {
        &self.inner.engine
    }

    /// Loads a template by name. A trailing `.<file_extension>` is optional.
    ///
    /// # Errors
    ///
    /// Returns `TemplateDoesNotExist` if no search directory has the file,
    /// or `TemplateSyntaxError` if it fails to compile.
    pub fn get_template(&self, name: &str) -> WebplusResult<Template> {
        let handle = self.inner.engine.get_template(name)?;
        Ok(self.wrap(handle))
    }

    /// Returns the first of `names` that exists.
    ///
    /// # Errors
    ///
    /// Returns `TemplateDoesNotExist` listing every name tried if none
    /// exists. Other errors are returned as soon as they occur.
    pub fn select_template(&self, names: &[&str]) -> WebplusResult<Template> {
        for name in names {
            match self.get_template(name) {
                Ok(template) => return Ok(template),
                Err(e) if e.is_template_not_found() => {
                    tracing::trace!(template = %name, "Candidate template not found");
                }
                Err(e) => return Err(e),
            }
        }
        Err(WebplusError::TemplateDoesNotExist(names.join(", ")))
    }

    /// Compiles a template from source text.
    ///
    /// # Errors
    ///
    /// Returns `TemplateSyntaxError` for malformed source.
    pub fn from_string(&self, source: &str) -> WebplusResult<Template> {
        let handle = self.inner.engine.from_string(source)?;
        Ok(self.wrap(handle))
    }

    fn wrap(&self, handle: Arc<CompiledTemplate>) -> Template {
        Template {
            handle,
            backend: self.clone(),
        }
    }
}

impl fmt::Debug for MustacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MustacheBackend")
            .field("search_dirs", &self.search_dirs())
            .field("options", &self.inner.options)
            .field("languages", &self.inner.locales.languages())
            .field("processors", &self.inner.processors.len())
            .field("default_language", &self.inner.default_language)
            .finish()
    }
}

/// Computes the template search path: the configured directories (resolved
/// against `base_dir`), then `<app>/mustache` for each installed app when
/// `app_dirs` is set, then each of those joined with `partial_dir`.
pub fn template_search_dirs(settings: &Settings, template_settings: &TemplateSettings) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = template_settings
        .dirs
        .iter()
        .map(|dir| settings.resolve(dir))
        .collect();

    if template_settings.app_dirs {
        dirs.extend(
            settings
                .installed_apps
                .iter()
                .map(|app| settings.resolve(app).join(APP_DIRNAME)),
        );
    }

    let partial_dir = &template_settings.options.partial_dir;
    if !partial_dir.is_empty() {
        let partial_dirs: Vec<PathBuf> = dirs.iter().map(|dir| dir.join(partial_dir)).collect();
        dirs.extend(partial_dirs);
    }

    dirs
}

/// A loaded template bound to the backend that loaded it.
#[derive(Clone)]
pub struct Template {
    handle: Arc<CompiledTemplate>,
    backend: MustacheBackend,
}

impl Template {
    /// Returns the template's base name.
    pub fn name(&self) -> &str {
        &self.handle.name
    }

    /// Returns the encoding the template source was read with.
    pub const fn encoding(&self) -> &'static str {
        FILE_ENCODING
    }

    /// Returns the compiled template.
    pub fn handle(&self) -> &Arc<CompiledTemplate> {
        &self.handle
    }

    /// Renders the template.
    ///
    /// If no `request` is given, one stored in `context` under `request` is
    /// used. With a request, every context processor contributes a mapping;
    /// `context` comes last and wins on conflicts. The language is the
    /// nearest `_lang` value, else the backend default.
    ///
    /// # Errors
    ///
    /// Returns `TemplateSyntaxError` if a lambda produces malformed template
    /// text.
    pub fn render(
        &self,
        context: Option<&HashMap<String, ContextValue>>,
        request: Option<&HttpRequest>,
    ) -> WebplusResult<String> {
        let inner = &self.backend.inner;
        let request = request.or_else(|| {
            context
                .and_then(|ctx| ctx.get(REQUEST_KEY))
                .and_then(ContextValue::as_request)
        });

        let mut mappings = Vec::with_capacity(inner.processors.len() + 2);
        mappings.push(HashMap::new());
        if let Some(request) = request {
            for processor in &inner.processors {
                mappings.push(processor.process(request));
            }
        }
        if let Some(context) = context {
            mappings.push(context.clone());
        }

        let language = mappings
            .iter()
            .rev()
            .find_map(|mapping| mapping.get(LANGUAGE_KEY))
            .map_or_else(|| inner.default_language.clone(), ContextValue::to_display_string);
        tracing::trace!(
            template = %self.handle.name,
            language = %language,
            mappings = mappings.len(),
            "Rendering template"
        );

        let translator = Translator::new(
            Arc::clone(&inner.locales),
            language,
            inner.default_language.clone(),
        );
        mappings[0].insert(I18N_KEY.to_string(), translator.into_lambda());

        inner
            .engine
            .render(&self.handle, &Context::from_mappings(mappings))
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.handle.name)
            .field("encoding", &FILE_ENCODING)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::locale::MessageMap;

    fn locales() -> LocaleTable {
        let mut en = MessageMap::new();
        en.insert("title".into(), "Welcome".into());
        en.insert("greet".into(), "Hello {0}!".into());
        let mut zh = MessageMap::new();
        zh.insert("title".into(), "欢迎".into());
        let mut table = LocaleTable::new();
        table.insert("en", en);
        table.insert("zh", zh);
        table
    }

    fn settings_in(base: &Path) -> Settings {
        Settings {
            base_dir: base.to_path_buf(),
            ..Settings::default()
        }
    }

    fn backend_in(base: &Path) -> MustacheBackend {
        let settings = settings_in(base);
        MustacheBackend::with_locales(
            &settings,
            &TemplateSettings::default(),
            locales(),
            Vec::new(),
        )
    }

    fn ctx(pairs: &[(&str, &str)]) -> HashMap<String, ContextValue> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), ContextValue::from(*v)))
            .collect()
    }

    #[test]
    fn test_search_dirs_include_partial_dirs() {
        let mut settings = settings_in(Path::new("/srv/site"));
        settings.installed_apps = vec![PathBuf::from("blog")];
        let mut template_settings = TemplateSettings::default();

        assert_eq!(
            template_search_dirs(&settings, &template_settings),
            vec![
                PathBuf::from("/srv/site/templates"),
                PathBuf::from("/srv/site/templates/partials"),
            ]
        );

        template_settings.app_dirs = true;
        assert_eq!(
            template_search_dirs(&settings, &template_settings),
            vec![
                PathBuf::from("/srv/site/templates"),
                PathBuf::from("/srv/site/blog/mustache"),
                PathBuf::from("/srv/site/templates/partials"),
                PathBuf::from("/srv/site/blog/mustache/partials"),
            ]
        );

        template_settings.options.partial_dir = String::new();
        template_settings.app_dirs = false;
        assert_eq!(
            template_search_dirs(&settings, &template_settings),
            vec![PathBuf::from("/srv/site/templates")]
        );
    }

    #[test]
    fn test_render_translates_in_requested_language() {
        let backend = backend_in(Path::new("."));
        let template = backend.from_string("{{#i18n}}title{{/i18n}}").unwrap();

        assert_eq!(template.render(None, None).unwrap(), "Welcome");
        assert_eq!(
            template.render(Some(&ctx(&[("_lang", "zh")])), None).unwrap(),
            "欢迎"
        );
        assert_eq!(template.render(None, None).unwrap(), "Welcome");
    }

    #[test]
    fn test_unknown_language_uses_default_table() {
        let backend = backend_in(Path::new("."));
        let template = backend.from_string("{{#i18n}}greet [x]{{/i18n}}").unwrap();
        assert_eq!(
            template.render(Some(&ctx(&[("_lang", "fr")])), None).unwrap(),
            "Hello x!"
        );
    }

    #[test]
    fn test_processors_run_only_with_request() {
        let backend = backend_in(Path::new("."));
        let template = backend.from_string("[{{csrf_token}}]").unwrap();

        assert_eq!(template.render(None, None).unwrap(), "[]");

        let request = HttpRequest::builder().build();
        let rendered = template.render(None, Some(&request)).unwrap();
        assert_eq!(rendered.len(), 66);
    }

    #[test]
    fn test_request_taken_from_context() {
        let backend = backend_in(Path::new("."));
        let template = backend.from_string("{{#csrf_token}}token{{/csrf_token}}").unwrap();

        let mut context = HashMap::new();
        context.insert(
            REQUEST_KEY.to_string(),
            ContextValue::from(HttpRequest::builder().build()),
        );
        assert_eq!(template.render(Some(&context), None).unwrap(), "token");
    }

    #[test]
    fn test_caller_context_wins_over_processors() {
        fn site(_: &HttpRequest) -> HashMap<String, ContextValue> {
            let mut ctx = HashMap::new();
            ctx.insert("site".to_string(), ContextValue::from("processor"));
            ctx.insert("csrf_token".to_string(), ContextValue::from("fixed"));
            ctx
        }

        let backend = MustacheBackend::with_locales(
            &Settings::default(),
            &TemplateSettings::default(),
            LocaleTable::new(),
            vec![Box::new(site)],
        );
        assert_eq!(backend.context_processors().len(), 2);

        let template = backend.from_string("{{site}}/{{csrf_token}}").unwrap();
        let request = HttpRequest::builder().build();
        assert_eq!(
            template.render(None, Some(&request)).unwrap(),
            "processor/fixed"
        );
        assert_eq!(
            template
                .render(Some(&ctx(&[("site", "caller")])), Some(&request))
                .unwrap(),
            "caller/fixed"
        );
    }

    #[test]
    fn test_caller_may_shadow_i18n() {
        let backend = backend_in(Path::new("."));
        let template = backend.from_string("{{i18n}}").unwrap();
        assert_eq!(
            template.render(Some(&ctx(&[("i18n", "plain")])), None).unwrap(),
            "plain"
        );
    }

    #[test]
    fn test_select_template() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("templates")).unwrap();
        std::fs::write(dir.path().join("templates/second.html"), "second").unwrap();
        let backend = backend_in(dir.path());

        let template = backend.select_template(&["first", "second"]).unwrap();
        assert_eq!(template.name(), "second");

        let err = backend.select_template(&["a", "b"]).unwrap_err();
        assert!(err.is_template_not_found());
        assert!(err.to_string().contains("a, b"));
    }

    #[test]
    fn test_from_settings_requires_engine() {
        let settings = Settings {
            templates: Vec::new(),
            ..Settings::default()
        };
        assert!(matches!(
            MustacheBackend::from_settings(&settings, Vec::new()),
            Err(WebplusError::ImproperlyConfigured(_))
        ));
    }

    #[test]
    fn test_new_loads_locales() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("locales")).unwrap();
        std::fs::write(dir.path().join("locales/en.properties"), "k=v\n").unwrap();

        let backend = MustacheBackend::from_settings(&settings_in(dir.path()), Vec::new()).unwrap();
        assert_eq!(backend.locales().lookup("en", "k"), Some("v"));
        assert_eq!(backend.default_language(), "en");
        assert_eq!(backend.options().file_extension, "html");
    }

    #[test]
    fn test_new_fails_without_locale_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(MustacheBackend::from_settings(&settings_in(dir.path()), Vec::new()).is_err());
    }

    #[test]
    fn test_template_metadata() {
        let backend = backend_in(Path::new("."));
        let template = backend.from_string("x").unwrap();
        assert_eq!(template.encoding(), "utf-8");
        assert!(format!("{template:?}").contains("<string>"));
        assert!(format!("{backend:?}").contains("MustacheBackend"));
    }
}

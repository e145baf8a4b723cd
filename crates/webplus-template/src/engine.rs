//! Template engine: loading, caching, and rendering compiled templates.
//!
//! The [`Engine`] resolves a template name to a [`CompiledTemplate`] through
//! its loaders and keeps every compiled template in a cache keyed by base
//! name. Loading a template also loads every partial it references, directly
//! or through other partials, so a later render never reads from disk.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use webplus_core::error::WebplusError;

use crate::context::Context;
use crate::loaders::{FileSystemLoader, StringLoader, TemplateLoader};
use crate::parser::{self, CompiledTemplate, TemplateStore};

/// Name given to templates compiled from a string.
pub const STRING_TEMPLATE_NAME: &str = "<string>";

/// The template engine. Manages loaders, the compiled-template cache, and
/// rendering.
///
/// # Examples
///
/// ```
/// use webplus_template::engine::Engine;
/// use webplus_template::context::{Context, ContextValue};
///
/// let engine = Engine::new(vec![], "html");
/// engine.add_string_template("hello", "Hello {{ name }}!");
///
/// let mut ctx = Context::new();
/// ctx.set("name", ContextValue::from("World"));
///
/// let template = engine.get_template("hello.html").unwrap();
/// assert_eq!(engine.render(&template, &ctx).unwrap(), "Hello World!");
/// ```
pub struct Engine {
    dirs: Vec<PathBuf>,
    file_extension: String,
    loaders: Vec<Box<dyn TemplateLoader>>,
    string_loader: StringLoader,
    cache: RwLock<HashMap<String, Arc<CompiledTemplate>>>,
}

impl Engine {
    /// Creates an engine searching `dirs`, in order, for `<name>.<file_extension>`.
    pub fn new(dirs: Vec<PathBuf>, file_extension: impl Into<String>) -> Self {
        let file_extension = file_extension.into();
        let loaders: Vec<Box<dyn TemplateLoader>> =
            vec![Box::new(FileSystemLoader::new(dirs.clone(), file_extension.clone()))];
        Self {
            dirs,
            file_extension,
            loaders,
            string_loader: StringLoader::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Adds an in-memory template, replacing any cached template of that name.
    pub fn add_string_template(&self, name: &str, source: &str) {
        let base = self.strip_extension(name);
        self.string_loader.add(base, source);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(base);
    }

    /// Returns the search directories, in order.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Returns the template file extension, without the dot.
    pub fn file_extension(&self) -> &str {
        &self.file_extension
    }

    /// Strips a trailing `.<file_extension>` from `name`, if present.
    pub fn strip_extension<'n>(&self, name: &'n str) -> &'n str {
        name.strip_suffix(self.file_extension.as_str())
            .and_then(|rest| rest.strip_suffix('.'))
            .unwrap_or(name)
    }

    /// Returns the number of compiled templates in the cache.
    pub fn cached_count(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Loads a template by name, with or without its extension, together
    /// with every partial it needs.
    ///
    /// # Errors
    ///
    /// Returns `TemplateDoesNotExist` if no loader has the template, or
    /// `TemplateSyntaxError` if it (or one of its partials) fails to compile.
    /// Partials that do not exist are not an error; they render empty.
    pub fn get_template(&self, name: &str) -> Result<Arc<CompiledTemplate>, WebplusError> {
        let base = self.strip_extension(name);
        let template = self.load_compiled(base)?;
        self.preload_partials(&template)?;
        Ok(template)
    }

    /// Compiles a template from source text and loads its partials.
    ///
    /// # Errors
    ///
    /// Returns `TemplateSyntaxError` for malformed source.
    pub fn from_string(&self, source: &str) -> Result<Arc<CompiledTemplate>, WebplusError> {
        let template = Arc::new(parser::compile(STRING_TEMPLATE_NAME, source)?);
        self.preload_partials(&template)?;
        Ok(template)
    }

    /// Renders a compiled template. Partials come from the cache only.
    ///
    /// # Errors
    ///
    /// See [`parser::render`].
    pub fn render(
        &self,
        template: &CompiledTemplate,
        context: &Context,
    ) -> Result<String, WebplusError> {
        parser::render(template, context, self)
    }

    fn cached(&self, base: &str) -> Option<Arc<CompiledTemplate>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(base)
            .cloned()
    }

    fn load_compiled(&self, base: &str) -> Result<Arc<CompiledTemplate>, WebplusError> {
        if let Some(template) = self.cached(base) {
            return Ok(template);
        }

        let source = self.load_source(base)?;
        let template = Arc::new(parser::compile(base, &source)?);
        tracing::debug!(template = %base, "Compiled template");

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let template = Arc::clone(cache.entry(base.to_string()).or_insert(template));
        Ok(template)
    }

    fn load_source(&self, base: &str) -> Result<String, WebplusError> {
        match self.string_loader.load(base) {
            Ok(source) => return Ok(source),
            Err(e) if e.is_template_not_found() => {}
            Err(e) => return Err(e),
        }

        for loader in &self.loaders {
            match loader.load(base) {
                Ok(source) => return Ok(source),
                Err(e) if e.is_template_not_found() => {}
                Err(e) => return Err(e),
            }
        }

        Err(WebplusError::TemplateDoesNotExist(base.to_string()))
    }

    fn preload_partials(&self, template: &CompiledTemplate) -> Result<(), WebplusError> {
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(template.name.clone());
        let mut pending = template.partial_names();

        while let Some(name) = pending.pop() {
            let base = self.strip_extension(&name).to_string();
            if !seen.insert(base.clone()) {
                continue;
            }
            match self.load_compiled(&base) {
                Ok(partial) => pending.extend(partial.partial_names()),
                Err(e) if e.is_template_not_found() => {
                    tracing::debug!(template = %template.name, partial = %base, "Partial not found");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl TemplateStore for Engine {
    fn partial(&self, name: &str) -> Option<Arc<CompiledTemplate>> {
        self.cached(self.strip_extension(name))
    }
}

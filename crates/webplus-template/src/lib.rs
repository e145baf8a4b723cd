//! # webplus-template
//!
//! A Mustache template backend shaped like a Django template engine.
//!
//! - [`backend::MustacheBackend`] locates templates in a list of search
//!   directories (plus a partials subdirectory of each), caches them, and
//!   hands out [`backend::Template`] wrappers.
//! - [`backend::Template::render`] chains the configured
//!   [`context_processors`] with the caller's context, picks the active
//!   language from the `_lang` key, and renders.
//! - [`locale`] loads `<code>.properties` files into a [`locale::LocaleTable`];
//!   [`i18n`] exposes it to templates as the `i18n` section lambda:
//!   `{{#i18n}}greeting [World]{{/i18n}}`.

pub mod backend;
pub mod context;
pub mod context_processors;
pub mod engine;
pub mod i18n;
pub mod lexer;
pub mod loaders;
pub mod locale;
pub mod parser;

pub use backend::{MustacheBackend, Template};
pub use context::{Context, ContextValue};
pub use context_processors::ContextProcessor;
pub use locale::{LocaleTable, MessageMap};

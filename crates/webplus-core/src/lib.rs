//! # webplus-core
//!
//! Core types shared by every webplus-rs crate. This crate has no framework
//! dependencies of its own.
//!
//! ## Modules
//!
//! - [`error`] - Error type and result alias
//! - [`settings`] - Application and template-engine settings
//! - [`settings_loader`] - Loading settings from TOML/JSON files and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{WebplusError, WebplusResult};
pub use settings::{MustacheOptions, Settings, TemplateSettings};

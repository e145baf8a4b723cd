//! # webplus-demo
//!
//! A one-page demo site. The index view reads a JSON site configuration and
//! the `WP_*` application environment, then renders the `index` Mustache
//! template in English or Chinese depending on `Accept-Language`.
//!
//! - [`config`] - Site configuration and `%(NAME)s` interpolation
//! - [`env`] - Application environment snapshots
//! - [`views`] - The index view
//! - [`server`] - Axum router and server loop

pub mod config;
pub mod env;
pub mod server;
pub mod views;

pub use server::{router, run, AppState};

//! # webplus-http
//!
//! HTTP layer for webplus-rs: a request type carrying headers and server
//! metadata, and a response type that converts into an Axum response.

pub mod request;
pub mod response;

pub use request::{HttpRequest, HttpRequestBuilder};
pub use response::HttpResponse;

//! Context processors.
//!
//! Context processors add variables to the template context automatically
//! based on the current request. The backend runs the builtin chain from
//! [`builtin_context_processors`] first, then the processors it was
//! constructed with, in order.

use std::collections::HashMap;

use webplus_http::HttpRequest;

use crate::context::ContextValue;

/// A context processor that adds variables to every template context.
///
/// Implemented for any `Fn(&HttpRequest) -> HashMap<String, ContextValue>`,
/// so a plain function can be registered directly.
pub trait ContextProcessor: Send + Sync {
    /// Processes the request and returns context variables.
    fn process(&self, request: &HttpRequest) -> HashMap<String, ContextValue>;
}

impl<F> ContextProcessor for F
where
    F: Fn(&HttpRequest) -> HashMap<String, ContextValue> + Send + Sync,
{
    fn process(&self, request: &HttpRequest) -> HashMap<String, ContextValue> {
        self(request)
    }
}

/// Adds `csrf_token` to the context.
pub struct CsrfContextProcessor;

impl ContextProcessor for CsrfContextProcessor {
    fn process(&self, _request: &HttpRequest) -> HashMap<String, ContextValue> {
        use rand::Rng;
        let token: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(64)
            .map(char::from)
            .collect();

        let mut ctx = HashMap::new();
        ctx.insert("csrf_token".to_string(), ContextValue::String(token));
        ctx
    }
}

/// Returns the processors every backend runs before its configured ones.
pub fn builtin_context_processors() -> Vec<Box<dyn ContextProcessor>> {
    vec![Box::new(CsrfContextProcessor)]
}

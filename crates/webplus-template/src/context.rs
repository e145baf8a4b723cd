//! Template context for variable resolution and rendering.
//!
//! Provides [`ContextValue`] for dynamic template values, [`Context`] for the
//! ordered list of mappings a render call sees, and the crate-internal
//! [`Stack`] the renderer walks while descending into sections.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use webplus_http::HttpRequest;

/// A function bound to a section: `{{#name}}raw text{{/name}}`.
///
/// It receives the unrendered section text and returns a template string,
/// which is then rendered against the current context.
pub type SectionLambda = dyn Fn(&str) -> String + Send + Sync;

/// Represents a dynamic value in a template context.
#[derive(Clone)]
pub enum ContextValue {
    /// A string value, HTML-escaped by `{{name}}`.
    String(String),
    /// A 64-bit integer.
    Integer(i64),
    /// A 64-bit floating point number.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// An ordered list of values.
    List(Vec<ContextValue>),
    /// A key-value mapping.
    Dict(HashMap<String, ContextValue>),
    /// The absence of a value.
    None,
    /// A string marked as safe; `{{name}}` does not escape it.
    SafeString(String),
    /// A section lambda.
    Lambda(Arc<SectionLambda>),
    /// The current request, stored under the reserved `request` key.
    Request(Arc<HttpRequest>),
}

impl ContextValue {
    /// Wraps a closure as a [`ContextValue::Lambda`].
    pub fn lambda<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self::Lambda(Arc::new(f))
    }

    /// Returns `true` if this value is considered "truthy" when deciding
    /// whether a section renders.
    ///
    /// - `None` is falsy
    /// - Empty strings, empty lists, empty dicts are falsy
    /// - `Bool(false)` is falsy
    /// - `Integer(0)` and `Float(0.0)` are falsy
    /// - Everything else is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) | Self::SafeString(s) => !s.is_empty(),
            Self::List(l) => !l.is_empty(),
            Self::Dict(d) => !d.is_empty(),
            Self::Lambda(_) | Self::Request(_) => true,
        }
    }

    /// Converts this value to a display string (without HTML escaping).
    ///
    /// `None` becomes the empty string; booleans render as `True`/`False`.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::String(s) | Self::SafeString(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => {
                if f.fract() == 0.0 {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
            Self::Bool(b) => {
                if *b {
                    "True".to_string()
                } else {
                    "False".to_string()
                }
            }
            Self::List(items) => {
                let inner: Vec<String> = items.iter().map(Self::to_repr).collect();
                format!("[{}]", inner.join(", "))
            }
            Self::Dict(map) => {
                let inner: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("'{}': {}", k, v.to_repr()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            Self::None | Self::Lambda(_) => String::new(),
            Self::Request(request) => request.path().to_string(),
        }
    }

    /// Returns a quoted representation used inside list and dict output.
    fn to_repr(&self) -> String {
        match self {
            Self::String(s) | Self::SafeString(s) => format!("'{s}'"),
            Self::None => "None".to_string(),
            other => other.to_display_string(),
        }
    }

    /// Returns `true` if this value is a safe string (escaping bypassed).
    pub const fn is_safe(&self) -> bool {
        matches!(self, Self::SafeString(_))
    }

    /// Marks a string value as safe, bypassing HTML escaping.
    #[must_use]
    pub fn mark_safe(self) -> Self {
        match self {
            Self::String(s) => Self::SafeString(s),
            other => other,
        }
    }

    /// Resolves one segment of a dotted name on this value
    /// (`user.name`, `items.0`).
    pub fn resolve_path(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Dict(map) => map.get(key),
            Self::List(list) => key.parse::<usize>().ok().and_then(|idx| list.get(idx)),
            _ => None,
        }
    }

    /// Returns the string contents if this is a String or SafeString.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::SafeString(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the request if this is a [`ContextValue::Request`].
    pub fn as_request(&self) -> Option<&HttpRequest> {
        match self {
            Self::Request(request) => Some(request),
            _ => None,
        }
    }
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.debug_tuple("String").field(s).finish(),
            Self::Integer(i) => f.debug_tuple("Integer").field(i).finish(),
            Self::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::List(l) => f.debug_tuple("List").field(l).finish(),
            Self::Dict(d) => f.debug_tuple("Dict").field(d).finish(),
            Self::None => f.write_str("None"),
            Self::SafeString(s) => f.debug_tuple("SafeString").field(s).finish(),
            Self::Lambda(_) => f.write_str("Lambda(..)"),
            Self::Request(r) => f.debug_tuple("Request").field(&r.path()).finish(),
        }
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl PartialEq for ContextValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a) | Self::SafeString(a), Self::String(b) | Self::SafeString(b)) => {
                a == b
            }
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::None, Self::None) => true,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Dict(a), Self::Dict(b)) => a == b,
            (Self::Lambda(a), Self::Lambda(b)) => Arc::ptr_eq(a, b),
            (Self::Request(a), Self::Request(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// -- From implementations --

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i32> for ContextValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<i64> for ContextValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for ContextValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<HttpRequest> for ContextValue {
    fn from(request: HttpRequest) -> Self {
        Self::Request(Arc::new(request))
    }
}

impl<T: Into<Self>> From<Vec<T>> for ContextValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self>> From<HashMap<String, T>> for ContextValue {
    fn from(m: HashMap<String, T>) -> Self {
        Self::Dict(m.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Self>> From<Option<T>> for ContextValue {
    fn from(o: Option<T>) -> Self {
        o.map_or(Self::None, Into::into)
    }
}

impl From<serde_json::Value> for ContextValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::None,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f)
                } else {
                    Self::None
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(arr) => Self::List(arr.into_iter().map(Self::from).collect()),
            serde_json::Value::Object(map) => {
                Self::Dict(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

/// The ordered list of mappings a single render call sees.
///
/// Mappings are searched from the most recently pushed downward, so a later
/// mapping shadows an earlier one that defines the same name.
///
/// # Examples
///
/// ```
/// use webplus_template::context::{Context, ContextValue};
///
/// let mut ctx = Context::new();
/// ctx.set("a", ContextValue::from(1));
///
/// ctx.push();
/// ctx.set("a", ContextValue::from(2));
/// assert_eq!(ctx.get("a").unwrap().to_display_string(), "2");
///
/// ctx.pop();
/// assert_eq!(ctx.get("a").unwrap().to_display_string(), "1");
/// ```
#[derive(Debug, Clone)]
pub struct Context {
    stack: Vec<HashMap<String, ContextValue>>,
}

impl Context {
    /// Creates a new context with a single empty mapping.
    pub fn new() -> Self {
        Self {
            stack: vec![HashMap::new()],
        }
    }

    /// Creates a context from mappings in precedence order (last wins).
    pub fn from_mappings(mappings: Vec<HashMap<String, ContextValue>>) -> Self {
        if mappings.is_empty() {
            Self::new()
        } else {
            Self { stack: mappings }
        }
    }

    /// Pushes a new empty mapping onto the stack.
    pub fn push(&mut self) {
        self.stack.push(HashMap::new());
    }

    /// Pops the top mapping from the stack.
    ///
    /// If only one mapping remains, this is a no-op.
    pub fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    /// Sets a variable in the top mapping.
    pub fn set(&mut self, key: impl Into<String>, value: ContextValue) {
        if let Some(top) = self.stack.last_mut() {
            top.insert(key.into(), value);
        }
    }

    /// Looks up a variable by name, searching from the top mapping downward.
    ///
    /// Dotted names resolve their first segment this way and the remaining
    /// segments inside the value found; a failed descent is not retried in
    /// lower mappings.
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        let mut parts = key.split('.');
        let root_key = parts.next()?;

        let mut current = self.stack.iter().rev().find_map(|scope| scope.get(root_key))?;
        for part in parts {
            current = current.resolve_path(part)?;
        }
        Some(current)
    }

    /// Returns the number of mappings.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns `true` if no mapping holds any variable.
    pub fn is_empty(&self) -> bool {
        self.stack.iter().all(HashMap::is_empty)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// One entry of the render stack: a whole context mapping, or a value
/// pushed by a section.
#[derive(Clone, Copy)]
enum Frame<'a> {
    Mapping(&'a HashMap<String, ContextValue>),
    Value(&'a ContextValue),
}

/// The stack the renderer walks. Borrowed from a [`Context`] for the
/// duration of one render.
pub(crate) struct Stack<'a> {
    frames: Vec<Frame<'a>>,
}

impl<'a> Stack<'a> {
    pub(crate) fn new(context: &'a Context) -> Self {
        Self {
            frames: context.stack.iter().map(Frame::Mapping).collect(),
        }
    }

    pub(crate) fn push(&mut self, value: &'a ContextValue) {
        self.frames.push(Frame::Value(value));
    }

    pub(crate) fn pop(&mut self) {
        self.frames.pop();
    }

    /// Resolves `name` with Mustache rules: `.` is the top value, dotted
    /// names find their first segment in the nearest frame that has it.
    pub(crate) fn lookup(&self, name: &str) -> Option<&'a ContextValue> {
        if name == "." {
            return match self.frames.last()? {
                Frame::Value(value) => Some(*value),
                Frame::Mapping(_) => None,
            };
        }

        let mut parts = name.split('.');
        let root_key = parts.next()?;

        let mut current = self.frames.iter().rev().copied().find_map(|frame| match frame {
            Frame::Mapping(map) => map.get(root_key),
            Frame::Value(value) => value.resolve_path(root_key),
        })?;
        for part in parts {
            current = current.resolve_path(part)?;
        }
        Some(current)
    }
}

/// Escapes HTML special characters in a string.
///
/// Replaces `&`, `<`, `>`, `"`, and `'` with their HTML entity equivalents.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

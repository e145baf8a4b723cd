//! HTTP request type.
//!
//! [`HttpRequest`] mirrors Django's `HttpRequest`: the method, path, headers,
//! and a `META` dictionary in which every header appears as `HTTP_<NAME>`.

use std::collections::HashMap;

use http::{HeaderMap, Method};

/// An HTTP request, modeled after Django's `HttpRequest`.
///
/// Instances are created from an incoming Axum request via
/// [`HttpRequest::from_axum`], or with [`HttpRequest::builder`] in tests.
///
/// # Examples
///
/// ```
/// use webplus_http::HttpRequest;
///
/// let request = HttpRequest::builder()
///     .path("/")
///     .header("accept-language", "zh-CN,zh;q=0.9")
///     .build();
///
/// assert_eq!(request.path(), "/");
/// assert_eq!(request.meta_value("HTTP_ACCEPT_LANGUAGE"), Some("zh-CN,zh;q=0.9"));
/// ```
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    path: String,
    query_string: String,
    headers: HeaderMap,
    meta: HashMap<String, String>,
    scheme: String,
}

impl HttpRequest {
    /// Creates a new [`HttpRequestBuilder`] for constructing an `HttpRequest`.
    pub fn builder() -> HttpRequestBuilder {
        HttpRequestBuilder::default()
    }

    /// Creates an `HttpRequest` from the parts of an Axum/hyper request.
    pub fn from_axum(parts: http::request::Parts) -> Self {
        let method = parts.method;
        let uri = parts.uri;
        let headers = parts.headers;

        let path = uri.path().to_string();
        let query_string = uri.query().unwrap_or("").to_string();

        let mut meta = header_meta(&headers);

        if let Some(host) = headers.get(http::header::HOST).and_then(|v| v.to_str().ok()) {
            meta.insert("SERVER_NAME".to_string(), host.to_string());
        }
        meta.insert("REQUEST_METHOD".to_string(), method.to_string());
        meta.insert("PATH_INFO".to_string(), path.clone());
        meta.insert("QUERY_STRING".to_string(), query_string.clone());

        let scheme = if headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "https")
        {
            "https".to_string()
        } else {
            "http".to_string()
        };

        Self {
            method,
            path,
            query_string,
            headers,
            meta,
            scheme,
        }
    }

    /// Returns the HTTP method.
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path (without query string).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the raw query string (without the leading `?`).
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// Returns the request headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the META dictionary containing server-level metadata.
    ///
    /// Keys include `REQUEST_METHOD`, `PATH_INFO`, and `HTTP_*` headers.
    pub const fn meta(&self) -> &HashMap<String, String> {
        &self.meta
    }

    /// Returns a single META value.
    pub fn meta_value(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(String::as_str)
    }

    /// Returns the `Accept-Language` header as recorded in META.
    pub fn accept_language(&self) -> Option<&str> {
        self.meta_value("HTTP_ACCEPT_LANGUAGE")
    }

    /// Returns `true` if the request uses HTTPS.
    pub fn is_secure(&self) -> bool {
        self.scheme == "https"
    }

    /// Returns the URL scheme (`"http"` or `"https"`).
    pub fn scheme(&self) -> &str {
        &self.scheme
    }
}

/// Builds the `HTTP_*` META entries for a header map.
fn header_meta(headers: &HeaderMap) -> HashMap<String, String> {
    let mut meta = HashMap::new();
    for (name, value) in headers {
        let meta_key = format!("HTTP_{}", name.as_str().to_uppercase().replace('-', "_"));
        if let Ok(v) = value.to_str() {
            meta.insert(meta_key, v.to_string());
        }
    }
    meta
}

/// Builder for constructing [`HttpRequest`] instances in tests.
#[derive(Debug)]
pub struct HttpRequestBuilder {
    method: Method,
    path: String,
    query_string: String,
    headers: HeaderMap,
    meta: HashMap<String, String>,
    scheme: String,
}

impl Default for HttpRequestBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            query_string: String::new(),
            headers: HeaderMap::new(),
            meta: HashMap::new(),
            scheme: "http".to_string(),
        }
    }
}

impl HttpRequestBuilder {
    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the request path.
    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Sets the query string (without leading `?`).
    #[must_use]
    pub fn query_string(mut self, qs: &str) -> Self {
        self.query_string = qs.to_string();
        self
    }

    /// Adds a header. It also appears in META as `HTTP_<NAME>`.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::header::HeaderName::from_bytes(name.as_bytes()),
            http::header::HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Adds a META entry.
    #[must_use]
    pub fn meta(mut self, key: &str, value: &str) -> Self {
        self.meta.insert(key.to_string(), value.to_string());
        self
    }

    /// Sets the scheme (http or https).
    #[must_use]
    pub fn scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    /// Builds the [`HttpRequest`].
    pub fn build(self) -> HttpRequest {
        let mut meta = header_meta(&self.headers);
        meta.extend(self.meta);
        meta.entry("REQUEST_METHOD".to_string())
            .or_insert_with(|| self.method.to_string());
        meta.entry("PATH_INFO".to_string())
            .or_insert_with(|| self.path.clone());
        meta.entry("QUERY_STRING".to_string())
            .or_insert_with(|| self.query_string.clone());

        HttpRequest {
            method: self.method,
            path: self.path,
            query_string: self.query_string,
            headers: self.headers,
            meta,
            scheme: self.scheme,
        }
    }
}

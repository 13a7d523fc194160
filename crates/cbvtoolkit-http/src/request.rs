//! HTTP request type.
//!
//! [`HttpRequest`] gives views access to the request method, path, headers,
//! query parameters and URL-encoded POST data.

use http::{HeaderMap, Method};

use crate::querydict::QueryDict;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// An HTTP request as seen by a view.
///
/// Instances are created from an incoming Axum request via
/// [`HttpRequest::from_axum`], or with [`HttpRequest::builder`] in tests.
///
/// # Examples
///
/// ```
/// use cbvtoolkit_http::HttpRequest;
///
/// let request = HttpRequest::builder()
///     .method(http::Method::GET)
///     .path("/reports/")
///     .query_string("page=1")
///     .build();
///
/// assert_eq!(request.method(), &http::Method::GET);
/// assert_eq!(request.path(), "/reports/");
/// assert_eq!(request.get().get("page"), Some("1"));
/// ```
#[derive(Debug)]
pub struct HttpRequest {
    method: Method,
    path: String,
    query_string: String,
    content_type: Option<String>,
    get: QueryDict,
    post: QueryDict,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl HttpRequest {
    /// Creates a new [`HttpRequestBuilder`].
    pub fn builder() -> HttpRequestBuilder {
        HttpRequestBuilder::default()
    }

    /// Creates an `HttpRequest` from the parts of an Axum request and its body.
    pub fn from_axum(parts: http::request::Parts, body: Vec<u8>) -> Self {
        let query_string = parts.uri.query().unwrap_or("").to_string();
        let content_type = parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Self::assemble(
            parts.method,
            parts.uri.path().to_string(),
            query_string,
            content_type,
            parts.headers,
            body,
        )
    }

    fn assemble(
        method: Method,
        path: String,
        query_string: String,
        content_type: Option<String>,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Self {
        let get = QueryDict::parse(&query_string);
        let post = if content_type.as_deref().is_some_and(is_form_urlencoded) {
            QueryDict::parse(&String::from_utf8_lossy(&body))
        } else {
            QueryDict::new()
        };

        Self {
            method,
            path,
            query_string,
            content_type,
            get,
            post,
            headers,
            body,
        }
    }

    /// Returns the HTTP method.
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the raw query string (without `?`).
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// Returns the content type, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns the query string parameters.
    pub const fn get(&self) -> &QueryDict {
        &self.get
    }

    /// Returns the URL-encoded POST parameters. Empty for other body types.
    pub const fn post(&self) -> &QueryDict {
        &self.post
    }

    /// Returns the request headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the raw body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the path followed by the query string, if any.
    pub fn get_full_path(&self) -> String {
        if self.query_string.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query_string)
        }
    }
}

/// Media types compare case-insensitively and parameters are ignored.
fn is_form_urlencoded(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|media_type| media_type.trim().eq_ignore_ascii_case(FORM_URLENCODED))
}

/// Builder for constructing [`HttpRequest`] instances in tests.
#[derive(Debug)]
pub struct HttpRequestBuilder {
    method: Method,
    path: String,
    query_string: String,
    content_type: Option<String>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Default for HttpRequestBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            query_string: String::new(),
            content_type: None,
            headers: HeaderMap::new(),
            body: Vec::new(),
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

    /// Sets the content type.
    #[must_use]
    pub fn content_type(mut self, ct: &str) -> Self {
        self.content_type = Some(ct.to_string());
        self
    }

    /// Adds a header. Invalid names or values are ignored.
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

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Shorthand for a URL-encoded POST body built from key/value pairs.
    #[must_use]
    pub fn form<'a>(self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.method(Method::POST)
            .content_type(FORM_URLENCODED)
            .body(body.into_bytes())
    }

    /// Builds the [`HttpRequest`].
    pub fn build(self) -> HttpRequest {
        HttpRequest::assemble(
            self.method,
            self.path,
            self.query_string,
            self.content_type,
            self.headers,
            self.body,
        )
    }
}

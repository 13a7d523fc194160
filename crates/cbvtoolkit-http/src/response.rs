//! HTTP response types.
//!
//! [`HttpResponse`] is what every view returns. Responses produced by
//! rendering a template keep the template name and context they were
//! rendered with, so callers and tests can inspect what a view exposed.

use std::collections::HashMap;

use axum::response::IntoResponse;
use http::{HeaderMap, HeaderValue, StatusCode};

use cbvtoolkit_core::ToolkitError;

/// Template context: variable name to JSON value.
pub type TemplateContext = HashMap<String, serde_json::Value>;

/// The body content of an HTTP response.
pub enum ResponseContent {
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// UTF-8 text.
    Text(String),
}

impl std::fmt::Debug for ResponseContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Self::Text(t) => f
                .debug_tuple("Text")
                .field(&t.chars().take(100).collect::<String>())
                .finish(),
        }
    }
}

/// An HTTP response.
///
/// # Examples
///
/// ```
/// use cbvtoolkit_http::HttpResponse;
///
/// let response = HttpResponse::ok("Hello, World!");
/// assert_eq!(response.status(), http::StatusCode::OK);
/// ```
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    content: ResponseContent,
    charset: Option<String>,
    content_type: String,
    template_name: Option<String>,
    context_data: Option<TemplateContext>,
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("template_name", &self.template_name)
            .field("content", &self.content)
            .finish_non_exhaustive()
    }
}

impl HttpResponse {
    /// Creates a new `HttpResponse` with the given status code and text body.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            content: ResponseContent::Text(body.into()),
            charset: Some("utf-8".to_string()),
            content_type: "text/html".to_string(),
            template_name: None,
            context_data: None,
        }
    }

    /// Creates a new `HttpResponse` with the given status code and byte body.
    pub fn with_bytes(status: StatusCode, body: Vec<u8>) -> Self {
        Self {
            content: ResponseContent::Bytes(body),
            content_type: "application/octet-stream".to_string(),
            ..Self::new(status, "")
        }
    }

    /// Creates a 200 OK response produced by rendering `template_name`.
    pub fn rendered(
        body: impl Into<String>,
        template_name: impl Into<String>,
        context: TemplateContext,
    ) -> Self {
        let mut response = Self::ok(body);
        response.template_name = Some(template_name.into());
        response.context_data = Some(context);
        response
    }

    /// Creates a 200 OK response with the given body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Creates a 403 Forbidden response.
    pub fn forbidden(body: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, body)
    }

    /// Creates a 405 Method Not Allowed response with the list of permitted methods.
    pub fn not_allowed(permitted_methods: &[&str]) -> Self {
        let allow = permitted_methods.join(", ");
        let mut response = Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            format!("Method Not Allowed. Permitted: {allow}"),
        );
        if let Ok(value) = HeaderValue::from_str(&allow) {
            response.headers.insert(http::header::ALLOW, value);
        }
        response
    }

    /// Builds the response for an error that reached the dispatch boundary.
    ///
    /// Debug mode includes the error message in the body.
    pub fn from_error(error: &ToolkitError, debug: bool) -> Self {
        let status = StatusCode::from_u16(error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = if debug {
            error.to_string()
        } else {
            status
                .canonical_reason()
                .unwrap_or("Server Error")
                .to_string()
        };
        Self::new(status, body)
    }

    /// Returns the status code.
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns a reference to the headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a mutable reference to the headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the charset, if one is declared.
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// Sets the charset. `None` sends the content type without a
    /// `charset` parameter.
    pub fn set_charset(&mut self, charset: Option<&str>) {
        self.charset = charset.map(String::from);
    }

    /// Returns the content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Sets the content type.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = content_type.into();
    }

    /// Returns the response body.
    pub const fn content(&self) -> &ResponseContent {
        &self.content
    }

    /// Returns the body length in bytes.
    pub fn content_len(&self) -> usize {
        match &self.content {
            ResponseContent::Bytes(b) => b.len(),
            ResponseContent::Text(t) => t.len(),
        }
    }

    /// Returns the body as bytes.
    pub fn content_bytes(&self) -> Vec<u8> {
        match &self.content {
            ResponseContent::Bytes(b) => b.clone(),
            ResponseContent::Text(t) => t.as_bytes().to_vec(),
        }
    }

    /// Returns the template this response was rendered from, if any.
    pub fn template_name(&self) -> Option<&str> {
        self.template_name.as_deref()
    }

    /// Returns the context this response was rendered with, if any.
    pub const fn context_data(&self) -> Option<&TemplateContext> {
        self.context_data.as_ref()
    }

    /// Empties the body, keeping status and headers. Used for HEAD.
    pub fn clear_content(&mut self) {
        self.content = ResponseContent::Bytes(Vec::new());
    }

    /// Returns the full content type header value including charset.
    fn full_content_type(&self) -> String {
        match &self.charset {
            Some(charset)
                if self.content_type.starts_with("text/") || self.content_type.contains("json") =>
            {
                format!("{}; charset={charset}", self.content_type)
            }
            _ => self.content_type.clone(),
        }
    }
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> axum::response::Response {
        let content_type = self.full_content_type();
        let body = match self.content {
            ResponseContent::Text(text) => axum::body::Body::from(text),
            ResponseContent::Bytes(bytes) => axum::body::Body::from(bytes),
        };

        let mut response = axum::response::Response::new(body);
        *response.status_mut() = self.status;
        if let Ok(ct) = HeaderValue::from_str(&content_type) {
            response.headers_mut().insert(http::header::CONTENT_TYPE, ct);
        }
        for (key, value) in &self.headers {
            response.headers_mut().insert(key, value.clone());
        }
        response
    }
}

/// An HTTP redirect response (302 Found).
pub struct HttpResponseRedirect;

impl HttpResponseRedirect {
    /// Creates a 302 Found redirect to the given URL.
    ///
    /// Fails with `ImproperlyConfigured` if `url` cannot be sent as a
    /// `Location` header.
    pub fn new(url: &str) -> Result<HttpResponse, ToolkitError> {
        let value = HeaderValue::from_str(url).map_err(|_| {
            ToolkitError::ImproperlyConfigured(format!(
                "Redirect URL {url:?} is not a valid Location header"
            ))
        })?;
        let mut response = HttpResponse::new(StatusCode::FOUND, "");
        response.headers.insert(http::header::LOCATION, value);
        Ok(response)
    }
}

/// A 403 Forbidden response.
pub struct HttpResponseForbidden;

impl HttpResponseForbidden {
    /// Creates a 403 Forbidden response with the given body.
    pub fn new(body: impl Into<String>) -> HttpResponse {
        HttpResponse::forbidden(body)
    }
}

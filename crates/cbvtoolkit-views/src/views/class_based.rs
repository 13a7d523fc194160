//! Class-based views.
//!
//! The [`View`] trait dispatches a request to a per-method handler. Handlers
//! return [`ToolkitResult`]: an `Err` is a fault in the view or its
//! collaborators and travels up to the dispatch boundary, [`respond`], where
//! it is logged and turned into an error response. Expected outcomes such
//! as a rejected form submission are ordinary `Ok` responses.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use http::Method;

use cbvtoolkit_core::ToolkitResult;
use cbvtoolkit_http::{HttpRequest, HttpResponse};

/// The future returned by a [`ViewFunction`].
pub type ViewFuture = Pin<Box<dyn Future<Output = HttpResponse> + Send>>;

/// A view as a plain request handler.
pub type ViewFunction = Arc<dyn Fn(HttpRequest) -> ViewFuture + Send + Sync>;

/// The base trait for class-based views.
///
/// Override the handlers for the methods a view supports and list them in
/// [`allowed_methods`](View::allowed_methods). Every other method receives
/// 405 Method Not Allowed.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use cbvtoolkit_core::ToolkitResult;
/// use cbvtoolkit_http::{HttpRequest, HttpResponse};
/// use cbvtoolkit_views::views::View;
///
/// struct Ping;
///
/// #[async_trait]
/// impl View for Ping {
///     async fn get(&self, _request: HttpRequest) -> ToolkitResult<HttpResponse> {
///         Ok(HttpResponse::ok("pong"))
///     }
/// }
/// ```
#[async_trait]
pub trait View: Send + Sync {
    /// Returns the list of HTTP methods this view allows.
    fn allowed_methods(&self) -> Vec<Method> {
        vec![Method::GET, Method::HEAD, Method::OPTIONS]
    }

    /// Dispatches the request to the handler for its method.
    async fn dispatch(&self, request: HttpRequest) -> ToolkitResult<HttpResponse> {
        if !self.allowed_methods().contains(request.method()) {
            return Ok(self.http_method_not_allowed(&request));
        }

        match *request.method() {
            Method::GET => self.get(request).await,
            Method::POST => self.post(request).await,
            Method::PUT => self.put(request).await,
            Method::PATCH => self.patch(request).await,
            Method::DELETE => self.delete(request).await,
            Method::HEAD => self.head(request).await,
            Method::OPTIONS => Ok(self.options(&request)),
            _ => Ok(self.http_method_not_allowed(&request)),
        }
    }

    /// Handles GET requests.
    async fn get(&self, request: HttpRequest) -> ToolkitResult<HttpResponse> {
        Ok(self.http_method_not_allowed(&request))
    }

    /// Handles POST requests.
    async fn post(&self, request: HttpRequest) -> ToolkitResult<HttpResponse> {
        Ok(self.http_method_not_allowed(&request))
    }

    /// Handles PUT requests.
    async fn put(&self, request: HttpRequest) -> ToolkitResult<HttpResponse> {
        Ok(self.http_method_not_allowed(&request))
    }

    /// Handles PATCH requests.
    async fn patch(&self, request: HttpRequest) -> ToolkitResult<HttpResponse> {
        Ok(self.http_method_not_allowed(&request))
    }

    /// Handles DELETE requests.
    async fn delete(&self, request: HttpRequest) -> ToolkitResult<HttpResponse> {
        Ok(self.http_method_not_allowed(&request))
    }

    /// Handles HEAD requests: the GET response without its body.
    async fn head(&self, request: HttpRequest) -> ToolkitResult<HttpResponse> {
        let mut response = self.get(request).await?;
        response.clear_content();
        Ok(response)
    }

    /// Handles OPTIONS requests with the list of allowed methods.
    fn options(&self, _request: &HttpRequest) -> HttpResponse {
        let allow = method_list(&self.allowed_methods());
        let mut response = HttpResponse::ok("");
        if let Ok(value) = http::header::HeaderValue::from_str(&allow) {
            response.headers_mut().insert(http::header::ALLOW, value);
        }
        response
    }

    /// Returns a 405 response listing the allowed methods.
    fn http_method_not_allowed(&self, request: &HttpRequest) -> HttpResponse {
        tracing::debug!(method = %request.method(), path = request.path(), "method not allowed");
        let methods = self.allowed_methods();
        let names: Vec<&str> = methods.iter().map(Method::as_str).collect();
        HttpResponse::not_allowed(&names)
    }

    /// Converts this view into a plain request handler.
    ///
    /// Errors are turned into responses by [`respond`] without exposing
    /// their messages.
    #[allow(clippy::wrong_self_convention)]
    fn as_view(self) -> ViewFunction
    where
        Self: Sized + 'static,
    {
        let view = Arc::new(self);
        Arc::new(move |request: HttpRequest| -> ViewFuture {
            let view = view.clone();
            Box::pin(async move { respond(view.as_ref(), request, false).await })
        })
    }
}

/// Dispatches `request` to `view` and converts a propagated error into a
/// response. The error is logged; `debug` controls whether its message is
/// included in the body.
pub async fn respond<V>(view: &V, request: HttpRequest, debug: bool) -> HttpResponse
where
    V: View + ?Sized,
{
    let method = request.method().clone();
    let path = request.path().to_string();
    match view.dispatch(request).await {
        Ok(response) => response,
        Err(error) => {
            tracing::error!(
                %method,
                path = %path,
                status = error.status_code(),
                programming_error = error.is_programming_error(),
                "view failed: {error}"
            );
            HttpResponse::from_error(&error, debug)
        }
    }
}

fn method_list(methods: &[Method]) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbvtoolkit_core::ToolkitError;

    struct TestView;

    #[async_trait]
    impl View for TestView {
        fn allowed_methods(&self) -> Vec<Method> {
            vec![Method::GET, Method::HEAD, Method::POST, Method::OPTIONS]
        }

        async fn get(&self, _request: HttpRequest) -> ToolkitResult<HttpResponse> {
            Ok(HttpResponse::ok("GET response"))
        }

        async fn post(&self, _request: HttpRequest) -> ToolkitResult<HttpResponse> {
            Ok(HttpResponse::ok("POST response"))
        }
    }

    struct FailingView;

    #[async_trait]
    impl View for FailingView {
        async fn get(&self, _request: HttpRequest) -> ToolkitResult<HttpResponse> {
            Err(ToolkitError::ImproperlyConfigured("filename is not set".into()))
        }
    }

    fn request(method: Method) -> HttpRequest {
        HttpRequest::builder().method(method).build()
    }

    #[tokio::test]
    async fn test_dispatch_get_and_post() {
        let view = TestView;
        let response = view.dispatch(request(Method::GET)).await.unwrap();
        assert_eq!(response.content_bytes(), b"GET response");
        let response = view.dispatch(request(Method::POST)).await.unwrap();
        assert_eq!(response.content_bytes(), b"POST response");
    }

    #[tokio::test]
    async fn test_dispatch_method_not_allowed() {
        let view = TestView;
        let response = view.dispatch(request(Method::DELETE)).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::METHOD_NOT_ALLOWED);
        let allow = response.headers().get(http::header::ALLOW).unwrap();
        assert_eq!(allow, "GET, HEAD, POST, OPTIONS");
    }

    #[tokio::test]
    async fn test_post_not_in_default_methods() {
        let view = FailingView;
        let response = view.dispatch(request(Method::POST)).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_head_drops_body() {
        let view = TestView;
        let response = view.dispatch(request(Method::HEAD)).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
        assert!(response.content_bytes().is_empty());
    }

    #[tokio::test]
    async fn test_options_lists_methods() {
        let view = TestView;
        let response = view.dispatch(request(Method::OPTIONS)).await.unwrap();
        let allow = response.headers().get(http::header::ALLOW).unwrap().to_str().unwrap();
        assert!(allow.contains("POST"));
    }

    #[tokio::test]
    async fn test_dispatch_propagates_errors() {
        let err = FailingView.dispatch(request(Method::GET)).await.unwrap_err();
        assert!(matches!(err, ToolkitError::ImproperlyConfigured(_)));
    }

    #[tokio::test]
    async fn test_respond_converts_errors() {
        let response = respond(&FailingView, request(Method::GET), true).await;
        assert_eq!(response.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
        let body = String::from_utf8(response.content_bytes()).unwrap();
        assert!(body.contains("filename is not set"));
    }

    #[tokio::test]
    async fn test_as_view_hides_error_details() {
        let view_fn = FailingView.as_view();
        let response = view_fn(request(Method::GET)).await;
        assert_eq!(response.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
        let body = String::from_utf8(response.content_bytes()).unwrap();
        assert!(!body.contains("filename"));
    }

    #[tokio::test]
    async fn test_as_view_ok() {
        let view_fn = TestView.as_view();
        let response = view_fn(request(Method::GET)).await;
        assert_eq!(response.status(), http::StatusCode::OK);
    }
}

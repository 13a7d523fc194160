//! Mounting views on an axum router.
//!
//! [`CbvApp`] maps literal paths to [`View`]s. Each incoming request is
//! converted into an [`HttpRequest`], dispatched inside a request span, and a
//! propagated [`ToolkitError`] is turned into an error response.
//!
//! # Examples
//!
//! ```no_run
//! use cbvtoolkit_core::Settings;
//! use cbvtoolkit_forms::{BaseForm, FormFieldDef, FormFieldType};
//! use cbvtoolkit_views::{CbvApp, FormSpec, MultiFormView};
//!
//! # async fn example() -> cbvtoolkit_core::ToolkitResult<()> {
//! let view = MultiFormView::builder()
//!     .template_name("account.html")
//!     .success_url("/account/")
//!     .form(
//!         FormSpec::new("profile", || {
//!             Box::new(BaseForm::new(vec![FormFieldDef::new("name", FormFieldType::text())]))
//!         })
//!         .on_valid(|_form| async { Ok(()) }),
//!     )
//!     .build()?;
//!
//! CbvApp::new(Settings::default())
//!     .route("/account/", view)
//!     .run()
//!     .await
//! # }
//! ```

use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::response::IntoResponse;
use axum::routing::any;
use tracing::Instrument;

use cbvtoolkit_core::logging::{request_span, setup_logging};
use cbvtoolkit_core::{Settings, ToolkitError, ToolkitResult};
use cbvtoolkit_http::{HttpRequest, HttpResponse};

use crate::views::{respond, View};

/// An application made of views mounted on paths.
pub struct CbvApp {
    settings: Settings,
    routes: Vec<(String, Arc<dyn View>)>,
}

impl CbvApp {
    /// Creates an application with no routes.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            routes: Vec::new(),
        }
    }

    /// Mounts `view` at `path`.
    #[must_use]
    pub fn route(mut self, path: impl Into<String>, view: impl View + 'static) -> Self {
        let view: Arc<dyn View> = Arc::new(view);
        self.routes.push((path.into(), view));
        self
    }

    /// Returns the application settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the number of mounted views.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Converts the application into an axum router.
    ///
    /// Request bodies larger than `settings.max_body_size` are rejected with
    /// 413 before the view runs.
    pub fn into_axum_router(self) -> axum::Router {
        let debug = self.settings.debug;
        let limit = self.settings.max_body_size;
        let mut router = axum::Router::new();

        for (path, view) in self.routes {
            let handler = move |req: Request<Body>| {
                let view = view.clone();
                async move {
                    let span = request_span(req.method().as_str(), req.uri().path());
                    let (parts, body) = req.into_parts();
                    let response = match read_body(&parts.headers, body, limit).await {
                        Ok(bytes) => {
                            let request = HttpRequest::from_axum(parts, bytes);
                            respond(view.as_ref(), request, debug).instrument(span).await
                        }
                        Err(error) => {
                            span.in_scope(|| tracing::warn!(limit, "{error}"));
                            HttpResponse::from_error(&error, debug)
                        }
                    };
                    response.into_response()
                }
            };
            router = router.route(&path, any(handler));
        }

        router
    }

    /// Installs logging and serves the application on the configured
    /// bind address.
    pub async fn run(self) -> ToolkitResult<()> {
        setup_logging(&self.settings);

        let addr = self.settings.bind_address.clone();
        let routes = self.routes.len();
        let router = self.into_axum_router();
        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            ToolkitError::ImproperlyConfigured(format!("Failed to bind to {addr}: {e}"))
        })?;

        tracing::info!(%addr, routes, "serving at http://{addr}/");

        axum::serve(listener, router)
            .await
            .map_err(|e| ToolkitError::InternalServerError(format!("Server error: {e}")))
    }
}

/// Reads at most `limit` bytes of body. A declared `Content-Length` over
/// the limit is rejected without reading.
async fn read_body(headers: &http::HeaderMap, body: Body, limit: usize) -> ToolkitResult<Vec<u8>> {
    let declared = headers
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit as u64) {
        return Err(too_large(limit));
    }

    match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => Ok(bytes.to_vec()),
        Err(e) => {
            let inner = e.into_inner();
            if inner.is::<http_body_util::LengthLimitError>() {
                Err(too_large(limit))
            } else {
                Err(ToolkitError::BadRequest(format!("Failed to read body: {inner}")))
            }
        }
    }
}

fn too_large(limit: usize) -> ToolkitError {
    ToolkitError::PayloadTooLarge(format!("request body exceeds {limit} bytes"))
}

impl std::fmt::Debug for CbvApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CbvApp")
            .field("routes", &self.routes.iter().map(|(p, _)| p).collect::<Vec<_>>())
            .field("debug", &self.settings.debug)
            .finish()
    }
}

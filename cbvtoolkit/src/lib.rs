//! # cbvtoolkit
//!
//! Reusable class-based views for axum services.
//!
//! This is the meta-crate that re-exports the sub-crates. Depend on
//! `cbvtoolkit` for everything, or on the individual crates for finer
//! control.
//!
//! ```no_run
//! use std::collections::HashMap;
//!
//! use cbvtoolkit::prelude::*;
//!
//! struct Members;
//!
//! #[async_trait]
//! impl CsvSource for Members {
//!     fn columns(&self) -> ToolkitResult<Vec<String>> {
//!         Ok(vec!["name".into()])
//!     }
//!
//!     fn filename(&self) -> ToolkitResult<String> {
//!         Ok("members.csv".into())
//!     }
//!
//!     async fn get_csv_data(&self, _request: &HttpRequest) -> ToolkitResult<Records> {
//!         let row = HashMap::from([("name".to_string(), "Ada".to_string())]);
//!         Ok(Box::new(std::iter::once(row)))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> ToolkitResult<()> {
//!     let settings = cbvtoolkit::core::settings_loader::from_env();
//!     CbvApp::new(settings)
//!         .route("/members.csv", CsvDownloadView::new(Members))
//!         .run()
//!         .await
//! }
//! ```

/// Error type, settings, and logging setup.
pub use cbvtoolkit_core as core;

/// Request, response, and query dictionary types.
pub use cbvtoolkit_http as http;

/// The `Form` trait, `BaseForm`, and field validation.
#[cfg(feature = "forms")]
pub use cbvtoolkit_forms as forms;

/// The `View` trait, the CSV and multi-form views, and the axum app.
#[cfg(feature = "views")]
pub use cbvtoolkit_views as views;

pub use async_trait::async_trait;
pub use axum;
pub use serde_json;
pub use tokio;
pub use tracing;

/// Commonly used types in one import.
pub mod prelude {
    pub use async_trait::async_trait;

    pub use cbvtoolkit_core::{Settings, ToolkitError, ToolkitResult};
    pub use cbvtoolkit_http::{HttpRequest, HttpResponse, HttpResponseRedirect, QueryDict};

    #[cfg(feature = "forms")]
    pub use cbvtoolkit_forms::{BaseForm, Form, FormDefinition, FormFieldDef, FormFieldType};

    #[cfg(feature = "views")]
    pub use cbvtoolkit_views::{
        CbvApp, CsvDownloadView, CsvSource, FallbackRenderer, FormMap, FormSpec, MultiFormView,
        Records, TemplateRenderer, TeraRenderer, View,
    };
}

//! # cbvtoolkit-views
//!
//! Class-based views for cbvtoolkit.
//!
//! - [`views::class_based`] - The [`View`](views::View) dispatch trait
//! - [`views::csv_download`] - Serve tabular data as a CSV attachment
//! - [`views::multi_form`] - Render and process several forms on one page
//! - [`template`] - The renderer seam and its tera-backed implementation
//! - [`server`] - Mount views on an axum router and serve them

pub mod server;
pub mod template;
pub mod views;

pub use server::CbvApp;
pub use template::{FallbackRenderer, TemplateRenderer, TeraRenderer};
pub use views::{
    CsvDownloadView, CsvSource, FormMap, FormSpec, MultiFormView, MultiFormViewBuilder, Record,
    Records, View,
};

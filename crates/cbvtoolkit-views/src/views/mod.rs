//! View types.
//!
//! - [`class_based`] - The `View` trait and the dispatch boundary
//! - [`csv_download`] - `CsvDownloadView` and the `CsvSource` contract
//! - [`multi_form`] - `MultiFormView` and its `FormSpec` table

pub mod class_based;
pub mod csv_download;
pub mod multi_form;

pub use class_based::{respond, View, ViewFunction, ViewFuture};
pub use csv_download::{encode_csv, CsvDownloadView, CsvSource, Record, Records};
pub use multi_form::{FormMap, FormSpec, MultiFormView, MultiFormViewBuilder, FORM_NAME_FIELD};

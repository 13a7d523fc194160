//! Tabular downloads as CSV attachments.
//!
//! A [`CsvSource`] supplies the column set, the attachment filename and the
//! records. [`CsvDownloadView`] turns any source into a view: on GET it
//! writes a header row equal to the columns, then one row per record
//! projected onto the columns in order, and returns the result as a
//! `text/csv` attachment.
//!
//! # Examples
//!
//! ```
//! use std::collections::HashMap;
//!
//! use async_trait::async_trait;
//! use cbvtoolkit_core::ToolkitResult;
//! use cbvtoolkit_http::HttpRequest;
//! use cbvtoolkit_views::views::{CsvDownloadView, CsvSource, Records};
//!
//! struct Members;
//!
//! #[async_trait]
//! impl CsvSource for Members {
//!     fn columns(&self) -> ToolkitResult<Vec<String>> {
//!         Ok(vec!["name".into(), "email".into()])
//!     }
//!
//!     fn filename(&self) -> ToolkitResult<String> {
//!         Ok("members.csv".into())
//!     }
//!
//!     async fn get_csv_data(&self, _request: &HttpRequest) -> ToolkitResult<Records> {
//!         let row: HashMap<String, String> = [
//!             ("name".to_string(), "Ada".to_string()),
//!             ("email".to_string(), "ada@example.com".to_string()),
//!         ]
//!         .into_iter()
//!         .collect();
//!         Ok(Box::new(std::iter::once(row)))
//!     }
//! }
//!
//! let view = CsvDownloadView::new(Members);
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use http::{HeaderValue, Method, StatusCode};

use cbvtoolkit_core::settings::CsvSettings;
use cbvtoolkit_core::{ToolkitError, ToolkitResult};
use cbvtoolkit_http::{HttpRequest, HttpResponse};

use super::class_based::View;

/// One output row: field name to value.
pub type Record = HashMap<String, String>;

/// A lazy sequence of records.
pub type Records = Box<dyn Iterator<Item = Record> + Send>;

/// The data-source side of a CSV download.
///
/// `columns` and `filename` must be provided; the defaults fail with
/// [`ToolkitError::ImproperlyConfigured`] the first time the view is used.
#[async_trait]
pub trait CsvSource: Send + Sync {
    /// The ordered column set. Every record must contain each name.
    fn columns(&self) -> ToolkitResult<Vec<String>> {
        Err(ToolkitError::ImproperlyConfigured(
            "CSV source must define columns".to_string(),
        ))
    }

    /// The suggested filename of the attachment.
    fn filename(&self) -> ToolkitResult<String> {
        Err(ToolkitError::ImproperlyConfigured(
            "CSV source must define a filename".to_string(),
        ))
    }

    /// Field delimiter for this source. `None` uses the view's delimiter.
    fn delimiter(&self) -> Option<u8> {
        None
    }

    /// Produces the records to write.
    async fn get_csv_data(&self, request: &HttpRequest) -> ToolkitResult<Records>;
}

/// A view that serves a [`CsvSource`] as a downloadable CSV file.
pub struct CsvDownloadView<S> {
    source: S,
    delimiter: u8,
}

impl<S: CsvSource> CsvDownloadView<S> {
    /// Creates a view over `source` using a comma delimiter.
    pub fn new(source: S) -> Self {
        Self {
            source,
            delimiter: b',',
        }
    }

    /// Takes the default delimiter from settings.
    #[must_use]
    pub fn with_settings(mut self, settings: &CsvSettings) -> Self {
        self.delimiter = settings.delimiter_byte();
        self
    }

    /// Returns the underlying source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Encodes `records` and wraps them in an attachment response.
    pub fn build_response(
        &self,
        columns: &[String],
        filename: &str,
        records: Records,
    ) -> ToolkitResult<HttpResponse> {
        let delimiter = self.source.delimiter().unwrap_or(self.delimiter);
        let body = encode_csv(columns, records, delimiter)?;

        let mut response = HttpResponse::with_bytes(StatusCode::OK, body);
        response.set_content_type("text/csv");
        response.set_charset(None);
        response
            .headers_mut()
            .insert(http::header::CONTENT_DISPOSITION, attachment(filename)?);
        Ok(response)
    }
}

#[async_trait]
impl<S: CsvSource> View for CsvDownloadView<S> {
    async fn get(&self, request: HttpRequest) -> ToolkitResult<HttpResponse> {
        let columns = self.source.columns()?;
        if columns.is_empty() {
            return Err(ToolkitError::ImproperlyConfigured(
                "CSV source columns must not be empty".to_string(),
            ));
        }
        let filename = self.source.filename()?;

        let records = self.source.get_csv_data(&request).await?;
        let response = self.build_response(&columns, &filename, records)?;
        tracing::debug!(
            filename = %filename,
            columns = columns.len(),
            bytes = response.content_len(),
            "CSV download built"
        );
        Ok(response)
    }

    fn allowed_methods(&self) -> Vec<Method> {
        vec![Method::GET, Method::HEAD, Method::OPTIONS]
    }
}

/// Writes a header row equal to `columns`, then each record projected onto
/// `columns` in order.
///
/// Fails with [`ToolkitError::MissingColumn`] on the first record that lacks
/// a declared column.
pub fn encode_csv(
    columns: &[String],
    records: impl IntoIterator<Item = Record>,
    delimiter: u8,
) -> ToolkitResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(columns).map_err(encoding_error)?;

    for (row, record) in records.into_iter().enumerate() {
        let line = columns
            .iter()
            .map(|column| {
                record
                    .get(column)
                    .map(String::as_str)
                    .ok_or_else(|| ToolkitError::MissingColumn {
                        column: column.clone(),
                        row,
                    })
            })
            .collect::<ToolkitResult<Vec<&str>>>()?;
        writer.write_record(&line).map_err(encoding_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| ToolkitError::IoError(e.into_error()))
}

fn encoding_error(error: csv::Error) -> ToolkitError {
    ToolkitError::EncodingError(error.to_string())
}

/// Builds `attachment; filename="<filename>"`, escaping quotes and backslashes.
fn attachment(filename: &str) -> ToolkitResult<HeaderValue> {
    let escaped = filename.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_str(&format!("attachment; filename=\"{escaped}\"")).map_err(|_| {
        ToolkitError::ImproperlyConfigured(format!(
            "CSV filename {filename:?} is not a valid header value"
        ))
    })
}

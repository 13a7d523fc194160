//! # cbvtoolkit-http
//!
//! HTTP layer for cbvtoolkit. Provides the request and response types that
//! views consume and produce, and the query dictionary used for GET and POST
//! parameters.

pub mod querydict;
pub mod request;
pub mod response;

pub use querydict::QueryDict;
pub use request::{HttpRequest, HttpRequestBuilder};
pub use response::{
    HttpResponse, HttpResponseForbidden, HttpResponseRedirect, ResponseContent, TemplateContext,
};

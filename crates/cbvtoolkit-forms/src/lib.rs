//! # cbvtoolkit-forms
//!
//! Forms for cbvtoolkit. Provides the [`Form`](form::Form) trait that views
//! bind and validate, [`BaseForm`](form::BaseForm) as the stock
//! implementation, and [`FormDefinition`](form::FormDefinition) for declaring
//! a named form type from a list of fields.

pub mod fields;
pub mod form;
pub mod validation;

pub use fields::{FormFieldDef, FormFieldType};
pub use form::{form_type_name, BaseForm, Form, FormDefinition};

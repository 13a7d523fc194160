//! Validation pipeline for form processing.
//!
//! 1. Field-level validation (type coercion + per-field constraints)
//! 2. Form-level cross-field validation via [`Form::clean`](crate::form::Form::clean)
//!
//! Errors accumulate rather than short-circuiting, so every problem is
//! reported at once.

use std::collections::HashMap;

use serde_json::Value;

use crate::fields::{clean_field_value, FormFieldDef};

/// Key under which form-level errors are stored.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Performs field-level validation for all fields.
///
/// Populates `cleaned_data` for fields that pass and `errors` for fields
/// that fail.
pub fn clean_fields(
    field_defs: &[FormFieldDef],
    raw_data: &HashMap<String, Option<String>>,
    cleaned_data: &mut HashMap<String, Value>,
    errors: &mut HashMap<String, Vec<String>>,
) {
    for field in field_defs {
        let raw = raw_data.get(&field.name).and_then(|v| v.as_deref());

        match clean_field_value(field, raw) {
            Ok(value) => {
                cleaned_data.insert(field.name.clone(), value);
            }
            Err(field_errors) => {
                errors.insert(field.name.clone(), field_errors);
            }
        }
    }
}

/// Merges form-level errors into the per-field error map.
pub fn merge_errors(
    errors: &mut HashMap<String, Vec<String>>,
    extra: HashMap<String, Vec<String>>,
) {
    for (key, msgs) in extra {
        errors.entry(key).or_default().extend(msgs);
    }
}

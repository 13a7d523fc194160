//! Form field definitions and type coercion.
//!
//! A [`FormFieldDef`] describes one input: its name, type, whether it is
//! required, and how it is labelled. [`clean_field_value`] turns the raw
//! submitted string into a cleaned [`serde_json::Value`] or a list of error
//! messages.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("valid regex")
});

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("valid regex"));

/// The kind of value a field accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum FormFieldType {
    /// A character (string) field.
    Char {
        /// Minimum length (characters).
        min_length: Option<usize>,
        /// Maximum length (characters).
        max_length: Option<usize>,
        /// Whether to strip leading/trailing whitespace.
        strip: bool,
    },
    /// An integer field.
    Integer {
        /// Minimum allowed value.
        min_value: Option<i64>,
        /// Maximum allowed value.
        max_value: Option<i64>,
    },
    /// A boolean field. Absent means `false`.
    Boolean,
    /// An email address field.
    Email,
    /// An http(s) URL field.
    Url,
}

impl FormFieldType {
    /// A plain, stripped char field with no length limits.
    pub const fn text() -> Self {
        Self::Char {
            min_length: None,
            max_length: None,
            strip: true,
        }
    }
}

/// Definition of a single form field.
#[derive(Debug, Clone)]
pub struct FormFieldDef {
    /// The field name (HTML name attribute).
    pub name: String,
    /// The field type, controlling parsing and coercion.
    pub field_type: FormFieldType,
    /// Whether this field is required.
    pub required: bool,
    /// Default/initial value shown on an unbound form.
    pub initial: Option<Value>,
    /// Human-readable label.
    pub label: String,
    /// Help text displayed alongside the field.
    pub help_text: String,
    /// Custom error messages keyed by error code ("required", "invalid").
    pub error_messages: HashMap<String, String>,
}

impl FormFieldDef {
    /// Creates a new required field. The label is derived from the name.
    pub fn new(name: impl Into<String>, field_type: FormFieldType) -> Self {
        let name = name.into();
        let label = name.replace('_', " ");
        Self {
            name,
            field_type,
            required: true,
            initial: None,
            label,
            help_text: String::new(),
            error_messages: HashMap::new(),
        }
    }

    /// Sets whether the field is required.
    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets the initial value.
    #[must_use]
    pub fn initial(mut self, initial: Value) -> Self {
        self.initial = Some(initial);
        self
    }

    /// Sets the label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = help_text.into();
        self
    }

    /// Overrides the message for an error code.
    #[must_use]
    pub fn error_message(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.error_messages.insert(code.into(), message.into());
        self
    }

    fn message(&self, code: &str, default: &str) -> String {
        self.error_messages
            .get(code)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

/// Cleans a raw submitted value for `field`.
///
/// Runs the required check, then type coercion and the type's constraints.
/// All constraint failures for the field are collected.
pub fn clean_field_value(field: &FormFieldDef, raw: Option<&str>) -> Result<Value, Vec<String>> {
    let raw_str = raw.unwrap_or("");
    if raw_str.trim().is_empty() && field.field_type != FormFieldType::Boolean {
        if field.required {
            return Err(vec![field.message("required", "This field is required.")]);
        }
        return Ok(field.initial.clone().unwrap_or(Value::Null));
    }

    let mut errors = Vec::new();
    let value = match &field.field_type {
        FormFieldType::Char {
            min_length,
            max_length,
            strip,
        } => {
            let s = if *strip { raw_str.trim() } else { raw_str };
            let len = s.chars().count();
            if let Some(min) = min_length {
                if len < *min {
                    errors.push(format!(
                        "Ensure this value has at least {min} characters (it has {len})."
                    ));
                }
            }
            if let Some(max) = max_length {
                if len > *max {
                    errors.push(format!(
                        "Ensure this value has at most {max} characters (it has {len})."
                    ));
                }
            }
            Value::String(s.to_string())
        }

        FormFieldType::Integer {
            min_value,
            max_value,
        } => match raw_str.trim().parse::<i64>() {
            Ok(n) => {
                if let Some(min) = min_value {
                    if n < *min {
                        errors.push(format!(
                            "Ensure this value is greater than or equal to {min}."
                        ));
                    }
                }
                if let Some(max) = max_value {
                    if n > *max {
                        errors.push(format!("Ensure this value is less than or equal to {max}."));
                    }
                }
                Value::from(n)
            }
            Err(_) => {
                errors.push(field.message("invalid", "Enter a whole number."));
                Value::Null
            }
        },

        FormFieldType::Email => {
            let s = raw_str.trim();
            if !EMAIL_RE.is_match(s) {
                errors.push(field.message("invalid", "Enter a valid email address."));
            }
            Value::String(s.to_string())
        }

        FormFieldType::Url => {
            let s = raw_str.trim();
            if !URL_RE.is_match(s) {
                errors.push(field.message("invalid", "Enter a valid URL."));
            }
            Value::String(s.to_string())
        }

        FormFieldType::Boolean => {
            // Unchecked checkboxes are not submitted at all.
            let checked = !matches!(raw_str.trim(), "" | "false" | "0" | "off");
            if field.required && !checked {
                errors.push(field.message("required", "This field is required."));
            }
            Value::Bool(checked)
        }
    };

    if errors.is_empty() {
        Ok(value)
    } else {
        Err(errors)
    }
}

//! Form trait and `BaseForm` implementation.
//!
//! The [`Form`] trait is what views work with: they construct a form, bind
//! submitted data to it, validate it, and hand its template context to a
//! renderer. Validation is async so that implementations can hit a database
//! or another service while cleaning.
//!
//! [`BaseForm`] implements `Form` over a list of [`FormFieldDef`]s.
//! [`FormDefinition`] declares a named form type whose fields (and optional
//! cross-field check) are fixed, the way a form class would.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};

use cbvtoolkit_http::QueryDict;

use crate::fields::FormFieldDef;
use crate::validation::{self, NON_FIELD_ERRORS};

/// Cross-field validation hook: receives the cleaned data and returns
/// errors keyed by field name (or `__all__`).
pub type CleanFn = fn(&HashMap<String, Value>) -> Result<(), HashMap<String, Vec<String>>>;

/// The core form trait.
///
/// All implementations must be `Send + Sync` so views can hold and await
/// them across task boundaries.
#[async_trait]
pub trait Form: Send + Sync {
    /// Returns the form's field definitions.
    fn fields(&self) -> &[FormFieldDef];

    /// Returns the initial values, overriding per-field initials.
    fn initial(&self) -> &HashMap<String, Value>;

    /// Returns the form prefix (for namespacing input names).
    fn prefix(&self) -> Option<&str>;

    /// Binds submitted data to this form, clearing previous validation state.
    fn bind(&mut self, data: &QueryDict);

    /// Returns `true` if this form has been bound to data.
    fn is_bound(&self) -> bool;

    /// Validates the form. Unbound forms are never valid.
    ///
    /// After this call, `errors()` and `cleaned_data()` are populated.
    async fn is_valid(&mut self) -> bool;

    /// Returns per-field validation errors.
    fn errors(&self) -> &HashMap<String, Vec<String>>;

    /// Returns the cleaned (validated and coerced) data.
    fn cleaned_data(&self) -> &HashMap<String, Value>;

    /// Builds the template context for this form.
    ///
    /// The returned object has the keys `fields`, `errors`,
    /// `non_field_errors`, `is_bound`, `initial` and `prefix`.
    fn as_context(&self) -> Value;

    /// Cross-field validation hook. The default accepts everything.
    async fn clean(&self) -> Result<(), HashMap<String, Vec<String>>> {
        Ok(())
    }
}

/// A named form type declared by its fields.
///
/// # Examples
///
/// ```
/// use cbvtoolkit_forms::{BaseForm, Form, FormDefinition, FormFieldDef, FormFieldType};
///
/// struct EmailForm;
///
/// impl FormDefinition for EmailForm {
///     fn fields() -> Vec<FormFieldDef> {
///         vec![FormFieldDef::new("email", FormFieldType::Email)]
///     }
/// }
///
/// let form = BaseForm::from_definition::<EmailForm>();
/// assert_eq!(form.fields().len(), 1);
/// assert!(!form.is_bound());
/// ```
pub trait FormDefinition: 'static {
    /// The fields of this form type.
    fn fields() -> Vec<FormFieldDef>;

    /// Cross-field validation run after field cleaning succeeds or fails.
    fn clean(_cleaned_data: &HashMap<String, Value>) -> Result<(), HashMap<String, Vec<String>>> {
        Ok(())
    }
}

/// Returns the lowercase name of a type: its final path segment without
/// generic arguments. `my_app::forms::EmailForm` becomes `emailform`.
pub fn form_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_lowercase()
}

/// A general-purpose form implementation.
pub struct BaseForm {
    field_defs: Vec<FormFieldDef>,
    initial_data: HashMap<String, Value>,
    prefix: Option<String>,
    bound: bool,
    raw_data: HashMap<String, Option<String>>,
    errors: HashMap<String, Vec<String>>,
    cleaned_data: HashMap<String, Value>,
    cleaner: Option<CleanFn>,
}

impl BaseForm {
    /// Creates a new unbound `BaseForm` with the given field definitions.
    pub fn new(fields: Vec<FormFieldDef>) -> Self {
        Self {
            field_defs: fields,
            initial_data: HashMap::new(),
            prefix: None,
            bound: false,
            raw_data: HashMap::new(),
            errors: HashMap::new(),
            cleaned_data: HashMap::new(),
            cleaner: None,
        }
    }

    /// Creates a new unbound form of a declared form type.
    pub fn from_definition<D: FormDefinition>() -> Self {
        Self::new(D::fields()).with_cleaner(D::clean)
    }

    /// Sets initial values for fields.
    #[must_use]
    pub fn with_initial(mut self, initial: HashMap<String, Value>) -> Self {
        self.initial_data = initial;
        self
    }

    /// Sets the form prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets the cross-field validation hook.
    #[must_use]
    pub fn with_cleaner(mut self, cleaner: CleanFn) -> Self {
        self.cleaner = Some(cleaner);
        self
    }

    /// Returns the non-field (form-level) errors.
    pub fn non_field_errors(&self) -> &[String] {
        self.errors.get(NON_FIELD_ERRORS).map_or(&[], Vec::as_slice)
    }

    fn html_name(&self, field: &str) -> String {
        match &self.prefix {
            Some(p) => format!("{p}-{field}"),
            None => field.to_string(),
        }
    }

    fn display_value(&self, field: &FormFieldDef) -> Value {
        if self.bound {
            return self
                .raw_data
                .get(&field.name)
                .cloned()
                .flatten()
                .map_or(Value::Null, Value::String);
        }
        self.initial_data
            .get(&field.name)
            .or(field.initial.as_ref())
            .cloned()
            .unwrap_or(Value::Null)
    }
}

#[async_trait]
impl Form for BaseForm {
    fn fields(&self) -> &[FormFieldDef] {
        &self.field_defs
    }

    fn initial(&self) -> &HashMap<String, Value> {
        &self.initial_data
    }

    fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    fn bind(&mut self, data: &QueryDict) {
        self.bound = true;
        self.raw_data.clear();
        self.errors.clear();
        self.cleaned_data.clear();

        for field in &self.field_defs {
            let value = data.get(&self.html_name(&field.name)).map(String::from);
            self.raw_data.insert(field.name.clone(), value);
        }
    }

    fn is_bound(&self) -> bool {
        self.bound
    }

    async fn is_valid(&mut self) -> bool {
        if !self.bound {
            return false;
        }

        self.errors.clear();
        self.cleaned_data.clear();

        validation::clean_fields(
            &self.field_defs,
            &self.raw_data,
            &mut self.cleaned_data,
            &mut self.errors,
        );

        if let Err(form_errors) = self.clean().await {
            validation::merge_errors(&mut self.errors, form_errors);
        }

        self.errors.is_empty()
    }

    fn errors(&self) -> &HashMap<String, Vec<String>> {
        &self.errors
    }

    fn cleaned_data(&self) -> &HashMap<String, Value> {
        &self.cleaned_data
    }

    fn as_context(&self) -> Value {
        let fields: Vec<Value> = self
            .field_defs
            .iter()
            .map(|field| {
                json!({
                    "name": field.name,
                    "html_name": self.html_name(&field.name),
                    "label": field.label,
                    "help_text": field.help_text,
                    "required": field.required,
                    "value": self.display_value(field),
                    "errors": self.errors.get(&field.name).cloned().unwrap_or_default(),
                })
            })
            .collect();

        json!({
            "fields": fields,
            "errors": self.errors,
            "non_field_errors": self.non_field_errors(),
            "is_bound": self.bound,
            "initial": self.initial_data,
            "prefix": self.prefix,
        })
    }

    async fn clean(&self) -> Result<(), HashMap<String, Vec<String>>> {
        match self.cleaner {
            Some(cleaner) => cleaner(&self.cleaned_data),
            None => Ok(()),
        }
    }
}

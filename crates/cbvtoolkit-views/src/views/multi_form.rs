//! Several independent forms on one page.
//!
//! A [`MultiFormView`] is configured with a table of [`FormSpec`]s, one per
//! form. On GET every form is instantiated unbound and the set is rendered.
//! On POST the `form_name` field picks exactly one form, which is bound to
//! the submitted data and validated:
//!
//! ```text
//! Received ─┬─ unknown form_name ─────────────────────────────▶ 403 Forbidden
//!           └─ Validating ─┬─ valid ── on_valid(form) ────────▶ 302 to success URL
//!                          └─ invalid ────────────────────────▶ 200 re-render
//! ```
//!
//! On re-render the submitted form keeps its data and errors while every
//! other form is freshly instantiated.
//!
//! The table is checked once, when the view is built: names must be unique,
//! every form needs an `on_valid` callback, and every form needs a success
//! URL (its own or the view's default).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use http::{HeaderValue, Method};

use cbvtoolkit_core::{ToolkitError, ToolkitResult};
use cbvtoolkit_forms::{form_type_name, BaseForm, Form, FormDefinition};
use cbvtoolkit_http::{HttpRequest, HttpResponse, HttpResponseForbidden, HttpResponseRedirect, TemplateContext};

use super::class_based::View;
use crate::template::{FallbackRenderer, TemplateRenderer};

/// The POST field naming the submitted form.
pub const FORM_NAME_FIELD: &str = "form_name";

/// Form instances keyed by form name.
pub type FormMap = BTreeMap<String, Box<dyn Form>>;

type FormConstructor = Arc<dyn Fn() -> Box<dyn Form> + Send + Sync>;
type InstanceFactory = Arc<dyn Fn(&HttpRequest) -> Box<dyn Form> + Send + Sync>;
type ValidFuture = Pin<Box<dyn Future<Output = ToolkitResult<()>> + Send>>;
type OnValid = Arc<dyn Fn(Box<dyn Form>) -> ValidFuture + Send + Sync>;
type ContextBuilder = Arc<dyn Fn(&HttpRequest, &mut TemplateContext) + Send + Sync>;

/// Configuration of one form on a [`MultiFormView`].
///
/// # Examples
///
/// ```
/// use cbvtoolkit_forms::{FormDefinition, FormFieldDef, FormFieldType};
/// use cbvtoolkit_views::views::FormSpec;
///
/// struct EmailForm;
///
/// impl FormDefinition for EmailForm {
///     fn fields() -> Vec<FormFieldDef> {
///         vec![FormFieldDef::new("email", FormFieldType::Email)]
///     }
/// }
///
/// let spec = FormSpec::of::<EmailForm>()
///     .on_valid(|_form| async { Ok(()) })
///     .success_url("/account/email/");
/// assert_eq!(spec.name(), "emailform");
/// ```
#[derive(Clone)]
pub struct FormSpec {
    name: String,
    form_type: FormConstructor,
    instance_factory: Option<InstanceFactory>,
    on_valid: Option<OnValid>,
    success_url: Option<String>,
}

impl FormSpec {
    /// Creates an entry from a name and a constructor for unbound instances.
    /// The name is lowercased.
    pub fn new<F>(name: impl Into<String>, form_type: F) -> Self
    where
        F: Fn() -> Box<dyn Form> + Send + Sync + 'static,
    {
        Self {
            name: name.into().to_lowercase(),
            form_type: Arc::new(form_type),
            instance_factory: None,
            on_valid: None,
            success_url: None,
        }
    }

    /// Creates an entry for a declared form type, named after the type.
    pub fn of<D: FormDefinition>() -> Self {
        Self::new(form_type_name::<D>(), || {
            Box::new(BaseForm::from_definition::<D>())
        })
    }

    /// Creates an entry for a custom [`Form`] implementation, named after the type.
    pub fn from_form<F>() -> Self
    where
        F: Form + Default + 'static,
    {
        Self::new(form_type_name::<F>(), || Box::new(F::default()))
    }

    /// Overrides how the unbound instance of this form is built, e.g. to
    /// pre-populate it from the request.
    #[must_use]
    pub fn instance_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&HttpRequest) -> Box<dyn Form> + Send + Sync + 'static,
    {
        self.instance_factory = Some(Arc::new(factory));
        self
    }

    /// Sets the callback run with the bound form after it validates.
    #[must_use]
    pub fn on_valid<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(Box<dyn Form>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolkitResult<()>> + Send + 'static,
    {
        self.on_valid = Some(Arc::new(move |form: Box<dyn Form>| -> ValidFuture {
            Box::pin(callback(form))
        }));
        self
    }

    /// Sets the redirect target for this form, overriding the view default.
    #[must_use]
    pub fn success_url(mut self, url: impl Into<String>) -> Self {
        self.success_url = Some(url.into());
        self
    }

    /// Returns the form name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for FormSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormSpec")
            .field("name", &self.name)
            .field("instance_factory", &self.instance_factory.is_some())
            .field("on_valid", &self.on_valid.is_some())
            .field("success_url", &self.success_url)
            .finish()
    }
}

/// A form entry after the table has been checked.
struct ResolvedForm {
    form_type: FormConstructor,
    instance_factory: Option<InstanceFactory>,
    on_valid: OnValid,
    success_url: String,
}

impl ResolvedForm {
    fn instantiate(&self, request: &HttpRequest) -> Box<dyn Form> {
        match &self.instance_factory {
            Some(factory) => factory(request),
            None => (self.form_type)(),
        }
    }
}

/// Builder for [`MultiFormView`].
#[derive(Default)]
pub struct MultiFormViewBuilder {
    template_name: Option<String>,
    renderer: Option<Arc<dyn TemplateRenderer>>,
    context_builder: Option<ContextBuilder>,
    success_url: Option<String>,
    forms: Vec<FormSpec>,
}

impl MultiFormViewBuilder {
    /// Sets the template rendered on GET and on invalid submissions.
    #[must_use]
    pub fn template_name(mut self, template_name: impl Into<String>) -> Self {
        self.template_name = Some(template_name.into());
        self
    }

    /// Sets the renderer. Defaults to [`FallbackRenderer`].
    #[must_use]
    pub fn renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Adds extra context before rendering. The `forms` key is always set
    /// by the view afterwards.
    #[must_use]
    pub fn context_builder<F>(mut self, builder: F) -> Self
    where
        F: Fn(&HttpRequest, &mut TemplateContext) + Send + Sync + 'static,
    {
        self.context_builder = Some(Arc::new(builder));
        self
    }

    /// Sets the shared redirect target for forms without their own.
    #[must_use]
    pub fn success_url(mut self, url: impl Into<String>) -> Self {
        self.success_url = Some(url.into());
        self
    }

    /// Adds a form.
    #[must_use]
    pub fn form(mut self, spec: FormSpec) -> Self {
        self.forms.push(spec);
        self
    }

    /// Checks the configuration and builds the view.
    pub fn build(self) -> ToolkitResult<MultiFormView> {
        let template_name = self.template_name.ok_or_else(|| {
            ToolkitError::ImproperlyConfigured("MultiFormView requires a template name".to_string())
        })?;

        if self.forms.is_empty() {
            return Err(ToolkitError::ImproperlyConfigured(
                "MultiFormView requires at least one form".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut order = Vec::with_capacity(self.forms.len());
        let mut forms = HashMap::with_capacity(self.forms.len());

        for spec in self.forms {
            if !seen.insert(spec.name.clone()) {
                return Err(ToolkitError::ImproperlyConfigured(format!(
                    "Duplicate form name '{}'",
                    spec.name
                )));
            }

            let on_valid = spec.on_valid.ok_or_else(|| {
                ToolkitError::ImproperlyConfigured(format!(
                    "Form '{}' has no on_valid callback",
                    spec.name
                ))
            })?;

            let success_url = spec
                .success_url
                .or_else(|| self.success_url.clone())
                .ok_or_else(|| {
                    ToolkitError::ImproperlyConfigured(format!(
                        "Form '{}' has no success URL and the view has no default",
                        spec.name
                    ))
                })?;
            if HeaderValue::from_str(&success_url).is_err() {
                return Err(ToolkitError::ImproperlyConfigured(format!(
                    "Form '{}' success URL {success_url:?} is not a valid Location header",
                    spec.name
                )));
            }

            order.push(spec.name.clone());
            forms.insert(
                spec.name,
                ResolvedForm {
                    form_type: spec.form_type,
                    instance_factory: spec.instance_factory,
                    on_valid,
                    success_url,
                },
            );
        }

        Ok(MultiFormView {
            template_name,
            renderer: self
                .renderer
                .unwrap_or_else(|| Arc::new(FallbackRenderer)),
            context_builder: self.context_builder,
            order,
            forms,
        })
    }
}

/// A view that renders and processes several independent forms.
///
/// See the [module documentation](self) for the request flow.
pub struct MultiFormView {
    template_name: String,
    renderer: Arc<dyn TemplateRenderer>,
    context_builder: Option<ContextBuilder>,
    order: Vec<String>,
    forms: HashMap<String, ResolvedForm>,
}

impl MultiFormView {
    /// Returns a new builder.
    pub fn builder() -> MultiFormViewBuilder {
        MultiFormViewBuilder::default()
    }

    /// Returns the configured template name.
    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    /// Returns the form names in configuration order.
    pub fn form_names(&self) -> &[String] {
        &self.order
    }

    /// Returns the redirect target for a form.
    pub fn success_url(&self, form_name: &str) -> Option<&str> {
        self.forms.get(form_name).map(|f| f.success_url.as_str())
    }

    /// Builds the full form map. Entries present in `overrides` are used
    /// as-is; every other form is instantiated unbound.
    pub fn get_forms(&self, request: &HttpRequest, mut overrides: FormMap) -> FormMap {
        let mut forms = FormMap::new();
        for name in &self.order {
            let instance = overrides
                .remove(name)
                .unwrap_or_else(|| self.forms[name].instantiate(request));
            forms.insert(name.clone(), instance);
        }
        for ignored in overrides.keys() {
            tracing::warn!(form = %ignored, "ignoring override for unconfigured form");
        }
        forms
    }

    /// Builds the template context: extra context from the context builder,
    /// then `forms` as an object of form name to form context.
    pub fn get_context_data(&self, request: &HttpRequest, forms: &FormMap) -> TemplateContext {
        let mut context = TemplateContext::new();
        if let Some(builder) = &self.context_builder {
            builder(request, &mut context);
        }

        let forms_json: serde_json::Map<String, serde_json::Value> = forms
            .iter()
            .map(|(name, form)| (name.clone(), form.as_context()))
            .collect();
        context.insert("forms".to_string(), serde_json::Value::Object(forms_json));
        context
    }

    /// Renders the template with the given forms.
    pub fn render_forms(&self, request: &HttpRequest, forms: &FormMap) -> ToolkitResult<HttpResponse> {
        let context = self.get_context_data(request, forms);
        let body = self.renderer.render(&self.template_name, &context)?;
        Ok(HttpResponse::rendered(body, self.template_name.clone(), context))
    }

    /// Read path: renders every form unbound (or as overridden).
    pub async fn handle_read(
        &self,
        request: &HttpRequest,
        overrides: FormMap,
    ) -> ToolkitResult<HttpResponse> {
        let forms = self.get_forms(request, overrides);
        self.render_forms(request, &forms)
    }

    /// Write path: validates the form named by `form_name`.
    pub async fn handle_write(&self, request: &HttpRequest) -> ToolkitResult<HttpResponse> {
        let data = request.post();
        let Some((form_name, entry)) = data
            .get(FORM_NAME_FIELD)
            .and_then(|name| self.forms.get_key_value(name))
        else {
            tracing::warn!(
                form = data.get(FORM_NAME_FIELD).unwrap_or_default(),
                path = request.path(),
                "rejecting submission for unknown form"
            );
            return Ok(HttpResponseForbidden::new("Unknown form"));
        };

        let mut form = (entry.form_type)();
        form.bind(data);

        if form.is_valid().await {
            (entry.on_valid)(form).await?;
            tracing::debug!(form = %form_name, location = %entry.success_url, "form valid, redirecting");
            return HttpResponseRedirect::new(&entry.success_url);
        }

        tracing::debug!(
            form = %form_name,
            errors = form.errors().len(),
            "form invalid, re-rendering"
        );
        let mut overrides = FormMap::new();
        overrides.insert(form_name.clone(), form);
        let forms = self.get_forms(request, overrides);
        self.render_forms(request, &forms)
    }
}

#[async_trait]
impl View for MultiFormView {
    fn allowed_methods(&self) -> Vec<Method> {
        vec![Method::GET, Method::HEAD, Method::POST, Method::OPTIONS]
    }

    async fn get(&self, request: HttpRequest) -> ToolkitResult<HttpResponse> {
        self.handle_read(&request, FormMap::new()).await
    }

    async fn post(&self, request: HttpRequest) -> ToolkitResult<HttpResponse> {
        self.handle_write(&request).await
    }
}

//! Template rendering for views.
//!
//! Views do not own a template engine. They are handed a
//! [`TemplateRenderer`] when they are built and call it with a template name
//! and a [`TemplateContext`]. Two renderers are provided:
//!
//! - [`TeraRenderer`] renders [tera](https://keats.github.io/tera/) templates
//!   loaded from directories or registered as strings.
//! - [`FallbackRenderer`] dumps the context as JSON inside an HTML page. It
//!   needs no templates and is useful in development and tests.
//!
//! Any `Fn(&str, &TemplateContext) -> ToolkitResult<String>` closure is also
//! a renderer.

use std::error::Error as _;

use cbvtoolkit_core::settings::TemplateSettings;
use cbvtoolkit_core::{ToolkitError, ToolkitResult};
use cbvtoolkit_http::TemplateContext;

/// Renders a named template with a context into a response body.
pub trait TemplateRenderer: Send + Sync {
    /// Renders `template_name` with `context`.
    fn render(&self, template_name: &str, context: &TemplateContext) -> ToolkitResult<String>;
}

impl<F> TemplateRenderer for F
where
    F: Fn(&str, &TemplateContext) -> ToolkitResult<String> + Send + Sync,
{
    fn render(&self, template_name: &str, context: &TemplateContext) -> ToolkitResult<String> {
        self(template_name, context)
    }
}

/// A renderer backed by a tera template set.
///
/// # Examples
///
/// ```
/// use cbvtoolkit_views::template::{TemplateRenderer, TeraRenderer};
/// use cbvtoolkit_http::TemplateContext;
///
/// let mut renderer = TeraRenderer::new();
/// renderer.add_string_template("hello.html", "Hello, {{ name }}!").unwrap();
///
/// let mut context = TemplateContext::new();
/// context.insert("name".into(), serde_json::json!("world"));
/// assert_eq!(renderer.render("hello.html", &context).unwrap(), "Hello, world!");
/// ```
#[derive(Debug, Default)]
pub struct TeraRenderer {
    tera: tera::Tera,
}

impl TeraRenderer {
    /// Creates a renderer with no templates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a renderer loading every template under the configured
    /// directories. Template names are paths relative to their directory.
    pub fn from_settings(settings: &TemplateSettings) -> ToolkitResult<Self> {
        let mut renderer = Self::new();
        for dir in &settings.dirs {
            let glob = format!("{}/**/*", dir.display());
            let loaded = tera::Tera::new(&glob).map_err(|e| {
                ToolkitError::TemplateError(format!(
                    "Failed to load templates from '{}': {}",
                    dir.display(),
                    describe(&e)
                ))
            })?;
            renderer
                .tera
                .extend(&loaded)
                .map_err(|e| ToolkitError::TemplateError(describe(&e)))?;
        }
        Ok(renderer)
    }

    /// Registers a template from a string.
    pub fn add_string_template(&mut self, name: &str, content: &str) -> ToolkitResult<()> {
        self.tera
            .add_raw_template(name, content)
            .map_err(|e| ToolkitError::TemplateError(describe(&e)))
    }

    /// Returns `true` if a template with this name is registered.
    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }
}

impl TemplateRenderer for TeraRenderer {
    fn render(&self, template_name: &str, context: &TemplateContext) -> ToolkitResult<String> {
        let tera_context = tera::Context::from_serialize(context)
            .map_err(|e| ToolkitError::TemplateError(describe(&e)))?;

        self.tera
            .render(template_name, &tera_context)
            .map_err(|e| match e.kind {
                tera::ErrorKind::TemplateNotFound(ref name) => {
                    ToolkitError::TemplateDoesNotExist(name.clone())
                }
                _ => ToolkitError::TemplateError(describe(&e)),
            })
    }
}

/// Flattens a tera error and its sources into one message.
fn describe(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// A renderer that needs no templates: the context is written as
/// pretty-printed JSON inside a minimal HTML page.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackRenderer;

impl TemplateRenderer for FallbackRenderer {
    fn render(&self, template_name: &str, context: &TemplateContext) -> ToolkitResult<String> {
        let context_json = serde_json::to_string_pretty(context)
            .map_err(|e| ToolkitError::TemplateError(e.to_string()))?;
        Ok(format!(
            "<!-- Template: {template_name} -->\n<html><body><pre>{context_json}</pre></body></html>"
        ))
    }
}

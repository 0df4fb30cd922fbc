//! Template engine contract and the Handlebars file-system engine.

use handlebars::Handlebars;
use serde_json::{Value, json};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

use crate::{Branding, MailError, Result};

/// Template engine used by [`Renderer`](crate::Renderer).
///
/// Implementations own the compiled-template cache and must tolerate
/// concurrent compiles and renders.
pub trait TemplateEngine: Send + Sync {
    /// Compile the template at `path`, cache it, and render it.
    fn compile_and_render(&self, path: &str, model: &Value, branding: &Branding) -> Result<String>;

    /// Look up an already compiled template.
    fn try_get_compiled(&self, path: &str) -> Option<CompiledTemplate>;

    /// Render a template previously returned by [`try_get_compiled`](Self::try_get_compiled).
    fn render_compiled(
        &self,
        template: &CompiledTemplate,
        model: &Value,
        branding: &Branding,
    ) -> Result<String>;
}

/// Handle to a template held in an engine's cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    name: String,
}

impl CompiledTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Cache key of the template.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Handlebars engine reading templates from a directory.
///
/// Template paths are relative to the root directory; the `.hbs` extension
/// may be omitted. Templates see the model as `model` and the branding as
/// `branding`:
///
/// ```handlebars
/// <img src="{{branding.logo_src}}">
/// <h1 style="color: {{branding.primary_color}}">Hello {{model.name}}</h1>
/// ```
///
/// Double-stash output is HTML-escaped, so `Smith & Sons` renders as
/// `Smith &amp; Sons`. Use the triple-stash `{{{branding.company_name}}}` to
/// insert a value verbatim.
///
/// Partials and layouts (`{{> header}}`, `{{#> layout}}...{{/layout}}`) are
/// loaded on first use from the partials directory, which defaults to the
/// root.
pub struct HandlebarsEngine {
    root: PathBuf,
    partials_dir: Option<PathBuf>,
    extension: String,
    handlebars: RwLock<Handlebars<'static>>,
}

impl HandlebarsEngine {
    /// Create an engine rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            partials_dir: None,
            extension: "hbs".to_string(),
            handlebars: RwLock::new(Handlebars::new()),
        }
    }

    /// Fail renders that reference missing fields.
    pub fn with_strict_mode(self, strict: bool) -> Self {
        self.handlebars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_strict_mode(strict);
        self
    }

    /// Extension tried when a path has none (default: `hbs`).
    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.extension = ext.into().trim_start_matches('.').to_string();
        self
    }

    /// Directory partials and layouts are loaded from (default: the root).
    pub fn with_partials_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.partials_dir = Some(dir.into());
        self
    }

    /// Root directory templates are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory partials are resolved against.
    pub fn partials_dir(&self) -> &Path {
        self.partials_dir.as_deref().unwrap_or(&self.root)
    }

    /// Register an in-memory template under `name`.
    pub fn register_template(&self, name: &str, source: &str) -> Result<()> {
        self.handlebars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register_template_string(name, source)?;
        Ok(())
    }

    /// Register an in-memory partial or layout under `name`.
    pub fn register_partial(&self, name: &str, source: &str) -> Result<()> {
        self.handlebars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register_partial(name, source)?;
        Ok(())
    }

    /// Names of all compiled templates.
    pub fn cached_templates(&self) -> Vec<String> {
        let handlebars = self.handlebars.read().unwrap_or_else(PoisonError::into_inner);
        handlebars.get_templates().keys().cloned().collect()
    }

    /// Drop every compiled template.
    pub fn clear_cache(&self) {
        self.handlebars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear_templates();
    }

    fn resolve(&self, dir: &Path, path: &str) -> PathBuf {
        let direct = dir.join(path);
        if direct.extension().is_none() && !direct.is_file() {
            direct.with_extension(&self.extension)
        } else {
            direct
        }
    }

    fn load_source(&self, path: &str) -> Result<String> {
        let file = self.resolve(&self.root, path);
        std::fs::read_to_string(&file).map_err(|e| match e.kind() {
            ErrorKind::NotFound => MailError::TemplateNotFound(path.to_string()),
            _ => MailError::TemplateRender(format!("cannot read {}: {}", file.display(), e)),
        })
    }

    /// Register every partial `source` references that is not known yet.
    ///
    /// Names without a file are left alone; inline partials and
    /// `@partial-block` are resolved by Handlebars itself.
    fn load_partials(&self, source: &str) -> Result<()> {
        for name in partial_names(source) {
            let known = self
                .handlebars
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .has_template(name);
            if known {
                continue;
            }

            let file = self.resolve(self.partials_dir(), name);
            let partial = match std::fs::read_to_string(&file) {
                Ok(partial) => partial,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(MailError::TemplateRender(format!(
                        "cannot read partial {}: {}",
                        file.display(),
                        e
                    )));
                }
            };

            self.register_partial(name, &partial)?;
            debug!(partial = name, "Loaded template partial");
            self.load_partials(&partial)?;
        }
        Ok(())
    }

    fn render_named(&self, name: &str, model: &Value, branding: &Branding) -> Result<String> {
        let context = json!({ "model": model, "branding": branding });
        let handlebars = self.handlebars.read().unwrap_or_else(PoisonError::into_inner);

        if !handlebars.has_template(name) {
            return Err(MailError::TemplateNotFound(name.to_string()));
        }
        Ok(handlebars.render(name, &context)?)
    }
}

/// Names referenced by `{{> name}}` and `{{#> name}}` tags.
fn partial_names(source: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        rest = &rest[start + 2..];
        let tag = rest.trim_start_matches(['~', '#']).trim_start();
        let Some(tag) = tag.strip_prefix('>') else {
            continue;
        };

        let tag = tag.trim_start();
        let end = tag
            .find(|c: char| c.is_whitespace() || c == '}' || c == '~')
            .unwrap_or(tag.len());
        let name = tag[..end].trim_matches(|c: char| c == '"' || c == '\'');

        if !name.is_empty() && !name.starts_with(['@', '(']) && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

impl Default for HandlebarsEngine {
    fn default() -> Self {
        Self::new(".")
    }
}

impl TemplateEngine for HandlebarsEngine {
    fn compile_and_render(&self, path: &str, model: &Value, branding: &Branding) -> Result<String> {
        let source = self.load_source(path)?;
        self.register_template(path, &source)?;
        self.load_partials(&source)?;
        debug!(template = path, root = %self.root.display(), "Compiled email template");

        self.render_named(path, model, branding)
    }

    fn try_get_compiled(&self, path: &str) -> Option<CompiledTemplate> {
        let handlebars = self.handlebars.read().unwrap_or_else(PoisonError::into_inner);
        handlebars
            .has_template(path)
            .then(|| CompiledTemplate::new(path))
    }

    fn render_compiled(
        &self,
        template: &CompiledTemplate,
        model: &Value,
        branding: &Branding,
    ) -> Result<String> {
        self.render_named(template.name(), model, branding)
    }
}

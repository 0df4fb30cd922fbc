//! Template rendering with branding context.

use courier_config::ConfigManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::{MailError, Result, TemplateEngine};

/// Organization identity values available to every template.
///
/// Templates reference these as `{{branding.logo_src}}`,
/// `{{branding.company_name}}`, `{{branding.company_address}}` and
/// `{{branding.primary_color}}` regardless of the model they are rendered with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branding {
    pub logo_src: Option<String>,
    pub company_name: Option<String>,
    pub company_address: Option<String>,
    pub primary_color: Option<String>,
}

impl Branding {
    pub fn logo_src(mut self, src: impl Into<String>) -> Self {
        self.logo_src = Some(src.into());
        self
    }

    pub fn company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = Some(name.into());
        self
    }

    pub fn company_address(mut self, address: impl Into<String>) -> Self {
        self.company_address = Some(address.into());
        self
    }

    pub fn primary_color(mut self, color: impl Into<String>) -> Self {
        self.primary_color = Some(color.into());
        self
    }

    /// Read `mail.logo_src`, `mail.company_name`, `mail.company_address`
    /// and `mail.primary_color`.
    pub fn from_config(config: &ConfigManager) -> Result<Self> {
        Ok(Self {
            logo_src: config.get_opt("mail.logo_src")?,
            company_name: config.get_opt("mail.company_name")?,
            company_address: config.get_opt("mail.company_address")?,
            primary_color: config.get_opt("mail.primary_color")?,
        })
    }
}

/// Renders templates to HTML through a [`TemplateEngine`].
///
/// The renderer owns no cache. It reuses a compiled template when the engine
/// already has one and otherwise asks the engine to compile and render in one
/// step, which fills the engine's cache for the next call.
#[derive(Clone)]
pub struct Renderer {
    engine: Arc<dyn TemplateEngine>,
    branding: Branding,
}

impl Renderer {
    /// Create a renderer over an engine with fixed branding.
    pub fn new(engine: impl TemplateEngine + 'static, branding: Branding) -> Self {
        Self {
            engine: Arc::new(engine),
            branding,
        }
    }

    /// Create a renderer whose branding is read from configuration.
    pub fn from_config(config: &ConfigManager, engine: impl TemplateEngine + 'static) -> Result<Self> {
        Ok(Self::new(engine, Branding::from_config(config)?))
    }

    /// Branding injected into every render.
    pub fn branding(&self) -> &Branding {
        &self.branding
    }

    /// Render `template_path` with `model`.
    pub fn render_to_string<M: Serialize + ?Sized>(&self, template_path: &str, model: &M) -> Result<String> {
        let model = serde_json::to_value(model).map_err(|e| {
            MailError::TemplateRender(format!("cannot serialize model for {}: {}", template_path, e))
        })?;

        self.render_value(template_path, &model)
    }

    /// Render with an already serialized model.
    pub fn render_value(&self, template_path: &str, model: &serde_json::Value) -> Result<String> {
        match self.engine.try_get_compiled(template_path) {
            Some(compiled) => {
                trace!(template = template_path, "Rendering cached template");
                self.engine.render_compiled(&compiled, model, &self.branding)
            }
            None => {
                debug!(template = template_path, "Compiling template");
                self.engine
                    .compile_and_render(template_path, model, &self.branding)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CompiledTemplate;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Engine that records which entry point the renderer used.
    #[derive(Default)]
    struct RecordingEngine {
        compiled: Mutex<HashMap<String, String>>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl RecordingEngine {
        fn fill(source: &str, model: &Value, branding: &Branding) -> String {
            source
                .replace("{name}", model["name"].as_str().unwrap_or_default())
                .replace("{company}", branding.company_name.as_deref().unwrap_or_default())
        }
    }

    impl TemplateEngine for Arc<RecordingEngine> {
        fn compile_and_render(&self, path: &str, model: &Value, branding: &Branding) -> Result<String> {
            self.calls.lock().unwrap().push("compile_and_render");
            if path != "welcome" {
                return Err(MailError::TemplateNotFound(path.to_string()));
            }
            let source = "Hi {name} from {company}".to_string();
            self.compiled.lock().unwrap().insert(path.to_string(), source.clone());
            Ok(RecordingEngine::fill(&source, model, branding))
        }

        fn try_get_compiled(&self, path: &str) -> Option<CompiledTemplate> {
            self.compiled
                .lock()
                .unwrap()
                .contains_key(path)
                .then(|| CompiledTemplate::new(path))
        }

        fn render_compiled(&self, template: &CompiledTemplate, model: &Value, branding: &Branding) -> Result<String> {
            self.calls.lock().unwrap().push("render_compiled");
            let source = self.compiled.lock().unwrap()[template.name()].clone();
            Ok(RecordingEngine::fill(&source, model, branding))
        }
    }

    #[test]
    fn test_compiles_once_then_reuses() {
        let engine = Arc::new(RecordingEngine::default());
        let renderer = Renderer::new(engine.clone(), Branding::default().company_name("Acme"));

        let first = renderer.render_to_string("welcome", &json!({"name": "Ada"})).unwrap();
        let second = renderer.render_to_string("welcome", &json!({"name": "Ada"})).unwrap();

        assert_eq!(first, "Hi Ada from Acme");
        assert_eq!(first, second);
        assert_eq!(
            *engine.calls.lock().unwrap(),
            vec!["compile_and_render", "render_compiled"]
        );
    }

    #[test]
    fn test_not_found_propagates() {
        let renderer = Renderer::new(Arc::new(RecordingEngine::default()), Branding::default());
        let err = renderer.render_to_string("missing", &json!({})).unwrap_err();
        assert!(matches!(err, MailError::TemplateNotFound(ref p) if p == "missing"));
    }

    #[test]
    fn test_branding_from_config() {
        let config = ConfigManager::new();
        config.set("mail.company_name", "Acme Corp").unwrap();
        config.set("mail.primary_color", "#ff6600").unwrap();

        let branding = Branding::from_config(&config).unwrap();
        assert_eq!(branding.company_name.as_deref(), Some("Acme Corp"));
        assert_eq!(branding.primary_color.as_deref(), Some("#ff6600"));
        assert!(branding.logo_src.is_none());
        assert!(branding.company_address.is_none());
    }
}

//! Tera template engine wrapper.
//!
//! Provides template loading, rendering, and management.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tera::{Context, Tera};
use tracing::{debug, info};

use crate::error::{DeployError, DeployResult};

/// Name of the nginx configuration template, both built in and as a file
/// in a template directory.
pub const NGINX_CONF_TEMPLATE: &str = "nginx.conf.tera";

const NGINX_CONF_SOURCE: &str = include_str!("nginx.conf.tera");

/// Template engine for rendering configuration files.
///
/// Wraps Tera and provides a simplified interface for template operations.
#[derive(Clone)]
pub struct TemplateEngine {
    tera: Arc<Tera>,
}

impl TemplateEngine {
    /// Engine holding only the templates compiled into the binary.
    pub fn builtin() -> DeployResult<Self> {
        Ok(Self {
            tera: Arc::new(builtin_tera()?),
        })
    }

    /// Create a template engine from the `.tera` files of a directory.
    ///
    /// Templates are named by their path relative to the directory, so
    /// `{% extends "base.tera" %}` works as written. Built-in templates fill
    /// in whatever the directory does not define; a `nginx.conf.tera` there
    /// replaces the built-in one.
    pub fn new(template_dir: &Path) -> DeployResult<Self> {
        let pattern = template_dir.join("**/*.tera");
        let pattern_str = pattern.to_string_lossy();

        debug!(pattern = %pattern_str, "Loading templates");

        let load_err = |e: tera::Error| DeployError::Template {
            message: format!(
                "Failed to load templates from '{}': {}",
                template_dir.display(),
                e
            ),
        };

        let mut tera = Tera::new(&pattern_str).map_err(load_err)?;
        let overrides = tera.get_template_names().count();
        tera.extend(&builtin_tera()?).map_err(load_err)?;

        info!(
            directory = %template_dir.display(),
            overrides = overrides,
            count = tera.get_template_names().count(),
            "Template engine initialized"
        );

        Ok(Self {
            tera: Arc::new(tera),
        })
    }

    /// Render a template with the given context.
    ///
    /// # Arguments
    ///
    /// * `template_name` - Name of the template (e.g., "nginx.conf.tera")
    /// * `context` - Any serializable value whose fields become template variables
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> DeployResult<String> {
        let tera_context = Context::from_serialize(context).map_err(|e| DeployError::Template {
            message: format!("Invalid template context: {}", e),
        })?;

        self.tera
            .render(template_name, &tera_context)
            .map_err(|e| DeployError::Template {
                message: format!("Failed to render template '{}': {}", template_name, e),
            })
    }
}

fn builtin_tera() -> DeployResult<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_template(NGINX_CONF_TEMPLATE, NGINX_CONF_SOURCE)
        .map_err(|e| DeployError::Template {
            message: format!("Failed to parse built-in template: {}", e),
        })?;
    Ok(tera)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[derive(Serialize)]
    struct Greeting {
        name: &'static str,
        value: u32,
    }

    #[test]
    fn test_directory_override() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("nginx.conf.tera"),
            "# custom for {{ name }}\nsetting = {{ value }}\n",
        )
        .unwrap();

        let engine = TemplateEngine::new(dir.path()).unwrap();
        let rendered = engine
            .render(
                NGINX_CONF_TEMPLATE,
                &Greeting {
                    name: "site",
                    value: 42,
                },
            )
            .unwrap();

        assert!(rendered.contains("# custom for site"));
        assert!(rendered.contains("setting = 42"));
    }

    #[test]
    fn test_directory_template_inheritance() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("base.tera"),
            "# site\n{% block body %}{% endblock body %}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("nginx.conf.tera"),
            "{% extends \"base.tera\" %}{% block body %}name = {{ name }}{% endblock body %}",
        )
        .unwrap();

        let engine = TemplateEngine::new(dir.path()).unwrap();
        let rendered = engine
            .render(NGINX_CONF_TEMPLATE, &Greeting { name: "site", value: 1 })
            .unwrap();

        assert_eq!(rendered, "# site\nname = site\n");
    }

    #[test]
    fn test_directory_without_nginx_template_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("unrelated.tera"), "{{ value }}").unwrap();

        let engine = TemplateEngine::new(dir.path()).unwrap();
        let builtin = TemplateEngine::builtin().unwrap();

        assert_eq!(
            engine.render("unrelated.tera", &Greeting { name: "x", value: 7 }).unwrap(),
            "7"
        );
        assert_eq!(
            engine.tera.get_template_names().count(),
            builtin.tera.get_template_names().count() + 1
        );
        assert!(engine
            .tera
            .get_template_names()
            .any(|n| n == NGINX_CONF_TEMPLATE));
    }

    #[test]
    fn test_missing_template() {
        let engine = TemplateEngine::builtin().unwrap();
        let result = engine.render(
            "nonexistent",
            &Greeting {
                name: "x",
                value: 1,
            },
        );
        assert!(matches!(result, Err(DeployError::Template { .. })));
    }
}

//! Configuration templates.

mod engine;

pub use engine::{TemplateEngine, NGINX_CONF_TEMPLATE};

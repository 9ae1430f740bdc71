//! nginx.conf generation.
//!
//! The set of server blocks is decided here; the embedded Tera template only
//! lays them out.

use std::fmt::Display;

use serde::Serialize;
use tracing::debug;

use super::layout::NginxLayout;
use super::service::{HttpsMaterial, Protocol, Service};
use crate::error::{DeployError, DeployResult, ValidationErrorKind};
use crate::templates::{TemplateEngine, NGINX_CONF_TEMPLATE};

/// URL path under which certbot publishes HTTP-01 challenge tokens.
pub const CHALLENGE_URI: &str = "/.well-known/acme-challenge/";

const GLOBAL_DIRECTIVES: &[&str] = &["worker_processes auto"];
const EVENTS_DIRECTIVES: &[&str] = &[];
const HTTP_DIRECTIVES: &[&str] = &[
    "include mime.types",
    "default_type application/octet-stream",
];

/// Knobs for a generation run.
#[derive(Debug, Clone)]
pub struct ConfigOptions {
    /// Bind port 80 (and 443) and select services by `Host`.
    pub with_server_names: bool,
    /// Enables the 443 listeners. Requires `with_server_names`.
    pub https: Option<HttpsMaterial>,
    /// Route challenge requests on port 80 to the challenge directory.
    pub with_challenge_location: bool,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            with_server_names: false,
            https: None,
            with_challenge_location: true,
        }
    }
}

impl ConfigOptions {
    /// Options for public deployment on ports 80/443.
    pub fn public(https: Option<HttpsMaterial>) -> Self {
        Self {
            with_server_names: true,
            https,
            with_challenge_location: true,
        }
    }

    /// Options for loopback-only serving.
    pub fn local() -> Self {
        Self::default()
    }
}

#[derive(Serialize)]
struct ConfigView {
    generator: &'static str,
    generated_at: String,
    challenge_uri: &'static str,
    global: &'static [&'static str],
    events: &'static [&'static str],
    https: Option<HttpsView>,
    http: &'static [&'static str],
    services: Vec<ServiceView>,
}

#[derive(Serialize)]
struct HttpsView {
    certificate: String,
    certificate_key: String,
}

#[derive(Serialize)]
struct ServiceView {
    title: String,
    servers: Vec<ServerView>,
}

#[derive(Debug, Serialize)]
struct ServerView {
    server_name: Option<String>,
    listen: String,
    challenge_root: Option<String>,
    lines: Vec<String>,
}

/// Render the full nginx configuration.
///
/// Output depends only on the inputs; `generated_at` appears solely in the
/// leading comment line.
pub fn generate_config(
    engine: &TemplateEngine,
    services: &[Service],
    options: &ConfigOptions,
    layout: &NginxLayout,
    generated_at: impl Display,
) -> DeployResult<String> {
    if options.https.is_some() && !options.with_server_names {
        return Err(DeployError::ConfigValidation {
            message: "HTTPS material requires server names to be enabled".to_string(),
        });
    }

    let challenge_root = options
        .with_challenge_location
        .then(|| layout.challenge_dir().display().to_string());

    let mut views = Vec::with_capacity(services.len());
    for service in services.iter().filter(|s| is_web_service(s)) {
        views.push(service_view(service, options, challenge_root.as_deref())?);
    }

    let view = ConfigView {
        generator: env!("CARGO_PKG_NAME"),
        generated_at: generated_at.to_string(),
        challenge_uri: CHALLENGE_URI,
        global: GLOBAL_DIRECTIVES,
        events: EVENTS_DIRECTIVES,
        https: options.https.as_ref().map(|m| HttpsView {
            certificate: m.certificate.display().to_string(),
            certificate_key: m.private_key.display().to_string(),
        }),
        http: HTTP_DIRECTIVES,
        services: views,
    };

    debug!(services = view.services.len(), "Rendering nginx configuration");
    engine.render(NGINX_CONF_TEMPLATE, &view)
}

fn is_web_service(service: &Service) -> bool {
    matches!(service.protocol(), Protocol::Http | Protocol::HttpsOnly)
}

fn service_view(
    service: &Service,
    options: &ConfigOptions,
    challenge_root: Option<&str>,
) -> DeployResult<ServiceView> {
    let directives = service.directives().to_vec();
    let mut servers = Vec::new();

    if options.with_server_names {
        let primary = service.primary_name().ok_or(DeployError::Validation {
            kind: ValidationErrorKind::EmptyServerNames {
                local_port: service.local_port(),
            },
        })?;
        let server_name = service.server_names().join(" ");

        let port_80_lines = match service.protocol() {
            Protocol::HttpsOnly => {
                vec![format!("return 302 https://{}$request_uri;", primary)]
            }
            Protocol::Http => directives.clone(),
        };
        servers.push(ServerView {
            server_name: Some(server_name.clone()),
            listen: "80".to_string(),
            challenge_root: challenge_root.map(str::to_string),
            lines: port_80_lines,
        });

        if options.https.is_some() {
            servers.push(ServerView {
                server_name: Some(server_name),
                listen: "443 ssl".to_string(),
                challenge_root: None,
                lines: directives.clone(),
            });
        }
    }

    servers.push(ServerView {
        server_name: None,
        listen: format!("localhost:{}", service.local_port()),
        challenge_root: None,
        lines: directives,
    });

    Ok(ServiceView {
        title: service.server_names().join(" "),
        servers,
    })
}

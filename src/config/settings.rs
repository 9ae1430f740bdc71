//! Configuration settings for the deployment helper.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::error::{DeployError, DeployResult};
use crate::filesystem::{absolute_path, resolve_absolute_path};
use crate::nginx::{Protocol, Service};

/// Name of the upstream source that holds the nginx tree itself.
pub const SERVER_SOURCE: &str = "nginx";

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub certbot: CertbotConfig,
    #[serde(default = "default_services")]
    pub services: Vec<ServiceConfig>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Paths configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Install prefix of the nginx build, relative to the working directory.
    #[serde(default = "default_install_prefix")]
    pub install_prefix: PathBuf,
    /// Optional directory of `.tera` files overriding built-in templates.
    pub templates_dir: Option<PathBuf>,
}

/// Source build configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    /// Upstream archives, downloaded and unpacked under `<prefix>/src/<name>`.
    #[serde(default = "default_sources")]
    pub sources: Vec<UpstreamSource>,
    /// Optional nginx modules, passed as `--with-<module>`.
    #[serde(default = "default_modules")]
    pub modules: Vec<String>,
    /// Kill `configure`/`make` after this many seconds. Unlimited if unset.
    pub timeout_seconds: Option<u64>,
}

/// One upstream source archive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpstreamSource {
    pub name: String,
    pub url: String,
    /// Configure flag pointing nginx at this tree (e.g. `--with-pcre`).
    pub configure_flag: Option<String>,
}

/// Certbot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CertbotConfig {
    /// Binary name or path.
    #[serde(default = "default_certbot_binary")]
    pub binary: String,
    /// Use the Let's Encrypt staging environment.
    #[serde(default)]
    pub staging: bool,
}

/// A service as written in the settings file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub server_names: Vec<String>,
    pub local_port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: Protocol,
    /// Document root, emitted as `root <absolute path>;`.
    pub root: Option<PathBuf>,
    /// Extra nginx snippet, emitted as `include <absolute path>;`.
    pub include: Option<PathBuf>,
    /// Raw nginx lines appended after `root`/`include`.
    #[serde(default)]
    pub directives: Vec<String>,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_install_prefix() -> PathBuf {
    PathBuf::from("./nginx")
}

fn default_sources() -> Vec<UpstreamSource> {
    vec![
        UpstreamSource {
            name: SERVER_SOURCE.to_string(),
            url: "https://nginx.org/download/nginx-1.21.6.tar.gz".to_string(),
            configure_flag: None,
        },
        UpstreamSource {
            name: "pcre2".to_string(),
            url: "https://github.com/PhilipHazel/pcre2/releases/download/pcre2-10.39/pcre2-10.39.tar.gz"
                .to_string(),
            configure_flag: Some("--with-pcre".to_string()),
        },
        UpstreamSource {
            name: "zlib".to_string(),
            url: "https://zlib.net/zlib-1.2.12.tar.gz".to_string(),
            configure_flag: Some("--with-zlib".to_string()),
        },
    ]
}

fn default_modules() -> Vec<String> {
    ["http_ssl_module", "http_v2_module", "http_addition_module"]
        .iter()
        .map(|m| m.to_string())
        .collect()
}

fn default_certbot_binary() -> String {
    "certbot".to_string()
}

fn default_protocol() -> Protocol {
    Protocol::Http
}

fn default_services() -> Vec<ServiceConfig> {
    vec![ServiceConfig {
        server_names: vec!["jvernay.fr".to_string(), "www.jvernay.fr".to_string()],
        local_port: 12000,
        protocol: Protocol::Http,
        root: Some(PathBuf::from("www.jvernay.fr/root")),
        include: Some(PathBuf::from("www.jvernay.fr/nginx.conf")),
        directives: Vec::new(),
    }]
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            install_prefix: default_install_prefix(),
            templates_dir: None,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            modules: default_modules(),
            timeout_seconds: None,
        }
    }
}

impl Default for CertbotConfig {
    fn default() -> Self {
        Self {
            binary: default_certbot_binary(),
            staging: false,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            paths: PathsConfig::default(),
            build: BuildConfig::default(),
            certbot: CertbotConfig::default(),
            services: default_services(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> DeployResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DeployError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            DeployError::Config { message } => DeployError::Config {
                message: format!("{} ({})", message, path.display()),
            },
            other => other,
        })
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> DeployResult<Self> {
        let settings: Settings = toml::from_str(content).map_err(|e| DeployError::Config {
            message: format!("Failed to parse config: {}", e),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings.
    pub fn validate(&self) -> DeployResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(DeployError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(DeployError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        if !self.build.sources.iter().any(|s| s.name == SERVER_SOURCE) {
            return Err(DeployError::Config {
                message: format!("Build sources must include '{}'", SERVER_SOURCE),
            });
        }

        if self.services.is_empty() {
            return Err(DeployError::Config {
                message: "At least one [[services]] entry is required".to_string(),
            });
        }

        for service in &self.services {
            if service.server_names.is_empty() {
                return Err(DeployError::Config {
                    message: format!(
                        "Service on port {} has no server_names",
                        service.local_port
                    ),
                });
            }
            if service.local_port == 0 {
                return Err(DeployError::Config {
                    message: format!(
                        "Service '{}' has an invalid local_port 0",
                        service.server_names[0]
                    ),
                });
            }
        }

        Ok(())
    }

    /// Build the service list, resolving `root`/`include` to absolute paths.
    pub fn services(&self) -> DeployResult<Vec<Service>> {
        self.services.iter().map(ServiceConfig::to_service).collect()
    }

    /// Every hostname of every service, in declaration order.
    pub fn all_server_names(&self) -> Vec<String> {
        self.services
            .iter()
            .flat_map(|s| s.server_names.iter().cloned())
            .collect()
    }
}

/// nginx serves a missing root as 404s, so it only needs to be absolute.
fn document_root(root: &Path) -> DeployResult<PathBuf> {
    if root.exists() {
        return resolve_absolute_path(root);
    }
    warn!(root = %root.display(), "Document root does not exist yet");
    absolute_path(root)
}

impl ServiceConfig {
    fn to_service(&self) -> DeployResult<Service> {
        let mut directives = Vec::with_capacity(self.directives.len() + 2);
        if let Some(root) = &self.root {
            directives.push(format!("root {};", document_root(root)?.display()));
        }
        if let Some(include) = &self.include {
            directives.push(format!(
                "include {};",
                resolve_absolute_path(include)?.display()
            ));
        }
        directives.extend(self.directives.iter().cloned());

        Service::new(
            self.server_names.iter().cloned(),
            self.local_port,
            self.protocol,
            directives,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.logging.format, "pretty");
        assert_eq!(settings.paths.install_prefix, PathBuf::from("./nginx"));
        assert_eq!(settings.build.sources.len(), 3);
        assert_eq!(settings.certbot.binary, "certbot");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.services.len(), 1);
        assert_eq!(
            settings.all_server_names(),
            vec!["jvernay.fr", "www.jvernay.fr"]
        );
    }

    #[test]
    fn test_parse_services() {
        let settings = Settings::from_toml(
            r#"
            [logging]
            level = "debug"
            format = "json"

            [paths]
            install_prefix = "/opt/site/nginx"

            [certbot]
            staging = true

            [[services]]
            server_names = ["a.com", "www.a.com"]
            local_port = 9000
            directives = ["root /x;"]

            [[services]]
            server_names = ["b.com"]
            local_port = 9001
            protocol = "https_only"
            "#,
        )
        .unwrap();

        assert!(settings.certbot.staging);
        assert_eq!(settings.paths.install_prefix, PathBuf::from("/opt/site/nginx"));

        let services = settings.services().unwrap();
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].protocol(), Protocol::Http);
        assert_eq!(services[0].directives(), ["root /x;"]);
        assert_eq!(services[1].protocol(), Protocol::HttpsOnly);
        assert_eq!(
            settings.all_server_names(),
            vec!["a.com", "www.a.com", "b.com"]
        );
    }

    #[test]
    fn test_root_and_include_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("site");
        std::fs::create_dir_all(site.join("root")).unwrap();
        std::fs::write(site.join("nginx.conf"), "").unwrap();

        let config = ServiceConfig {
            server_names: vec!["a.com".to_string()],
            local_port: 9000,
            protocol: Protocol::Http,
            root: Some(site.join("./root")),
            include: Some(site.join("nginx.conf")),
            directives: vec!["index index.html;".to_string()],
        };
        let service = config.to_service().unwrap();

        let canonical = std::fs::canonicalize(&site).unwrap();
        assert_eq!(
            service.directives(),
            [
                format!("root {};", canonical.join("root").display()),
                format!("include {};", canonical.join("nginx.conf").display()),
                "index index.html;".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_root_made_absolute() {
        let config = ServiceConfig {
            server_names: vec!["a.com".to_string()],
            local_port: 9000,
            protocol: Protocol::Http,
            root: Some(PathBuf::from("/nonexistent/site/root")),
            include: None,
            directives: Vec::new(),
        };
        let service = config.to_service().unwrap();
        assert_eq!(service.directives(), ["root /nonexistent/site/root;"]);
    }

    #[test]
    fn test_missing_include_fails() {
        let config = ServiceConfig {
            server_names: vec!["a.com".to_string()],
            local_port: 9000,
            protocol: Protocol::Http,
            root: None,
            include: Some(PathBuf::from("/nonexistent/site/nginx.conf")),
            directives: Vec::new(),
        };
        assert!(matches!(
            config.to_service(),
            Err(DeployError::Filesystem { .. })
        ));
    }

    #[test]
    fn test_invalid_settings() {
        assert!(Settings::from_toml("[logging]\nlevel = \"loud\"").is_err());
        assert!(Settings::from_toml("[logging]\nformat = \"xml\"").is_err());
        assert!(Settings::from_toml("services = []").is_err());
        assert!(Settings::from_toml(
            "[[services]]\nserver_names = []\nlocal_port = 9000"
        )
        .is_err());
        assert!(Settings::from_toml(
            "[[services]]\nserver_names = [\"a.com\"]\nlocal_port = 0"
        )
        .is_err());
        assert!(Settings::from_toml(
            "[build]\nsources = [{ name = \"zlib\", url = \"https://zlib.net/zlib.tar.gz\" }]"
        )
        .is_err());
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.toml");
        std::fs::write(&path, "[logging]\nlevel = 3").unwrap();

        let err = Settings::load(&path).unwrap_err();
        assert!(err.to_string().contains("deploy.toml"));
    }
}

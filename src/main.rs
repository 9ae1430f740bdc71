//! site-deploy - build, configure, run and certify the website's nginx.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use site_deploy::certbot::{validate_request, CertificateIssuer};
use site_deploy::cli::{Cli, Invocation, Mode};
use site_deploy::config::Settings;
use site_deploy::error::DeployResult;
use site_deploy::filesystem::{absolute_path, resolve_absolute_path};
use site_deploy::nginx::{prepare_challenge_dir, ConfigOptions, NginxLayout, NginxManager};
use site_deploy::templates::TemplateEngine;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Flag combinations are checked before anything else happens
    let invocation = match cli.into_invocation() {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let settings = match &invocation.config {
        Some(path) => match Settings::load(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error loading configuration: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Settings::default(),
    };

    if let Err(e) = init_logging(&settings) {
        eprintln!("Error initializing logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Starting {} v{}", NAME, VERSION);
    if let Some(path) = &invocation.config {
        info!("Configuration loaded from: {}", path.display());
    }

    match run(&invocation, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Deployment failed");
            ExitCode::FAILURE
        }
    }
}

/// Dispatch to the certificate issuer or the nginx manager.
fn run(invocation: &Invocation, settings: &Settings) -> DeployResult<()> {
    let layout = NginxLayout::new(absolute_path(&settings.paths.install_prefix)?);

    match &invocation.mode {
        Mode::Certify { admin_email } => {
            let hostnames = settings.all_server_names();
            validate_request(&hostnames, admin_email)?;
            let issuer = CertificateIssuer::locate(&settings.certbot)?;

            // Only the webroot is created here; an unbuilt prefix stays unbuilt
            if !layout.challenge_dir().exists() {
                prepare_challenge_dir(&layout)?;
            }
            let webroot = resolve_absolute_path(&layout.challenge_dir())?;
            issuer.certify(&hostnames, &webroot, admin_email)
        }
        Mode::Deploy { https } => deploy(
            layout,
            invocation,
            settings,
            ConfigOptions::public(https.clone()),
        ),
        Mode::Local => deploy(layout, invocation, settings, ConfigOptions::local()),
    }
}

fn deploy(
    layout: NginxLayout,
    invocation: &Invocation,
    settings: &Settings,
    options: ConfigOptions,
) -> DeployResult<()> {
    // Resolve services first so a bad site path fails before any build
    let services = settings.services()?;

    let engine = match &settings.paths.templates_dir {
        Some(dir) => TemplateEngine::new(dir)?,
        None => TemplateEngine::builtin()?,
    };

    let manager = NginxManager::new(layout, settings.build.clone(), engine);
    manager.ensure_built(invocation.force_rebuild, invocation.parallel_build)?;
    manager.configure(&services, &options)?;
    let outcome = manager.run()?;

    info!(outcome = ?outcome, "Deployment complete");
    Ok(())
}

/// Initialize logging based on settings.
fn init_logging(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    match settings.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .try_init()?;
        }
    }

    Ok(())
}

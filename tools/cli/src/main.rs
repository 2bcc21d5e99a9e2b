//! ProjectDrive CLI - provision event projects on cloud storage.
//!
//! Runs the admin API server, or performs single provisioning actions
//! directly against the configured providers and the local record store.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use projectdrive_common::{AdminIdentity, ExposeSecret, ProjectCode, Provider, SecretString};
use projectdrive_projects::{LocalProjectStore, NewProject, Project, ProvisioningService};
use projectdrive_server::{AppState, JwtAdminVerifier};
use projectdrive_storage::{create_registry_from_env, http_client, Clock, SystemClock};

#[derive(Parser)]
#[command(name = "projectdrive")]
#[command(about = "ProjectDrive - Event project storage provisioning")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Directory holding project records.
    #[arg(long, env = "PROJECTDRIVE_DATA_DIR", default_value = "./data/projects")]
    data_dir: PathBuf,

    /// Name recorded in audit entries for actions run from the command line.
    #[arg(long, env = "PROJECTDRIVE_ACTOR", default_value = "cli")]
    actor: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the admin HTTP API.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "PROJECTDRIVE_BIND", default_value = "127.0.0.1:8080")]
        bind: SocketAddr,

        /// Shared secret for HS256 admin tokens.
        #[arg(long, env = "PROJECTDRIVE_ADMIN_SECRET", hide_env_values = true)]
        admin_secret: String,
    },

    /// Create a project and its folder tree.
    Create {
        /// Event name, e.g. "Boda Ana".
        #[arg(long)]
        event_name: String,

        /// Event date as YYYY-MM-DD.
        #[arg(long)]
        event_date: String,

        /// Storage provider: "dropbox" or "gdrive".
        #[arg(long, default_value = "gdrive")]
        provider: Provider,
    },

    /// Get or create the export link of a project.
    Link {
        /// Project code.
        code: String,
    },

    /// Revoke the export link of a project.
    Revoke {
        /// Project code.
        code: String,
    },

    /// Show a project record.
    Show {
        /// Project code.
        code: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let service = build_service(&cli.data_dir)?;
    let actor = AdminIdentity::new(cli.actor);

    match cli.command {
        Commands::Serve { bind, admin_secret } => cmd_serve(service, bind, admin_secret).await,

        Commands::Create {
            event_name,
            event_date,
            provider,
        } => cmd_create(&service, event_name, event_date, provider, &actor).await,

        Commands::Link { code } => cmd_link(&service, &code, &actor).await,

        Commands::Revoke { code } => cmd_revoke(&service, &code, &actor).await,

        Commands::Show { code } => cmd_show(&service, &code).await,
    }
}

/// Wire the provisioning service from the environment.
fn build_service(data_dir: &Path) -> Result<Arc<ProvisioningService>> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let http = http_client().context("Failed to build HTTP client")?;
    let registry = create_registry_from_env(http, clock.clone());
    if registry.available().is_empty() {
        tracing::warn!("No storage provider is configured");
    }

    let store = LocalProjectStore::new(data_dir)
        .with_context(|| format!("Failed to open project store at {}", data_dir.display()))?;

    Ok(Arc::new(ProvisioningService::new(
        Arc::new(store),
        Arc::new(registry),
        clock,
    )))
}

fn print_project(project: &Project) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(project)?);
    Ok(())
}

/// Run the admin API.
async fn cmd_serve(
    service: Arc<ProvisioningService>,
    bind: SocketAddr,
    admin_secret: String,
) -> Result<()> {
    let secret = SecretString::from(admin_secret);
    if secret.expose_secret().is_empty() {
        anyhow::bail!("PROJECTDRIVE_ADMIN_SECRET cannot be empty");
    }

    let state = AppState::new(service, Arc::new(JwtAdminVerifier::new(&secret)));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;

    projectdrive_server::serve(listener, state)
        .await
        .context("Server stopped")
}

/// Create a new project.
async fn cmd_create(
    service: &ProvisioningService,
    event_name: String,
    event_date: String,
    provider: Provider,
    actor: &AdminIdentity,
) -> Result<()> {
    info!("Creating {} project for {}", provider, event_name);

    let project = service
        .create_project(
            NewProject {
                event_name,
                event_date,
                provider,
            },
            actor,
        )
        .await
        .context("Failed to create project")?;

    println!("Project created: {}", project.project_code);
    print_project(&project)
}

/// Get or create the export link on the project's own provider.
async fn cmd_link(service: &ProvisioningService, code: &str, actor: &AdminIdentity) -> Result<()> {
    let code = ProjectCode::new(code).context("Invalid project code")?;
    let provider = service.get_project(&code).await?.storage.provider();

    let outcome = service
        .get_or_create_export_link(&code, provider, actor)
        .await
        .context("Failed to get export link")?;

    println!("{}", outcome.link.url);
    if let Some(id) = &outcome.link.id {
        println!("  Link id: {}", id);
    }
    Ok(())
}

/// Revoke the export link.
async fn cmd_revoke(
    service: &ProvisioningService,
    code: &str,
    actor: &AdminIdentity,
) -> Result<()> {
    let code = ProjectCode::new(code).context("Invalid project code")?;
    let provider = service.get_project(&code).await?.storage.provider();

    service
        .revoke_export_link(&code, provider, actor)
        .await
        .context("Failed to revoke export link")?;

    println!("Export link revoked for {}", code);
    Ok(())
}

/// Print a stored project.
async fn cmd_show(service: &ProvisioningService, code: &str) -> Result<()> {
    let code = ProjectCode::new(code).context("Invalid project code")?;
    let project = service.get_project(&code).await?;
    print_project(&project)
}

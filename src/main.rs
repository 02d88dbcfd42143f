use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use portal_client::services::maintenance::MaintenanceService;
use portal_client::services::server::ServerService;
use portal_client::{
    ApiError, AuthContext, AuthMode, BroadcastHub, ClientConfig, ConfigError, Credentials, FileStorage, LoginError,
    LoginForm, LoginOutcome, MemoryNavigator, PortalState, RequestOptions, Storage,
};
use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("http client init failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api request failed: {0}")]
    Api(#[from] ApiError),
    #[error("login failed: {0}")]
    Login(#[from] LoginError),
    #[error("two-factor code required; pass --code")]
    TwoFactorRequired,
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "portal", about = "Game portal API client")]
struct Cli {
    #[arg(long, env = "PORTAL_API_URL")]
    api_url: Option<String>,

    /// `local` (bearer token) or `cookie` (server session).
    #[arg(long, env = "PORTAL_AUTH_MODE")]
    auth_mode: Option<String>,

    /// Where the local credential is kept between invocations.
    #[arg(long, env = "PORTAL_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Six-digit second factor, sent when the backend asks for it.
        #[arg(long)]
        code: Option<String>,
    },
    Logout,
    Status,
    Get {
        endpoint: String,
        #[arg(long)]
        public: bool,
    },
    ServerInfo,
    Maintenance,
}

/// A wired client for one invocation.
struct Session {
    state: PortalState,
    navigator: MemoryNavigator,
    hub: BroadcastHub,
}

impl Session {
    fn open(cli: &Cli, start: &str) -> Result<Self, CliError> {
        let config = ClientConfig::from_lookup(|key| {
            let flag = match key {
                "PORTAL_API_URL" => cli.api_url.clone(),
                "PORTAL_AUTH_MODE" => cli.auth_mode.clone(),
                "PORTAL_TOKEN_FILE" => cli.token_file.as_ref().map(|p| p.display().to_string()),
                _ => None,
            };
            flag.or_else(|| std::env::var(key).ok())
        })?;
        if config.auth_mode == AuthMode::CookieSession {
            tracing::warn!("cookie sessions live only as long as this process");
        }

        let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(&config.token_file));
        let navigator = MemoryNavigator::new(start);
        let state = PortalState::new(config, Some(storage), Arc::new(navigator.clone()))?;
        Ok(Self { state, navigator, hub: BroadcastHub::new() })
    }

    async fn context(&self) -> AuthContext {
        let ctx = self.state.mount_context(&self.hub);
        ctx.settled().await;
        ctx
    }

    fn redirects(&self) -> Vec<String> {
        self.navigator.history()
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output = match &cli.command {
        Command::Login { email, password, code } => {
            run_login(&cli, Credentials::new(email.as_str(), password.as_str()), code.as_deref()).await?
        }
        Command::Logout => run_logout(&cli).await?,
        Command::Status => run_status(&cli).await?,
        Command::Get { endpoint, public } => run_get(&cli, endpoint, *public).await?,
        Command::ServerInfo => run_server_info(&cli).await?,
        Command::Maintenance => run_maintenance(&cli).await?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_login(cli: &Cli, credentials: Credentials, code: Option<&str>) -> Result<Value, CliError> {
    let session = Session::open(cli, "/login")?;
    let ctx = session.context().await;
    let mut form = LoginForm::new(&session.state);

    let mut outcome = form.submit(&credentials, None, &ctx).await?;
    if outcome == LoginOutcome::TwoFactorRequired {
        let Some(code) = code else {
            return Err(CliError::TwoFactorRequired);
        };
        outcome = form.submit(&credentials, Some(code), &ctx).await?;
    }

    Ok(json!({
        "authenticated": outcome == LoginOutcome::Authenticated,
        "mode": mode_name(session.state.auth.mode()),
        "redirects": session.redirects(),
    }))
}

async fn run_logout(cli: &Cli) -> Result<Value, CliError> {
    let session = Session::open(cli, "/account")?;
    let ctx = session.context().await;
    ctx.logout().await;
    Ok(json!({ "authenticated": ctx.is_authenticated(), "redirects": session.redirects() }))
}

async fn run_status(cli: &Cli) -> Result<Value, CliError> {
    let session = Session::open(cli, "/")?;
    let ctx = session.context().await;
    let auth = &session.state.auth;
    Ok(json!({
        "apiUrl": session.state.config.api_url,
        "mode": mode_name(auth.mode()),
        "authenticated": ctx.is_authenticated(),
        "tokenExpired": auth.is_token_expired(),
    }))
}

async fn run_get(cli: &Cli, endpoint: &str, public: bool) -> Result<Value, CliError> {
    let session = Session::open(cli, endpoint)?;
    let options = if public { RequestOptions::public() } else { RequestOptions::default() };
    let result = session.state.api.get::<Value>(endpoint, options).await;
    let redirects = session.redirects();
    if !redirects.is_empty() {
        tracing::info!(?redirects, "request redirected");
    }
    Ok(result?)
}

async fn run_server_info(cli: &Cli) -> Result<Value, CliError> {
    let session = Session::open(cli, "/")?;
    let service = ServerService::new(Arc::clone(&session.state.api));
    let name = service.server_name().await?;
    let config = service.config().await?;
    let stages = service.stages().await?;
    Ok(json!({
        "serverName": name,
        "config": serde_json::to_value(&*config)?,
        "stages": serde_json::to_value(&*stages)?,
    }))
}

async fn run_maintenance(cli: &Cli) -> Result<Value, CliError> {
    let session = Session::open(cli, "/maintenance")?;
    let status = MaintenanceService::new(Arc::clone(&session.state.api)).status().await?;
    Ok(json!({ "maintenance": status.maintenance, "message": status.display_message() }))
}

fn mode_name(mode: AuthMode) -> &'static str {
    match mode {
        AuthMode::LocalCredential => "local",
        AuthMode::CookieSession => "cookie",
    }
}

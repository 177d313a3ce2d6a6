//! Sign Server - upload a file over HTTPS, receive it signed.
//!
//! This binary loads configuration, sets up logging and TLS, and serves the
//! signing router until it receives a shutdown signal.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use axum_server::Handle;
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sign_server::{
    config::Config,
    server::{create_router, load_tls_config, AppState, RouterConfig},
    signer::ScriptSigner,
};

/// How long in-flight requests may drain after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; variables may come from the environment.
    let dotenv = dotenvy::dotenv();

    let config = Config::parse();

    init_logging(config.verbose);

    match dotenv {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => {
            error!("Failed to load .env file: {}", e);
            return ExitCode::FAILURE;
        }
    }

    run_serve(config).await
}

async fn run_serve(config: Config) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let work_dir = match config.work_dir() {
        Ok(dir) => dir,
        Err(e) => {
            error!("Failed to resolve working directory: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let script = Config::resolve(&work_dir, &config.sign_script);
    let cert = Config::resolve(&work_dir, &config.cert);
    let key = Config::resolve(&work_dir, &config.key);
    let auth = config.basic_auth();

    info!("Starting the signature service v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Working directory: {}", work_dir.display());
    info!("  Sign script: {}", script.display());
    info!("  Sign timeout: {}s", config.sign_timeout);
    info!("  Max upload size: {} bytes", config.max_upload_size);
    if auth.is_some() {
        info!("  Auth: enabled (HTTP Basic)");
    } else {
        warn!("  Auth: DISABLED - /sign is publicly accessible");
        warn!("        Enable for production: SIGN_USERNAME=<user> SIGN_PASSWORD=<password>");
    }
    if !script.exists() {
        warn!("  Sign script not found, requests will fail until it exists");
    }

    let addr: SocketAddr = match config.bind_address().parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid bind address {}: {}", config.bind_address(), e);
            return ExitCode::FAILURE;
        }
    };

    let tls_config = match load_tls_config(&cert, &key).await {
        Ok(tls) => tls,
        Err(e) => {
            error!("Failed to load TLS configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let signer = ScriptSigner::new(script).with_timeout(config.sign_timeout());
    let state = AppState::new(work_dir, signer);

    let mut router_config = RouterConfig::new()
        .with_max_upload_size(config.max_upload_size)
        .with_tracing(!config.no_tracing);
    if let Some(auth) = auth {
        router_config = router_config.with_auth(auth);
    }

    let router = create_router(state, router_config);

    info!("Server listening on: https://{}", addr);
    info!("  curl -F file=@app.apk https://{}/sign -o app-signed.apk", addr);

    let handle = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone()));

    if let Err(e) = axum_server::bind_rustls(addr, tls_config)
        .handle(handle)
        .serve(router.into_make_service_with_connect_info::<SocketAddr>())
        .await
    {
        error!("Server failed: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "sign_server=debug,tower_http=debug"
    } else {
        "sign_server=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM, then start a graceful shutdown.
async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received termination signal, shutting down");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}

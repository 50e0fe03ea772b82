//! dirwarden server
//!
//! A small web front-end for administering users and groups stored in
//! an LDAP or Active Directory tree, built with Axum.

mod config;
mod logging;

use std::net::SocketAddr;
use std::sync::Arc;

use config::Config;
use dirwarden_core::DnResolver;
use dirwarden_directory::{
    GroupRepo, LdapGroupRepo, LdapHandle, LdapUserRepo, LdifPopulator,
};
use dirwarden_web::{app_router, AppState, DepartmentCatalog, UserService};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() {
    // Load configuration (fail-fast on missing required values).
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.rust_log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        port = config.port,
        directory = %config.directory.url(),
        flavor = %config.directory.directory_type,
        "Starting dirwarden"
    );

    let handle = match LdapHandle::new(config.directory.clone()) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("Invalid directory configuration: {e}");
            std::process::exit(1);
        }
    };

    let resolver = match DnResolver::parse(&config.directory.base_dn) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Invalid base DN '{}': {e}", config.directory.base_dn);
            std::process::exit(1);
        }
    };

    // Seed the directory before serving any request.
    if let Some(path) = &config.ldif_path {
        let populator = LdifPopulator::new(
            handle.clone(),
            path.clone(),
            config.ldif_default_base.clone(),
        )
        .with_clean(config.ldif_clean);
        if let Err(e) = populator.populate().await {
            tracing::error!("LDIF population failed: {e}");
            std::process::exit(1);
        }
    }

    let user_repo = match LdapUserRepo::new(handle.clone(), resolver.clone()) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to create user store: {e}");
            std::process::exit(1);
        }
    };
    let group_repo = match LdapGroupRepo::new(handle.clone(), resolver.clone()) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to create group store: {e}");
            std::process::exit(1);
        }
    };
    let group_repo: Arc<dyn GroupRepo> = Arc::new(group_repo);

    let user_service = UserService::new(
        Arc::new(user_repo),
        group_repo.clone(),
        resolver,
        config.directory.directory_type,
    );

    let state = AppState::new(user_service, group_repo, DepartmentCatalog::standard());
    let app = app_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = match config.bind_addr().parse() {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("Invalid bind address '{}': {e}", config.bind_addr());
            std::process::exit(1);
        }
    };

    info!(%addr, "Server listening");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    handle.unbind().await;
    info!("Server shutdown complete");
}

/// Graceful shutdown on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {e}");
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

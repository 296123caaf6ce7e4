//! Roster server binary: configuration, logging and graceful shutdown around
//! [`roster_server::router`].
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use roster_server::config::Config;
use salvo::prelude::*;
use salvo::server::ServerHandle;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();
    roster_server::logging::init(&config)?;

    let staff = roster_server::staff_members_from(&config).await?;
    let service = roster_server::service(roster_server::router(staff, config.max_body_size));

    let acceptor = TcpListener::new(config.listen.clone())
        .try_bind()
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    let server = Server::new(acceptor);
    tokio::spawn(listen_shutdown_signal(server.handle(), config.shutdown_timeout()));

    tracing::info!(listen = %config.listen, "roster server started");
    server.serve(service).await;
    tracing::info!("roster server stopped");
    Ok(())
}

async fn listen_shutdown_signal(handle: ServerHandle, timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install ctrl-c handler");
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
                tracing::error!(error = %e, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("ctrl-c received"),
        _ = terminate => tracing::info!("terminate signal received"),
    };

    handle.stop_graceful(Some(timeout));
}

use anyhow::Context;
use clap::Parser;
use snapkv::{server::Server, web, KvService, ServerConfig};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    // RUST_LOG wins over --log-level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("snapkv starting...");

    // Load before serving anything; a corrupt snapshot must not be overwritten
    let service = match KvService::open(&config).await {
        Ok(service) => service,
        Err(e) => {
            error!("Failed to load snapshot: {}", e);
            std::process::exit(1);
        }
    };
    info!("Store ready with {} entries", service.store().len().await);

    let shutdown = CancellationToken::new();

    let server = Server::bind(&config.addr, service.clone()).await?;
    let mut resp_handle = tokio::spawn(server.run(shutdown.clone()));

    let web_handle = match &config.http_addr {
        Some(addr) => {
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind HTTP gateway on {}", addr))?;
            Some(tokio::spawn(web::run_web(listener, service.clone(), shutdown.clone())))
        }
        None => None,
    };

    let early_exit = tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            None
        }
        result = &mut resp_handle => Some(result),
    };

    // Stop serving first so no SET lands after the snapshot is taken
    shutdown.cancel();

    let resp_result = match early_exit {
        Some(result) => {
            error!("RESP server stopped unexpectedly");
            result
        }
        None => resp_handle.await,
    };
    match resp_result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("RESP server error: {:#}", e),
        Err(e) => error!("RESP server task failed: {}", e),
    }

    if let Some(handle) = web_handle {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("HTTP gateway error: {:#}", e),
            Err(e) => error!("HTTP gateway task failed: {}", e),
        }
    }

    match service.persist().await {
        Ok(Some(count)) => info!("Snapshot written with {} entries", count),
        Ok(None) => info!("Persistence disabled, nothing saved"),
        Err(e) => {
            error!("Failed to save snapshot, in-memory data is lost: {}", e);
            std::process::exit(1);
        }
    }

    info!("snapkv stopped");
    Ok(())
}

/// Wait for Ctrl-C or, on unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

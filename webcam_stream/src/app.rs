use crate::config::{Config, Resolution};
use crate::context::AppContext;
use crate::server::HttpServer;

use std::error::Error;
use tokio::signal;

pub async fn start_app(config: Config, resolution: Resolution) -> Result<(), Box<dyn Error>> {
    let context = match AppContext::initialize(&config, resolution) {
        Ok(context) => context,
        Err(e) => {
            tracing::error!("Failed to initialize application: {:?}", e);
            return Err(Box::new(e));
        }
    };

    let server = match HttpServer::new(context.clone(), &config.server).await {
        Ok(server) => server,
        Err(e) => {
            context.teardown();
            return Err(e.into());
        }
    };

    let server_handle = server.run(context.subscribe_shutdown()).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    context.shutdown();
    match server_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("Server error: {:?}", e),
        Err(e) => tracing::error!("Server task failed: {:?}", e),
    }

    context.teardown();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {:?}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {:?}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

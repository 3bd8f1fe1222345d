use crate::{config::ServerConfig, context::AppContext, routes::api_routes};
use axum::Router;
use tokio::{net::TcpListener, sync::broadcast::Receiver, task::JoinHandle};

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new(context: AppContext, config: &ServerConfig) -> anyhow::Result<Self> {
        let addr = config.get_address();

        let router = api_routes().with_state(context);

        let listener = TcpListener::bind(addr).await?;

        Ok(Self { router, listener })
    }

    pub fn local_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(
        self,
        shutdown_rx: Receiver<()>,
    ) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
        tracing::info!("Starting app on {}", self.local_addr()?);

        let listener = self.listener;
        let router = self.router;
        let server_handle = tokio::spawn({
            let mut shutdown_rx = shutdown_rx;
            async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        shutdown_rx.recv().await.ok();
                    })
                    .await?;
                tracing::info!("Server stopped");
                Ok(())
            }
        });

        Ok(server_handle)
    }
}

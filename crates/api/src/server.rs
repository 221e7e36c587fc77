use crate::{
    middleware::{cors_layer, request_logging_middleware, timeout_layer},
    routes::{create_routes, not_found_handler},
    ApiConfig, AppContext,
};
use axum::Router;
use mapbot_common::{MapbotError, Result};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub struct ApiServer {
    config: ApiConfig,
    context: AppContext,
}

impl ApiServer {
    pub fn new(config: ApiConfig, context: AppContext) -> Self {
        Self { config, context }
    }

    pub async fn start(&self) -> Result<()> {
        let app = self.create_app();
        let addr = self.config.bind_address();

        info!("Starting API server on {}", addr);
        info!("CORS origins: {:?}", self.config.cors_origins);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| MapbotError::Internal(format!("cannot bind {}: {}", addr, e)))?;

        info!("API server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| MapbotError::Internal(format!("server error: {}", e)))?;

        info!("API server stopped");
        Ok(())
    }

    pub fn create_app(&self) -> Router {
        create_routes(self.context.clone(), &self.config.static_dir)
            .fallback(not_found_handler)
            .layer(
                ServiceBuilder::new()
                    // Outermost layers (applied first)
                    .layer(TraceLayer::new_for_http())
                    .layer(timeout_layer(&self.config))
                    .layer(cors_layer(&self.config))
                    .layer(axum::middleware::from_fn(request_logging_middleware)),
            )
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        },
    }
}

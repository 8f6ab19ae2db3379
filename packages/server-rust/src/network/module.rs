//! Network module with deferred startup lifecycle.
//!
//! `new()` allocates shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections. The store is opened between `start()` and
//! `serve()`, so the port is known (and probes answer 503) before the
//! server is Ready.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use super::handlers::{
    delete_country_handler, get_country_handler, health_handler, list_countries_handler,
    liveness_handler, readiness_handler, refresh_handler, status_handler, summary_image_handler,
    welcome_handler, AppState,
};
use super::middleware::{build_http_layers, build_timeout_layer};
use super::shutdown::ShutdownController;
use crate::config::NetworkConfig;
use crate::service::RefreshService;
use crate::storage::CountryStore;

/// Manages the HTTP server lifecycle.
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    /// Creates a module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            listener: None,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Handler state sharing this module's shutdown controller.
    #[must_use]
    pub fn app_state(
        &self,
        store: Arc<dyn CountryStore>,
        refresh: Arc<RefreshService>,
        image_path: PathBuf,
    ) -> AppState {
        AppState {
            store,
            refresh,
            image_path: Arc::new(image_path),
            shutdown: Arc::clone(&self.shutdown),
            start_time: Instant::now(),
        }
    }

    /// Assembles the router with all routes and middleware.
    pub fn build_router(&self, state: AppState) -> Router {
        build_router(&self.config, state)
    }

    /// Binds the TCP listener and returns the bound port, which differs from
    /// the configured one when port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves `router` until `shutdown` resolves, then lets in-flight
    /// requests finish.
    ///
    /// Health moves to Ready on entry, Draining when `shutdown` fires and
    /// Stopped once the server has returned.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server hits
    /// a fatal I/O error.
    pub async fn serve(
        self,
        router: Router,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let controller = self.shutdown;

        controller.set_ready();
        info!("serving HTTP connections");

        let draining = Arc::clone(&controller);
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("shutdown signal received, draining requests");
                draining.trigger_shutdown();
            })
            .await?;

        controller.mark_stopped();
        info!("server stopped");
        Ok(())
    }
}

/// Routes:
/// - `GET /` welcome text
/// - `POST /countries/refresh`
/// - `GET /countries/image`
/// - `GET /countries`
/// - `GET|DELETE /countries/{name}`
/// - `GET /status`
/// - `GET /health`, `/health/live`, `/health/ready`
///
/// Every route except refresh is bounded by the request timeout. A refresh
/// is bounded only by its two upstream call timeouts.
pub fn build_router(config: &NetworkConfig, state: AppState) -> Router {
    Router::new()
        .route("/", get(welcome_handler))
        .route("/countries/image", get(summary_image_handler))
        .route("/countries", get(list_countries_handler))
        .route(
            "/countries/{name}",
            get(get_country_handler).delete(delete_country_handler),
        )
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .layer(build_timeout_layer(config))
        .route("/countries/refresh", post(refresh_handler))
        .layer(build_http_layers(config))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::HealthState;

    #[test]
    fn new_creates_module_without_binding() {
        let module = NetworkModule::new(NetworkConfig::default());
        assert!(module.listener.is_none());
    }

    #[test]
    fn shutdown_controller_returns_shared_arc() {
        let module = NetworkModule::new(NetworkConfig::default());
        assert!(Arc::ptr_eq(
            &module.shutdown_controller(),
            &module.shutdown_controller()
        ));
    }

    #[tokio::test]
    async fn start_binds_to_os_assigned_port() {
        let mut module = NetworkModule::new(NetworkConfig {
            host: "127.0.0.1".to_string(),
            ..NetworkConfig::default()
        });
        let port = module.start().await.unwrap();
        assert!(port > 0);
        assert!(module.listener.is_some());
    }

    #[tokio::test]
    async fn serve_without_start_is_an_error() {
        let module = NetworkModule::new(NetworkConfig::default());
        let result = module.serve(Router::new(), std::future::pending()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn serve_walks_health_states_until_stopped() {
        let mut module = NetworkModule::new(NetworkConfig {
            host: "127.0.0.1".to_string(),
            ..NetworkConfig::default()
        });
        module.start().await.unwrap();
        let controller = module.shutdown_controller();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(module.serve(Router::new(), async move {
            let _ = rx.await;
        }));
        tokio::task::yield_now().await;
        tx.send(()).unwrap();
        server.await.unwrap().unwrap();

        assert_eq!(controller.health_state(), HealthState::Stopped);
    }
}

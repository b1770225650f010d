//! Web server for filecab.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::{StorageConfig, WebConfig};
use crate::db::{Database, RefreshTokenRepository};
use crate::file::FileService;
use crate::{FilecabError, Result};

use super::handlers::AppState;
use super::middleware::{JwtState, RateLimitState};
use super::router::create_app;

/// How often expired refresh tokens are purged.
const TOKEN_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// HTTP server wiring the services into the router.
pub struct WebServer {
    addr: SocketAddr,
    db: Database,
    app: Router,
    rate_limit: Arc<RateLimitState>,
}

impl WebServer {
    /// Build the server from configuration and constructed services.
    pub fn new(
        web: &WebConfig,
        storage: &StorageConfig,
        db: Database,
        files: Arc<FileService>,
    ) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", web.host, web.port)
            .parse()
            .map_err(|e| FilecabError::Config(format!("invalid listen address: {e}")))?;

        let jwt = Arc::new(JwtState::new(
            &web.jwt_secret,
            web.jwt_access_token_expiry_secs,
        ));
        let rate_limit = Arc::new(RateLimitState::new(web.login_rate_limit, web.api_rate_limit));
        let app_state = Arc::new(AppState::new(
            db.clone(),
            files,
            jwt,
            web.jwt_refresh_token_expiry_days,
        ));

        let app = create_app(
            app_state,
            rate_limit.clone(),
            &web.cors_origins,
            &storage.public_url,
            &storage.blob_path,
        );

        Ok(Self {
            addr,
            db,
            app,
            rate_limit,
        })
    }

    /// Configured listen address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn start_token_cleanup_task(db: Database) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(TOKEN_CLEANUP_INTERVAL);
            // First tick fires immediately.
            interval.tick().await;

            loop {
                interval.tick().await;
                match RefreshTokenRepository::new(db.pool()).cleanup_expired().await {
                    Ok(0) => tracing::debug!("No expired refresh tokens to clean up"),
                    Ok(count) => {
                        tracing::info!(deleted_count = count, "Cleaned up expired refresh tokens")
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to clean up refresh tokens"),
                }
            }
        });
    }

    async fn bind(self) -> Result<(TcpListener, Router)> {
        let listener = TcpListener::bind(self.addr).await?;

        Self::start_token_cleanup_task(self.db);
        self.rate_limit.start_cleanup_task();

        tracing::info!(addr = %listener.local_addr()?, "Web server listening");
        Ok((listener, self.app))
    }

    /// Serve until the process is stopped.
    pub async fn run(self) -> Result<()> {
        let (listener, app) = self.bind().await?;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }

    /// Serve in the background and return the bound address.
    ///
    /// Useful with port 0.
    pub async fn spawn(self) -> Result<SocketAddr> {
        let (listener, app) = self.bind().await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            let service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, service).await {
                tracing::error!(error = %e, "Web server error");
            }
        });
        Ok(addr)
    }
}

//! Server lifecycle: provision, bind, serve, shut down.

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::Router;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use arstage_core::config::ServerConfig;
use arstage_core::error::{AppError, ErrorKind};
use arstage_core::result::AppResult;

use crate::banner;
use crate::router::build_router;
use crate::tls::{CertificatePair, CertificateProvisioner, ProvisionOutcome};

/// Protocol the server listens with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenMode {
    /// TLS on `port` with the given pair.
    Https(CertificatePair),
    /// Plain HTTP on `fallback_port`.
    Http,
}

impl ListenMode {
    /// URL scheme.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Https(_) => "https",
            Self::Http => "http",
        }
    }

    /// Whether traffic is encrypted.
    pub fn is_secure(&self) -> bool {
        matches!(self, Self::Https(_))
    }

    /// Port this mode binds according to `config`.
    pub fn port(&self, config: &ServerConfig) -> u16 {
        match self {
            Self::Https(_) => config.port,
            Self::Http => config.fallback_port,
        }
    }
}

impl From<ProvisionOutcome> for ListenMode {
    fn from(outcome: ProvisionOutcome) -> Self {
        match outcome {
            ProvisionOutcome::Existing(pair) | ProvisionOutcome::Generated(pair) => {
                Self::Https(pair)
            }
            ProvisionOutcome::Failed(_) => Self::Http,
        }
    }
}

enum Bound {
    Tls {
        handle: Handle,
        task: JoinHandle<std::io::Result<()>>,
    },
    Plain {
        listener: TcpListener,
        router: Router,
    },
}

/// A bound static file server.
pub struct StaticServer {
    mode: ListenMode,
    local_addr: SocketAddr,
    grace: Duration,
    bound: Bound,
}

impl std::fmt::Debug for StaticServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticServer")
            .field("mode", &self.mode)
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

impl StaticServer {
    /// Bind the listener for `mode`.
    ///
    /// In HTTPS mode the PEM pair is loaded here; an unreadable pair is a
    /// configuration error, not a reason to fall back.
    pub async fn bind(config: &ServerConfig, mode: ListenMode) -> AppResult<Self> {
        if !Path::new(&config.static_dir).is_dir() {
            tracing::warn!(dir = %config.static_dir, "Static directory does not exist");
        }
        let router = build_router(&config.static_dir);
        let addr = resolve(&config.host, mode.port(config)).await?;
        let grace = Duration::from_secs(config.shutdown_grace_seconds);

        let (local_addr, bound) = match &mode {
            ListenMode::Https(pair) => {
                let tls = RustlsConfig::from_pem_file(&pair.cert_path, &pair.key_path)
                    .await
                    .map_err(|e| {
                        AppError::with_source(
                            ErrorKind::Configuration,
                            format!(
                                "Failed to load TLS certificate '{}': {}",
                                pair.cert_path.display(),
                                e
                            ),
                            e,
                        )
                    })?;

                let handle = Handle::new();
                let task = tokio::spawn(
                    axum_server::bind_rustls(addr, tls)
                        .handle(handle.clone())
                        .serve(router.into_make_service()),
                );

                match handle.listening().await {
                    Some(local_addr) => (local_addr, Bound::Tls { handle, task }),
                    None => {
                        let reason = match task.await {
                            Ok(Err(e)) => e.to_string(),
                            Ok(Ok(())) => "listener exited".to_string(),
                            Err(e) => e.to_string(),
                        };
                        return Err(AppError::internal(format!(
                            "Failed to bind {}: {}",
                            addr, reason
                        )));
                    }
                }
            }
            ListenMode::Http => {
                let listener = TcpListener::bind(addr)
                    .await
                    .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;
                let local_addr = listener.local_addr()?;
                (local_addr, Bound::Plain { listener, router })
            }
        };

        tracing::info!(
            scheme = mode.scheme(),
            addr = %local_addr,
            "Static server listening"
        );

        Ok(Self {
            mode,
            local_addr,
            grace,
            bound,
        })
    }

    /// The listen mode.
    pub fn mode(&self) -> &ListenMode {
        &self.mode
    }

    /// The bound socket address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until `shutdown` resolves, then drain connections.
    pub async fn serve<F>(self, shutdown: F) -> AppResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.bound {
            Bound::Tls { handle, task } => {
                let grace = self.grace;
                let watcher = tokio::spawn(async move {
                    shutdown.await;
                    tracing::info!("Shutdown signal received, starting graceful shutdown...");
                    handle.graceful_shutdown(Some(grace));
                });

                let result = task.await;
                watcher.abort();
                result
                    .map_err(|e| AppError::internal(format!("Server task failed: {}", e)))?
                    .map_err(|e| AppError::internal(format!("Server error: {}", e)))
            }
            Bound::Plain { listener, router } => axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    shutdown.await;
                    tracing::info!("Shutdown signal received, starting graceful shutdown...");
                })
                .await
                .map_err(|e| AppError::internal(format!("Server error: {}", e))),
        }
    }
}

async fn resolve(host: &str, port: u16) -> AppResult<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| AppError::configuration(format!("Invalid bind address '{host}': {e}")))?
        .next()
        .ok_or_else(|| AppError::configuration(format!("No address found for '{host}'")))
}

/// Runs the static server with the given configuration until Ctrl-C.
pub async fn run_server(config: ServerConfig) -> AppResult<()> {
    tracing::info!("Starting ARStage static server...");

    let outcome = CertificateProvisioner::new(config.tls.clone())
        .provision()
        .await;
    let mode = ListenMode::from(outcome);
    if !mode.is_secure() {
        tracing::info!(
            "Starting HTTP server instead on port {}...",
            config.fallback_port
        );
    }

    let server = StaticServer::bind(&config, mode).await?;
    banner::log_banner(server.mode(), server.local_addr());

    server.serve(shutdown_signal()).await?;

    tracing::info!("ARStage server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
}

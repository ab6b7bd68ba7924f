//! Runtime bootstrapping and lifecycle.
//!
//! The runtime turns a [`ChirpConfig`] into a ready [`Dispatcher`] (Cloud API
//! client, session store, conversation serialization), lets the bot register
//! its handlers, and then serves the webhook until shutdown.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use chirp_runtime::ChirpRuntime;
//!
//! let mut runtime = ChirpRuntime::builder()
//!     .config_file("config/chirp.toml")
//!     .build()
//!     .await?;
//!
//! runtime.dispatcher_mut().command("/start", |ctx| Box::pin(async move {
//!     ctx.reply("Welcome").await?;
//!     Ok(())
//! }));
//!
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::signal;
use tracing::{debug, info};

use chirp_adapter_whatsapp::{CloudApiClient, WhatsAppWebhook};
use chirp_core::{BoxedSessionStore, FileSessionStore, MemorySessionStore};
use chirp_framework::Dispatcher;
use chirp_transport::{ServerHandle, WebhookServer};

use crate::config::{ChirpConfig, ConfigLoader, SessionBackend, SessionConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// A configured bot: dispatcher plus the settings to serve it.
pub struct ChirpRuntime {
    config: ChirpConfig,
    dispatcher: Dispatcher,
}

impl ChirpRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from a loaded configuration.
    ///
    /// Initializes logging, validates the configuration, and opens the
    /// session store.
    pub async fn from_config(config: ChirpConfig) -> RuntimeResult<Self> {
        logging::init_from_config(&config.logging);
        validate_config(&config)?;

        let client = Arc::new(CloudApiClient::new(&config.whatsapp)?);
        let store = open_session_store(&config.session).await?;
        let dispatcher = Dispatcher::new(client)
            .with_session_store(store)
            .serialize_conversations(config.dispatch.serialize_conversations);

        info!(
            log_level = %config.logging.level,
            session_backend = ?config.session.backend,
            "Runtime initialized from configuration"
        );

        Ok(Self { config, dispatcher })
    }

    pub fn config(&self) -> &ChirpConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Returns the dispatcher for registering middleware and handlers.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// Freezes the dispatcher behind the WhatsApp webhook handler.
    pub fn into_webhook(self) -> WhatsAppWebhook {
        WhatsAppWebhook::new(
            Arc::new(self.dispatcher),
            self.config.whatsapp.verify_token,
        )
    }

    /// Binds the webhook server and serves on a background task.
    pub async fn start(self) -> RuntimeResult<ServerHandle> {
        let server = self.config.server.clone();
        debug!(
            middleware = self.dispatcher.middleware_count(),
            "Starting webhook server"
        );

        let webhook = Arc::new(self.into_webhook());
        let bound = WebhookServer::bind(&server.bind_addr(), &server.path, webhook).await?;
        info!(addr = %bound.local_addr(), path = %bound.path(), "Chirp runtime started");

        Ok(bound.spawn())
    }

    /// Runs until Ctrl+C or SIGTERM.
    pub async fn run(self) -> RuntimeResult<()> {
        let handle = self.start().await?;
        info!("Chirp runtime is now running. Press Ctrl+C to stop.");

        let signalled = wait_for_shutdown().await;
        handle.shutdown().await?;
        info!("Chirp runtime stopped");
        signalled
    }

    /// Runs until `shutdown` completes.
    pub async fn run_until<F>(self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let handle = self.start().await?;
        shutdown.await;
        handle.shutdown().await?;
        info!("Chirp runtime stopped");
        Ok(())
    }
}

impl std::fmt::Debug for ChirpRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChirpRuntime")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

async fn open_session_store(config: &SessionConfig) -> RuntimeResult<BoxedSessionStore> {
    let store: BoxedSessionStore = match config.backend {
        SessionBackend::Memory => Arc::new(MemorySessionStore::new()),
        SessionBackend::File => {
            let path: &Path = &config.file_path;
            debug!(path = %path.display(), "Opening session file");
            Arc::new(FileSessionStore::open(path).await?)
        }
    };
    Ok(store)
}

/// Waits for Ctrl+C or SIGTERM.
async fn wait_for_shutdown() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .map_err(RuntimeError::Signal)?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result.map_err(RuntimeError::Signal)?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.map_err(RuntimeError::Signal)?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`ChirpRuntime`] loaded through [`ConfigLoader`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration programmatically, below files and environment.
    pub fn merge(mut self, config: ChirpConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    pub async fn build(self) -> RuntimeResult<ChirpRuntime> {
        let config = self.config_loader.load()?;
        ChirpRuntime::from_config(config).await
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

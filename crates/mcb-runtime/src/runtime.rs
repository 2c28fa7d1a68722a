//! The update loop that drives a bot.
//!
//! A [`BotRuntime`] ties together the loaded [`McbConfig`], the registry built
//! from a bot's [`Configuration`] and the outbound [`BoxedBot`] session. It
//! pulls batches of updates from an [`UpdateSource`] and dispatches every
//! update of each batch in order.
//!
//! ```rust,ignore
//! let runtime = BotRuntime::builder()
//!     .config_file("config/mcb.toml")
//!     .build(Arc::new(MyBot), session)?;
//!
//! // Until Ctrl+C / SIGTERM or until the source ends
//! let stats = runtime.run(poller).await;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::signal;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, McbConfig};
use crate::error::{LoggingError, RuntimeError, RuntimeResult};
use crate::logging;
use mcb_core::{BoxedBot, Update};
use mcb_framework::{
    BoxError, BoxedListener, Configuration, DispatchReport, DispatchResult, EventDispatcher,
    RegistrationBuilder, UpdateListener,
};

const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(3);

/// Where updates come from, e.g. a long-polling client.
#[async_trait]
pub trait UpdateSource: Send {
    /// Waits for the next batch. `Ok(None)` means the source is exhausted.
    async fn next_batch(&mut self) -> Result<Option<Vec<Update>>, BoxError>;
}

/// Counters collected by one run of the update loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    pub batches: u64,
    pub updates: u64,
    pub dispatch_errors: u64,
    pub source_errors: u64,
}

/// A configured bot ready to process updates.
pub struct BotRuntime {
    config: McbConfig,
    dispatcher: EventDispatcher,
    bot: BoxedBot,
    error_backoff: Duration,
}

impl BotRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Builds the runtime for `configuration` under an already loaded config.
    ///
    /// Logging is initialized first; an already installed subscriber is kept.
    /// The `bot` section of `config` is applied onto the settings the
    /// configuration declares before the registry is built.
    pub fn from_config<C: Configuration>(
        config: McbConfig,
        configuration: Arc<C>,
        bot: BoxedBot,
    ) -> RuntimeResult<Self> {
        match logging::init_from_config(&config.logging) {
            Ok(()) | Err(LoggingError::AlreadyInitialized(_)) => {}
            Err(err) => return Err(err.into()),
        }

        let mut builder = RegistrationBuilder::from_configuration(configuration);
        if let Some(settings) = builder.manifest_mut().settings_mut() {
            config.bot.apply(settings);
        }
        let registry = builder.build()?;
        if registry.settings().bot_token.trim().is_empty() {
            return Err(RuntimeError::MissingToken);
        }

        info!(
            bot = bot.id(),
            handlers = registry.len(),
            log_level = %config.logging.level,
            "Runtime initialized from configuration"
        );

        Ok(Self {
            config,
            dispatcher: EventDispatcher::new(registry),
            bot,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        })
    }

    /// Attaches a listener for double dispatch.
    pub fn with_listener(mut self, listener: impl UpdateListener) -> Self {
        self.dispatcher = self.dispatcher.with_listener(listener);
        self
    }

    /// Sets how long to wait after the source fails before polling again.
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    pub fn config(&self) -> &McbConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Dispatches a single update.
    pub async fn handle(&self, update: Update) -> DispatchResult<DispatchReport> {
        self.dispatcher
            .dispatch(Arc::new(update), Arc::clone(&self.bot))
            .await
    }

    /// Runs until Ctrl+C, SIGTERM or the end of `source`.
    pub async fn run<S: UpdateSource>(&self, source: S) -> RuntimeStats {
        info!("mcb runtime is now running. Press Ctrl+C to stop.");
        self.run_until(source, wait_for_shutdown()).await
    }

    /// Runs until `shutdown` completes or `source` ends.
    ///
    /// A batch that is already being dispatched is finished before the
    /// shutdown is observed.
    pub async fn run_until<S, F>(&self, mut source: S, shutdown: F) -> RuntimeStats
    where
        S: UpdateSource,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut stats = RuntimeStats::default();
        info!(bot = self.bot.id(), "Runtime started");

        loop {
            let batch = tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                batch = source.next_batch() => batch,
            };

            match batch {
                Ok(Some(updates)) => {
                    stats.batches += 1;
                    self.process_batch(updates, &mut stats).await;
                }
                Ok(None) => {
                    info!("Update source exhausted");
                    break;
                }
                Err(err) => {
                    stats.source_errors += 1;
                    warn!(error = %err, backoff = ?self.error_backoff, "Failed to fetch updates");
                    tokio::select! {
                        biased;
                        () = &mut shutdown => {
                            info!("Shutdown requested");
                            break;
                        }
                        () = tokio::time::sleep(self.error_backoff) => {}
                    }
                }
            }
        }

        info!(
            batches = stats.batches,
            updates = stats.updates,
            dispatch_errors = stats.dispatch_errors,
            source_errors = stats.source_errors,
            "Runtime stopped"
        );
        stats
    }

    async fn process_batch(&self, updates: Vec<Update>, stats: &mut RuntimeStats) {
        debug!(size = updates.len(), "Processing update batch");
        for update in updates {
            let update_id = update.update_id;
            stats.updates += 1;
            match self.handle(update).await {
                Ok(report) => {
                    debug!(update_id, handlers = report.total(), "Update dispatched");
                }
                Err(err) => {
                    stats.dispatch_errors += 1;
                    error!(update_id, error = %err, "Dispatch failed");
                }
            }
        }
    }
}

impl std::fmt::Debug for BotRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotRuntime")
            .field("bot", &self.bot.id())
            .field("handlers", &self.dispatcher.registry().len())
            .field("error_backoff", &self.error_backoff)
            .finish_non_exhaustive()
    }
}

/// Completes on Ctrl+C, or SIGTERM on Unix.
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            Err(err) => {
                warn!(error = %err, "Failed to register SIGTERM handler");
                wait_for_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(err) => {
            error!(error = %err, "Failed to listen for Ctrl+C, running until the source ends");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Loads configuration and builds a [`BotRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    listener: Option<BoxedListener>,
    error_backoff: Duration,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            listener: None,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

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

    /// Merges programmatic configuration below files and environment.
    pub fn merge(mut self, config: McbConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    pub fn listener(mut self, listener: impl UpdateListener) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    pub fn build<C: Configuration>(
        self,
        configuration: Arc<C>,
        bot: BoxedBot,
    ) -> RuntimeResult<BotRuntime> {
        let config = self.config_loader.load()?;
        let mut runtime = BotRuntime::from_config(config, configuration, bot)?
            .with_error_backoff(self.error_backoff);
        if let Some(listener) = self.listener {
            runtime.dispatcher = runtime.dispatcher.with_shared_listener(listener);
        }
        Ok(runtime)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use agora_dispatch::Dispatcher;
use agora_engine::LifecycleController;
use agora_ledger::BonusLedger;
use agora_meeting::MeetingController;
use agora_store::{InMemoryStore, NewAgent, NewChannel, Store, StoreError};
use agora_types::ChannelKind;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Agora daemon server
pub struct Server {
    config: DaemonConfig,
    store: Arc<dyn Store>,
    engine: LifecycleController,
    dispatcher: Dispatcher,
}

impl Server {
    /// Wire the full stack from configuration.
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());

        let ledger = BonusLedger::new(store.clone());
        let dispatcher = Dispatcher::new(store.clone(), config.dispatch.clone());
        let meeting = MeetingController::new(
            store.clone(),
            ledger.clone(),
            dispatcher.health(),
            config.meeting.clone(),
        );
        let engine = LifecycleController::new(
            store.clone(),
            ledger,
            dispatcher.clone(),
            meeting,
            config.engine.clone(),
        );

        let server = Self {
            config,
            store,
            engine,
            dispatcher,
        };
        server.seed_board().await?;
        Ok(server)
    }

    /// Create the meeting channel and any configured agents, if absent.
    async fn seed_board(&self) -> DaemonResult<()> {
        if self.store.meeting_channel().await?.is_none() {
            let board = &self.config.board;
            self.store
                .insert_channel(NewChannel {
                    slug: board.meeting_channel_slug.clone(),
                    name: board.meeting_channel_name.clone(),
                    description: "Synchronized meeting rounds".to_string(),
                    emoji: "\u{1F3DB}\u{FE0F}".to_string(),
                    category: "meetings".to_string(),
                    kind: ChannelKind::Meeting,
                })
                .await?;
            tracing::info!(slug = %board.meeting_channel_slug, "Seeded meeting channel");
        }

        for seed in &self.config.board.seed_agents {
            match self
                .store
                .register_agent(NewAgent {
                    name: seed.name.clone(),
                    active: true,
                    callback_url: seed.callback_url.clone(),
                    bearer_token: seed.bearer_token.clone(),
                    avatar_emoji: seed.avatar_emoji.clone(),
                    bio: String::new(),
                    model_name: seed.model_name.clone(),
                })
                .await
            {
                Ok(agent) => tracing::info!(name = %agent.name, "Seeded agent"),
                Err(StoreError::Conflict(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    /// Run the server until shutdown, then drain in-flight deliveries.
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        let state = AppState::new(
            self.store.clone(),
            self.engine.clone(),
            self.dispatcher.clone(),
        );
        let app = create_router(state);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Agora daemon listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!(
            in_flight = self.dispatcher.in_flight(),
            "Agora daemon shutting down, draining deliveries"
        );
        self.dispatcher.drain().await;

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}

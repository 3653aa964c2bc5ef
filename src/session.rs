//! Top-level session
//!
//! Owns the transport connection, its readiness gate and the registry of
//! live conversations. The registry is an owned map behind the session; no
//! ambient or global state.

use crate::conversation::{Conversation, OverlapPolicy};
use crate::error::ChatError;
use crate::protocol::ConversationSettings;
use crate::transport::Transport;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Default remote endpoint for the chat backend
pub const DEFAULT_ENDPOINT: &str = "wss://public.backend.medisearch.io:443/ws/medichat/api";

/// Connection configuration, supplied programmatically
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub endpoint: String,
    pub api_key: String,
}

impl SessionConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Read `MEDICHAT_API_KEY` (and optionally `MEDICHAT_ENDPOINT`)
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("MEDICHAT_API_KEY").ok()?;
        let mut config = Self::new(api_key);
        if let Ok(endpoint) = std::env::var("MEDICHAT_ENDPOINT") {
            config.endpoint = endpoint;
        }
        Some(config)
    }
}

/// Options for creating a conversation
#[derive(Debug, Clone, Default)]
pub struct ConversationOptions {
    pub settings: ConversationSettings,
    /// Carried-forward history; must have even length (ends on an agent
    /// turn, or empty)
    pub seed_history: Vec<String>,
    pub overlap_policy: OverlapPolicy,
}

impl ConversationOptions {
    pub fn with_settings(mut self, settings: ConversationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_seed_history(mut self, seed_history: Vec<String>) -> Self {
        self.seed_history = seed_history;
        self
    }

    pub fn with_overlap_policy(mut self, overlap_policy: OverlapPolicy) -> Self {
        self.overlap_policy = overlap_policy;
        self
    }
}

/// One physical connection backing any number of logical conversations
pub struct Session {
    transport: Arc<dyn Transport>,
    config: SessionConfig,
    conversations: RwLock<HashMap<String, Arc<Conversation>>>,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>, config: SessionConfig) -> Self {
        Self {
            transport,
            config,
            conversations: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve the readiness gate for this connection
    pub async fn is_ready(&self) -> bool {
        self.transport.readiness().is_ready().await
    }

    /// Create a conversation once the transport is usable.
    ///
    /// Fails if the connection never opened, or if the seed history does not
    /// end on a completed agent turn.
    pub async fn create_conversation(
        &self,
        options: ConversationOptions,
    ) -> Result<Arc<Conversation>, ChatError> {
        if !self.is_ready().await {
            return Err(ChatError::NotReady);
        }
        if options.seed_history.len() % 2 != 0 {
            return Err(ChatError::MalformedSeedHistory(options.seed_history.len()));
        }

        let id = Uuid::new_v4().to_string();
        let conversation = Conversation::spawn(
            id.clone(),
            self.config.api_key.clone(),
            options.settings,
            options.seed_history,
            options.overlap_policy,
            Arc::clone(&self.transport),
        );

        self.conversations
            .write()
            .await
            .insert(id.clone(), Arc::clone(&conversation));
        tracing::info!(conversation_id = %id, "conversation created");
        Ok(conversation)
    }

    /// Look up a live conversation by id
    pub async fn conversation(&self, id: &str) -> Option<Arc<Conversation>> {
        self.conversations.read().await.get(id).cloned()
    }

    /// All live conversations
    pub async fn conversations(&self) -> Vec<Arc<Conversation>> {
        self.conversations.read().await.values().cloned().collect()
    }

    /// Close every conversation and the underlying connection
    pub async fn destroy(&self) {
        let conversations: Vec<_> = self.conversations.write().await.drain().collect();
        for (id, conversation) in conversations {
            if let Err(error) = conversation.close().await {
                tracing::warn!(conversation_id = %id, %error, "failed to close conversation");
            }
        }
        self.transport.shutdown().await;
        tracing::info!("session destroyed");
    }
}

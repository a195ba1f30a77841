//! Front-end session state
//!
//! Per-session chat history kept by the front ends. The chatbot core never
//! reads or writes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ChatbotError;
use crate::Result;

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Bot,
}

/// A single message in a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub timestamp: DateTime<Utc>,
    pub role: MessageRole,
    pub content: String,
}

impl SessionMessage {
    pub fn new(role: MessageRole, content: String) -> Self {
        Self {
            timestamp: Utc::now(),
            role,
            content,
        }
    }
}

/// Latest user/bot pair, the part of a session a chat view shows
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exchange {
    pub user: String,
    pub bot: String,
}

/// Chat history of one front-end session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    messages: Vec<SessionMessage>,
}

impl ChatSession {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    /// Record one user utterance and the bot's answer
    pub fn record_exchange(&mut self, user: impl Into<String>, bot: impl Into<String>) {
        self.messages
            .push(SessionMessage::new(MessageRole::User, user.into()));
        self.messages
            .push(SessionMessage::new(MessageRole::Bot, bot.into()));
        self.updated_at = Utc::now();
    }

    pub fn messages(&self) -> impl Iterator<Item = &SessionMessage> {
        self.messages.iter()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Most recent user message with the bot reply that followed it
    pub fn latest_exchange(&self) -> Option<Exchange> {
        let bot_idx = self
            .messages
            .iter()
            .rposition(|m| m.role == MessageRole::Bot)?;
        let user = self.messages[..bot_idx]
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)?;

        Some(Exchange {
            user: user.content.clone(),
            bot: self.messages[bot_idx].content.clone(),
        })
    }
}

/// Trait for session persistence
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn record_exchange(&self, session_id: Uuid, user: &str, bot: &str) -> Result<()>;
    async fn load(&self, session_id: Uuid) -> Result<ChatSession>;
    async fn session_ids(&self) -> Result<Vec<Uuid>>;
}

/// In-memory session store, lost on restart
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, ChatSession>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn record_exchange(&self, session_id: Uuid, user: &str, bot: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id)
            .or_insert_with(|| ChatSession::new(session_id))
            .record_exchange(user, bot);
        Ok(())
    }

    async fn load(&self, session_id: Uuid) -> Result<ChatSession> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| ChatbotError::SessionNotFound(session_id.to_string()))
    }

    async fn session_ids(&self) -> Result<Vec<Uuid>> {
        let sessions = self.sessions.read().await;

        let mut items: Vec<_> = sessions
            .values()
            .map(|s| (s.session_id, s.created_at))
            .collect();
        items.sort_by_key(|(_, created_at)| *created_at);

        Ok(items.into_iter().map(|(id, _)| id).collect())
    }
}

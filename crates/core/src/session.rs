//! Session and turn domain types.
//!
//! A session is an append-only, chronologically ordered list of turns.
//! Recency matters: enrichment reads the latest user message and the
//! history context window keeps only the newest turns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// Unique identifier for a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who produced a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "bot" => Some(Self::Bot),
            _ => None,
        }
    }
}

/// One user message and the response that was given to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(default)]
    pub user_message: String,

    #[serde(default)]
    pub bot_response: String,

    #[serde(default)]
    pub is_feedback: bool,
}

impl Turn {
    pub fn new(user_message: impl Into<String>, bot_response: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            bot_response: bot_response.into(),
            is_feedback: false,
        }
    }

    pub fn feedback(user_message: impl Into<String>, bot_response: impl Into<String>) -> Self {
        Self {
            is_feedback: true,
            ..Self::new(user_message, bot_response)
        }
    }
}

/// A single persisted message row, as the session store records it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub sender: Sender,
    pub text: String,
    #[serde(default)]
    pub is_feedback: bool,
}

/// A conversation session with its ordered history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    #[serde(default)]
    pub history: Vec<Turn>,
}

impl Session {
    pub fn empty(session_id: &SessionId) -> Self {
        Self {
            session_id: session_id.0.clone(),
            history: Vec::new(),
        }
    }

    /// Rebuild turns from sender rows in insertion order.
    ///
    /// A user row opens a turn; the next bot row closes it. A bot row with no
    /// open turn becomes a bot-only turn. A turn is feedback if either of its
    /// rows was flagged.
    pub fn from_messages(session_id: &SessionId, messages: &[StoredMessage]) -> Self {
        let mut history = Vec::new();
        let mut open: Option<Turn> = None;

        for msg in messages {
            match msg.sender {
                Sender::User => {
                    if let Some(turn) = open.take() {
                        history.push(turn);
                    }
                    open = Some(Turn {
                        user_message: msg.text.clone(),
                        bot_response: String::new(),
                        is_feedback: msg.is_feedback,
                    });
                }
                Sender::Bot => {
                    let mut turn = open.take().unwrap_or(Turn {
                        user_message: String::new(),
                        bot_response: String::new(),
                        is_feedback: false,
                    });
                    turn.bot_response = msg.text.clone();
                    turn.is_feedback |= msg.is_feedback;
                    history.push(turn);
                }
            }
        }

        if let Some(turn) = open {
            history.push(turn);
        }

        Self {
            session_id: session_id.0.clone(),
            history,
        }
    }

    /// The most recent non-feedback turn that carries a user message.
    pub fn last_user_message(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .filter(|t| !t.is_feedback)
            .find(|t| !t.user_message.is_empty())
            .map(|t| t.user_message.as_str())
    }
}

/// Persistence for session history.
///
/// Implementations: SQLite, in-memory (for testing).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Register a session. Creating an existing session is a no-op.
    async fn create(&self, id: &SessionId) -> std::result::Result<(), StoreError>;

    /// Load a session. Unknown ids yield an empty history, not an error.
    async fn fetch(&self, id: &SessionId) -> std::result::Result<Session, StoreError>;

    /// Append one message row to a session.
    async fn append(
        &self,
        id: &SessionId,
        sender: Sender,
        text: &str,
        is_feedback: bool,
    ) -> std::result::Result<(), StoreError>;

    /// Append a full turn: the user row, then the bot row.
    ///
    /// Both rows land together or not at all, and no other turn's rows may
    /// fall between them.
    async fn append_turn(&self, id: &SessionId, turn: &Turn) -> std::result::Result<(), StoreError>;
}

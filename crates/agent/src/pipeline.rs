//! One user turn, end to end.
//!
//! 1. **Filter** low-information input (canned reply, no retrieval)
//! 2. **Enrich** the message from the previous user turn
//! 3. **Classify** the mode on the enriched text
//! 4. **Retrieve** documents, stories, images and history
//! 5. **Compose** the prompt behind the mode's assistant profile
//! 6. **Generate**, falling back to canned replies on failure
//! 7. **Record** the turn once the reply is final

use parley_config::{ConfigError, ConfigHandle, ConfigSnapshot};
use parley_core::provider::{GenerationRequest, Generator};
use parley_core::session::{Session, SessionId, SessionStore, Turn};
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::enrichment::enrich;
use crate::gibberish::{GibberishFilter, Lexicon};
use crate::image::KeywordMemory;
use crate::keywords::KeywordSet;
use crate::mode::{Mode, ModeClassifier};
use crate::profile::{profile_for, render_profile, with_profile};
use crate::prompt::compose;
use crate::retrieval::{ContextRetriever, RetrievalRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// The generator produced the reply.
    Answered,
    /// The message was rejected before retrieval.
    Gibberish,
    /// The generator asked us to back off.
    RateLimited,
    /// The generator failed for any other reason.
    GenerationFailed,
}

/// The result of one turn, including the session history after it was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub session_id: String,
    pub user_message: String,
    pub bot_response: String,
    /// `None` when the message never reached mode classification.
    pub mode: Option<Mode>,
    pub status: TurnStatus,
    pub history: Vec<Turn>,
}

pub struct ChatPipeline {
    config: Arc<ConfigHandle>,
    store: Arc<dyn SessionStore>,
    generator: Arc<dyn Generator>,
    retriever: ContextRetriever,
    lexicon: Arc<dyn Lexicon>,
    /// Image keyword memory per session, bounded and expired on idle.
    memories: Cache<String, KeywordMemory>,
}

impl ChatPipeline {
    pub fn new(
        config: Arc<ConfigHandle>,
        store: Arc<dyn SessionStore>,
        generator: Arc<dyn Generator>,
        retriever: ContextRetriever,
        lexicon: Arc<dyn Lexicon>,
    ) -> Self {
        let snapshot = config.snapshot();
        let sessions = &snapshot.config.sessions;
        let memories = Cache::builder()
            .max_capacity(sessions.memory_capacity)
            .time_to_idle(Duration::from_secs(sessions.memory_idle_secs))
            .build();

        Self {
            config,
            store,
            generator,
            retriever,
            lexicon,
            memories,
        }
    }

    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.config.snapshot()
    }

    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    /// Register a new session under a fresh UUID.
    pub async fn start_session(&self) -> Result<SessionId, parley_core::Error> {
        let id = SessionId::new();
        self.store.create(&id).await?;
        info!(session_id = %id, "Session started");
        Ok(id)
    }

    /// The stored history of a session. Unknown sessions are empty.
    pub async fn history(&self, session_id: &SessionId) -> Result<Session, parley_core::Error> {
        Ok(self.store.fetch(session_id).await?)
    }

    /// Log user feedback. Feedback is not part of the conversation history.
    pub fn record_feedback(&self, session_id: &str, user: &str, feedback: &str) {
        info!(target: "feedback", session_id, user, feedback, "Feedback received");
    }

    /// Re-read configuration and profiles. On failure the current snapshot stays live.
    pub fn reload_config(&self) -> Result<(), ConfigError> {
        self.config.reload()?;
        Ok(())
    }

    pub async fn handle_turn(
        &self,
        session_id: &SessionId,
        user_message: &str,
    ) -> Result<TurnOutcome, parley_core::Error> {
        let snapshot = self.config.snapshot();
        let config = &snapshot.config;

        let filter = GibberishFilter::new(self.lexicon.clone(), &config.gibberish);
        if filter.is_gibberish(user_message) {
            info!(session_id = %session_id, "Rejected low-information message");
            return self
                .record(
                    session_id,
                    user_message,
                    config.responses.gibberish.clone(),
                    None,
                    TurnStatus::Gibberish,
                )
                .await;
        }

        let session = self.store.fetch(session_id).await?;
        let keywords = KeywordSet::from_config(&config.keywords);
        let query = enrich(&keywords, &session, user_message);
        let mode = ModeClassifier::from_config(&config.keywords).infer_mode(&query.text);
        info!(session_id = %session_id, mode = %mode, tags = ?query.tags, "Handling turn");

        let mut memory = self.memory_for(session_id);
        let context = self
            .retriever
            .retrieve(
                &RetrievalRequest {
                    user_message,
                    query: &query,
                    mode,
                    session: &session,
                },
                config,
                &keywords,
                &mut memory,
            )
            .await;
        self.remember(session_id, memory);

        let preamble = render_profile(profile_for(&snapshot.profiles, mode), mode);
        let prompt = with_profile(&preamble, &compose(user_message, &context));

        let request = GenerationRequest {
            model: config.generation.model.clone(),
            prompt,
            temperature: config.generation.temperature,
            max_tokens: config.generation.max_tokens,
        };

        let (bot_response, status) = match self.generator.generate(request).await {
            Ok(response) => (response.text, TurnStatus::Answered),
            Err(e) if e.is_rate_limited() => {
                warn!(session_id = %session_id, error = %e, "Generation rate limited");
                (config.responses.retry_later.clone(), TurnStatus::RateLimited)
            }
            Err(e) => {
                error!(session_id = %session_id, provider = self.generator.name(), error = %e, "Generation failed");
                (config.responses.generation_failed.clone(), TurnStatus::GenerationFailed)
            }
        };

        self.record(session_id, user_message, bot_response, Some(mode), status)
            .await
    }

    async fn record(
        &self,
        session_id: &SessionId,
        user_message: &str,
        bot_response: String,
        mode: Option<Mode>,
        status: TurnStatus,
    ) -> Result<TurnOutcome, parley_core::Error> {
        self.store
            .append_turn(session_id, &Turn::new(user_message, bot_response.as_str()))
            .await?;
        let history = self.store.fetch(session_id).await?.history;

        Ok(TurnOutcome {
            session_id: session_id.to_string(),
            user_message: user_message.to_string(),
            bot_response,
            mode,
            status,
            history,
        })
    }

    fn memory_for(&self, session_id: &SessionId) -> KeywordMemory {
        self.memories.get(session_id.as_str()).unwrap_or_default()
    }

    fn remember(&self, session_id: &SessionId, memory: KeywordMemory) {
        if memory == KeywordMemory::default() {
            return;
        }
        self.memories.insert(session_id.to_string(), memory);
    }
}

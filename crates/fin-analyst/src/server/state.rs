//! Application state for the analyst server

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::conversation::{Orchestrator, Session};
use crate::error::{Error, Result};
use crate::generation::PromptTemplate;
use crate::ingestion::IngestPipeline;
use crate::providers::{GeminiProviders, ProviderFactory};

/// Handle to one session; holding the lock serializes work on it
pub type SessionHandle = Arc<Mutex<Session>>;

/// A live session and when it was last looked up
struct SessionSlot {
    handle: SessionHandle,
    last_access: DateTime<Utc>,
}

impl SessionSlot {
    fn idle_secs(&self, now: DateTime<Utc>) -> u64 {
        now.signed_duration_since(self.last_access).num_seconds().max(0) as u64
    }

    /// A locked session has a request in flight
    fn is_busy(&self) -> bool {
        self.handle.try_lock().is_err()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: AppConfig,
    /// Live sessions, independent of each other
    sessions: DashMap<Uuid, SessionSlot>,
    /// Extraction, chunking and indexing
    pipeline: IngestPipeline,
    /// Validated prompt template
    template: PromptTemplate,
    /// Builds Gemini clients per credential
    providers: Arc<dyn ProviderFactory>,
}

impl AppState {
    /// Create application state backed by Gemini
    pub fn new(config: AppConfig) -> Result<Self> {
        let pipeline = IngestPipeline::from_config(&config)?;
        let providers = Arc::new(GeminiProviders::new(config.llm.clone()));
        Self::from_parts(config, pipeline, providers)
    }

    /// Create application state from explicit components
    pub fn from_parts(
        config: AppConfig,
        pipeline: IngestPipeline,
        providers: Arc<dyn ProviderFactory>,
    ) -> Result<Self> {
        config.validate()?;

        let template = match &config.prompt.template {
            Some(custom) => PromptTemplate::with_language(custom, &config.prompt.response_language)?,
            None => PromptTemplate::financial_analyst(&config.prompt.response_language)?,
        };

        tracing::info!(
            "Initialized state (generate: {}, embed: {}, chunk {}/{}, top_k {})",
            providers.generate_model(),
            providers.embed_model(),
            config.chunking.chunk_size,
            config.chunking.chunk_overlap,
            config.retrieval.top_k
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                sessions: DashMap::new(),
                pipeline,
                template,
                providers,
            }),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn pipeline(&self) -> &IngestPipeline {
        &self.inner.pipeline
    }

    pub fn providers(&self) -> &dyn ProviderFactory {
        self.inner.providers.as_ref()
    }

    /// Start a session, seeded with the server-wide key if one is configured
    ///
    /// Idle sessions are swept first. At capacity the least recently used
    /// idle session is dropped; if every session is busy the request fails.
    pub fn create_session(&self) -> Result<Uuid> {
        self.evict_idle();

        let max_sessions = self.inner.config.server.max_sessions;
        if self.inner.sessions.len() >= max_sessions {
            let oldest = self
                .inner
                .sessions
                .iter()
                .filter(|entry| !entry.is_busy())
                .min_by_key(|entry| entry.last_access)
                .map(|entry| *entry.key());

            match oldest {
                Some(oldest) => {
                    self.inner.sessions.remove(&oldest);
                    tracing::info!("Session limit reached, evicted session {}", oldest);
                }
                None => return Err(Error::SessionLimit(self.inner.sessions.len())),
            }
        }

        let session = Session::new(self.inner.config.llm.api_key.clone());
        let id = session.id;
        self.inner.sessions.insert(
            id,
            SessionSlot {
                handle: Arc::new(Mutex::new(session)),
                last_access: Utc::now(),
            },
        );
        tracing::info!("Created session {}", id);
        Ok(id)
    }

    /// Look up a session by its id string and mark it as used
    pub fn session(&self, id: &str) -> Result<SessionHandle> {
        let uuid = Uuid::parse_str(id).map_err(|_| Error::SessionNotFound(id.to_string()))?;
        let mut slot = self
            .inner
            .sessions
            .get_mut(&uuid)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        slot.last_access = Utc::now();
        Ok(Arc::clone(&slot.handle))
    }

    /// Drop sessions idle for longer than the configured TTL
    ///
    /// Sessions with a request in flight are kept. Returns the number removed.
    pub fn evict_idle(&self) -> usize {
        let ttl = self.inner.config.server.session_ttl_secs;
        let now = Utc::now();
        let before = self.inner.sessions.len();

        self.inner
            .sessions
            .retain(|_, slot| slot.idle_secs(now) <= ttl || slot.is_busy());

        let evicted = before.saturating_sub(self.inner.sessions.len());
        if evicted > 0 {
            tracing::info!("Evicted {} idle sessions (ttl {}s)", evicted, ttl);
        }
        evicted
    }

    pub fn remove_session(&self, id: &str) -> Result<()> {
        let uuid = Uuid::parse_str(id).map_err(|_| Error::SessionNotFound(id.to_string()))?;
        match self.inner.sessions.remove(&uuid) {
            Some(_) => {
                tracing::info!("Removed session {}", uuid);
                Ok(())
            }
            None => Err(Error::SessionNotFound(id.to_string())),
        }
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Orchestrator bound to a session's current credential
    pub fn orchestrator(&self, api_key: &str) -> Result<Orchestrator> {
        let llm = self.inner.providers.llm(api_key)?;
        let embedder = self.inner.providers.embedder(api_key)?;
        Ok(Orchestrator::new(
            llm,
            embedder,
            self.inner.template.clone(),
            self.inner.config.retrieval.top_k,
        ))
    }
}

/// Credential of a session or a configuration error
pub fn require_api_key(session: &Session) -> Result<String> {
    session
        .api_key()
        .map(str::to_string)
        .ok_or_else(|| Error::config("Gemini API key is not set for this session"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedLlm, StubProviders};

    fn state(config: AppConfig) -> Result<AppState> {
        let pipeline = IngestPipeline::from_config(&config)?;
        AppState::from_parts(
            config,
            pipeline,
            Arc::new(StubProviders::new(Arc::new(ScriptedLlm::new()))),
        )
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let state = state(AppConfig::default()).unwrap();
        let id = state.create_session().unwrap().to_string();

        assert_eq!(state.session_count(), 1);
        assert!(state.session(&id).is_ok());

        state.remove_session(&id).unwrap();
        assert!(matches!(state.session(&id), Err(Error::SessionNotFound(_))));
        assert!(matches!(state.session("not-a-uuid"), Err(Error::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_default_key_seeds_sessions() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("server-key".into());
        let state = state(config).unwrap();

        let handle = state.session(&state.create_session().unwrap().to_string()).unwrap();
        let session = handle.lock().await;
        assert_eq!(require_api_key(&session).unwrap(), "server-key");
    }

    impl AppState {
        fn backdate(&self, id: Uuid, secs: i64) {
            if let Some(mut slot) = self.inner.sessions.get_mut(&id) {
                slot.last_access = Utc::now() - chrono::Duration::seconds(secs);
            }
        }
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let mut config = AppConfig::default();
        config.server.session_ttl_secs = 60;
        let state = state(config).unwrap();

        let stale = state.create_session().unwrap();
        let fresh = state.create_session().unwrap();
        let busy = state.create_session().unwrap();
        state.backdate(stale, 120);

        let handle = state.session(&busy.to_string()).unwrap();
        state.backdate(busy, 120);
        let _guard = handle.lock().await;

        assert_eq!(state.evict_idle(), 1);
        assert!(matches!(
            state.session(&stale.to_string()),
            Err(Error::SessionNotFound(_))
        ));
        assert!(state.session(&fresh.to_string()).is_ok());
        assert_eq!(state.session_count(), 2);
    }

    #[tokio::test]
    async fn test_lookup_refreshes_last_access() {
        let mut config = AppConfig::default();
        config.server.session_ttl_secs = 60;
        let state = state(config).unwrap();

        let id = state.create_session().unwrap();
        state.backdate(id, 120);
        assert!(state.session(&id.to_string()).is_ok());

        assert_eq!(state.evict_idle(), 0);
    }

    #[tokio::test]
    async fn test_session_cap_evicts_least_recent() {
        let mut config = AppConfig::default();
        config.server.max_sessions = 2;
        let state = state(config).unwrap();

        let first = state.create_session().unwrap();
        let second = state.create_session().unwrap();
        state.backdate(first, 30);
        let third = state.create_session().unwrap();

        assert_eq!(state.session_count(), 2);
        assert!(state.session(&first.to_string()).is_err());
        assert!(state.session(&second.to_string()).is_ok());
        assert!(state.session(&third.to_string()).is_ok());
    }

    #[tokio::test]
    async fn test_session_cap_with_all_busy() {
        let mut config = AppConfig::default();
        config.server.max_sessions = 1;
        let state = state(config).unwrap();

        let handle = state.session(&state.create_session().unwrap().to_string()).unwrap();
        let _guard = handle.lock().await;

        assert!(matches!(state.create_session(), Err(Error::SessionLimit(1))));
    }

    #[test]
    fn test_invalid_template_rejected() {
        let mut config = AppConfig::default();
        config.prompt.template = Some("{question} only".into());
        assert!(matches!(state(config), Err(Error::Prompt(_))));
    }
}

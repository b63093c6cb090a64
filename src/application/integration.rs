use crate::domain::models::IntegrationSession;
use crate::infrastructure::error::CoreError;
use crate::infrastructure::integration_client::{CalendarEvent, InboxMessage, IntegrationClient};
use crate::infrastructure::logging::CoreLogger;
use crate::infrastructure::snapshot_store::SnapshotStore;
use crate::infrastructure::snapshots::SnapshotAdapter;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationStatus {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone)]
pub struct IntegrationSnapshot {
    pub status: IntegrationStatus,
    pub events: Vec<CalendarEvent>,
    pub messages: Vec<InboxMessage>,
    pub events_loading: bool,
    pub mail_loading: bool,
}

#[derive(Debug)]
struct IntegrationState {
    session: Option<IntegrationSession>,
    status: IntegrationStatus,
    events: Vec<CalendarEvent>,
    messages: Vec<InboxMessage>,
    events_loading: bool,
    mail_loading: bool,
}

impl Default for IntegrationState {
    fn default() -> Self {
        Self {
            session: None,
            status: IntegrationStatus::Disconnected,
            events: Vec::new(),
            messages: Vec::new(),
            events_loading: false,
            mail_loading: false,
        }
    }
}

/// Owns the connect/disconnect lifecycle of the third-party integration.
/// The dependent fetches fire exactly once per transition into `Connected`;
/// connecting while already connected is a no-op.
pub struct IntegrationSessionManager<S, I>
where
    S: SnapshotStore,
    I: IntegrationClient,
{
    snapshots: Arc<SnapshotAdapter<S>>,
    client: Arc<I>,
    logger: Arc<CoreLogger>,
    state: Mutex<IntegrationState>,
}

impl<S, I> IntegrationSessionManager<S, I>
where
    S: SnapshotStore,
    I: IntegrationClient,
{
    pub fn new(
        snapshots: Arc<SnapshotAdapter<S>>,
        client: Arc<I>,
        logger: Arc<CoreLogger>,
    ) -> Self {
        Self {
            snapshots,
            client,
            logger,
            state: Mutex::new(IntegrationState::default()),
        }
    }

    pub fn status(&self) -> Result<IntegrationStatus, CoreError> {
        Ok(self.lock_state()?.status)
    }

    pub fn snapshot(&self) -> Result<IntegrationSnapshot, CoreError> {
        let state = self.lock_state()?;
        Ok(IntegrationSnapshot {
            status: state.status,
            events: state.events.clone(),
            messages: state.messages.clone(),
            events_loading: state.events_loading,
            mail_loading: state.mail_loading,
        })
    }

    /// Persists the token and transitions into `Connected`. Returns whether a
    /// session is active afterwards; a persist failure leaves the manager
    /// disconnected (there is no separate error state).
    pub async fn connect(&self, session: IntegrationSession) -> Result<bool, CoreError> {
        session
            .validate()
            .map_err(CoreError::InvalidInput)?;

        {
            let mut state = self.lock_state()?;
            match state.status {
                // A connect already in flight (or done) owns the transition;
                // its dependent fetches must not fire a second time.
                IntegrationStatus::Connected | IntegrationStatus::Connecting => return Ok(true),
                IntegrationStatus::Disconnected => state.status = IntegrationStatus::Connecting,
            }
        }

        if let Err(error) = self.snapshots.save_session(&session).await {
            self.logger
                .error("connect_integration", &format!("failed to persist session token: {error}"));
            self.lock_state()?.status = IntegrationStatus::Disconnected;
            return Ok(false);
        }

        self.enter_connected(session)?;
        self.refresh().await?;
        Ok(true)
    }

    /// Bootstrap path: the token was already persisted, so only the
    /// transition and the dependent fetches run.
    pub async fn restore(&self, session: IntegrationSession) -> Result<(), CoreError> {
        {
            let mut state = self.lock_state()?;
            match state.status {
                IntegrationStatus::Connected | IntegrationStatus::Connecting => return Ok(()),
                IntegrationStatus::Disconnected => state.status = IntegrationStatus::Connecting,
            }
        }
        self.enter_connected(session)?;
        self.refresh().await
    }

    /// Clears the token and every piece of derived integration data.
    pub async fn disconnect(&self) -> Result<(), CoreError> {
        if let Err(error) = self.snapshots.remove_session().await {
            self.logger
                .error("disconnect_integration", &format!("failed to remove session token: {error}"));
        }

        let mut state = self.lock_state()?;
        state.session = None;
        state.status = IntegrationStatus::Disconnected;
        state.events.clear();
        state.messages.clear();
        state.events_loading = false;
        state.mail_loading = false;
        Ok(())
    }

    /// Fetches calendar events and inbox messages for the active session,
    /// each flipping its own loading flag for its own duration. Failures are
    /// logged; previously fetched data is kept.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let access_token = {
            let mut state = self.lock_state()?;
            if state.status != IntegrationStatus::Connected {
                return Ok(());
            }
            let Some(access_token) = state
                .session
                .as_ref()
                .map(|session| session.access_token.clone())
            else {
                return Ok(());
            };
            state.events_loading = true;
            state.mail_loading = true;
            access_token
        };

        let events_fetch = async {
            let fetched = self.client.fetch_calendar_events(&access_token).await;
            let mut state = self.lock_state()?;
            state.events_loading = false;
            match fetched {
                Ok(events) => state.events = events,
                Err(error) => self
                    .logger
                    .error("fetch_calendar_events", &error.to_string()),
            }
            Ok::<(), CoreError>(())
        };
        let mail_fetch = async {
            let fetched = self.client.fetch_inbox_messages(&access_token).await;
            let mut state = self.lock_state()?;
            state.mail_loading = false;
            match fetched {
                Ok(messages) => state.messages = messages,
                Err(error) => self
                    .logger
                    .error("fetch_inbox_messages", &error.to_string()),
            }
            Ok::<(), CoreError>(())
        };

        let (events_result, mail_result) = tokio::join!(events_fetch, mail_fetch);
        events_result?;
        mail_result
    }

    fn enter_connected(&self, session: IntegrationSession) -> Result<(), CoreError> {
        let mut state = self.lock_state()?;
        state.session = Some(session);
        state.status = IntegrationStatus::Connected;
        Ok(())
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, IntegrationState>, CoreError> {
        self.state
            .lock()
            .map_err(|error| CoreError::Storage(format!("integration state lock poisoned: {error}")))
    }
}

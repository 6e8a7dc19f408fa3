use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::admin::FareBoard;
use crate::config::{BookingCqrs, ConfigError, Settings, cqrs_framework};
use crate::domain::booking::BookingServices;
use crate::domain::route::RouteCatalog;
use crate::i18n::Language;
use crate::notifications::{ChannelNotifier, Notification, TracingNotifier};
use crate::view_repository::BookingViewRepository;
use crate::wizard::{BookingWizard, WizardError};

/// A wizard plus the notifications it has raised but nobody has read yet.
pub struct Session {
    pub wizard: BookingWizard,
    notifications: Mutex<UnboundedReceiver<Notification>>,
}

impl Session {
    pub async fn drain_notifications(&self) -> Vec<Notification> {
        let mut receiver = self.notifications.lock().await;
        let mut drained = Vec::new();
        while let Ok(notification) = receiver.try_recv() {
            drained.push(notification);
        }
        drained
    }
}

#[derive(Clone)]
pub struct ApplicationState {
    pub cqrs: Arc<BookingCqrs>,
    pub booking_query: BookingViewRepository,
    pub catalog: Arc<RouteCatalog>,
    pub fare_board: Arc<Mutex<FareBoard>>,
    pub sessions: Arc<RwLock<HashMap<Uuid, Arc<Session>>>>,
    pub language: Language,
}

/// # Errors
///
/// Fails when the configured route catalog cannot be loaded.
pub fn new_application_state(settings: &Settings) -> Result<ApplicationState, ConfigError> {
    // Configure the CQRS framework, backed by an in-memory event store, along with two queries:
    // - a simple query that traces every committed event
    // - `booking_query` keeps the latest view of each session
    let catalog = Arc::new(settings.load_catalog()?);
    tracing::info!(routes = catalog.len(), "route catalog loaded");

    let services = BookingServices::new(catalog.clone(), settings.gateway());
    let (cqrs, booking_query) = cqrs_framework(services);
    let fare_board = FareBoard::new(&catalog, settings.language, Arc::new(TracingNotifier));

    Ok(ApplicationState {
        cqrs,
        booking_query,
        catalog,
        fare_board: Arc::new(Mutex::new(fare_board)),
        sessions: Arc::new(RwLock::new(HashMap::new())),
        language: settings.language,
    })
}

impl ApplicationState {
    /// Starts a new wizard session, in the default language unless another is given.
    ///
    /// # Errors
    ///
    /// Fails when the first booking cannot be recorded.
    pub async fn open_session(
        &self,
        language: Option<Language>,
    ) -> Result<(Uuid, Arc<Session>), WizardError> {
        let session_id = Uuid::new_v4();
        let (notifier, notifications) = ChannelNotifier::new();
        let wizard = BookingWizard::start(
            session_id,
            self.cqrs.clone(),
            self.booking_query.clone(),
            language.unwrap_or(self.language),
            Arc::new(notifier),
        )
        .await?;

        let session = Arc::new(Session {
            wizard,
            notifications: Mutex::new(notifications),
        });
        self.sessions
            .write()
            .await
            .insert(session_id, session.clone());
        Ok((session_id, session))
    }

    pub async fn session(&self, session_id: &Uuid) -> Option<Arc<Session>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Ends a session and drops its booking view. The committed events stay
    /// in the event store.
    ///
    /// # Errors
    ///
    /// `SessionMissing` for an unknown session, `Busy` while it is paying or
    /// refunding.
    pub async fn close_session(&self, session_id: &Uuid) -> Result<(), WizardError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get(session_id).ok_or(WizardError::SessionMissing)?;
        if session.wizard.is_processing() {
            return Err(WizardError::Busy);
        }
        if let Some(session) = sessions.remove(session_id) {
            self.booking_query.remove(session.wizard.session_id()).await;
        }
        tracing::info!(session = %session_id, open = sessions.len(), "session closed");
        Ok(())
    }
}

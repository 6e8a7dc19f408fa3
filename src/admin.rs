use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::fare::FareBreakdown;
use crate::domain::route::{Fare, Route, RouteCatalog, RouteError};
use crate::i18n::Language;
use crate::notifications::{Notification, Notifier};

/// Catalog maintenance the dashboard shows but cannot perform yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    AddRoute,
    EditRoute(u32),
    DeleteRoute(u32),
    AddBus,
    EditBus(String),
    DeleteBus(String),
}

impl fmt::Display for AdminAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminAction::AddRoute => write!(f, "add route"),
            AdminAction::EditRoute(id) => write!(f, "edit route {id}"),
            AdminAction::DeleteRoute(id) => write!(f, "delete route {id}"),
            AdminAction::AddBus => write!(f, "add bus"),
            AdminAction::EditBus(id) => write!(f, "edit bus {id}"),
            AdminAction::DeleteBus(id) => write!(f, "delete bus {id}"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum AdminError {
    #[error("unknown route {0}")]
    UnknownRoute(u32),
    #[error(transparent)]
    Fare(#[from] RouteError),
    #[error("{0} is not implemented")]
    NotImplemented(AdminAction),
}

/// The administrator's fare sheet.
///
/// Works on its own copy of the routes, so edited fares never reach
/// passengers booking from the shared catalog.
pub struct FareBoard {
    routes: Vec<Route>,
    editing: Option<u32>,
    language: Language,
    notifier: Arc<dyn Notifier>,
}

impl FareBoard {
    pub fn new(catalog: &RouteCatalog, language: Language, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            routes: catalog.routes().to_vec(),
            editing: None,
            language,
            notifier,
        }
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// The route whose fare is being edited, if any.
    #[must_use]
    pub fn editing(&self) -> Option<u32> {
        self.editing
    }

    /// # Errors
    ///
    /// Rejects unknown routes and a zero amount.
    pub fn edit_fare(&mut self, route_id: u32, amount: u64) -> Result<(), AdminError> {
        let fare = Fare::new(amount)?;
        let route = self.route_mut(route_id)?;
        route.fare = fare;
        self.editing = Some(route_id);
        Ok(())
    }

    /// # Errors
    ///
    /// Rejects unknown routes.
    pub fn save(&mut self, route_id: u32) -> Result<Notification, AdminError> {
        let fare = self.route_mut(route_id)?.fare;
        self.editing = None;
        tracing::info!(route_id, %fare, "fare saved");

        let strings = self.language.strings();
        let notification = Notification::normal(strings.fare_updated, strings.fare_updated_message);
        self.notifier.notify(notification.clone());
        Ok(notification)
    }

    /// # Errors
    ///
    /// Rejects unknown routes.
    pub fn breakdown(&self, route_id: u32) -> Result<FareBreakdown, AdminError> {
        let route = self
            .routes
            .iter()
            .find(|route| route.id == route_id)
            .ok_or(AdminError::UnknownRoute(route_id))?;
        Ok(FareBreakdown::new(route.fare, route.distance))
    }

    /// Always refuses, after telling the administrator the feature is coming.
    ///
    /// # Errors
    ///
    /// Always `NotImplemented`.
    pub fn request(&self, action: AdminAction) -> Result<(), AdminError> {
        tracing::info!(%action, "catalog maintenance requested");
        self.notifier.notify(self.coming_soon());
        Err(AdminError::NotImplemented(action))
    }

    #[must_use]
    pub fn coming_soon(&self) -> Notification {
        let strings = self.language.strings();
        Notification::normal(strings.coming_soon, strings.coming_soon_message)
    }

    fn route_mut(&mut self, route_id: u32) -> Result<&mut Route, AdminError> {
        self.routes
            .iter_mut()
            .find(|route| route.id == route_id)
            .ok_or(AdminError::UnknownRoute(route_id))
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cqrs_es::{EventEnvelope, Query, View};
use tokio::sync::RwLock;

use crate::domain::booking::Booking;
use crate::queries::BookingView;

/// Keeps the latest [`BookingView`] of every session in memory.
///
/// Registered as a query on the CQRS framework, so views are updated before
/// `execute` returns.
#[derive(Clone, Default)]
pub struct BookingViewRepository {
    views: Arc<RwLock<HashMap<String, BookingView>>>,
}

impl BookingViewRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the view for a session, if any events were committed for it.
    pub async fn load(&self, session_id: &str) -> Option<BookingView> {
        self.views.read().await.get(session_id).cloned()
    }

    /// Forget a session's view.
    pub async fn remove(&self, session_id: &str) -> Option<BookingView> {
        self.views.write().await.remove(session_id)
    }

    pub async fn len(&self) -> usize {
        self.views.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.views.read().await.is_empty()
    }
}

#[async_trait]
impl Query<Booking> for BookingViewRepository {
    async fn dispatch(&self, aggregate_id: &str, events: &[EventEnvelope<Booking>]) {
        let mut views = self.views.write().await;
        let view = views.entry(aggregate_id.to_string()).or_default();
        for event in events {
            view.update(event);
        }
    }
}

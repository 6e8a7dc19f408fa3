pub mod admin;
pub mod config;
pub mod domain;
pub mod i18n;
pub mod notifications;
pub mod queries;
pub mod route_handler;
pub mod services;
pub mod state;
pub mod view_repository;
pub mod wizard;

use async_trait::async_trait;
use cqrs_es::{Aggregate, EventEnvelope, Query};

pub struct SimpleLoggingQuery {}

#[async_trait]
impl<A> Query<A> for SimpleLoggingQuery
where
    A: Aggregate,
{
    async fn dispatch(&self, aggregate_id: &str, events: &[EventEnvelope<A>]) {
        for event in events {
            tracing::debug!(
                aggregate_id,
                sequence = event.sequence,
                payload = ?event.payload,
                "event committed"
            );
        }
    }
}

use chrono::NaiveDate;
use cqrs_es::DomainEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::payment::{PaymentMethod, TicketId};
use crate::domain::route::Route;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum BookingEvent {
    Started {
        id: Uuid,
    },
    RouteSelected {
        route: Route,
    },
    DateChosen {
        date: NaiveDate,
    },
    DepartureChosen {
        departure: String,
    },
    PassengersChanged {
        passengers: u8,
    },
    TripConfirmed,
    PaymentMethodChosen {
        method: PaymentMethod,
    },
    /// Amount and method are what the gateway actually collected.
    PaymentSettled {
        ticket_id: TicketId,
        amount: u64,
        method: PaymentMethod,
    },
    RefundCompleted,
    Reset {
        id: Uuid,
    },
}

impl DomainEvent for BookingEvent {
    fn event_type(&self) -> String {
        let event_type: &str = match self {
            BookingEvent::Started { .. } => "BookingStarted",
            BookingEvent::RouteSelected { .. } => "RouteSelected",
            BookingEvent::DateChosen { .. } => "DateChosen",
            BookingEvent::DepartureChosen { .. } => "DepartureChosen",
            BookingEvent::PassengersChanged { .. } => "PassengersChanged",
            BookingEvent::TripConfirmed => "TripConfirmed",
            BookingEvent::PaymentMethodChosen { .. } => "PaymentMethodChosen",
            BookingEvent::PaymentSettled { .. } => "PaymentSettled",
            BookingEvent::RefundCompleted => "RefundCompleted",
            BookingEvent::Reset { .. } => "BookingReset",
        };
        event_type.to_string()
    }

    fn event_version(&self) -> String {
        "1.0".to_string()
    }
}

use std::fmt;

use chrono::NaiveDate;
use cqrs_es::{EventEnvelope, View};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::booking::{Booking, MIN_PASSENGERS, WizardStep};
use crate::domain::events::BookingEvent;
use crate::domain::payment::{PaymentMethod, PaymentStatus, RefundStatus, TicketId};
use crate::domain::route::Route;

/// The booking as a UI sees it, kept up to date as events are committed.
///
/// Field names follow the wire shape a browser client expects
/// (`paymentStatus`, `ticketId`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub id: Uuid,
    pub step: WizardStep,
    pub route: Option<Route>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub passengers: u8,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub refund_status: Option<RefundStatus>,
    pub ticket_id: Option<TicketId>,
    pub amount_paid: Option<u64>,
}

impl Default for BookingView {
    fn default() -> Self {
        Self {
            id: Uuid::default(),
            step: WizardStep::default(),
            route: None,
            date: None,
            time: None,
            passengers: MIN_PASSENGERS,
            payment_method: PaymentMethod::default(),
            payment_status: PaymentStatus::default(),
            refund_status: None,
            ticket_id: None,
            amount_paid: None,
        }
    }
}

// Mirrors `Booking::apply`; events carry everything the view needs.
impl View<Booking> for BookingView {
    fn update(&mut self, event: &EventEnvelope<Booking>) {
        match &event.payload {
            BookingEvent::Started { id } | BookingEvent::Reset { id } => {
                *self = BookingView {
                    id: *id,
                    ..BookingView::default()
                };
            }
            BookingEvent::RouteSelected { route } => {
                self.route = Some(route.clone());
                self.step = WizardStep::SelectDateTime;
            }
            BookingEvent::DateChosen { date } => self.date = Some(*date),
            BookingEvent::DepartureChosen { departure } => self.time = Some(departure.clone()),
            BookingEvent::PassengersChanged { passengers } => self.passengers = *passengers,
            BookingEvent::TripConfirmed => self.step = WizardStep::Payment,
            BookingEvent::PaymentMethodChosen { method } => self.payment_method = *method,
            BookingEvent::PaymentSettled {
                ticket_id,
                amount,
                method,
            } => {
                self.ticket_id = Some(ticket_id.clone());
                self.amount_paid = Some(*amount);
                self.payment_method = *method;
                self.payment_status = PaymentStatus::Paid;
                self.step = WizardStep::Receipt;
            }
            BookingEvent::RefundCompleted => {
                self.payment_status = PaymentStatus::Refunded;
                self.refund_status = Some(RefundStatus::Completed);
            }
        }
    }
}

impl BookingView {
    /// Recomputed on every call from the route fare and passenger count.
    #[must_use]
    pub fn total_fare(&self) -> u64 {
        self.route
            .as_ref()
            .map_or(0, |route| route.fare.times(self.passengers))
    }

    /// The e-ticket, once the booking has been paid for. Shows the amount and
    /// method that were settled.
    #[must_use]
    pub fn receipt(&self) -> Option<Receipt> {
        let ticket_id = self.ticket_id.clone()?;
        let route = self.route.as_ref()?;
        Some(Receipt {
            ticket_id,
            route_name: route.name.clone(),
            from: route.from.clone(),
            to: route.to.clone(),
            date: self.date,
            time: self.time.clone(),
            passengers: self.passengers,
            payment_method: self.payment_method,
            total_fare: self.amount_paid.unwrap_or_else(|| self.total_fare()),
            status: self.payment_status,
        })
    }
}

/// A paid (or refunded) ticket, ready to show to the conductor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub ticket_id: TicketId,
    pub route_name: String,
    pub from: String,
    pub to: String,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub passengers: u8,
    pub payment_method: PaymentMethod,
    pub total_fare: u64,
    pub status: PaymentStatus,
}

impl Receipt {
    /// Contents of the code scanned when boarding: just the ticket id.
    #[must_use]
    pub fn scan_code(&self) -> &str {
        self.ticket_id.as_str()
    }
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "E-TICKET · Rural Bus Service")?;
        writeln!(f, "Ticket ID:  {} [{}]", self.ticket_id, self.status)?;
        writeln!(f, "Route:      {} ({} → {})", self.route_name, self.from, self.to)?;
        if let Some(date) = self.date {
            writeln!(f, "Date:       {date}")?;
        }
        if let Some(time) = &self.time {
            writeln!(f, "Time:       {time}")?;
        }
        writeln!(f, "Passengers: {}", self.passengers)?;
        writeln!(f, "Payment:    {}", self.payment_method.label())?;
        write!(f, "Total fare: ₹{}", self.total_fare)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::domain::route::{Distance, Fare, TimeSlot};

    fn envelope(sequence: usize, payload: BookingEvent) -> EventEnvelope<Booking> {
        EventEnvelope {
            aggregate_id: "session".to_string(),
            sequence,
            payload,
            metadata: HashMap::new(),
        }
    }

    fn route() -> Route {
        Route {
            id: 1,
            name: "Village Express".to_string(),
            from: "Rampur".to_string(),
            to: "Sitapur".to_string(),
            fare: Fare::new(500).unwrap(),
            distance: Distance::from_km(32),
            schedule: vec![TimeSlot {
                departure: "06:00 AM".to_string(),
                arrival: "07:10 AM".to_string(),
                duration: "1h 10m".to_string(),
            }],
            stops: vec![],
        }
    }

    fn project(events: Vec<BookingEvent>) -> BookingView {
        let mut view = BookingView::default();
        for (i, event) in events.into_iter().enumerate() {
            view.update(&envelope(i + 1, event));
        }
        view
    }

    fn paid_events(id: Uuid) -> Vec<BookingEvent> {
        vec![
            BookingEvent::Started { id },
            BookingEvent::RouteSelected { route: route() },
            BookingEvent::DateChosen {
                date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            },
            BookingEvent::DepartureChosen {
                departure: "06:00 AM".to_string(),
            },
            BookingEvent::TripConfirmed,
            BookingEvent::PassengersChanged { passengers: 3 },
            BookingEvent::PaymentMethodChosen {
                method: PaymentMethod::Upi,
            },
            BookingEvent::PaymentSettled {
                ticket_id: TicketId::from("TKT-ABC123XYZ"),
                amount: 1500,
                method: PaymentMethod::Upi,
            },
        ]
    }

    #[test]
    fn view_follows_the_wizard() {
        let id = Uuid::new_v4();
        let view = project(paid_events(id));

        assert_eq!(view.id, id);
        assert_eq!(view.step, WizardStep::Receipt);
        assert_eq!(view.time.as_deref(), Some("06:00 AM"));
        assert_eq!(view.payment_status, PaymentStatus::Paid);
        assert_eq!(view.total_fare(), 1500);
    }

    #[test]
    fn no_receipt_before_payment() {
        let view = project(vec![
            BookingEvent::Started { id: Uuid::new_v4() },
            BookingEvent::RouteSelected { route: route() },
        ]);
        assert!(view.receipt().is_none());
    }

    #[test]
    fn receipt_scan_code_is_the_ticket_id() {
        let receipt = project(paid_events(Uuid::new_v4())).receipt().unwrap();
        assert_eq!(receipt.scan_code(), "TKT-ABC123XYZ");
        assert_eq!(receipt.total_fare, 1500);

        let printed = receipt.to_string();
        assert!(printed.contains("TKT-ABC123XYZ [paid]"));
        assert!(printed.contains("Village Express (Rampur → Sitapur)"));
        assert!(printed.contains("Total fare: ₹1500"));
    }

    #[test]
    fn refunded_receipt_shows_status() {
        let mut events = paid_events(Uuid::new_v4());
        events.push(BookingEvent::RefundCompleted);
        let view = project(events);
        assert_eq!(view.refund_status, Some(RefundStatus::Completed));
        assert_eq!(view.receipt().unwrap().status, PaymentStatus::Refunded);
    }

    #[test]
    fn reset_view_serializes_to_initial_shape() {
        let next = Uuid::new_v4();
        let mut events = paid_events(Uuid::new_v4());
        events.push(BookingEvent::Reset { id: next });
        let json = serde_json::to_value(project(events)).unwrap();

        assert_eq!(json["step"], "select_route");
        assert!(json["route"].is_null());
        assert!(json["date"].is_null());
        assert!(json["time"].is_null());
        assert_eq!(json["passengers"], 1);
        assert_eq!(json["paymentStatus"], "pending");
        assert_eq!(json["paymentMethod"], "card");
        assert!(json["refundStatus"].is_null());
        assert!(json["ticketId"].is_null());
        assert!(json["amountPaid"].is_null());
    }

    #[test]
    fn receipt_shows_the_settled_amount_and_method() {
        // Changes committed while settlement was running do not reach the ticket.
        let mut events = paid_events(Uuid::new_v4());
        let settled = events.pop().unwrap();
        events.push(BookingEvent::PassengersChanged { passengers: 5 });
        events.push(BookingEvent::PaymentMethodChosen {
            method: PaymentMethod::Gpay,
        });
        events.push(settled);
        let receipt = project(events).receipt().unwrap();
        assert_eq!(receipt.total_fare, 1500);
        assert_eq!(receipt.payment_method, PaymentMethod::Upi);
    }
}

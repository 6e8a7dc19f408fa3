use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use cqrs_es::Aggregate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::commands::BookingCommand;
use crate::domain::events::BookingEvent;
use crate::domain::payment::{
    PaymentMethod, PaymentStatus, RefundStatus, TicketId, ValidationError,
};
use crate::domain::route::{Route, RouteCatalog};
use crate::services::payment_gateway::{GatewayError, PaymentGateway, SettlementRequest};

pub const MIN_PASSENGERS: u8 = 1;
pub const MAX_PASSENGERS: u8 = 10;

/// The four screens of the booking wizard, in order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    SelectRoute,
    SelectDateTime,
    Payment,
    Receipt,
}

impl WizardStep {
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            WizardStep::SelectRoute => 1,
            WizardStep::SelectDateTime => 2,
            WizardStep::Payment => 3,
            WizardStep::Receipt => 4,
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// One passenger's ticket purchase, from route selection to receipt.
///
/// The wizard only moves forward; the single way back is `BookAnother`,
/// which starts a fresh booking at step 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    id: Uuid,
    step: WizardStep,
    route: Option<Route>,
    date: Option<NaiveDate>,
    departure: Option<String>,
    passengers: u8,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    refund_status: Option<RefundStatus>,
    ticket_id: Option<TicketId>,
    amount_paid: Option<u64>,
}

impl Default for Booking {
    fn default() -> Self {
        Self {
            id: Uuid::default(),
            step: WizardStep::default(),
            route: None,
            date: None,
            departure: None,
            passengers: MIN_PASSENGERS,
            payment_method: PaymentMethod::default(),
            payment_status: PaymentStatus::default(),
            refund_status: None,
            ticket_id: None,
            amount_paid: None,
        }
    }
}

#[async_trait]
impl Aggregate for Booking {
    type Command = BookingCommand;
    type Event = BookingEvent;
    type Error = BookingError;
    type Services = BookingServices;

    fn aggregate_type() -> String {
        "Booking".to_string()
    }

    async fn handle(
        &self,
        command: Self::Command,
        services: &Self::Services,
    ) -> Result<Vec<Self::Event>, Self::Error> {
        if let BookingCommand::Start { id } = command {
            return if self.is_started() {
                Err(BookingError::AlreadyStarted)
            } else {
                Ok(vec![BookingEvent::Started { id }])
            };
        }
        if !self.is_started() {
            return Err(BookingError::NotFound);
        }

        match command {
            BookingCommand::Start { .. } => Err(BookingError::AlreadyStarted),
            BookingCommand::SelectRoute { route_id } => {
                self.expect_step("selecting a route", &[WizardStep::SelectRoute])?;
                let route = services
                    .catalog()
                    .get(route_id)
                    .ok_or(BookingError::UnknownRoute(route_id))?;
                if !route.is_bookable() {
                    return Err(BookingError::RouteNotBookable(route_id));
                }
                Ok(vec![BookingEvent::RouteSelected {
                    route: route.clone(),
                }])
            }
            BookingCommand::ChooseDate { date } => {
                self.expect_step("choosing a date", &[WizardStep::SelectDateTime])?;
                let today = services.today();
                if date < today {
                    Err(BookingError::DateInPast { date, today })
                } else {
                    Ok(vec![BookingEvent::DateChosen { date }])
                }
            }
            BookingCommand::ChooseDeparture { departure } => {
                self.expect_step("choosing a departure", &[WizardStep::SelectDateTime])?;
                let departs = self
                    .route
                    .as_ref()
                    .is_some_and(|route| route.departs_at(&departure));
                if departs {
                    Ok(vec![BookingEvent::DepartureChosen { departure }])
                } else {
                    Err(BookingError::UnknownDeparture(departure))
                }
            }
            BookingCommand::SetPassengers { passengers } => {
                self.expect_step(
                    "changing passengers",
                    &[WizardStep::SelectDateTime, WizardStep::Payment],
                )?;
                if (MIN_PASSENGERS..=MAX_PASSENGERS).contains(&passengers) {
                    Ok(vec![BookingEvent::PassengersChanged { passengers }])
                } else {
                    Err(BookingError::PassengersOutOfRange(passengers))
                }
            }
            BookingCommand::ContinueToPayment => {
                self.expect_step("continuing to payment", &[WizardStep::SelectDateTime])?;
                if self.date.is_some() && self.departure.is_some() {
                    Ok(vec![BookingEvent::TripConfirmed])
                } else {
                    Err(BookingError::MissingTripDetails)
                }
            }
            BookingCommand::ChoosePaymentMethod { method } => {
                self.expect_step("choosing a payment method", &[WizardStep::Payment])?;
                Ok(vec![BookingEvent::PaymentMethodChosen { method }])
            }
            BookingCommand::Pay { form } => {
                self.expect_step("paying", &[WizardStep::Payment])?;
                self.payment_method.validate(&form)?;

                let request = SettlementRequest {
                    idempotency_key: self.id,
                    amount: self.total_fare(),
                    method: self.payment_method,
                };
                let settlement = services.gateway().settle(&request).await?;
                Ok(vec![BookingEvent::PaymentSettled {
                    ticket_id: settlement.ticket_id,
                    amount: request.amount,
                    method: request.method,
                }])
            }
            BookingCommand::Refund => match (self.payment_status, &self.ticket_id) {
                (PaymentStatus::Paid, Some(ticket_id)) => {
                    services
                        .gateway()
                        .refund(ticket_id)
                        .await
                        .map_err(BookingError::RefundFailed)?;
                    Ok(vec![BookingEvent::RefundCompleted])
                }
                // a second refund changes nothing
                (PaymentStatus::Refunded, _) => Ok(vec![]),
                _ => Err(BookingError::NotPaid),
            },
            BookingCommand::BookAnother { id } => {
                self.expect_step("booking another ticket", &[WizardStep::Receipt])?;
                Ok(vec![BookingEvent::Reset { id }])
            }
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            BookingEvent::Started { id } | BookingEvent::Reset { id } => {
                *self = Booking {
                    id,
                    ..Booking::default()
                };
            }
            BookingEvent::RouteSelected { route } => {
                self.route = Some(route);
                self.step = WizardStep::SelectDateTime;
            }
            BookingEvent::DateChosen { date } => {
                self.date = Some(date);
            }
            BookingEvent::DepartureChosen { departure } => {
                self.departure = Some(departure);
            }
            BookingEvent::PassengersChanged { passengers } => {
                self.passengers = passengers;
            }
            BookingEvent::TripConfirmed => {
                self.step = WizardStep::Payment;
            }
            BookingEvent::PaymentMethodChosen { method } => {
                self.payment_method = method;
            }
            BookingEvent::PaymentSettled {
                ticket_id,
                amount,
                method,
            } => {
                self.ticket_id = Some(ticket_id);
                self.amount_paid = Some(amount);
                self.payment_method = method;
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

#[derive(Error, Debug, PartialEq)]
pub enum BookingError {
    #[error("Booking not found")]
    NotFound,
    #[error("Booking already started")]
    AlreadyStarted,
    #[error("{action} is not available at step {step}")]
    NotAvailable {
        action: &'static str,
        step: WizardStep,
    },
    #[error("unknown route {0}")]
    UnknownRoute(u32),
    #[error("route {0} has no departures")]
    RouteNotBookable(u32),
    #[error("{date} is before today ({today})")]
    DateInPast { date: NaiveDate, today: NaiveDate },
    #[error("the route does not depart at {0}")]
    UnknownDeparture(String),
    #[error("passengers must be between 1 and 10, got {0}")]
    PassengersOutOfRange(u8),
    #[error("choose a date and departure time first")]
    MissingTripDetails,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("settlement failed: {0}")]
    Settlement(#[from] GatewayError),
    #[error("only a paid booking can be refunded")]
    NotPaid,
    #[error("refund failed: {0}")]
    RefundFailed(GatewayError),
}

pub struct BookingServices {
    catalog: Arc<RouteCatalog>,
    gateway: Arc<dyn PaymentGateway>,
    today: Option<NaiveDate>,
}

impl BookingServices {
    pub fn new(catalog: Arc<RouteCatalog>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            catalog,
            gateway,
            today: None,
        }
    }

    /// Pins "today" instead of reading the local clock.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &RouteCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn gateway(&self) -> &Arc<dyn PaymentGateway> {
        &self.gateway
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

impl Booking {
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.id != Uuid::default()
    }

    #[must_use]
    pub fn step(&self) -> WizardStep {
        self.step
    }

    #[must_use]
    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    #[must_use]
    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    #[must_use]
    pub fn departure(&self) -> Option<&str> {
        self.departure.as_deref()
    }

    #[must_use]
    pub fn passengers(&self) -> u8 {
        self.passengers
    }

    #[must_use]
    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    #[must_use]
    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    #[must_use]
    pub fn refund_status(&self) -> Option<RefundStatus> {
        self.refund_status
    }

    #[must_use]
    pub fn ticket_id(&self) -> Option<&TicketId> {
        self.ticket_id.as_ref()
    }

    /// What the gateway collected, once paid.
    #[must_use]
    pub fn amount_paid(&self) -> Option<u64> {
        self.amount_paid
    }

    /// Fare times passengers, zero before a route is chosen.
    #[must_use]
    pub fn total_fare(&self) -> u64 {
        self.route
            .as_ref()
            .map_or(0, |route| route.fare.times(self.passengers))
    }

    fn expect_step(&self, action: &'static str, allowed: &[WizardStep]) -> Result<(), BookingError> {
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            Err(BookingError::NotAvailable {
                action,
                step: self.step,
            })
        }
    }
}

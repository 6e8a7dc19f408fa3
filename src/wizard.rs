use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use cqrs_es::AggregateError;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::BookingCqrs;
use crate::domain::booking::BookingError;
use crate::domain::commands::BookingCommand;
use crate::domain::payment::{Bank, PaymentForm, PaymentMethod, PaymentStatus};
use crate::i18n::Language;
use crate::notifications::{Notification, Notifier};
use crate::queries::{BookingView, Receipt};
use crate::view_repository::BookingViewRepository;

#[derive(Error, Debug)]
pub enum WizardError {
    #[error(transparent)]
    Booking(#[from] BookingError),
    #[error("a payment or refund is already in progress")]
    Busy,
    #[error("event store failure: {0}")]
    Store(String),
    #[error("no booking recorded for this session")]
    SessionMissing,
}

impl From<AggregateError<BookingError>> for WizardError {
    fn from(err: AggregateError<BookingError>) -> Self {
        match err {
            AggregateError::UserError(err) => WizardError::Booking(err),
            other => WizardError::Store(other.to_string()),
        }
    }
}

/// One step of user input, as posted by a client.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WizardAction {
    SelectRoute {
        route_id: u32,
    },
    ChooseDate {
        date: NaiveDate,
    },
    ChooseDeparture {
        departure: String,
    },
    SetPassengers {
        passengers: u8,
    },
    ContinueToPayment,
    ChoosePaymentMethod {
        method: PaymentMethod,
    },
    UpdateForm {
        form: PaymentForm,
    },
    /// Replaces the form first when one is given.
    Pay {
        #[serde(default)]
        form: Option<PaymentForm>,
    },
    Refund,
    BookAnother,
}

/// A single wizard session: one browser tab's worth of booking.
///
/// The booking itself lives in the event store under `session_id`. The session
/// adds what must never be recorded in events (typed-in payment details), the
/// in-flight guard for settlement and refund, and user-facing notifications.
pub struct BookingWizard {
    session_id: String,
    cqrs: Arc<BookingCqrs>,
    views: BookingViewRepository,
    language: Language,
    notifier: Arc<dyn Notifier>,
    form: Mutex<PaymentForm>,
    processing: AtomicBool,
}

struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl BookingWizard {
    /// Opens a session and records the first booking in it.
    ///
    /// # Errors
    ///
    /// Fails when the session id is already in use or the store rejects the
    /// first event.
    pub async fn start(
        session_id: Uuid,
        cqrs: Arc<BookingCqrs>,
        views: BookingViewRepository,
        language: Language,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, WizardError> {
        let wizard = Self {
            session_id: session_id.to_string(),
            cqrs,
            views,
            language,
            notifier,
            form: Mutex::new(PaymentForm::default()),
            processing: AtomicBool::new(false),
        };
        wizard
            .execute(BookingCommand::Start { id: Uuid::new_v4() })
            .await?;
        tracing::info!(session = %wizard.session_id, language = wizard.language.code(), "session started");
        Ok(wizard)
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// The current booking, with `processing` shown while a payment or refund
    /// is in flight.
    ///
    /// # Errors
    ///
    /// Returns `SessionMissing` if nothing was ever recorded for the session.
    pub async fn view(&self) -> Result<BookingView, WizardError> {
        let mut view = self
            .views
            .load(&self.session_id)
            .await
            .ok_or(WizardError::SessionMissing)?;
        if self.is_processing() {
            view.payment_status = PaymentStatus::Processing;
        }
        Ok(view)
    }

    /// # Errors
    ///
    /// Returns `SessionMissing` if nothing was ever recorded for the session.
    pub async fn total_fare(&self) -> Result<u64, WizardError> {
        Ok(self.view().await?.total_fare())
    }

    /// # Errors
    ///
    /// Returns `SessionMissing` if nothing was ever recorded for the session.
    pub async fn receipt(&self) -> Result<Option<Receipt>, WizardError> {
        Ok(self.view().await?.receipt())
    }

    pub async fn select_route(&self, route_id: u32) -> Result<(), WizardError> {
        self.execute(BookingCommand::SelectRoute { route_id }).await
    }

    pub async fn choose_date(&self, date: NaiveDate) -> Result<(), WizardError> {
        self.execute(BookingCommand::ChooseDate { date }).await
    }

    pub async fn choose_departure(&self, departure: impl Into<String>) -> Result<(), WizardError> {
        self.execute(BookingCommand::ChooseDeparture {
            departure: departure.into(),
        })
        .await
    }

    pub async fn set_passengers(&self, passengers: u8) -> Result<(), WizardError> {
        self.execute(BookingCommand::SetPassengers { passengers })
            .await
    }

    pub async fn continue_to_payment(&self) -> Result<(), WizardError> {
        self.execute(BookingCommand::ContinueToPayment).await
    }

    pub async fn choose_payment_method(&self, method: PaymentMethod) -> Result<(), WizardError> {
        self.execute(BookingCommand::ChoosePaymentMethod { method })
            .await
    }

    pub async fn form(&self) -> PaymentForm {
        self.form.lock().await.clone()
    }

    pub async fn update_form(&self, edit: impl FnOnce(&mut PaymentForm)) {
        edit(&mut *self.form.lock().await);
    }

    pub async fn replace_form(&self, form: PaymentForm) {
        *self.form.lock().await = form;
    }

    pub async fn select_bank(&self, bank: Bank) {
        self.update_form(|form| form.bank = Some(bank)).await;
    }

    /// Validates the form for the chosen method and settles the total fare.
    ///
    /// # Errors
    ///
    /// `Busy` while another payment or refund is running; otherwise the
    /// booking's validation, settlement or step errors.
    pub async fn pay(&self) -> Result<(), WizardError> {
        let _guard = self.begin_processing()?;
        let form = self.form().await;
        let strings = self.language.strings();

        match self.execute(BookingCommand::Pay { form }).await {
            Ok(()) => {
                let passengers = self
                    .views
                    .load(&self.session_id)
                    .await
                    .map_or(1, |view| view.passengers);
                self.notifier.notify(Notification::normal(
                    strings.booking_confirmed,
                    format!("{passengers} {}(s) {}", strings.ticket, strings.booked),
                ));
                Ok(())
            }
            Err(err @ WizardError::Booking(BookingError::Validation(_))) => {
                self.notifier.notify(Notification::destructive(
                    strings.error,
                    strings.fill_all_fields,
                ));
                Err(err)
            }
            Err(err @ WizardError::Booking(BookingError::Settlement(_))) => {
                self.notifier.notify(Notification::destructive(
                    strings.error,
                    strings.payment_failed,
                ));
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Refunds a paid booking in full. Refunding twice changes nothing.
    ///
    /// # Errors
    ///
    /// `Busy` while another payment or refund is running, `NotPaid` before
    /// payment, or the gateway's refund failure.
    pub async fn refund(&self) -> Result<(), WizardError> {
        let _guard = self.begin_processing()?;
        let strings = self.language.strings();
        let view = self
            .views
            .load(&self.session_id)
            .await
            .ok_or(WizardError::SessionMissing)?;
        let refunding = view.payment_status == PaymentStatus::Paid;

        if refunding {
            self.notifier.notify(Notification::normal(
                strings.processing_refund,
                strings.initiating_refund,
            ));
        }
        match self.execute(BookingCommand::Refund).await {
            Ok(()) if refunding => {
                self.notifier.notify(Notification::normal(
                    strings.refund_successful,
                    format!(
                        "{} {}.",
                        strings.amount_refunded_to,
                        view.payment_method.code().to_uppercase()
                    ),
                ));
                Ok(())
            }
            Err(WizardError::Booking(BookingError::RefundFailed(err))) => {
                self.notifier
                    .notify(Notification::destructive(strings.error, err.to_string()));
                Err(BookingError::RefundFailed(err).into())
            }
            other => other,
        }
    }

    /// Discards the finished booking and starts a new one at step 1.
    ///
    /// # Errors
    ///
    /// `Busy` while a refund is running, or a step error before the receipt.
    pub async fn book_another(&self) -> Result<(), WizardError> {
        self.execute(BookingCommand::BookAnother { id: Uuid::new_v4() })
            .await?;
        self.replace_form(PaymentForm::default()).await;
        Ok(())
    }

    /// Applies a client action.
    ///
    /// # Errors
    ///
    /// `Busy` for form edits while a payment or refund is running; otherwise
    /// whatever the matching operation returns.
    pub async fn dispatch(&self, action: WizardAction) -> Result<(), WizardError> {
        let edits_form = matches!(
            action,
            WizardAction::UpdateForm { .. } | WizardAction::Pay { form: Some(_) }
        );
        if edits_form && self.is_processing() {
            return Err(WizardError::Busy);
        }
        match action {
            WizardAction::SelectRoute { route_id } => self.select_route(route_id).await,
            WizardAction::ChooseDate { date } => self.choose_date(date).await,
            WizardAction::ChooseDeparture { departure } => self.choose_departure(departure).await,
            WizardAction::SetPassengers { passengers } => self.set_passengers(passengers).await,
            WizardAction::ContinueToPayment => self.continue_to_payment().await,
            WizardAction::ChoosePaymentMethod { method } => {
                self.choose_payment_method(method).await
            }
            WizardAction::UpdateForm { form } => {
                self.replace_form(form).await;
                Ok(())
            }
            WizardAction::Pay { form } => {
                if let Some(form) = form {
                    self.replace_form(form).await;
                }
                self.pay().await
            }
            WizardAction::Refund => self.refund().await,
            WizardAction::BookAnother => self.book_another().await,
        }
    }

    fn begin_processing(&self) -> Result<ProcessingGuard<'_>, WizardError> {
        self.processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| WizardError::Busy)?;
        Ok(ProcessingGuard(&self.processing))
    }

    // Only the in-flight operations themselves may run while processing; they
    // hold the guard and report a second attempt as `Busy`.
    async fn execute(&self, command: BookingCommand) -> Result<(), WizardError> {
        let in_flight = matches!(command, BookingCommand::Pay { .. } | BookingCommand::Refund);
        if !in_flight && self.is_processing() {
            tracing::debug!(session = %self.session_id, ?command, "rejected while processing");
            return Err(WizardError::Busy);
        }
        tracing::debug!(session = %self.session_id, ?command, "executing");
        self.cqrs
            .execute(&self.session_id, command)
            .await
            .map_err(|err| {
                let err = WizardError::from(err);
                tracing::warn!(session = %self.session_id, error = %err, "command rejected");
                err
            })
    }
}

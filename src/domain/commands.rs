use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::payment::{PaymentForm, PaymentMethod};

#[derive(Debug, Deserialize)]
pub enum BookingCommand {
    Start {
        id: Uuid,
    },
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
    Pay {
        form: PaymentForm,
    },
    Refund,
    BookAnother {
        id: Uuid,
    },
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Ways a passenger can pay for a booking.
///
/// Each variant knows which form fields it renders and which of them must be
/// filled in before settlement is attempted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Card,
    Upi,
    Paytm,
    Gpay,
    Apple,
    Netbanking,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 6] = [
        PaymentMethod::Upi,
        PaymentMethod::Paytm,
        PaymentMethod::Gpay,
        PaymentMethod::Apple,
        PaymentMethod::Card,
        PaymentMethod::Netbanking,
    ];

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::Paytm => "paytm",
            PaymentMethod::Gpay => "gpay",
            PaymentMethod::Apple => "apple",
            PaymentMethod::Netbanking => "netbanking",
        }
    }

    /// Name shown on the pay button and receipt.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::Card => "CARD",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::Paytm => "PAYTM",
            PaymentMethod::Gpay => "Google Pay",
            PaymentMethod::Apple => "Apple Pay",
            PaymentMethod::Netbanking => "Net Banking",
        }
    }

    /// Input fields an UI renders for this method, in display order.
    #[must_use]
    pub fn fields(self) -> &'static [PaymentField] {
        match self {
            PaymentMethod::Card => &[
                PaymentField::CardNumber,
                PaymentField::Expiry,
                PaymentField::Cvc,
                PaymentField::NameOnCard,
            ],
            PaymentMethod::Upi => &[PaymentField::UpiId],
            PaymentMethod::Paytm => &[PaymentField::MobileNumber],
            PaymentMethod::Gpay | PaymentMethod::Apple => &[],
            PaymentMethod::Netbanking => &[PaymentField::Bank],
        }
    }

    /// Fields that block payment while empty.
    ///
    /// UPI renders an id field but never requires it: scanning the QR code is
    /// always accepted as an alternative.
    #[must_use]
    pub fn required_fields(self) -> &'static [PaymentField] {
        match self {
            PaymentMethod::Card => &[
                PaymentField::CardNumber,
                PaymentField::Expiry,
                PaymentField::Cvc,
            ],
            PaymentMethod::Upi | PaymentMethod::Gpay | PaymentMethod::Apple => &[],
            PaymentMethod::Paytm => &[PaymentField::MobileNumber],
            PaymentMethod::Netbanking => &[PaymentField::Bank],
        }
    }

    /// Checks the form against this method only; fields of other methods are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingFields`] listing every empty required
    /// field.
    pub fn validate(self, form: &PaymentForm) -> Result<(), ValidationError> {
        let missing: Vec<PaymentField> = self
            .required_fields()
            .iter()
            .copied()
            .filter(|field| !form.provides(*field))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingFields {
                method: self,
                fields: missing,
            })
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|method| method.code() == s)
            .ok_or_else(|| ValidationError::UnknownMethod(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentField {
    CardNumber,
    Expiry,
    Cvc,
    NameOnCard,
    UpiId,
    MobileNumber,
    Bank,
}

impl fmt::Display for PaymentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentField::CardNumber => "card number",
            PaymentField::Expiry => "expiry",
            PaymentField::Cvc => "CVC",
            PaymentField::NameOnCard => "name on card",
            PaymentField::UpiId => "UPI id",
            PaymentField::MobileNumber => "mobile number",
            PaymentField::Bank => "bank",
        };
        f.write_str(name)
    }
}

/// Banks offered for net banking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bank {
    Sbi,
    Hdfc,
    Icici,
    Axis,
    Kotak,
}

impl Bank {
    pub const ALL: [Bank; 5] = [Bank::Sbi, Bank::Hdfc, Bank::Icici, Bank::Axis, Bank::Kotak];

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Bank::Sbi => "sbi",
            Bank::Hdfc => "hdfc",
            Bank::Icici => "icici",
            Bank::Axis => "axis",
            Bank::Kotak => "kotak",
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Bank::Sbi => "State Bank of India",
            Bank::Hdfc => "HDFC Bank",
            Bank::Icici => "ICICI Bank",
            Bank::Axis => "Axis Bank",
            Bank::Kotak => "Kotak Mahindra Bank",
        }
    }
}

impl FromStr for Bank {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Bank::ALL
            .into_iter()
            .find(|bank| bank.code() == s)
            .ok_or_else(|| ValidationError::UnknownBank(s.to_string()))
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardDetails {
    pub number: String,
    pub expiry: String,
    pub cvc: String,
    pub name: String,
}

// Card number and CVC stay out of logs.
impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last_four: String = self
            .number
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        f.debug_struct("CardDetails")
            .field("number", &format_args!("****{last_four}"))
            .field("expiry", &self.expiry)
            .field("cvc", &"***")
            .field("name", &self.name)
            .finish()
    }
}

/// Everything the passenger has typed into the payment step.
///
/// Inputs for every method are kept side by side so switching methods does
/// not lose what was entered; only the selected method's fields are checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentForm {
    pub card: CardDetails,
    pub upi_id: String,
    pub mobile_number: String,
    pub bank: Option<Bank>,
}

impl PaymentForm {
    #[must_use]
    pub fn provides(&self, field: PaymentField) -> bool {
        let filled = |value: &str| !value.trim().is_empty();
        match field {
            PaymentField::CardNumber => filled(&self.card.number),
            PaymentField::Expiry => filled(&self.card.expiry),
            PaymentField::Cvc => filled(&self.card.cvc),
            PaymentField::NameOnCard => filled(&self.card.name),
            PaymentField::UpiId => filled(&self.upi_id),
            PaymentField::MobileNumber => filled(&self.mobile_number),
            PaymentField::Bank => self.bank.is_some(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("missing {} for {method} payment", join_fields(.fields))]
    MissingFields {
        method: PaymentMethod,
        fields: Vec<PaymentField>,
    },
    #[error("unknown payment method `{0}`")]
    UnknownMethod(String),
    #[error("unknown bank `{0}`")]
    UnknownBank(String),
}

fn join_fields(fields: &[PaymentField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Processing,
    Paid,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        };
        f.write_str(status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Completed,
}

const TICKET_PREFIX: &str = "TKT-";
const TICKET_SUFFIX_LEN: usize = 9;

/// Opaque identifier printed on a paid ticket, e.g. `TKT-3F9A0C21B`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    /// A fresh random id. Callers that need uniqueness beyond chance keep track
    /// of the ids they have issued.
    #[must_use]
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string().to_uppercase();
        Self(format!("{TICKET_PREFIX}{}", &hex[..TICKET_SUFFIX_LEN]))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.0.strip_prefix(TICKET_PREFIX).is_some_and(|suffix| {
            suffix.len() == TICKET_SUFFIX_LEN
                && suffix
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        })
    }
}

impl From<&str> for TicketId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(number: &str, expiry: &str, cvc: &str) -> PaymentForm {
        PaymentForm {
            card: CardDetails {
                number: number.to_string(),
                expiry: expiry.to_string(),
                cvc: cvc.to_string(),
                name: String::new(),
            },
            ..PaymentForm::default()
        }
    }

    #[test]
    fn card_requires_number_expiry_and_cvc() {
        assert!(
            PaymentMethod::Card
                .validate(&card("4111111111111111", "12/29", "123"))
                .is_ok()
        );

        let err = PaymentMethod::Card
            .validate(&card("4111111111111111", "", " "))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingFields {
                method: PaymentMethod::Card,
                fields: vec![PaymentField::Expiry, PaymentField::Cvc],
            }
        );
        assert_eq!(err.to_string(), "missing expiry, CVC for card payment");
    }

    #[test]
    fn card_name_is_optional() {
        let form = card("4111111111111111", "12/29", "123");
        assert!(!form.provides(PaymentField::NameOnCard));
        assert!(PaymentMethod::Card.validate(&form).is_ok());
    }

    #[test]
    fn upi_gpay_and_apple_never_block() {
        let empty = PaymentForm::default();
        for method in [PaymentMethod::Upi, PaymentMethod::Gpay, PaymentMethod::Apple] {
            assert!(method.validate(&empty).is_ok(), "{method} blocked");
        }
    }

    #[test]
    fn paytm_requires_mobile_number() {
        let mut form = PaymentForm::default();
        assert!(PaymentMethod::Paytm.validate(&form).is_err());
        form.mobile_number = "9876543210".to_string();
        assert!(PaymentMethod::Paytm.validate(&form).is_ok());
    }

    #[test]
    fn netbanking_requires_bank() {
        let mut form = PaymentForm::default();
        assert!(PaymentMethod::Netbanking.validate(&form).is_err());
        form.bank = Some("hdfc".parse().unwrap());
        assert!(PaymentMethod::Netbanking.validate(&form).is_ok());
    }

    #[test]
    fn other_methods_fields_are_ignored() {
        // a complete card does not satisfy net banking
        let form = card("4111111111111111", "12/29", "123");
        assert!(PaymentMethod::Netbanking.validate(&form).is_err());
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert_eq!(
            "bitcoin".parse::<PaymentMethod>(),
            Err(ValidationError::UnknownMethod("bitcoin".to_string()))
        );
        assert_eq!(
            "".parse::<Bank>(),
            Err(ValidationError::UnknownBank(String::new()))
        );
        assert_eq!("netbanking".parse::<PaymentMethod>(), Ok(PaymentMethod::Netbanking));
    }

    #[test]
    fn generated_ticket_ids_are_well_formed() {
        for _ in 0..100 {
            let id = TicketId::generate();
            assert!(id.is_well_formed(), "{id}");
        }
        assert!(!TicketId::from("TKT-abc").is_well_formed());
        assert!(!TicketId::from("TKT-abcdefghi").is_well_formed());
        assert!(TicketId::from("TKT-ABC123XYZ").is_well_formed());
    }

    #[test]
    fn card_debug_masks_number_and_cvc() {
        let form = card("4111111111111234", "12/29", "987");
        let debug = format!("{:?}", form.card);
        assert!(debug.contains("****1234"));
        assert!(!debug.contains("4111"));
        assert!(!debug.contains("987"));
    }
}

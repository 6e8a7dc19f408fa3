//! Static display strings for the booking flow.
//!
//! The wizard's decisions never depend on the language; these tables only
//! feed notification titles and descriptions.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
    Hi,
    Te,
}

#[derive(Error, Debug, PartialEq)]
#[error("unsupported language `{0}`")]
pub struct UnsupportedLanguage(pub String);

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "es" => Ok(Language::Es),
            "hi" => Ok(Language::Hi),
            "te" => Ok(Language::Te),
            _ => Err(UnsupportedLanguage(s.to_string())),
        }
    }
}

pub struct Strings {
    pub error: &'static str,
    pub fill_all_fields: &'static str,
    pub payment_failed: &'static str,
    pub booking_confirmed: &'static str,
    pub ticket: &'static str,
    pub booked: &'static str,
    pub processing_refund: &'static str,
    pub initiating_refund: &'static str,
    pub refund_successful: &'static str,
    pub amount_refunded_to: &'static str,
    pub fare_updated: &'static str,
    pub fare_updated_message: &'static str,
    pub coming_soon: &'static str,
    pub coming_soon_message: &'static str,
}

const EN: Strings = Strings {
    error: "Error",
    fill_all_fields: "Please fill in all required fields",
    payment_failed: "Payment could not be completed",
    booking_confirmed: "Booking Confirmed",
    ticket: "ticket",
    booked: "booked",
    processing_refund: "Processing Refund",
    initiating_refund: "Initiating automatic refund...",
    refund_successful: "Refund Successful",
    amount_refunded_to: "Amount refunded to",
    fare_updated: "Fare Updated",
    fare_updated_message: "Route fare has been updated successfully.",
    coming_soon: "Feature Coming Soon",
    coming_soon_message: "This feature isn't implemented yet.",
};

const ES: Strings = Strings {
    error: "Error",
    fill_all_fields: "Por favor complete todos los campos obligatorios",
    payment_failed: "No se pudo completar el pago",
    booking_confirmed: "Reserva confirmada",
    ticket: "boleto",
    booked: "reservado",
    processing_refund: "Procesando reembolso",
    initiating_refund: "Iniciando reembolso automático...",
    refund_successful: "Reembolso exitoso",
    amount_refunded_to: "Importe reembolsado a",
    fare_updated: "Tarifa actualizada",
    fare_updated_message: "La tarifa de la ruta se actualizó correctamente.",
    coming_soon: "Próximamente",
    coming_soon_message: "Esta función aún no está disponible.",
};

const HI: Strings = Strings {
    error: "त्रुटि",
    fill_all_fields: "कृपया सभी आवश्यक जानकारी भरें",
    payment_failed: "भुगतान पूरा नहीं हो सका",
    booking_confirmed: "बुकिंग की पुष्टि हो गई",
    ticket: "टिकट",
    booked: "बुक हो गए",
    processing_refund: "रिफंड प्रक्रिया में",
    initiating_refund: "स्वचालित रिफंड शुरू किया जा रहा है...",
    refund_successful: "रिफंड सफल",
    amount_refunded_to: "राशि वापस भेजी गई",
    fare_updated: "किराया अपडेट हुआ",
    fare_updated_message: "रूट का किराया सफलतापूर्वक अपडेट हो गया।",
    coming_soon: "जल्द आ रहा है",
    coming_soon_message: "यह सुविधा अभी उपलब्ध नहीं है।",
};

const TE: Strings = Strings {
    error: "లోపం",
    fill_all_fields: "దయచేసి అవసరమైన అన్ని వివరాలు నింపండి",
    payment_failed: "చెల్లింపు పూర్తి కాలేదు",
    booking_confirmed: "బుకింగ్ నిర్ధారించబడింది",
    ticket: "టికెట్",
    booked: "బుక్ అయ్యాయి",
    processing_refund: "రీఫండ్ ప్రాసెస్ అవుతోంది",
    initiating_refund: "ఆటోమేటిక్ రీఫండ్ ప్రారంభమవుతోంది...",
    refund_successful: "రీఫండ్ విజయవంతమైంది",
    amount_refunded_to: "మొత్తం తిరిగి జమ చేయబడింది",
    fare_updated: "ఛార్జీ నవీకరించబడింది",
    fare_updated_message: "రూట్ ఛార్జీ విజయవంతంగా నవీకరించబడింది.",
    coming_soon: "త్వరలో వస్తుంది",
    coming_soon_message: "ఈ సదుపాయం ఇంకా అందుబాటులో లేదు.",
};

impl Language {
    pub const ALL: [Language; 4] = [Language::En, Language::Es, Language::Hi, Language::Te];

    #[must_use]
    pub fn strings(self) -> &'static Strings {
        match self {
            Language::En => &EN,
            Language::Es => &ES,
            Language::Hi => &HI,
            Language::Te => &TE,
        }
    }

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::Hi => "hi",
            Language::Te => "te",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_language_codes() {
        assert_eq!("en".parse::<Language>(), Ok(Language::En));
        assert_eq!(" HI ".parse::<Language>(), Ok(Language::Hi));
        assert_eq!("es".parse::<Language>(), Ok(Language::Es));
        assert_eq!("Te".parse::<Language>(), Ok(Language::Te));
        assert_eq!(
            "fr".parse::<Language>(),
            Err(UnsupportedLanguage("fr".to_string()))
        );
    }

    #[test]
    fn every_language_has_strings() {
        for language in Language::ALL {
            assert_eq!(language.code().parse::<Language>(), Ok(language));
            let strings = language.strings();
            assert!(!strings.booking_confirmed.is_empty());
            assert!(!strings.fill_all_fields.is_empty());
        }
        assert_eq!(Language::default().strings().error, "Error");
        assert_eq!(Language::Es.strings().booking_confirmed, "Reserva confirmada");
        assert_eq!(Language::Te.strings().ticket, "టికెట్");
    }
}

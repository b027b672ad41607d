//! Способы оплаты и проверка платёжной формы.
//!
//! Сообщения об ошибках уходят пользователю как есть, поэтому они на английском,
//! как и весь интерфейс кинотеатра.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::PaymentError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    pub number: String,
    pub holder: String,
    pub expiry: String,
    pub cvv: String,
}

/// Нормализованная карта, которую проверяет `validator`.
#[derive(Debug, Validate)]
struct CardForm {
    #[validate(length(min = 13, max = 19, message = "Please enter a valid card number"))]
    number: String,
    #[validate(length(min = 1, message = "Please enter cardholder name"))]
    holder: String,
    #[validate(length(equal = 5, message = "Please enter a valid expiry date (MM/YY)"))]
    expiry: String,
    #[validate(length(min = 3, max = 4, message = "Please enter a valid CVV"))]
    cvv: String,
}

const CARD_FIELDS: [&str; 4] = ["number", "holder", "expiry", "cvv"];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpiDetails {
    pub upi_id: Option<String>,
    pub app: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum PaymentMethod {
    Card(CardDetails),
    Upi(UpiDetails),
    Wallet { wallet: Option<String> },
    #[serde(rename = "netbanking")]
    NetBanking { bank: Option<String> },
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or_default().is_empty()
}

fn invalid(message: &str) -> PaymentError {
    PaymentError::Validation(message.to_string())
}

impl PaymentMethod {
    pub fn kind(&self) -> &'static str {
        match self {
            PaymentMethod::Card(_) => "card",
            PaymentMethod::Upi(_) => "upi",
            PaymentMethod::Wallet { .. } => "wallet",
            PaymentMethod::NetBanking { .. } => "netbanking",
        }
    }

    pub fn card_brand(&self) -> Option<CardBrand> {
        match self {
            PaymentMethod::Card(card) => Some(CardBrand::detect(&card.number)),
            _ => None,
        }
    }

    /// Проверяет форму выбранного способа оплаты на дату `today`.
    pub fn validate(&self, today: NaiveDate) -> Result<(), PaymentError> {
        match self {
            PaymentMethod::Card(card) => validate_card(card, today),
            PaymentMethod::Upi(upi) => {
                if is_blank(&upi.upi_id) && is_blank(&upi.app) {
                    return Err(invalid("Please enter UPI ID or select a UPI app"));
                }
                match upi.upi_id.as_deref().map(str::trim) {
                    Some(id) if !id.is_empty() && !id.contains('@') => {
                        Err(invalid("Please enter a valid UPI ID (e.g., name@upi)"))
                    }
                    _ => Ok(()),
                }
            }
            PaymentMethod::Wallet { wallet } if is_blank(wallet) => {
                Err(invalid("Please select a wallet"))
            }
            PaymentMethod::NetBanking { bank } if is_blank(bank) => {
                Err(invalid("Please select your bank"))
            }
            _ => Ok(()),
        }
    }
}

fn validate_card(card: &CardDetails, today: NaiveDate) -> Result<(), PaymentError> {
    let form = CardForm {
        number: card.number.chars().filter(|c| !c.is_whitespace()).collect(),
        holder: card.holder.trim().to_string(),
        expiry: card.expiry.trim().to_string(),
        cvv: card.cvv.trim().to_string(),
    };

    if let Err(errors) = form.validate() {
        let field_errors = errors.field_errors();
        for field in CARD_FIELDS {
            let message = field_errors
                .get(field)
                .and_then(|errs| errs.first())
                .and_then(|err| err.message.as_ref())
                .map(|msg| msg.to_string());
            if let Some(message) = message {
                return Err(PaymentError::Validation(message));
            }
        }
        return Err(invalid("Please check your card details"));
    }

    if !form.number.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("Please enter a valid card number"));
    }
    if !form.cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("Please enter a valid CVV"));
    }

    let (month, year) = parse_expiry(&form.expiry)
        .ok_or_else(|| invalid("Please enter a valid expiry date (MM/YY)"))?;
    // Карта действует до конца указанного месяца
    let current_month = (today.year(), today.month());
    if (2000 + year as i32, month) < current_month {
        return Err(invalid("Card has expired"));
    }

    Ok(())
}

fn parse_expiry(expiry: &str) -> Option<(u32, u32)> {
    let (month, year) = expiry.split_once('/')?;
    if month.len() != 2 || year.len() != 2 {
        return None;
    }
    let month: u32 = month.parse().ok()?;
    let year: u32 = year.parse().ok()?;
    (1..=12).contains(&month).then_some((month, year))
}

/// Платёжная система по первой цифре номера карты.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    RuPay,
    Unknown,
}

impl CardBrand {
    pub fn detect(number: &str) -> Self {
        match number.trim_start().chars().next() {
            Some('4') => CardBrand::Visa,
            Some('5') | Some('2') => CardBrand::Mastercard,
            Some('3') => CardBrand::Amex,
            Some('6') | Some('8') => CardBrand::RuPay,
            _ => CardBrand::Unknown,
        }
    }
}

// === Форматирование ввода ===

/// Оставляет только цифры и группирует их по четыре: `4111 1111 1111 1111`.
pub fn format_card_number(input: &str) -> String {
    let digits: Vec<char> = input.chars().filter(|c| c.is_ascii_digit()).collect();
    let grouped = digits
        .chunks(4)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ");
    grouped.chars().take(19).collect()
}

/// `1227` -> `12/27`.
pub fn format_expiry(input: &str) -> String {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() >= 2 {
        let year: String = digits.chars().skip(2).take(2).collect();
        format!("{}/{}", &digits[..2], year)
    } else {
        digits
    }
}

pub fn format_cvv(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn card(number: &str, holder: &str, expiry: &str, cvv: &str) -> PaymentMethod {
        PaymentMethod::Card(CardDetails {
            number: number.to_string(),
            holder: holder.to_string(),
            expiry: expiry.to_string(),
            cvv: cvv.to_string(),
        })
    }

    fn message(result: Result<(), PaymentError>) -> String {
        match result {
            Err(PaymentError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn valid_card_passes() {
        assert!(card("4111 1111 1111 1111", "Jane Doe", "12/27", "123").validate(today()).is_ok());
    }

    #[test]
    fn card_fields_are_checked_in_form_order() {
        assert_eq!(
            message(card("4111", "", "1/2", "1").validate(today())),
            "Please enter a valid card number"
        );
        assert_eq!(
            message(card("4111111111111111", " ", "12/27", "123").validate(today())),
            "Please enter cardholder name"
        );
        assert_eq!(
            message(card("4111111111111111", "Jane", "1227", "123").validate(today())),
            "Please enter a valid expiry date (MM/YY)"
        );
        assert_eq!(
            message(card("4111111111111111", "Jane", "12/27", "12").validate(today())),
            "Please enter a valid CVV"
        );
    }

    #[test]
    fn card_valid_through_its_expiry_month() {
        assert!(card("4111111111111111", "Jane", "10/26", "123").validate(today()).is_ok());
        assert_eq!(
            message(card("4111111111111111", "Jane", "09/26", "123").validate(today())),
            "Card has expired"
        );
        assert_eq!(
            message(card("4111111111111111", "Jane", "13/27", "123").validate(today())),
            "Please enter a valid expiry date (MM/YY)"
        );
    }

    #[test]
    fn upi_wallet_and_netbanking_rules() {
        let empty_upi = PaymentMethod::Upi(UpiDetails::default());
        assert_eq!(
            message(empty_upi.validate(today())),
            "Please enter UPI ID or select a UPI app"
        );

        let bad_id = PaymentMethod::Upi(UpiDetails {
            upi_id: Some("jane".to_string()),
            app: None,
        });
        assert_eq!(
            message(bad_id.validate(today())),
            "Please enter a valid UPI ID (e.g., name@upi)"
        );

        let app_only = PaymentMethod::Upi(UpiDetails {
            upi_id: None,
            app: Some("gpay".to_string()),
        });
        assert!(app_only.validate(today()).is_ok());

        assert!(PaymentMethod::Wallet { wallet: None }.validate(today()).is_err());
        assert!(PaymentMethod::NetBanking { bank: Some("sbi".to_string()) }
            .validate(today())
            .is_ok());
    }

    #[test]
    fn method_deserializes_from_tagged_json() {
        let method: PaymentMethod =
            serde_json::from_str(r#"{"method":"netbanking","bank":"hdfc"}"#).unwrap();
        assert_eq!(method.kind(), "netbanking");

        let method: PaymentMethod = serde_json::from_str(
            r#"{"method":"card","number":"4111111111111111","holder":"J","expiry":"12/27","cvv":"123"}"#,
        )
        .unwrap();
        assert_eq!(method.kind(), "card");
        assert_eq!(method.card_brand(), Some(CardBrand::Visa));
        assert_eq!(PaymentMethod::Wallet { wallet: None }.card_brand(), None);
    }

    #[test]
    fn brand_detection_and_formatting() {
        assert_eq!(CardBrand::detect("4111"), CardBrand::Visa);
        assert_eq!(CardBrand::detect("2221"), CardBrand::Mastercard);
        assert_eq!(CardBrand::detect("3782"), CardBrand::Amex);
        assert_eq!(CardBrand::detect("6521"), CardBrand::RuPay);
        assert_eq!(CardBrand::detect("9"), CardBrand::Unknown);

        assert_eq!(format_card_number("4111-1111 1111 11112222"), "4111 1111 1111 1111");
        assert_eq!(format_expiry("1227"), "12/27");
        assert_eq!(format_expiry("1"), "1");
        assert_eq!(format_cvv("1a2b3"), "123");
    }
}

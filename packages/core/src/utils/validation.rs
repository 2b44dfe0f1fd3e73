use crate::config::Config;
use crate::payload::quote::{QuoteBody, QuotePayload};
use crate::utils::error::{NegotiationError, Result};

/// Котировку можно отправлять: у базиса есть контракт и объём,
/// у спота есть цена или объём
pub fn can_send_quote(quote: &QuotePayload) -> bool {
    match &quote.body {
        QuoteBody::Basis(basis) => {
            !basis.contract_code.trim().is_empty() && basis.quantity.is_some()
        }
        QuoteBody::Spot(spot) => spot.price.is_some() || spot.quantity.is_some(),
    }
}

pub fn validate_quote(quote: &QuotePayload) -> Result<()> {
    if !can_send_quote(quote) {
        let reason = if quote.is_basis() {
            "Basis quote needs a contract code and quantity"
        } else {
            "Quote needs a price or quantity"
        };
        return Err(NegotiationError::ValidationError(reason.to_string()));
    }
    Ok(())
}

pub fn validate_text_message(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(NegotiationError::ValidationError(
            "Message cannot be empty".to_string(),
        ));
    }

    let max_length = Config::global().max_message_length;
    if content.chars().count() > max_length {
        return Err(NegotiationError::ValidationError(format!(
            "Message must be at most {} characters",
            max_length
        )));
    }

    Ok(())
}

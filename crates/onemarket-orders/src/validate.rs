//! Customer, payment and quantity validation.

use crate::error::OrderError;
use crate::types::{CustomerDetails, PaymentMethod};

pub const MAX_QUANTITY: f64 = 1000.0;
pub const MAX_ORDER_PRICE: f64 = 100_000.0;

/// Trimmed name of 3 to 100 characters.
#[must_use]
pub fn validate_name(name: &str) -> bool {
    (3..=100).contains(&name.trim().chars().count())
}

/// 11 or 12 digits once every non-digit is removed.
#[must_use]
pub fn validate_phone(phone: &str) -> bool {
    let digits = phone.trim().chars().filter(char::is_ascii_digit).count();
    digits == 11 || digits == 12
}

/// Trimmed address of 10 to 500 characters.
#[must_use]
pub fn validate_address(address: &str) -> bool {
    (10..=500).contains(&address.trim().chars().count())
}

#[must_use]
pub fn validate_quantity(quantity: f64) -> bool {
    quantity.is_finite() && quantity > 0.0 && quantity <= MAX_QUANTITY
}

#[must_use]
pub fn validate_price(price: f64) -> bool {
    price.is_finite() && (0.0..=MAX_ORDER_PRICE).contains(&price)
}

impl CustomerDetails {
    /// Trims every field and checks it.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule: [`OrderError::InvalidName`],
    /// [`OrderError::InvalidPhone`] or [`OrderError::InvalidAddress`].
    pub fn validated(self) -> Result<Self, OrderError> {
        if !validate_name(&self.name) {
            return Err(OrderError::InvalidName);
        }
        if !validate_phone(&self.phone) {
            return Err(OrderError::InvalidPhone);
        }
        if !validate_address(&self.address) {
            return Err(OrderError::InvalidAddress);
        }
        Ok(Self {
            name: self.name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
        })
    }
}

impl PaymentMethod {
    /// Trims the Vodafone Cash fields and requires both.
    ///
    /// # Errors
    ///
    /// [`OrderError::MissingVodafoneSender`] or
    /// [`OrderError::MissingPaymentRef`] for an incomplete Vodafone Cash
    /// payment.
    pub fn validated(self) -> Result<Self, OrderError> {
        match self {
            PaymentMethod::CashOnDelivery => Ok(self),
            PaymentMethod::VodafoneCash { sender, reference } => {
                let sender = sender.trim().to_string();
                let reference = reference.trim().to_string();
                if sender.is_empty() {
                    return Err(OrderError::MissingVodafoneSender);
                }
                if reference.is_empty() {
                    return Err(OrderError::MissingPaymentRef);
                }
                Ok(PaymentMethod::VodafoneCash { sender, reference })
            }
        }
    }
}

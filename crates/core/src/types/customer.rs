//! Customer details collected at checkout.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{Email, EmailError};

static ZIP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}$").expect("Invalid regex"));

/// Minimum characters for first and last name.
pub const MIN_NAME_LENGTH: usize = 2;
/// Minimum characters for the delivery address.
pub const MIN_ADDRESS_LENGTH: usize = 5;

/// A checkout form field that failed validation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CustomerDetailsError {
    #[error("Name must be at least 2 characters long")]
    Name,
    #[error("Surname must be at least 2 characters long")]
    Surname,
    #[error("Please enter a valid email address")]
    Email,
    #[error("Address must be at least 5 characters long")]
    Address,
    #[error("Please enter a valid 5-digit zip code")]
    Zipcode,
}

impl From<EmailError> for CustomerDetailsError {
    fn from(_: EmailError) -> Self {
        Self::Email
    }
}

/// Raw checkout form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub address: String,
    pub zipcode: String,
}

/// Checkout details that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidCustomerDetails {
    pub name: String,
    pub surname: String,
    pub email: Email,
    pub address: String,
    pub zipcode: String,
}

impl CustomerDetails {
    /// Check every field, reporting the first one that fails.
    ///
    /// Fields are trimmed before their lengths are measured.
    ///
    /// # Errors
    ///
    /// Returns the [`CustomerDetailsError`] naming the first invalid field, in
    /// form order: name, surname, email, address, zip code.
    pub fn validate(&self) -> Result<ValidCustomerDetails, CustomerDetailsError> {
        let name = self.name.trim();
        if name.chars().count() < MIN_NAME_LENGTH {
            return Err(CustomerDetailsError::Name);
        }

        let surname = self.surname.trim();
        if surname.chars().count() < MIN_NAME_LENGTH {
            return Err(CustomerDetailsError::Surname);
        }

        let email = Email::parse(self.email.trim())?;

        let address = self.address.trim();
        if address.chars().count() < MIN_ADDRESS_LENGTH {
            return Err(CustomerDetailsError::Address);
        }

        let zipcode = self.zipcode.trim();
        if !ZIP_PATTERN.is_match(zipcode) {
            return Err(CustomerDetailsError::Zipcode);
        }

        Ok(ValidCustomerDetails {
            name: name.to_owned(),
            surname: surname.to_owned(),
            email,
            address: address.to_owned(),
            zipcode: zipcode.to_owned(),
        })
    }
}

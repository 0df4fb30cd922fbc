//! Email address types.

use crate::{MailError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Email address with optional display name.
///
/// Two addresses are equal when their email parts are equal; the display
/// name does not take part in comparisons or hashing. Deserialization goes
/// through the same validation as [`Address::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "AddressRepr")]
pub struct Address {
    email: String,
    name: Option<String>,
}

impl Address {
    /// Create a new address with just an email.
    pub fn new(email: impl Into<String>) -> Result<Self> {
        let email = email.into().trim().to_string();
        validate_email(&email)?;
        Ok(Self { email, name: None })
    }

    /// Create a new address with a display name.
    ///
    /// A blank name is treated as no name.
    pub fn with_name(email: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let mut address = Self::new(email)?;
        let name = name.into();
        if !name.trim().is_empty() {
            address.name = Some(name.trim().to_string());
        }
        Ok(address)
    }

    /// Parse an address from a string like "Name <email@example.com>" or "email@example.com".
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if let Some(start) = s.find('<')
            && let Some(end) = s.rfind('>')
            && start < end
        {
            let name = s[..start].trim().trim_matches('"');
            let email = s[start + 1..end].trim();
            return Self::with_name(email, name);
        }

        Self::new(s)
    }

    /// Get the email address.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Get the display name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Convert to a lettre mailbox.
    pub(crate) fn to_mailbox(&self) -> Result<lettre::message::Mailbox> {
        let address: lettre::Address = self.email.parse()?;
        Ok(lettre::message::Mailbox::new(self.name.clone(), address))
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.email == other.email
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.email.hash(state);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.email),
            None => write!(f, "{}", self.email),
        }
    }
}

/// Wire shape of [`Address`] before validation.
#[derive(Deserialize)]
struct AddressRepr {
    email: String,
    #[serde(default)]
    name: Option<String>,
}

impl TryFrom<AddressRepr> for Address {
    type Error = MailError;

    fn try_from(repr: AddressRepr) -> Result<Self> {
        match repr.name {
            Some(name) => Self::with_name(repr.email, name),
            None => Self::new(repr.email),
        }
    }
}

impl TryFrom<&str> for Address {
    type Error = MailError;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = MailError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

/// Trait for types that can be converted to an Address.
///
/// This allows accepting both `Address` directly and string types that
/// can be parsed into addresses.
pub trait IntoAddress {
    /// Convert into an Address.
    fn into_address(self) -> Result<Address>;
}

impl IntoAddress for Address {
    fn into_address(self) -> Result<Address> {
        Ok(self)
    }
}

impl IntoAddress for &Address {
    fn into_address(self) -> Result<Address> {
        Ok(self.clone())
    }
}

impl IntoAddress for &str {
    fn into_address(self) -> Result<Address> {
        Address::parse(self)
    }
}

impl IntoAddress for String {
    fn into_address(self) -> Result<Address> {
        Address::parse(&self)
    }
}

impl IntoAddress for &String {
    fn into_address(self) -> Result<Address> {
        Address::parse(self)
    }
}

/// Join addresses with `", "` for display.
pub(crate) fn join(addresses: &[Address]) -> String {
    addresses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn validate_email(email: &str) -> Result<()> {
    if email.is_empty() {
        return Err(MailError::InvalidAddress(
            "Email cannot be empty".to_string(),
        ));
    }

    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Ok(())
        }
        _ => Err(MailError::InvalidAddress(format!(
            "Invalid email format: {}",
            email
        ))),
    }
}

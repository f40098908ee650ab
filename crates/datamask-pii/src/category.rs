//! PII categories

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Types of PII that can be detected
///
/// Variant order is the registry order: when a value matches several
/// categories, masking resolves them in this order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PiiCategory {
    /// Email address
    Email,

    /// Phone number
    Phone,

    /// Credit card number (Luhn validated)
    CreditCard,

    /// US Social Security Number
    Ssn,

    /// IPv4 address
    Ipv4,

    /// IPv6 address (strictly parsed)
    Ipv6,

    /// International Bank Account Number (mod-97 validated)
    Iban,
}

impl PiiCategory {
    /// Every category, in registry order
    pub const ALL: [PiiCategory; 7] = [
        PiiCategory::Email,
        PiiCategory::Phone,
        PiiCategory::CreditCard,
        PiiCategory::Ssn,
        PiiCategory::Ipv4,
        PiiCategory::Ipv6,
        PiiCategory::Iban,
    ];

    /// Identifier used in configuration, reports and token keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::CreditCard => "credit_card",
            Self::Ssn => "ssn",
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
            Self::Iban => "iban",
        }
    }
}

impl fmt::Display for PiiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PiiCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| format!("unknown PII category '{}'", s))
    }
}

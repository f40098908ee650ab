//! Algorithmic post-filters for regex matches
//!
//! Credit card, IPv6 and IBAN patterns produce false positives on their
//! own. A match only counts when the corresponding predicate here passes.

use regex::Regex;
use std::net::Ipv6Addr;
use std::sync::OnceLock;

const MIN_CREDIT_CARD_DIGITS: usize = 13;
const LUHN_SUBTRACT: u32 = 9;

/// Luhn checksum over the decimal digits of `text`
///
/// Non-digit characters are ignored. Fewer than 13 digits never validates.
pub fn luhn_valid(text: &str) -> bool {
    let digits: Vec<u32> = text.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() < MIN_CREDIT_CARD_DIGITS {
        return false;
    }

    let parity = (digits.len() - 2) % 2;
    let (body, check) = digits.split_at(digits.len() - 1);

    let checksum: u32 = body
        .iter()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == parity {
                let doubled = d * 2;
                if doubled > LUHN_SUBTRACT {
                    doubled - LUHN_SUBTRACT
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    (checksum + check[0]).is_multiple_of(10)
}

/// True when some whitespace- or comma-separated token is a valid IPv6 address
pub fn ipv6_valid(text: &str) -> bool {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .any(|token| token.parse::<Ipv6Addr>().is_ok())
}

fn iban_candidate_regex() -> &'static Regex {
    static IBAN_CANDIDATE: OnceLock<Regex> = OnceLock::new();
    IBAN_CANDIDATE.get_or_init(|| {
        Regex::new(r"[A-Z]{2}[0-9]{2}[A-Z0-9]{10,30}").expect("IBAN candidate pattern is valid")
    })
}

/// True when at least one IBAN-shaped token in the uppercased text passes mod-97
pub fn iban_valid(text: &str) -> bool {
    let upper = text.to_uppercase();
    iban_candidate_regex()
        .find_iter(&upper)
        .any(|candidate| iban_mod97(candidate.as_str()))
}

/// ISO 13616 check: rearranged numeric form must leave remainder 1 mod 97
///
/// The numeric string is reduced one digit at a time, so arbitrarily long
/// inputs never overflow.
pub fn iban_mod97(iban: &str) -> bool {
    if iban.len() < 4 || !iban.is_ascii() {
        return false;
    }

    let upper = iban.to_ascii_uppercase();
    let (head, tail) = upper.split_at(4);

    let mut remainder: u32 = 0;
    for ch in tail.chars().chain(head.chars()) {
        let value = match ch {
            '0'..='9' => ch as u32 - '0' as u32,
            'A'..='Z' => ch as u32 - 'A' as u32 + 10,
            _ => return false,
        };
        // Letters expand to two digits
        if value >= 10 {
            remainder = (remainder * 10 + value / 10) % 97;
            remainder = (remainder * 10 + value % 10) % 97;
        } else {
            remainder = (remainder * 10 + value) % 97;
        }
    }

    remainder == 1
}

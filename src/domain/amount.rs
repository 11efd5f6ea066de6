use std::fmt;

/// Voting credits held by a participant and accumulated by an event.
pub type Credits = i64;

/// Purchase prices are integer cents so slot trades never touch floating point.
/// 1 unit = 100 cents, so a bid of 12.50 is stored as 1250.
pub type Cents = i64;

/// Format a price in cents for display.
/// Example: 10000 -> "100.00", 5 -> "0.05"
pub fn format_price(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parse a decimal price into cents. Prices are never negative.
/// Example: "100" -> 10000, "12.5" -> 1250, ".05" -> 5
pub fn parse_price(input: &str) -> Result<Cents, ParsePriceError> {
    let input = input.trim();
    if input.is_empty() || input.starts_with('-') {
        return Err(ParsePriceError::InvalidFormat);
    }

    let (units, fraction) = match input.split_once('.') {
        Some((units, fraction)) => (units, fraction),
        None => (input, ""),
    };

    let units: i64 = if units.is_empty() {
        0
    } else {
        units.parse().map_err(|_| ParsePriceError::InvalidFormat)?
    };

    if fraction.len() > 2 {
        return Err(ParsePriceError::TooPrecise);
    }
    let fraction_cents: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().map_err(|_| ParsePriceError::InvalidFormat)? * 10,
        _ => fraction.parse().map_err(|_| ParsePriceError::InvalidFormat)?,
    };

    units
        .checked_mul(100)
        .and_then(|c| c.checked_add(fraction_cents))
        .ok_or(ParsePriceError::Overflow)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsePriceError {
    InvalidFormat,
    TooPrecise,
    Overflow,
}

impl fmt::Display for ParsePriceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsePriceError::InvalidFormat => write!(f, "invalid price format"),
            ParsePriceError::TooPrecise => write!(f, "prices have at most two decimal places"),
            ParsePriceError::Overflow => write!(f, "price is too large"),
        }
    }
}

impl std::error::Error for ParsePriceError {}

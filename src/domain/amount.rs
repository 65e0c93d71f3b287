use crate::error::Pacs008Error;
use rust_decimal::Decimal;
use std::fmt;

/// The only settlement currency accepted by the instant payment network.
pub const SETTLEMENT_CURRENCY: &str = "BRL";

/// Maximum number of fractional digits the network accepts for BRL.
pub const MAX_FRACTION_DIGITS: u32 = 2;

/// Maximum number of significant digits in `ActiveCurrencyAndAmount`.
pub const MAX_TOTAL_DIGITS: usize = 18;

/// Represents a positive interbank settlement amount in BRL.
///
/// This is a wrapper around `rust_decimal::Decimal` that enforces the
/// network's precision rules at construction time, so every `Amount` that
/// reaches the serializer is already schema-valid.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, Pacs008Error> {
        if value <= Decimal::ZERO {
            return Err(Pacs008Error::validation("amount", "must be positive"));
        }
        let normalized = value.normalize();
        if normalized.scale() > MAX_FRACTION_DIGITS {
            return Err(Pacs008Error::validation(
                "amount",
                format!("must have at most {MAX_FRACTION_DIGITS} decimal places"),
            ));
        }
        let digits = normalized.mantissa().unsigned_abs().to_string().len();
        if digits > MAX_TOTAL_DIGITS {
            return Err(Pacs008Error::validation(
                "amount",
                format!("must have at most {MAX_TOTAL_DIGITS} digits"),
            ));
        }
        Ok(Self(normalized))
    }

    pub fn currency(&self) -> &'static str {
        SETTLEMENT_CURRENCY
    }
}

/// Renders the amount with exactly two decimals, as the schema expects.
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

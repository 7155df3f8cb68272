use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Amount in the currency's smallest unit, as the gateway expects it
/// (e.g. paise for INR, cents for USD).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinorUnits(pub i64);

/// Human-readable amount in major units.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct DisplayAmount(pub Decimal);

/// Number of minor units in one major unit for the currencies we settle in.
/// Everything the gateway supports today uses two decimal places except the
/// zero-decimal currencies listed here.
fn minor_exponent(currency: &str) -> u32 {
    match currency {
        "JPY" | "KRW" | "VND" | "CLP" => 0,
        _ => 2,
    }
}

impl MinorUnits {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Converts to major units using the currency's decimal places.
    pub fn to_display(self, currency: &str) -> DisplayAmount {
        DisplayAmount(Decimal::new(self.0, minor_exponent(currency)))
    }
}

/// Written back as a JSON number: integral amounts as integers, everything
/// else as a float, so a listing re-serializes the way the backend sent it.
impl Serialize for DisplayAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let amount = self.0.normalize();
        if amount.scale() == 0
            && let Some(whole) = amount.to_i64()
        {
            return serializer.serialize_i64(whole);
        }
        match amount.to_f64() {
            Some(value) => serializer.serialize_f64(value),
            None => serializer.serialize_str(&amount.to_string()),
        }
    }
}

impl fmt::Display for DisplayAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

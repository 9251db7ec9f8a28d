use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Latest traded price for an instrument, valid for a single cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub instrument: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(instrument: impl Into<String>, price: Decimal, observed_at: DateTime<Utc>) -> Self {
        Self {
            instrument: instrument.into(),
            price,
            observed_at,
        }
    }
}

/// Recent one-minute closes, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    #[serde(with = "decimal_float_vec")]
    pub prices: Vec<Decimal>,
    pub timestamp: DateTime<Utc>,
}

mod decimal_float_vec {
    use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
    use rust_decimal::Decimal;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(values: &[Decimal], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(values.iter().map(|d| d.to_f64().unwrap_or_default()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<f64>::deserialize(deserializer)?
            .into_iter()
            .map(|v| Decimal::from_f64(v).ok_or_else(|| D::Error::custom(format!("invalid price {}", v))))
            .collect()
    }
}

//! Lenient numeric fields for data feeds that mix numbers and numeric strings.
//!
//! Anything that cannot be read as a number becomes NaN so that the caller
//! can decide what to keep; deserialization itself never fails on a value.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Raw {
    Number(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

pub fn nan() -> f64 {
    f64::NAN
}

pub fn f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Raw>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Raw::Number(v)) => v,
        Some(Raw::Text(s)) => s.trim().parse().unwrap_or(f64::NAN),
        Some(Raw::Other(_)) | None => f64::NAN,
    })
}

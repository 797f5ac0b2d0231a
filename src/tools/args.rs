//! Typed arguments, one variant per tool.

use crate::error::ToolError;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SumArgs {
    pub num1: f64,
    pub num2: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrimeArgs {
    #[serde(deserialize_with = "integral")]
    pub number: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CryptoPriceArgs {
    pub coin: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewsArgs {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DcfArgs {
    pub ticker: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversionArgs {
    pub amount: f64,
    pub from: String,
    pub to: String,
}

/// A validated tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    Sum(SumArgs),
    PrimeNumber(PrimeArgs),
    CryptoPrice(CryptoPriceArgs),
    News(NewsArgs),
    DcfValuation(DcfArgs),
    CurrencyConversion(ConversionArgs),
}

impl ToolRequest {
    /// Build the typed request for `name` from schema-validated arguments.
    pub fn parse(name: &str, args: Map<String, Value>) -> Result<Self, ToolError> {
        let args = Value::Object(args);
        let request = match name {
            super::SUM => Self::Sum(decode(name, args)?),
            super::PRIME_NUMBER => Self::PrimeNumber(decode(name, args)?),
            super::CRYPTO_PRICE => Self::CryptoPrice(decode(name, args)?),
            super::NEWS => Self::News(decode(name, args)?),
            super::DCF_VALUATION => Self::DcfValuation(decode(name, args)?),
            super::CURRENCY_CONVERSION => Self::CurrencyConversion(decode(name, args)?),
            _ => return Err(ToolError::NotFound(name.to_string())),
        };
        Ok(request)
    }
}

fn decode<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::invalid(tool, e.to_string()))
}

/// Accept any JSON number without a fractional part as an `i64`.
fn integral<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = serde_json::Number::deserialize(deserializer)?;
    if let Some(i) = value.as_i64() {
        return Ok(i);
    }
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Ok(f as i64)
        }
        _ => Err(D::Error::custom(format!("{value} is not an integer"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn parses_each_variant() {
        let sum = ToolRequest::parse("sum", object(json!({"num1": 25, "num2": 37}))).unwrap();
        assert_eq!(sum, ToolRequest::Sum(SumArgs { num1: 25.0, num2: 37.0 }));

        let prime = ToolRequest::parse("primeNumber", object(json!({"number": 97.0}))).unwrap();
        assert_eq!(prime, ToolRequest::PrimeNumber(PrimeArgs { number: 97 }));

        let news = ToolRequest::parse("news", Map::new()).unwrap();
        assert_eq!(news, ToolRequest::News(NewsArgs::default()));
    }

    #[test]
    fn unknown_name_is_not_found() {
        let err = ToolRequest::parse("weather", Map::new()).unwrap_err();
        assert!(matches!(err, ToolError::NotFound(ref n) if n == "weather"));
    }

    #[test]
    fn out_of_range_prime_input_is_invalid() {
        // 2^63 would saturate to i64::MAX
        let err = ToolRequest::parse("primeNumber", object(json!({"number": 9_223_372_036_854_775_808.0})))
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));

        let ok = ToolRequest::parse("primeNumber", object(json!({"number": -9_223_372_036_854_775_808.0})))
            .unwrap();
        assert_eq!(ok, ToolRequest::PrimeNumber(PrimeArgs { number: i64::MIN }));
    }

    #[test]
    fn fractional_prime_input_is_invalid() {
        let err = ToolRequest::parse("primeNumber", object(json!({"number": 7.5}))).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}

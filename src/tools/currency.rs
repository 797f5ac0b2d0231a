//! Currency conversion via ExchangeRate-API pair endpoint.

use super::args::ConversionArgs;
use super::http::{endpoint, generic, get_json};
use super::{ToolContext, CURRENCY_CONVERSION};
use crate::error::ToolError;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const FAILURE: &str = "Failed to convert currency";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversion {
    pub amount: f64,
    pub from: String,
    pub to: String,
    pub rate: f64,
    pub converted_amount: f64,
    /// Provider's last-update time (UTC, as reported).
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
struct PairResponse {
    #[serde(default)]
    result: String,
    #[serde(default, rename = "error-type")]
    error_type: Option<String>,
    conversion_rate: Option<f64>,
    conversion_result: Option<f64>,
    #[serde(default)]
    time_last_update_utc: String,
}

pub async fn currency_conversion(
    ctx: &ToolContext,
    args: &ConversionArgs,
) -> Result<Value, ToolError> {
    let api_key = ctx
        .config
        .exchange_rate_api_key
        .expose()
        .ok_or_else(|| ToolError::missing_key("Exchange Rate"))?;

    let from = args.from.trim().to_uppercase();
    let to = args.to.trim().to_uppercase();
    let valid_code = |c: &str| !c.is_empty() && c.chars().all(|ch| ch.is_ascii_alphabetic());
    if !valid_code(&from) || !valid_code(&to) {
        return Err(ToolError::invalid(
            CURRENCY_CONVERSION,
            "currency codes must be alphabetic (e.g. USD)",
        ));
    }
    if !args.amount.is_finite() {
        return Err(ToolError::invalid(CURRENCY_CONVERSION, "amount must be finite"));
    }

    let path = format!("{}/pair/{}/{}/{}", api_key, from, to, args.amount);
    let url = endpoint(&ctx.config.exchange_rate_api_url, &path);

    let body: PairResponse = get_json(&ctx.http, &url, &[])
        .await
        .map_err(generic(CURRENCY_CONVERSION, FAILURE))?;

    let (rate, converted_amount) = match (body.result.as_str(), body.conversion_rate, body.conversion_result) {
        ("success", Some(rate), Some(converted)) => (rate, converted),
        _ => {
            let reason = body.error_type.unwrap_or_else(|| "missing conversion fields".into());
            return Err(generic(CURRENCY_CONVERSION, FAILURE)(anyhow!(reason)));
        }
    };

    let conversion = Conversion {
        amount: args.amount,
        from,
        to,
        rate,
        converted_amount,
        timestamp: body.time_last_update_utc,
    };
    serde_json::to_value(conversion).map_err(|e| ToolError::Execution(e.to_string()))
}

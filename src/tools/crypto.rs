//! Cryptocurrency market snapshot via CoinGecko.

use super::args::CryptoPriceArgs;
use super::http::{endpoint, generic, get_json};
use super::{ToolContext, CRYPTO_PRICE};
use crate::error::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

const FAILURE: &str = "Failed to fetch cryptocurrency data";

/// Market data for one coin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoSnapshot {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
}

pub async fn crypto_price(ctx: &ToolContext, args: &CryptoPriceArgs) -> Result<Value, ToolError> {
    let coin = args.coin.trim().to_lowercase();
    if coin.is_empty() {
        return Err(ToolError::invalid(CRYPTO_PRICE, "coin must not be empty"));
    }

    let url = endpoint(&ctx.config.coingecko_api_url, "coins/markets");
    let markets: Vec<CryptoSnapshot> = get_json(
        &ctx.http,
        &url,
        &[
            ("vs_currency", "usd"),
            ("ids", coin.as_str()),
            ("order", "market_cap_desc"),
            ("per_page", "1"),
            ("page", "1"),
            ("sparkline", "false"),
        ],
    )
    .await
    .map_err(generic(CRYPTO_PRICE, FAILURE))?;

    match markets.into_iter().next() {
        Some(snapshot) => {
            debug!("Crypto snapshot for {}: {:?}", coin, snapshot.current_price);
            serde_json::to_value(snapshot).map_err(|e| ToolError::Execution(e.to_string()))
        }
        None => Ok(json!({
            "coin": coin,
            "data": null,
            "message": "No market data found",
        })),
    }
}

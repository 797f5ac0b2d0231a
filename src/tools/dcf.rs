//! Discounted-cash-flow valuation with Buffett / Lynch buy rules.
//!
//! Fundamentals, cash-flow history and the live quote come from Alpha
//! Vantage; the valuation itself is a pure function of those inputs.

use super::args::DcfArgs;
use super::http::{endpoint, generic, get_json};
use super::{ToolContext, DCF_VALUATION};
use crate::error::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::debug;

const FAILURE: &str = "Failed to calculate DCF valuation";
const INSUFFICIENT: &str = "Insufficient data for DCF calculation";

/// Fixed model assumptions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DcfAssumptions {
    /// Annual FCF growth over the projection window.
    pub growth_rate: f64,
    /// Discount rate (WACC).
    pub discount_rate: f64,
    /// Gordon-growth rate after the projection window.
    pub terminal_growth: f64,
    pub years: u32,
}

pub const ASSUMPTIONS: DcfAssumptions = DcfAssumptions {
    growth_rate: 0.05,
    discount_rate: 0.10,
    terminal_growth: 0.03,
    years: 5,
};

/// Buffett buy price as a fraction of intrinsic value (30% margin).
const BUFFETT_FACTOR: f64 = 0.70;
/// Lynch buy price as a fraction of intrinsic value (20% margin).
const LYNCH_FACTOR: f64 = 0.80;
/// Price above intrinsic × this is a sell.
const SELL_FACTOR: f64 = 1.20;
const BUFFETT_MIN_MARGIN: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "STRONG BUY (Buffett Criteria)")]
    StrongBuy,
    #[serde(rename = "BUY (Lynch Criteria)")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
    #[serde(rename = "HOLD")]
    Hold,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StrongBuy => write!(f, "STRONG BUY (Buffett Criteria)"),
            Self::Buy => write!(f, "BUY (Lynch Criteria)"),
            Self::Sell => write!(f, "SELL"),
            Self::Hold => write!(f, "HOLD"),
        }
    }
}

/// Upstream figures a valuation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct DcfInputs {
    pub ticker: String,
    pub current_price: f64,
    pub market_cap: f64,
    pub pe: f64,
    /// Latest annual operating cash flow minus capital expenditures.
    pub fcf: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DcfValuation {
    pub ticker: String,
    pub intrinsic_value: f64,
    pub current_price: f64,
    pub recommendation: Recommendation,
    pub safety_margin: f64,
    pub buy_range: BuyRange,
    pub metrics: DcfMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyRange {
    pub buffett: f64,
    pub lynch: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfMetrics {
    pub pe: f64,
    pub peg: f64,
    pub fcf: f64,
    /// Assumed growth, in percent.
    pub growth: f64,
}

/// Value a company from its inputs.
///
/// Fails when the discount rate does not exceed the terminal growth rate,
/// since the Gordon-growth terminal value is undefined there.
pub fn value(inputs: &DcfInputs, a: &DcfAssumptions) -> Result<DcfValuation, ToolError> {
    let spread = a.discount_rate - a.terminal_growth;
    if spread <= 0.0 {
        return Err(ToolError::Execution(format!(
            "Discount rate ({}) must exceed terminal growth ({})",
            a.discount_rate, a.terminal_growth
        )));
    }

    let mut projected = inputs.fcf;
    let mut total_pv = 0.0;
    for year in 1..=a.years {
        projected *= 1.0 + a.growth_rate;
        total_pv += projected / (1.0 + a.discount_rate).powi(year as i32);
    }

    let terminal_value = projected * (1.0 + a.terminal_growth) / spread;
    let terminal_pv = terminal_value / (1.0 + a.discount_rate).powi(a.years as i32);

    let enterprise_value = total_pv + terminal_pv;
    let shares_outstanding = inputs.market_cap / inputs.current_price;
    let intrinsic_value = enterprise_value / shares_outstanding;

    let growth = a.growth_rate * 100.0;
    let peg = inputs.pe / growth;

    let safety_margin = (intrinsic_value - inputs.current_price) / intrinsic_value * 100.0;
    let buy_range = BuyRange {
        buffett: intrinsic_value * BUFFETT_FACTOR,
        lynch: intrinsic_value * LYNCH_FACTOR,
    };
    let recommendation = recommend(
        inputs.current_price,
        intrinsic_value,
        safety_margin,
        &buy_range,
        peg,
    );

    Ok(DcfValuation {
        ticker: inputs.ticker.clone(),
        intrinsic_value,
        current_price: inputs.current_price,
        recommendation,
        safety_margin,
        buy_range,
        metrics: DcfMetrics {
            pe: inputs.pe,
            peg,
            fcf: inputs.fcf,
            growth,
        },
    })
}

/// First matching rule wins: Buffett, then Lynch, then overvalued, else hold.
pub fn recommend(
    current_price: f64,
    intrinsic_value: f64,
    safety_margin: f64,
    buy_range: &BuyRange,
    peg: f64,
) -> Recommendation {
    if current_price <= buy_range.buffett && safety_margin >= BUFFETT_MIN_MARGIN {
        Recommendation::StrongBuy
    } else if current_price <= buy_range.lynch && peg < 1.0 {
        Recommendation::Buy
    } else if current_price > intrinsic_value * SELL_FACTOR {
        Recommendation::Sell
    } else {
        Recommendation::Hold
    }
}

pub async fn dcf_valuation(ctx: &ToolContext, args: &DcfArgs) -> Result<Value, ToolError> {
    let api_key = ctx
        .config
        .alpha_vantage_api_key
        .expose()
        .ok_or_else(|| ToolError::missing_key("Alpha Vantage"))?;

    let ticker = args.ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(ToolError::invalid(DCF_VALUATION, "ticker must not be empty"));
    }

    let url = endpoint(&ctx.config.alpha_vantage_api_url, "query");
    let fetch = |function: &'static str| {
        let params = [("function", function), ("symbol", ticker.as_str()), ("apikey", api_key)];
        let http = &ctx.http;
        let url = url.as_str();
        async move { get_json::<Value>(http, url, &params).await }
    };

    let (overview, cash_flow, quote) =
        tokio::try_join!(fetch("OVERVIEW"), fetch("CASH_FLOW"), fetch("GLOBAL_QUOTE"))
            .map_err(generic(DCF_VALUATION, FAILURE))?;

    let inputs = extract_inputs(&ticker, &overview, &cash_flow, &quote)
        .ok_or_else(|| ToolError::Execution(INSUFFICIENT.to_string()))?;
    debug!("DCF inputs for {}: {:?}", ticker, inputs);

    let valuation = value(&inputs, &ASSUMPTIONS)?;
    serde_json::to_value(valuation).map_err(|e| ToolError::Execution(e.to_string()))
}

/// Pull the figures out of the three Alpha Vantage payloads.
fn extract_inputs(
    ticker: &str,
    overview: &Value,
    cash_flow: &Value,
    quote: &Value,
) -> Option<DcfInputs> {
    overview
        .get("Symbol")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())?;

    let current_price = number(quote.get("Global Quote")?.get("05. price")?)
        .filter(|p| *p > 0.0)?;
    let market_cap = overview
        .get("MarketCapitalization")
        .and_then(number)
        .filter(|m| *m > 0.0)?;
    let pe = overview.get("PERatio").and_then(number).unwrap_or(0.0);

    let latest = cash_flow.get("annualReports")?.as_array()?.first()?;
    let operating = latest.get("operatingCashflow").and_then(number).unwrap_or(0.0);
    let capex = latest.get("capitalExpenditures").and_then(number).unwrap_or(0.0);

    Some(DcfInputs {
        ticker: ticker.to_string(),
        current_price,
        market_cap,
        pe,
        fcf: operating - capex,
    })
}

/// Alpha Vantage sends numbers as strings ("None" when absent).
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inputs(market_cap: f64, current_price: f64) -> DcfInputs {
        DcfInputs {
            ticker: "TEST".into(),
            current_price,
            market_cap,
            pe: 10.0,
            fcf: 100.0,
        }
    }

    fn range(intrinsic: f64) -> BuyRange {
        BuyRange {
            buffett: intrinsic * BUFFETT_FACTOR,
            lynch: intrinsic * LYNCH_FACTOR,
        }
    }

    fn margin(intrinsic: f64, current: f64) -> f64 {
        (intrinsic - current) / intrinsic * 100.0
    }

    #[test]
    fn five_year_projection_with_terminal_value() {
        // 100 shares at 10.00, FCF 100 -> EV 1601.8757
        let v = value(&inputs(1000.0, 10.0), &ASSUMPTIONS).unwrap();
        assert!((v.intrinsic_value - 16.018757).abs() < 1e-5, "{}", v.intrinsic_value);
        assert!((v.safety_margin - 37.5732).abs() < 1e-3);
        assert!((v.buy_range.buffett - 11.213130).abs() < 1e-5);
        assert!((v.buy_range.lynch - 12.815006).abs() < 1e-5);
        assert_eq!(v.metrics.growth, 5.0);
        assert_eq!(v.metrics.peg, 2.0);
        assert_eq!(v.recommendation, Recommendation::StrongBuy);
    }

    #[test]
    fn price_above_threshold_is_sell() {
        let intrinsic = 100.0;
        let current = intrinsic * 1.25;
        let rec = recommend(current, intrinsic, margin(intrinsic, current), &range(intrinsic), 0.5);
        assert_eq!(rec, Recommendation::Sell);
    }

    #[test]
    fn sell_from_valuation_inputs() {
        // price / intrinsic == market_cap / EV, so a cap of 1.25 x EV sells
        let v = value(&inputs(1601.875725701796 * 1.25, 42.0), &ASSUMPTIONS).unwrap();
        assert!((v.current_price / v.intrinsic_value - 1.25).abs() < 1e-9);
        assert_eq!(v.recommendation, Recommendation::Sell);
    }

    #[test]
    fn rule_priority() {
        let i = 100.0;
        let cases = [
            (65.0, 0.5, Recommendation::StrongBuy),
            (70.0, 5.0, Recommendation::StrongBuy),
            (75.0, 0.8, Recommendation::Buy),
            (75.0, 1.5, Recommendation::Hold),
            (110.0, 0.2, Recommendation::Hold),
            (120.0, 0.2, Recommendation::Hold),
            (120.5, 0.2, Recommendation::Sell),
        ];
        for (current, peg, want) in cases {
            assert_eq!(recommend(current, i, margin(i, current), &range(i), peg), want, "{current}");
        }
    }

    #[test]
    fn non_positive_spread_is_rejected() {
        let bad = DcfAssumptions {
            terminal_growth: 0.10,
            ..ASSUMPTIONS
        };
        assert!(matches!(value(&inputs(1000.0, 10.0), &bad), Err(ToolError::Execution(_))));
    }

    #[test]
    fn recommendation_serializes_as_label() {
        assert_eq!(
            serde_json::to_value(Recommendation::StrongBuy).unwrap(),
            json!("STRONG BUY (Buffett Criteria)")
        );
        assert_eq!(Recommendation::Buy.to_string(), "BUY (Lynch Criteria)");
    }

    #[test]
    fn extraction_requires_all_three_datasets() {
        let overview = json!({"Symbol": "ACME", "MarketCapitalization": "1000", "PERatio": "None"});
        let cash = json!({"annualReports": [{"operatingCashflow": "150", "capitalExpenditures": "50"}]});
        let quote = json!({"Global Quote": {"05. price": "10.00"}});

        let got = extract_inputs("ACME", &overview, &cash, &quote).unwrap();
        assert_eq!(got.fcf, 100.0);
        assert_eq!(got.pe, 0.0);

        assert!(extract_inputs("ACME", &json!({"Note": "rate limited"}), &cash, &quote).is_none());
        assert!(extract_inputs("ACME", &overview, &json!({}), &quote).is_none());
        assert!(extract_inputs("ACME", &overview, &cash, &json!({"Global Quote": {}})).is_none());
    }
}

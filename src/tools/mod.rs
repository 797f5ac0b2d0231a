//! Tool registry: the fixed set of capabilities the model may call.
//!
//! The registry is assembled once at startup and never mutated. Every call
//! passes through [`ToolRegistry::dispatch`], which checks the name, validates
//! the arguments against the advertised [`ToolSpec`], builds a typed
//! [`ToolRequest`] and runs it under the configured timeout.

pub mod args;
pub mod crypto;
pub mod currency;
pub mod dcf;
pub mod http;
pub mod math;
pub mod news;
pub mod spec;

pub use args::ToolRequest;
pub use spec::{ParamSpec, ParamType, ToolSpec};

use crate::config::FinchatConfig;
use crate::error::ToolError;
use crate::types::{ToolInvocation, ToolOutcome};
use serde_json::{json, Value};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

pub const SUM: &str = "sum";
pub const PRIME_NUMBER: &str = "primeNumber";
pub const CRYPTO_PRICE: &str = "cryptoPrice";
pub const NEWS: &str = "news";
pub const DCF_VALUATION: &str = "dcfValuation";
pub const CURRENCY_CONVERSION: &str = "currencyConversion";

// ---------------------------------------------------------------------------
// Tool specs advertised to the model
// ---------------------------------------------------------------------------

fn param(
    name: &'static str,
    kind: ParamType,
    description: &'static str,
    required: bool,
) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        description,
        required,
    }
}

/// The process-wide tool specs, built on first use.
pub fn tool_specs() -> &'static [ToolSpec] {
    static SPECS: OnceLock<Vec<ToolSpec>> = OnceLock::new();
    SPECS.get_or_init(|| {
        vec![
            ToolSpec {
                name: SUM,
                description: "Calculate the sum of two numbers",
                params: vec![
                    param("num1", ParamType::Number, "First number", true),
                    param("num2", ParamType::Number, "Second number", true),
                ],
            },
            ToolSpec {
                name: PRIME_NUMBER,
                description: "Check if a number is prime",
                params: vec![param(
                    "number",
                    ParamType::Integer,
                    "Number to check for primality",
                    true,
                )],
            },
            ToolSpec {
                name: CRYPTO_PRICE,
                description: "Get current cryptocurrency price and market data",
                params: vec![param(
                    "coin",
                    ParamType::String,
                    "Cryptocurrency ID (e.g., bitcoin, ethereum)",
                    true,
                )],
            },
            ToolSpec {
                name: NEWS,
                description: "Get latest news articles by category or search query",
                params: vec![
                    param("query", ParamType::String, "Search query for news articles", false),
                    param(
                        "category",
                        ParamType::String,
                        "News category (technology, business, sports, etc.)",
                        false,
                    ),
                ],
            },
            ToolSpec {
                name: DCF_VALUATION,
                description: "Perform DCF (Discounted Cash Flow) valuation analysis for a stock",
                params: vec![param(
                    "ticker",
                    ParamType::String,
                    "Stock ticker symbol (e.g., AAPL, GOOGL)",
                    true,
                )],
            },
            ToolSpec {
                name: CURRENCY_CONVERSION,
                description: "Convert amount from one currency to another",
                params: vec![
                    param("amount", ParamType::Number, "Amount to convert", true),
                    param("from", ParamType::String, "Source currency code (e.g., USD)", true),
                    param("to", ParamType::String, "Target currency code (e.g., EUR)", true),
                ],
            },
        ]
    })
}

// ---------------------------------------------------------------------------
// Tool execution engine
// ---------------------------------------------------------------------------

/// Handles shared by the remote-data tools.
pub struct ToolContext {
    pub http: reqwest::Client,
    pub config: FinchatConfig,
}

/// Read-only registry of tools.
pub struct ToolRegistry {
    specs: &'static [ToolSpec],
    ctx: ToolContext,
    timeout: Duration,
}

impl ToolRegistry {
    pub fn new(config: &FinchatConfig) -> Self {
        Self {
            specs: tool_specs(),
            ctx: ToolContext {
                http: reqwest::Client::new(),
                config: config.clone(),
            },
            timeout: config.tool_timeout(),
        }
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn specs(&self) -> &'static [ToolSpec] {
        self.specs
    }

    pub fn spec(&self, name: &str) -> Option<&'static ToolSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Validate and run one call.
    pub async fn dispatch(&self, name: &str, args: &Value) -> Result<Value, ToolError> {
        let spec = self
            .spec(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        let normalized = spec.validate(args)?;
        let request = ToolRequest::parse(name, normalized)?;

        match tokio::time::timeout(self.timeout, self.run(&request)).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout {
                tool: name.to_string(),
                after: self.timeout,
            }),
        }
    }

    /// Run one invocation, folding any failure into its outcome.
    pub async fn execute(&self, invocation: &ToolInvocation) -> ToolOutcome {
        info!("Tool: {}({})", invocation.name, invocation.arguments);

        match self.dispatch(&invocation.name, &invocation.arguments).await {
            Ok(value) => {
                info!("Tool {} succeeded", invocation.name);
                ToolOutcome::success(invocation, value)
            }
            Err(e) => {
                warn!("Tool {} failed: {}", invocation.name, e);
                ToolOutcome::failure(invocation, e.to_string())
            }
        }
    }

    async fn run(&self, request: &ToolRequest) -> Result<Value, ToolError> {
        match request {
            ToolRequest::Sum(a) => Ok(number_value(math::sum(a.num1, a.num2))),
            ToolRequest::PrimeNumber(a) => Ok(json!(math::is_prime(a.number).await)),
            ToolRequest::CryptoPrice(a) => crypto::crypto_price(&self.ctx, a).await,
            ToolRequest::News(a) => news::news(&self.ctx, a).await,
            ToolRequest::DcfValuation(a) => dcf::dcf_valuation(&self.ctx, a).await,
            ToolRequest::CurrencyConversion(a) => {
                currency::currency_conversion(&self.ctx, a).await
            }
        }
    }
}

/// Render integral results without a trailing `.0`.
fn number_value(x: f64) -> Value {
    const EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    if x.fract() == 0.0 && x.abs() < EXACT {
        json!(x as i64)
    } else {
        json!(x)
    }
}

//! First-run interactive setup wizard.
//!
//! Steps:
//! 1. Display banner
//! 2. Model endpoint, key and model name
//! 3. Data provider keys (all optional)
//! 4. Write finchat.toml
//!
//! Existing values are offered as defaults; secrets are never echoed back.

use crate::config::{self, FinchatConfig, Secret, CONFIG_FILE};
use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::path::Path;

/// ASCII banner displayed during setup.
const BANNER: &str = r#"
  _____ _            _           _
 |  ___(_)_ __   ___| |__   __ _| |_
 | |_  | | '_ \ / __| '_ \ / _` | __|
 |  _| | | | | | (__| | | | (_| | |_
 |_|   |_|_| |_|\___|_| |_|\__,_|\__|

        Tool-augmented financial chat
"#;

/// Run the interactive setup wizard on stdin.
pub fn run_setup_wizard(home_dir: &Path) -> Result<FinchatConfig> {
    println!("{}", BANNER);
    println!("Welcome to finchat setup.\n");

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut out = io::stdout();
    let config = run_setup_with(&mut reader, &mut out, home_dir)?;

    println!("\nSetup complete! Run `finchat chat` to start.\n");
    Ok(config)
}

/// Wizard body over arbitrary input/output; returns the saved config.
pub fn run_setup_with(
    reader: &mut impl BufRead,
    out: &mut impl Write,
    home_dir: &Path,
) -> Result<FinchatConfig> {
    let config_path = home_dir.join(CONFIG_FILE);
    let existing = config::load_config(&config_path)?;

    writeln!(out, "[1/3] Model")?;
    let model_api_url =
        prompt_with_default(reader, out, "  API base URL", &existing.model_api_url)?;
    let model_api_key = prompt_secret(reader, out, "  API key", &existing.model_api_key)?;
    let inference_model =
        prompt_with_default(reader, out, "  Model", &existing.inference_model)?;

    writeln!(out, "\n[2/3] Data providers (press Enter to skip)")?;
    let news_api_key = prompt_secret(reader, out, "  NewsAPI key", &existing.news_api_key)?;
    let alpha_vantage_api_key = prompt_secret(
        reader,
        out,
        "  Alpha Vantage key",
        &existing.alpha_vantage_api_key,
    )?;
    let exchange_rate_api_key = prompt_secret(
        reader,
        out,
        "  ExchangeRate-API key",
        &existing.exchange_rate_api_key,
    )?;

    writeln!(out, "\n[3/3] Writing configuration...")?;
    let config = FinchatConfig {
        model_api_url,
        model_api_key,
        inference_model,
        news_api_key,
        alpha_vantage_api_key,
        exchange_rate_api_key,
        ..existing
    };
    config::save_config(&config, &config_path)?;
    writeln!(out, "  Written: {}", config_path.display())?;

    Ok(config)
}

/// Prompt the user for input with a label.
fn prompt(reader: &mut impl BufRead, out: &mut impl Write, label: &str) -> Result<String> {
    write!(out, "{}: ", label)?;
    out.flush()?;
    let mut input = String::new();
    reader.read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Prompt with a default value.
fn prompt_with_default(
    reader: &mut impl BufRead,
    out: &mut impl Write,
    label: &str,
    default: &str,
) -> Result<String> {
    let input = prompt(reader, out, &format!("{} [{}]", label, default))?;
    if input.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(input)
    }
}

/// Prompt for a credential; Enter keeps the current one.
fn prompt_secret(
    reader: &mut impl BufRead,
    out: &mut impl Write,
    label: &str,
    current: &Secret,
) -> Result<Secret> {
    let hint = if current.is_set() { "configured" } else { "not set" };
    let input = prompt(reader, out, &format!("{} ({})", label, hint))?;
    if input.is_empty() {
        Ok(current.clone())
    } else {
        Ok(Secret::new(input))
    }
}
